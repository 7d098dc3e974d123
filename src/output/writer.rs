// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use super::{ReportOutputConnection, ShadowBuffer};

/// Flushes shadow buffers on a fixed pool of worker threads.
///
/// Scheduling never blocks. Flush requests for the same group are
/// coalesced until a worker picks them up, so each flush sends the
/// latest contents.
#[allow(missing_debug_implementations)]
pub struct DeferredWriter {
    groups: Arc<[Arc<ShadowBuffer>]>,
    queue_tx: Mutex<Option<Sender<usize>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn flush_group(group: &ShadowBuffer, connection: &dyn ReportOutputConnection, report: &mut Vec<u8>) {
    group.begin_flush();
    loop {
        group.snapshot_into(report);
        // The shadow buffer is not locked while sending.
        if let Err(err) = connection.send_report(report) {
            log::error!(
                "Failed to send report {report_id:#04x}: {err}",
                report_id = group.report_id()
            );
        } else {
            log::trace!(
                "Sent report {report_id:#04x} ({len} bytes)",
                report_id = group.report_id(),
                len = report.len()
            );
        }
        if !group.end_flush() {
            break;
        }
    }
}

fn worker_fn(
    groups: &[Arc<ShadowBuffer>],
    connection: &dyn ReportOutputConnection,
    queue_rx: &Receiver<usize>,
) {
    let mut report = Vec::new();
    // Terminates after the sender has been dropped and the
    // queue has been drained.
    while let Ok(index) = queue_rx.recv() {
        flush_group(&groups[index], connection, &mut report);
    }
}

impl DeferredWriter {
    /// Spawn `num_threads` worker threads (at least one).
    pub fn spawn(
        groups: Arc<[Arc<ShadowBuffer>]>,
        connection: Arc<dyn ReportOutputConnection>,
        num_threads: usize,
    ) -> io::Result<Self> {
        // Each group is queued at most once at any time
        let (queue_tx, queue_rx) = crossbeam_channel::bounded(groups.len().max(1));
        let num_threads = num_threads.max(1);
        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let groups = Arc::clone(&groups);
            let connection = Arc::clone(&connection);
            let queue_rx = queue_rx.clone();
            let join_handle = thread::Builder::new()
                .name(format!("jamio-writer-{index}"))
                .spawn(move || worker_fn(&groups, connection.as_ref(), &queue_rx))?;
            log::debug!("Spawned writer thread: {join_handle:?}");
            workers.push(join_handle);
        }
        Ok(Self {
            groups,
            queue_tx: Mutex::new(Some(queue_tx)),
            workers: Mutex::new(workers),
        })
    }

    #[must_use]
    pub fn groups(&self) -> &[Arc<ShadowBuffer>] {
        &self.groups
    }

    /// Request a flush of the group with the given index.
    ///
    /// Returns `true` if a new flush has been queued and `false` if
    /// the request has been merged into a pending flush or the writer
    /// has already been shut down.
    pub fn schedule(&self, index: usize) -> bool {
        let group = &self.groups[index];
        if !group.request_flush() {
            log::trace!(
                "Flush of report {report_id:#04x} already pending",
                report_id = group.report_id()
            );
            return false;
        }
        let queue_tx = self.queue_tx.lock();
        let Some(queue_tx) = queue_tx.as_ref() else {
            log::debug!(
                "Dropping flush of report {report_id:#04x} after shutdown",
                report_id = group.report_id()
            );
            group.cancel_flush();
            return false;
        };
        match queue_tx.try_send(index) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                log::error!(
                    "Failed to queue flush of report {report_id:#04x}",
                    report_id = group.report_id()
                );
                group.cancel_flush();
                false
            }
        }
    }

    /// Request a flush of all groups.
    pub fn schedule_all(&self) {
        for index in 0..self.groups.len() {
            self.schedule(index);
        }
    }

    /// Execute all pending flushes and join the worker threads.
    ///
    /// All subsequent flush requests are dropped.
    pub fn shutdown(&self) {
        // Disconnecting lets the workers exit after draining the queue.
        drop(self.queue_tx.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for join_handle in workers {
            log::debug!("Joining writer thread: {join_handle:?}");
            if join_handle.join().is_err() {
                log::error!("Writer thread panicked");
            }
        }
    }
}

impl Drop for DeferredWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
