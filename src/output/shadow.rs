// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

const FLUSH_IDLE: u8 = 0;
const FLUSH_QUEUED: u8 = 1;
const FLUSH_RUNNING: u8 = 2;
// Modified while the previous contents were being sent
const FLUSH_RUNNING_DIRTY: u8 = 3;

/// Last requested state of an indicator group.
///
/// Contains the bytes of one outbound report without the leading
/// report id. The flush state ensures that at most one flush of the
/// group is queued or in flight at any time.
#[derive(Debug)]
pub struct ShadowBuffer {
    report_id: u8,
    bytes: Mutex<Box<[u8]>>,
    flush: AtomicU8,
}

impl ShadowBuffer {
    /// A zero-initialized buffer of `len` bytes.
    #[must_use]
    pub fn new(report_id: u8, len: usize) -> Self {
        Self {
            report_id,
            bytes: Mutex::new(vec![0; len].into_boxed_slice()),
            flush: AtomicU8::new(FLUSH_IDLE),
        }
    }

    #[must_use]
    pub const fn report_id(&self) -> u8 {
        self.report_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics if `index` is out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> u8 {
        self.bytes.lock()[index]
    }

    /// Store a single byte.
    ///
    /// Returns `true` if the contents have changed. Panics if `index`
    /// is out of range.
    pub fn set(&self, index: usize, value: u8) -> bool {
        let mut bytes = self.bytes.lock();
        let byte = &mut bytes[index];
        if *byte == value {
            return false;
        }
        *byte = value;
        true
    }

    /// Overwrite `bytes.len()` bytes starting at `offset`.
    ///
    /// Returns `true` if the contents have changed.
    pub fn set_range(&self, offset: usize, bytes: &[u8]) -> bool {
        let mut buffer = self.bytes.lock();
        let range = &mut buffer[offset..offset + bytes.len()];
        if range == bytes {
            return false;
        }
        range.copy_from_slice(bytes);
        true
    }

    pub fn clear(&self) {
        self.bytes.lock().fill(0);
    }

    /// Copy the complete report including the id into `report`.
    pub fn snapshot_into(&self, report: &mut Vec<u8>) {
        let bytes = self.bytes.lock();
        report.clear();
        report.reserve(1 + bytes.len());
        report.push(self.report_id);
        report.extend_from_slice(&bytes);
    }

    /// Returns `true` if a flush is queued or in flight.
    #[must_use]
    pub fn is_flush_pending(&self) -> bool {
        self.flush.load(Ordering::Acquire) != FLUSH_IDLE
    }

    /// Mark the buffer as modified.
    ///
    /// Returns `true` if the caller is responsible for queuing a flush,
    /// i.e. if no flush is currently queued or in flight.
    pub(crate) fn request_flush(&self) -> bool {
        let previous = self
            .flush
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| match state {
                FLUSH_IDLE => Some(FLUSH_QUEUED),
                FLUSH_RUNNING => Some(FLUSH_RUNNING_DIRTY),
                // Already pending
                _ => None,
            });
        previous == Ok(FLUSH_IDLE)
    }

    /// Revert a request that could not be queued.
    pub(crate) fn cancel_flush(&self) {
        self.flush.store(FLUSH_IDLE, Ordering::Release);
    }

    pub(crate) fn begin_flush(&self) {
        let previous = self.flush.swap(FLUSH_RUNNING, Ordering::AcqRel);
        debug_assert_eq!(previous, FLUSH_QUEUED);
    }

    /// Finish a flush.
    ///
    /// Returns `true` if the buffer has been modified in the meantime
    /// and needs to be flushed again.
    pub(crate) fn end_flush(&self) -> bool {
        match self.flush.compare_exchange(
            FLUSH_RUNNING,
            FLUSH_IDLE,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => false,
            Err(state) => {
                debug_assert_eq!(state, FLUSH_RUNNING_DIRTY);
                self.flush.store(FLUSH_RUNNING, Ordering::Release);
                true
            }
        }
    }
}
