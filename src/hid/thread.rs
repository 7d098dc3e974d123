// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    any::Any,
    thread::JoinHandle,
    time::{Duration, Instant},
};

use super::{HidDevice, HidDeviceError, HidError, HidResult};

#[derive(Debug, Clone, Copy)]
pub enum State {
    Running,
    Terminating,
}

/// Emitted event
///
/// Consumed by a single receiver within the thread.
#[allow(missing_debug_implementations)]
pub enum Event<'e> {
    StateChanged(State),
    ReportRead {
        data: &'e [u8],
    },
    ReportReadError(HidError),
    ReportWritten {
        report_id: u8,
        bytes_written: usize,
    },
    ReportWriteError {
        report_id: u8,
        err: HidError,
    },
}

#[derive(Debug, Clone)]
pub enum Command {
    WriteReport {
        data: Vec<u8>,
    },
    Terminate,
}

#[derive(Debug)]
pub struct CommandDisconnected;

pub type ReceiveCommandResult = std::result::Result<Option<Command>, CommandDisconnected>;

pub trait CommandReceiver {
    /// Receive command within the thread.
    ///
    /// Non-blocking receive (polling). The thread only blocks on hidapi
    /// read requests (intentionally) and during blocking hidapi write
    /// requests (unintentionally).
    fn try_recv_command(&mut self) -> ReceiveCommandResult;
}

pub trait EventHandler {
    /// Handle an event within the thread.
    ///
    /// Must not block the thread for longer than needed.
    fn handle_event(&mut self, event: Event<'_>);
}

#[allow(missing_debug_implementations)]
pub struct HidThread<C: CommandReceiver + EventHandler> {
    join_handle: JoinHandle<Environment<C>>,
}

// Id byte + the largest input report with some headroom
const READ_BUFFER_SIZE: usize = 1 + 256;

// hidapi only supports timeouts with millisecond precision.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

const FIRST_READ_TIMEOUT: Duration = MIN_READ_TIMEOUT;

// Upper bound for the polling frequency if a device misbehaves.
const MIN_CYCLE_TIME: Duration = Duration::from_micros(250); // 4 kHz

struct ReadSlot {
    buf: [u8; READ_BUFFER_SIZE],
    len: usize,
}

impl ReadSlot {
    const fn new() -> Self {
        Self {
            buf: [0; READ_BUFFER_SIZE],
            len: 0,
        }
    }

    fn data(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Double-buffering for deduplication of subsequent incoming reports
pub(super) struct ReadSlots {
    slots: [ReadSlot; 2],
    last_index: usize,
}

impl ReadSlots {
    pub(super) const fn new() -> Self {
        Self {
            slots: [ReadSlot::new(), ReadSlot::new()],
            last_index: 0,
        }
    }

    const fn next_index(&self) -> usize {
        (self.last_index + 1) % 2
    }

    /// Buffer for reading the next report.
    pub(super) fn next_buf(&mut self) -> &mut [u8] {
        let index = self.next_index();
        &mut self.slots[index].buf
    }

    /// Accept the next report with `len` bytes.
    ///
    /// Returns `None` if it equals the last accepted report.
    pub(super) fn accept(&mut self, len: usize) -> Option<&[u8]> {
        let index = self.next_index();
        self.slots[index].len = len;
        if self.slots[index].data() == self.slots[self.last_index].data() {
            log::trace!(
                "Discarding duplicate report (id = {id}, len = {len})",
                id = self.slots[index].buf[0],
            );
            return None;
        }
        self.last_index = index;
        Some(self.slots[index].data())
    }
}

fn handle_command(device: &HidDevice, command: Command) -> Option<Event<'static>> {
    match command {
        Command::Terminate => None,
        Command::WriteReport { data } => {
            debug_assert!(!data.is_empty());
            let report_id = data[0];
            match device.write(&data) {
                Ok(bytes_written) => Some(Event::ReportWritten {
                    report_id,
                    bytes_written,
                }),
                Err(err) => Some(Event::ReportWriteError { report_id, err }),
            }
        }
    }
}

fn thread_fn<C: CommandReceiver + EventHandler>(environment: &mut Environment<C>) {
    let Environment {
        connected_device: device,
        context,
    } = environment;
    context.handle_event(Event::StateChanged(State::Running));
    let mut read_slots = ReadSlots::new();
    let mut last_read_cycle_started = Instant::now();
    while let Ok(command) = context.try_recv_command() {
        // Handle a single command during each cycle.
        if let Some(command) = command {
            if let Some(event) = handle_command(device, command) {
                context.handle_event(event);
            } else {
                // Received a termination command
                break;
            }
        }
        let mut read_cycle_started = Instant::now();
        if !MIN_CYCLE_TIME.is_zero() {
            let earliest_next_read_cycle = last_read_cycle_started + MIN_CYCLE_TIME;
            while earliest_next_read_cycle > read_cycle_started {
                let sleep_duration = earliest_next_read_cycle.duration_since(read_cycle_started);
                log::trace!(
                    "Throttling: {millis:0.3} ms",
                    millis = sleep_duration.as_secs_f64() * 1_000.0
                );
                std::thread::sleep(sleep_duration);
                read_cycle_started = Instant::now();
            }
        }
        // Consume all available reports.
        //
        // Only the first read request uses a timeout, all subsequent requests
        // return immediately if no incoming reports are available.
        let elapsed_since_last_read_cycle =
            read_cycle_started.saturating_duration_since(last_read_cycle_started);
        let mut next_read_timeout = if FIRST_READ_TIMEOUT > elapsed_since_last_read_cycle {
            let next_read_timeout = FIRST_READ_TIMEOUT - elapsed_since_last_read_cycle;
            #[allow(clippy::cast_possible_truncation)]
            if next_read_timeout < MIN_READ_TIMEOUT {
                MIN_READ_TIMEOUT
            } else {
                Duration::from_millis(next_read_timeout.as_millis() as u64)
            }
        } else {
            Duration::ZERO
        };
        loop {
            let read_timeout = next_read_timeout;
            next_read_timeout = Duration::ZERO;
            let bytes_read = match device.read(read_slots.next_buf(), Some(read_timeout)) {
                Ok(count) => count,
                Err(err) => {
                    context.handle_event(Event::ReportReadError(err));
                    break;
                }
            };
            if bytes_read == 0 {
                // No report received
                break;
            }
            // Subsequent reports with the same content are idempotent.
            let Some(data) = read_slots.accept(bytes_read) else {
                continue;
            };
            last_read_cycle_started = read_cycle_started;
            context.handle_event(Event::ReportRead { data });
        }
    }
    context.handle_event(Event::StateChanged(State::Terminating));
}

#[allow(missing_debug_implementations)]
pub struct Environment<C> {
    pub connected_device: HidDevice,

    pub context: C,
}

impl<C> HidThread<C>
where
    C: CommandReceiver + EventHandler + Send + 'static,
{
    pub fn spawn(environment: Environment<C>) -> HidResult<Self> {
        if !environment.connected_device.is_connected() {
            return Err(HidDeviceError::NotConnected.into());
        }
        let join_handle = std::thread::Builder::new()
            .name("jamio-hid".to_owned())
            .spawn(move || {
                let mut environment = environment;
                thread_fn(&mut environment);
                environment
            })?;
        log::debug!("Spawned thread: {join_handle:?}");
        Ok(Self { join_handle })
    }

    pub fn join(self) -> JoinedThread<C> {
        let Self { join_handle } = self;
        log::debug!("Joining thread: {join_handle:?}");
        join_handle
            .join()
            .map_or_else(JoinedThread::JoinError, |environment| {
                JoinedThread::Terminated(environment)
            })
    }
}

#[allow(missing_debug_implementations)]
pub enum JoinedThread<C> {
    Terminated(Environment<C>),
    JoinError(Box<dyn Any + Send + 'static>),
}
