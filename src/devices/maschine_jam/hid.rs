// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Connects a [`DeviceContext`] to the device via hidapi

use std::sync::{mpsc, Arc};

use hidapi::DeviceInfo;

use super::{DeviceContext, Settings, PRODUCT_ID, VENDOR_ID};
use crate::{
    hid::{
        thread::{
            Command, CommandDisconnected, CommandReceiver, Environment, Event, EventHandler,
            JoinedThread, ReceiveCommandResult,
        },
        HidDevice, HidDeviceError, HidResult, HidThread,
    },
    output::{self, ReportOutputConnection},
};

#[must_use]
pub fn is_supported(device_info: &DeviceInfo) -> bool {
    device_info.vendor_id() == VENDOR_ID && device_info.product_id() == PRODUCT_ID
}

/// Queues output reports for the I/O thread.
#[derive(Debug)]
struct HidReportOutput {
    command_tx: mpsc::Sender<Command>,
}

impl ReportOutputConnection for HidReportOutput {
    fn send_report(&self, report: &[u8]) -> output::Result<()> {
        self.command_tx
            .send(Command::WriteReport {
                data: report.to_vec(),
            })
            .map_err(|_| output::Error::Disconnected)
    }
}

struct ThreadContext {
    command_rx: mpsc::Receiver<Command>,
    device: Arc<DeviceContext>,
}

impl CommandReceiver for ThreadContext {
    fn try_recv_command(&mut self) -> ReceiveCommandResult {
        match self.command_rx.try_recv() {
            Ok(command) => Ok(Some(command)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(CommandDisconnected),
        }
    }
}

impl EventHandler for ThreadContext {
    fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::StateChanged(state) => {
                log::info!("Thread state changed: {state:?}");
            }
            Event::ReportRead { data } => {
                // Invalid reports have already been logged.
                let _ = self.device.handle_report(data);
            }
            Event::ReportReadError(err) => {
                log::warn!("Failed to read report: {err}");
            }
            Event::ReportWritten {
                report_id,
                bytes_written,
            } => {
                log::trace!("Written report {report_id:#04x} ({bytes_written} bytes)");
            }
            Event::ReportWriteError { report_id, err } => {
                log::error!("Failed to write report {report_id:#04x}: {err}");
            }
        }
    }
}

/// A device with a running I/O thread.
#[allow(missing_debug_implementations)]
pub struct AttachedDevice {
    info: DeviceInfo,
    context: Arc<DeviceContext>,
    thread: HidThread<ThreadContext>,
    command_tx: mpsc::Sender<Command>,
}

impl AttachedDevice {
    /// Spawn the I/O thread and send the initial output reports.
    pub fn attach(connected_device: HidDevice, settings: &Settings) -> HidResult<Self> {
        if !is_supported(connected_device.info()) {
            return Err(HidDeviceError::NotSupported.into());
        }
        if !connected_device.is_connected() {
            return Err(HidDeviceError::NotConnected.into());
        }
        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let report_output = Arc::new(HidReportOutput {
            command_tx: command_tx.clone(),
        });
        let context = Arc::new(DeviceContext::new(report_output, settings)?);
        let info = connected_device.info().clone();
        let environment = Environment {
            connected_device,
            context: ThreadContext {
                command_rx,
                device: Arc::clone(&context),
            },
        };
        log::info!("Spawning HID I/O thread");
        let thread = HidThread::spawn(environment)?;
        context.initialize();
        Ok(Self {
            info,
            context,
            thread,
            command_tx,
        })
    }

    #[must_use]
    pub const fn info(&self) -> &DeviceInfo {
        &self.info
    }

    #[must_use]
    pub const fn context(&self) -> &Arc<DeviceContext> {
        &self.context
    }

    /// Turn off all indicators and terminate the I/O thread.
    ///
    /// Returns the still connected device.
    pub fn detach(self) -> HidResult<HidDevice> {
        let Self {
            info: _,
            context,
            thread,
            command_tx,
        } = self;
        // All output reports are queued before the termination command.
        context.finalize();
        log::info!("Terminating I/O thread");
        command_tx
            .send(Command::Terminate)
            .map_err(|_| anyhow::anyhow!("command channel to I/O thread closed unexpectedly"))?;
        log::info!("Joining I/O thread");
        match thread.join() {
            JoinedThread::Terminated(environment) => {
                let connected_device = environment.connected_device;
                debug_assert!(connected_device.is_connected());
                Ok(connected_device)
            }
            JoinedThread::JoinError(err) => {
                Err(anyhow::anyhow!("Joining the I/O thread failed: {err:?}").into())
            }
        }
    }
}
