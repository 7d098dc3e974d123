// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! USB HID transport driven by [`hidapi`]

use std::{
    ops::{Deref, DerefMut},
    time::Duration,
};

use hidapi::DeviceInfo;
use thiserror::Error;

pub mod thread;
pub use thread::HidThread;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum HidDeviceError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Device not found")]
    NotFound,

    #[error("Device not supported")]
    NotSupported,
}

#[derive(Debug, Error)]
pub enum HidError {
    #[error(transparent)]
    Device(#[from] HidDeviceError),

    #[error(transparent)]
    Api(#[from] hidapi::HidError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type HidResult<T> = std::result::Result<T, HidError>;

#[allow(missing_debug_implementations)]
pub struct HidApi(hidapi::HidApi);

impl Deref for HidApi {
    type Target = hidapi::HidApi;

    fn deref(&self) -> &Self::Target {
        let Self(inner) = self;
        inner
    }
}

impl DerefMut for HidApi {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let Self(inner) = self;
        inner
    }
}

impl HidApi {
    pub fn new() -> HidResult<Self> {
        let inner = hidapi::HidApi::new_without_enumerate()?;
        Ok(Self(inner))
    }

    pub fn query_devices(&mut self) -> HidResult<impl Iterator<Item = &DeviceInfo>> {
        self.refresh_devices()?;
        Ok(self.device_list())
    }

    /// Find the first device with matching vendor and product id.
    pub fn find_device(&mut self, vendor_id: u16, product_id: u16) -> HidResult<HidDevice> {
        self.query_devices()?
            .find(|info| info.vendor_id() == vendor_id && info.product_id() == product_id)
            .map(|info| HidDevice::new(info.clone()))
            .ok_or_else(|| HidDeviceError::NotFound.into())
    }
}

#[allow(missing_debug_implementations)]
pub struct HidDevice {
    info: DeviceInfo,

    connected: Option<hidapi::HidDevice>,
}

impl HidDevice {
    #[must_use]
    pub fn new(info: DeviceInfo) -> Self {
        Self {
            info,
            connected: None,
        }
    }

    #[must_use]
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.is_some()
    }

    pub fn connect(&mut self, api: &HidApi) -> HidResult<()> {
        if self.is_connected() {
            return Ok(());
        }
        let connected = api.open_path(self.info.path())?;
        // Each read request is issued with an explicit timeout.
        connected.set_blocking_mode(true)?;
        self.connected = Some(connected);
        debug_assert!(self.is_connected());
        Ok(())
    }

    pub fn disconnect(&mut self) {
        // Dropping the device closes it.
        self.connected = None;
        debug_assert!(!self.is_connected());
    }

    fn connected(&self) -> HidResult<&hidapi::HidDevice> {
        self.connected
            .as_ref()
            .ok_or(HidDeviceError::NotConnected.into())
    }

    /// Blocking read into buffer with optional timeout (millisecond precision).
    pub fn read(&self, buffer: &mut [u8], timeout: Option<Duration>) -> HidResult<usize> {
        let timeout_millis = timeout_millis(timeout);
        Ok(self.connected()?.read_timeout(buffer, timeout_millis)?)
    }

    pub fn write(&self, data: &[u8]) -> HidResult<usize> {
        Ok(self.connected()?.write(data)?)
    }
}

const INF_TIMEOUT_MILLIS: i32 = -1;
const MAX_TIMEOUT_MILLIS: i32 = i32::MAX;

#[allow(clippy::cast_possible_truncation)]
fn timeout_millis(timeout: Option<Duration>) -> i32 {
    debug_assert_eq!(0, timeout.unwrap_or_default().subsec_nanos() % 1_000_000);
    timeout
        .as_ref()
        .map(Duration::as_millis)
        // Saturating conversion from u128 to i32
        .map_or(INF_TIMEOUT_MILLIS, |millis| {
            millis.min(MAX_TIMEOUT_MILLIS as _) as _
        })
}
