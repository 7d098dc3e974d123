// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Per-control configuration of emitted MIDI messages

use strum::{EnumCount, EnumIter, FromRepr};
use thiserror::Error;

use crate::midi::{ChannelMessage, NUM_CHANNELS, NUM_U7_VALUES};

#[cfg(test)]
mod tests;

/// Maximum 7-bit data value
pub const U7_MAX: u8 = 0x7f;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid channel {0}")]
    InvalidChannel(u8),

    #[error("invalid key {0}")]
    InvalidKey(u8),

    #[error("invalid value range {min}..={max}")]
    InvalidValueRange { min: u8, max: u8 },

    #[error("index {index} out of range 0..{count}")]
    IndexOutOfRange { index: usize, count: usize },
}

/// Type of the channel message emitted for an input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControlKind {
    #[default]
    Note,
    /// Polyphonic key pressure
    Aftertouch,
    ControlChange,
}

/// Mapping of an input control onto channel messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlConfig {
    pub kind: ControlKind,
    pub channel: u8,
    pub key: u8,
    /// Lower bound of continuous values
    pub value_min: u8,
    /// Upper bound of continuous values and the value sent on press
    pub value_max: u8,
}

impl ControlConfig {
    /// Full 7-bit value range.
    #[must_use]
    pub const fn new(kind: ControlKind, channel: u8, key: u8) -> Self {
        Self {
            kind,
            channel,
            key,
            value_min: 0,
            value_max: U7_MAX,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            kind: _,
            channel,
            key,
            value_min,
            value_max,
        } = *self;
        if usize::from(channel) >= NUM_CHANNELS {
            return Err(ConfigError::InvalidChannel(channel));
        }
        if usize::from(key) >= NUM_U7_VALUES {
            return Err(ConfigError::InvalidKey(key));
        }
        if value_min > value_max || value_max > U7_MAX {
            return Err(ConfigError::InvalidValueRange {
                min: value_min,
                max: value_max,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn clamp_value(&self, value: u8) -> u8 {
        value.clamp(self.value_min, self.value_max)
    }

    /// The message that carries `value` for this control.
    ///
    /// Notes with value 0 are sent as Note-Off.
    #[must_use]
    pub const fn message(&self, value: u8) -> ChannelMessage {
        match self.kind {
            ControlKind::Note => {
                if value > 0 {
                    ChannelMessage::note_on(self.channel, self.key, value)
                } else {
                    ChannelMessage::note_off(self.channel, self.key)
                }
            }
            ControlKind::Aftertouch => ChannelMessage::poly_pressure(self.channel, self.key, value),
            ControlKind::ControlChange => {
                ChannelMessage::control_change(self.channel, self.key, value)
            }
        }
    }
}
