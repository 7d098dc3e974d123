// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use super::{
    is_data_byte, ChannelMessage, ChannelMessageKind, MidiMessage, MAX_SYSEX_PAYLOAD_LEN,
    SYSEX_END, SYSEX_START,
};

/// Recoverable decoding errors.
///
/// The decoder has already resynchronized when an error is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("data byte 0x{0:02x} without running status")]
    UnexpectedDataByte(u8),

    #[error("incomplete message interrupted by status byte 0x{status:02x}")]
    InterruptedMessage { status: u8 },

    #[error("system exclusive message interrupted by status byte 0x{status:02x}")]
    InterruptedExclusive { status: u8 },

    #[error("end of system exclusive without start")]
    UnexpectedEndOfExclusive,

    #[error("system exclusive message too long")]
    ExclusiveOverflow,

    #[error("undefined status byte 0x{0:02x}")]
    UndefinedStatus(u8),
}

/// Outcome of feeding a single byte into the [`MidiDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// More bytes are needed, or the byte has been consumed silently.
    Incomplete,
    Message(MidiMessage<'a>),
    Error(DecodeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SystemCommon {
    /// Not inside a system common message
    Idle,
    /// Skipping the given number of remaining data bytes
    Skipping(u8),
}

#[derive(Debug)]
struct Exclusive {
    active: bool,
    overflowed: bool,
    len: usize,
    payload: [u8; MAX_SYSEX_PAYLOAD_LEN],
}

impl Exclusive {
    const fn new() -> Self {
        Self {
            active: false,
            overflowed: false,
            len: 0,
            payload: [0; MAX_SYSEX_PAYLOAD_LEN],
        }
    }

    fn start(&mut self) {
        self.active = true;
        self.overflowed = false;
        self.len = 0;
    }

    fn push(&mut self, byte: u8) {
        if self.len < self.payload.len() {
            self.payload[self.len] = byte;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
    }
}

/// Streaming decoder for the host-to-device direction.
///
/// Honors running status for channel voice messages. Real-time bytes
/// may be interleaved anywhere and are consumed without affecting the
/// decoder state.
#[derive(Debug)]
pub struct MidiDecoder {
    running_status: Option<(ChannelMessageKind, u8)>,
    data: [u8; 2],
    data_len: usize,
    system_common: SystemCommon,
    exclusive: Exclusive,
}

impl Default for MidiDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running_status: None,
            data: [0; 2],
            data_len: 0,
            system_common: SystemCommon::Idle,
            exclusive: Exclusive::new(),
        }
    }

    /// Discard all partial state and forget the running status.
    pub fn reset(&mut self) {
        self.running_status = None;
        self.data_len = 0;
        self.system_common = SystemCommon::Idle;
        self.exclusive.active = false;
    }

    const fn is_mid_message(&self) -> bool {
        self.data_len > 0 || matches!(self.system_common, SystemCommon::Skipping(_))
    }

    pub fn decode_byte(&mut self, byte: u8) -> Decoded<'_> {
        if byte >= 0xf8 {
            // Real-time
            log::trace!("Skipping real-time byte 0x{byte:02x}");
            return Decoded::Incomplete;
        }
        if self.exclusive.active {
            return self.decode_exclusive_byte(byte);
        }
        if is_data_byte(byte) {
            return self.decode_data_byte(byte);
        }
        let interrupted = self.is_mid_message();
        let decoded = self.decode_status_byte(byte);
        if interrupted {
            if let Decoded::Error(_) = decoded {
                return decoded;
            }
            return Decoded::Error(DecodeError::InterruptedMessage { status: byte });
        }
        decoded
    }

    fn decode_exclusive_byte(&mut self, byte: u8) -> Decoded<'_> {
        debug_assert!(self.exclusive.active);
        if is_data_byte(byte) {
            self.exclusive.push(byte);
            return Decoded::Incomplete;
        }
        self.exclusive.active = false;
        if byte == SYSEX_END {
            if self.exclusive.overflowed {
                return Decoded::Error(DecodeError::ExclusiveOverflow);
            }
            let payload = &self.exclusive.payload[..self.exclusive.len];
            return Decoded::Message(MidiMessage::SystemExclusive(payload));
        }
        // The interrupting status byte is the new synchronization point.
        let _ = self.decode_status_byte(byte);
        Decoded::Error(DecodeError::InterruptedExclusive { status: byte })
    }

    fn decode_data_byte(&mut self, byte: u8) -> Decoded<'_> {
        if let SystemCommon::Skipping(remaining) = self.system_common {
            debug_assert!(remaining > 0);
            self.system_common = if remaining > 1 {
                SystemCommon::Skipping(remaining - 1)
            } else {
                SystemCommon::Idle
            };
            return Decoded::Incomplete;
        }
        let Some((kind, channel)) = self.running_status else {
            return Decoded::Error(DecodeError::UnexpectedDataByte(byte));
        };
        debug_assert!(self.data_len < kind.data_len());
        self.data[self.data_len] = byte;
        self.data_len += 1;
        if self.data_len < kind.data_len() {
            return Decoded::Incomplete;
        }
        self.data_len = 0;
        let value = if kind.data_len() > 1 { self.data[1] } else { 0 };
        Decoded::Message(MidiMessage::Channel(ChannelMessage {
            kind,
            channel,
            key: self.data[0],
            value,
        }))
    }

    fn decode_status_byte(&mut self, status: u8) -> Decoded<'_> {
        self.data_len = 0;
        self.system_common = SystemCommon::Idle;
        if let Some(kind) = ChannelMessageKind::from_status(status) {
            self.running_status = Some((kind, status & 0x0f));
            return Decoded::Incomplete;
        }
        // All system messages cancel the running status.
        self.running_status = None;
        match status {
            SYSEX_START => {
                self.exclusive.start();
                Decoded::Incomplete
            }
            SYSEX_END => Decoded::Error(DecodeError::UnexpectedEndOfExclusive),
            // MTC quarter frame, song select
            0xf1 | 0xf3 => {
                self.system_common = SystemCommon::Skipping(1);
                Decoded::Incomplete
            }
            // Song position pointer
            0xf2 => {
                self.system_common = SystemCommon::Skipping(2);
                Decoded::Incomplete
            }
            // Tune request
            0xf6 => Decoded::Incomplete,
            _ => Decoded::Error(DecodeError::UndefinedStatus(status)),
        }
    }
}
