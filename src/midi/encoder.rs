// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

use super::{
    is_data_byte, ChannelMessage, MidiMessage, MAX_SYSEX_PAYLOAD_LEN, NUM_CHANNELS, SYSEX_END,
    SYSEX_START,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("output buffer too small: {required} > {available} bytes")]
    BufferTooSmall { required: usize, available: usize },

    #[error("invalid channel {0}")]
    InvalidChannel(u8),

    #[error("invalid data byte 0x{0:02x}")]
    InvalidDataByte(u8),

    #[error("system exclusive payload too long: {0} bytes")]
    ExclusiveTooLong(usize),
}

/// Streaming encoder for the device-to-host direction.
#[derive(Debug, Default)]
pub struct MidiEncoder {
    use_running_status: bool,
    running_status: Option<u8>,
}

impl MidiEncoder {
    /// Create a new encoder.
    ///
    /// With `use_running_status` repeated status bytes of consecutive
    /// channel messages are omitted.
    #[must_use]
    pub const fn new(use_running_status: bool) -> Self {
        Self {
            use_running_status,
            running_status: None,
        }
    }

    /// Forget the running status, e.g. after the receiver reconnected.
    pub fn reset(&mut self) {
        self.running_status = None;
    }

    /// Encode a single message into `out`.
    ///
    /// Returns the number of bytes written. Nothing is written and the
    /// state remains unchanged if an error is returned.
    pub fn encode(&mut self, message: &MidiMessage<'_>, out: &mut [u8]) -> Result<usize, EncodeError> {
        match message {
            MidiMessage::Channel(message) => self.encode_channel(message, out),
            MidiMessage::SystemExclusive(payload) => self.encode_exclusive(payload, out),
        }
    }

    fn encode_channel(
        &mut self,
        message: &ChannelMessage,
        out: &mut [u8],
    ) -> Result<usize, EncodeError> {
        if usize::from(message.channel) >= NUM_CHANNELS {
            return Err(EncodeError::InvalidChannel(message.channel));
        }
        let data_len = message.kind.data_len();
        let data = [message.key, message.value];
        let data = &data[..data_len];
        if let Some(invalid) = data.iter().copied().find(|byte| !is_data_byte(*byte)) {
            return Err(EncodeError::InvalidDataByte(invalid));
        }
        let status = message.status();
        let omit_status = self.use_running_status && self.running_status == Some(status);
        let required = data_len + usize::from(!omit_status);
        check_capacity(required, out)?;
        let mut len = 0;
        if !omit_status {
            out[0] = status;
            len += 1;
        }
        out[len..len + data_len].copy_from_slice(data);
        len += data_len;
        debug_assert_eq!(len, required);
        self.running_status = Some(status);
        Ok(len)
    }

    fn encode_exclusive(&mut self, payload: &[u8], out: &mut [u8]) -> Result<usize, EncodeError> {
        if payload.len() > MAX_SYSEX_PAYLOAD_LEN {
            return Err(EncodeError::ExclusiveTooLong(payload.len()));
        }
        if let Some(invalid) = payload.iter().copied().find(|byte| !is_data_byte(*byte)) {
            return Err(EncodeError::InvalidDataByte(invalid));
        }
        let required = payload.len() + 2;
        check_capacity(required, out)?;
        out[0] = SYSEX_START;
        out[1..=payload.len()].copy_from_slice(payload);
        out[required - 1] = SYSEX_END;
        // System exclusive messages cancel the running status.
        self.running_status = None;
        Ok(required)
    }
}

const fn check_capacity(required: usize, out: &[u8]) -> Result<(), EncodeError> {
    if required > out.len() {
        return Err(EncodeError::BufferTooSmall {
            required,
            available: out.len(),
        });
    }
    Ok(())
}
