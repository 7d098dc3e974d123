// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Byte-stream MIDI codec
//!
//! Converts between the host's raw MIDI byte stream and [`MidiMessage`]s,
//! one byte at a time and without allocating per call. Each direction owns
//! its own state: a [`MidiDecoder`] for incoming and a [`MidiEncoder`] for
//! outgoing messages.

use std::fmt;

use strum::{EnumCount, EnumIter, FromRepr};

use crate::OutputResult;

mod decoder;
pub use self::decoder::{DecodeError, Decoded, MidiDecoder};

mod encoder;
pub use self::encoder::{EncodeError, MidiEncoder};

#[cfg(feature = "midir")]
pub mod midir;

#[cfg(test)]
mod tests;

pub const STATUS_NOTE_OFF: u8 = 0x80;
pub const STATUS_NOTE_ON: u8 = 0x90;
pub const STATUS_POLY_PRESSURE: u8 = 0xa0;
pub const STATUS_CONTROL_CHANGE: u8 = 0xb0;
pub const STATUS_PROGRAM_CHANGE: u8 = 0xc0;
pub const STATUS_CHANNEL_PRESSURE: u8 = 0xd0;
pub const STATUS_PITCH_BEND: u8 = 0xe0;

pub const SYSEX_START: u8 = 0xf0;
pub const SYSEX_END: u8 = 0xf7;

/// Number of MIDI channels
pub const NUM_CHANNELS: usize = 16;

/// Number of distinct 7-bit data values, i.e. keys, controllers or velocities
pub const NUM_U7_VALUES: usize = 128;

/// Upper bound of a framed system exclusive message, including
/// the start and end tags.
pub const MAX_SYSEX_LEN: usize = 64;

/// Upper bound of the payload between the start and end tags.
pub const MAX_SYSEX_PAYLOAD_LEN: usize = MAX_SYSEX_LEN - 2;

/// Upper bound of any single encoded message.
pub const MAX_MESSAGE_LEN: usize = MAX_SYSEX_LEN;

#[must_use]
pub const fn is_status_byte(byte: u8) -> bool {
    byte & 0x80 != 0
}

#[must_use]
pub const fn is_data_byte(byte: u8) -> bool {
    !is_status_byte(byte)
}

/// Channel voice message types, in the order of their status nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[repr(u8)]
pub enum ChannelMessageKind {
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl ChannelMessageKind {
    /// Decode the kind from the upper nibble of a channel status byte.
    #[must_use]
    pub fn from_status(status: u8) -> Option<Self> {
        if !(STATUS_NOTE_OFF..SYSEX_START).contains(&status) {
            return None;
        }
        Self::from_repr((status >> 4) - 0x8)
    }

    #[must_use]
    pub const fn status_nibble(self) -> u8 {
        match self {
            Self::NoteOff => STATUS_NOTE_OFF,
            Self::NoteOn => STATUS_NOTE_ON,
            Self::PolyPressure => STATUS_POLY_PRESSURE,
            Self::ControlChange => STATUS_CONTROL_CHANGE,
            Self::ProgramChange => STATUS_PROGRAM_CHANGE,
            Self::ChannelPressure => STATUS_CHANNEL_PRESSURE,
            Self::PitchBend => STATUS_PITCH_BEND,
        }
    }

    /// Number of data bytes following the status byte.
    #[must_use]
    pub const fn data_len(self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// A channel voice message.
///
/// Messages with a single data byte only use `key`, their `value` is 0.
/// For pitch bend `key` carries the LSB and `value` the MSB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMessage {
    pub kind: ChannelMessageKind,
    /// Channel in the range `0..16`
    pub channel: u8,
    pub key: u8,
    pub value: u8,
}

impl ChannelMessage {
    #[must_use]
    pub const fn note_on(channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            kind: ChannelMessageKind::NoteOn,
            channel,
            key,
            value: velocity,
        }
    }

    #[must_use]
    pub const fn note_off(channel: u8, key: u8) -> Self {
        Self {
            kind: ChannelMessageKind::NoteOff,
            channel,
            key,
            value: 0,
        }
    }

    #[must_use]
    pub const fn poly_pressure(channel: u8, key: u8, pressure: u8) -> Self {
        Self {
            kind: ChannelMessageKind::PolyPressure,
            channel,
            key,
            value: pressure,
        }
    }

    #[must_use]
    pub const fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        Self {
            kind: ChannelMessageKind::ControlChange,
            channel,
            key: controller,
            value,
        }
    }

    #[must_use]
    pub const fn status(&self) -> u8 {
        self.kind.status_nibble() | (self.channel & 0x0f)
    }
}

/// A decoded or to be encoded MIDI message.
///
/// System exclusive payloads are borrowed and never include the
/// start and end tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage<'a> {
    Channel(ChannelMessage),
    SystemExclusive(&'a [u8]),
}

impl From<ChannelMessage> for MidiMessage<'_> {
    fn from(from: ChannelMessage) -> Self {
        Self::Channel(from)
    }
}

impl fmt::Display for ChannelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            kind,
            channel,
            key,
            value,
        } = self;
        write!(f, "{kind:?} ch = {channel} key = {key} value = {value}")
    }
}

impl fmt::Display for MidiMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(message) => fmt::Display::fmt(message, f),
            Self::SystemExclusive(payload) => write!(f, "SysEx {payload:02x?}"),
        }
    }
}

/// Sink for encoded MIDI messages, i.e. the host's event outbox.
///
/// Invoked while handling input reports and must not block.
pub trait MidiOutputConnection {
    fn send_midi_output(&mut self, output: &[u8]) -> OutputResult<()>;
}

impl<C> MidiOutputConnection for Box<C>
where
    C: MidiOutputConnection + ?Sized,
{
    fn send_midi_output(&mut self, output: &[u8]) -> OutputResult<()> {
        self.as_mut().send_midi_output(output)
    }
}

pub type BoxedMidiOutputConnection = Box<dyn MidiOutputConnection + Send + 'static>;

/// Passive callback for sinking raw MIDI input from the host.
pub trait MidiInputHandler: Send {
    /// Invoked for each chunk of incoming bytes.
    ///
    /// Returns `true` if all bytes have been decoded without errors.
    #[must_use]
    fn handle_midi_input(&mut self, input: &[u8]) -> bool;
}
