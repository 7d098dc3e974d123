// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Fixed report layouts
//!
//! All accessors operate on complete reports including the leading
//! report id. Control indices out of range are contract violations
//! and panic.

use thiserror::Error;

pub const NUM_KNOBS: usize = 2;
pub const NUM_BUTTONS: usize = 120;
pub const NUM_STRIPS: usize = 8;
pub const NUM_STRIP_FINGERS: usize = 2;

pub const NUM_BUTTON_LEDS: usize = 53;
pub const NUM_PAD_LEDS: usize = 80;
pub const NUM_STRIP_SEGMENTS: usize = 11;
pub const NUM_STRIP_LEDS: usize = NUM_STRIPS * NUM_STRIP_SEGMENTS;

pub const BUTTONS_REPORT_ID: u8 = 0x01;
pub const STRIPS_REPORT_ID: u8 = 0x02;

pub const BUTTON_LEDS_REPORT_ID: u8 = 0x80;
pub const PAD_LEDS_REPORT_ID: u8 = 0x81;
pub const STRIP_LEDS_REPORT_ID: u8 = 0x82;

const KNOBS_OFFSET: usize = 1;
const KNOBS_LEN: usize = NUM_KNOBS.div_ceil(2);

const BUTTONS_OFFSET: usize = KNOBS_OFFSET + KNOBS_LEN;
const BUTTONS_LEN: usize = NUM_BUTTONS / 8;

const STRIPS_OFFSET: usize = 1;
const STRIP_LEN: usize = 6;

/// Id + knob nibbles + button bits
pub const BUTTONS_REPORT_LEN: usize = BUTTONS_OFFSET + BUTTONS_LEN;

/// Id + strip triplets
pub const STRIPS_REPORT_LEN: usize = STRIPS_OFFSET + NUM_STRIPS * STRIP_LEN;

pub type ButtonsReport = [u8; BUTTONS_REPORT_LEN];
pub type StripsReport = [u8; STRIPS_REPORT_LEN];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("empty report")]
    Empty,

    #[error("unknown report id {0:#04x}")]
    UnknownId(u8),

    #[error("invalid length of report {id:#04x}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        id: u8,
        expected: usize,
        actual: usize,
    },
}

/// A validated input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReport<'a> {
    Buttons(&'a ButtonsReport),
    Strips(&'a StripsReport),
}

impl<'a> InputReport<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self, ReportError> {
        let Some(&id) = data.first() else {
            return Err(ReportError::Empty);
        };
        let invalid_length = |expected| ReportError::InvalidLength {
            id,
            expected,
            actual: data.len(),
        };
        match id {
            BUTTONS_REPORT_ID => data
                .try_into()
                .map(Self::Buttons)
                .map_err(|_| invalid_length(BUTTONS_REPORT_LEN)),
            STRIPS_REPORT_ID => data
                .try_into()
                .map(Self::Strips)
                .map_err(|_| invalid_length(STRIPS_REPORT_LEN)),
            _ => Err(ReportError::UnknownId(id)),
        }
    }
}

/// Timestamp and touch values of a strip.
///
/// A touch value of 0 means that the finger is not touching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StripState {
    pub timestamp: u16,
    pub touch: [u16; NUM_STRIP_FINGERS],
}

fn knob_position(index: usize) -> (usize, u32) {
    assert!(index < NUM_KNOBS, "knob index {index} out of range");
    #[allow(clippy::cast_possible_truncation)]
    let shift = ((index % 2) * 4) as u32;
    (KNOBS_OFFSET + index / 2, shift)
}

fn button_position(index: usize) -> (usize, u8) {
    assert!(index < NUM_BUTTONS, "button index {index} out of range");
    (BUTTONS_OFFSET + index / 8, 1 << (index % 8))
}

fn strip_offset(index: usize) -> usize {
    assert!(index < NUM_STRIPS, "strip index {index} out of range");
    STRIPS_OFFSET + index * STRIP_LEN
}

/// Rotation nibble of a knob in the range `0..16`.
#[must_use]
pub fn decode_knob_nibble(report: &ButtonsReport, index: usize) -> u8 {
    let (offset, shift) = knob_position(index);
    (report[offset] >> shift) & 0x0f
}

pub fn encode_knob_nibble(report: &mut ButtonsReport, index: usize, nibble: u8) {
    debug_assert!(nibble <= 0x0f);
    let (offset, shift) = knob_position(index);
    report[offset] = (report[offset] & !(0x0f << shift)) | ((nibble & 0x0f) << shift);
}

#[must_use]
pub fn decode_button_bit(report: &ButtonsReport, index: usize) -> bool {
    let (offset, mask) = button_position(index);
    report[offset] & mask != 0
}

pub fn encode_button_bit(report: &mut ButtonsReport, index: usize, pressed: bool) {
    let (offset, mask) = button_position(index);
    if pressed {
        report[offset] |= mask;
    } else {
        report[offset] &= !mask;
    }
}

#[must_use]
pub fn decode_strip(report: &StripsReport, index: usize) -> StripState {
    let offset = strip_offset(index);
    let word = |pos: usize| u16::from_le_bytes([report[offset + pos], report[offset + pos + 1]]);
    StripState {
        timestamp: word(0),
        touch: [word(2), word(4)],
    }
}

pub fn encode_strip(report: &mut StripsReport, index: usize, strip: &StripState) {
    let offset = strip_offset(index);
    let StripState {
        timestamp,
        touch: [first, second],
    } = *strip;
    for (pos, word) in [timestamp, first, second].into_iter().enumerate() {
        report[offset + pos * 2..offset + pos * 2 + 2].copy_from_slice(&word.to_le_bytes());
    }
}

#[must_use]
pub const fn new_buttons_report() -> ButtonsReport {
    let mut report = [0; BUTTONS_REPORT_LEN];
    report[0] = BUTTONS_REPORT_ID;
    report
}

#[must_use]
pub const fn new_strips_report() -> StripsReport {
    let mut report = [0; STRIPS_REPORT_LEN];
    report[0] = STRIPS_REPORT_ID;
    report
}
