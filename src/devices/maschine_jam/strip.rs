// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Touch strip indicator rendering

use strum::{EnumCount, EnumIter, FromRepr};

use super::report::{NUM_STRIPS, NUM_STRIP_SEGMENTS};

/// Common prefix of all vendor system exclusive messages.
pub const SYSEX_PREFIX: [u8; 9] = [0x00, 0x21, 0x09, 0x15, 0x00, 0x4d, 0x50, 0x00, 0x01];

const SYSEX_VALUES_LEN: usize = SYSEX_PREFIX.len() + NUM_STRIPS;

const SYSEX_MODES_LEN: usize = SYSEX_PREFIX.len() + 2 * NUM_STRIPS;

// Upper bounds of the first 10 segments. The segments are not
// evenly spaced.
const BREAKPOINTS: [u8; NUM_STRIP_SEGMENTS - 1] = [7, 19, 32, 45, 58, 70, 83, 96, 109, 127];

/// Segment index in the range `0..11` of a 7-bit value.
#[must_use]
pub fn quantize(value: u8) -> usize {
    let value = value.min(0x7f);
    BREAKPOINTS.partition_point(|&breakpoint| breakpoint <= value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, FromRepr, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StripMode {
    /// Bar from the bottom up to the value
    #[default]
    Single,
    Dot,
    Pan,
    Dual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StripDisplay {
    pub mode: StripMode,
    pub color: u8,
    pub value: u8,
}

impl StripDisplay {
    #[must_use]
    pub fn render(&self) -> [u8; NUM_STRIP_SEGMENTS] {
        let mut segments = [0; NUM_STRIP_SEGMENTS];
        let index = quantize(self.value);
        match self.mode {
            StripMode::Single => segments[..=index].fill(self.color),
            StripMode::Dot | StripMode::Pan | StripMode::Dual => segments[index] = self.color,
        }
        segments
    }
}

/// Host request for updating all strip displays at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripDisplayUpdate<'a> {
    /// One value per strip
    Values(&'a [u8]),
    /// Pairs of mode and color per strip
    ModesAndColors(&'a [u8]),
}

impl<'a> StripDisplayUpdate<'a> {
    /// Parse the payload of a system exclusive message.
    ///
    /// Returns `None` for unrelated messages.
    #[must_use]
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        let data = payload.strip_prefix(SYSEX_PREFIX.as_slice())?;
        match payload.len() {
            SYSEX_VALUES_LEN => Some(Self::Values(data)),
            SYSEX_MODES_LEN => Some(Self::ModesAndColors(data)),
            _ => None,
        }
    }
}

/// Display state of all strips.
#[derive(Debug, Clone, Default)]
pub struct StripDisplays {
    displays: [StripDisplay; NUM_STRIPS],
}

impl StripDisplays {
    /// Panics if `strip` is out of range.
    #[must_use]
    pub fn get(&self, strip: usize) -> StripDisplay {
        self.displays[strip]
    }

    /// Returns `true` if the value has changed.
    pub fn set_value(&mut self, strip: usize, value: u8) -> bool {
        let display = &mut self.displays[strip];
        if display.value == value {
            return false;
        }
        display.value = value;
        true
    }

    /// Apply an update from the host.
    ///
    /// Returns a bit mask of the strips that have changed.
    pub fn apply(&mut self, update: StripDisplayUpdate<'_>) -> u8 {
        let mut changed = 0;
        match update {
            StripDisplayUpdate::Values(values) => {
                for (strip, &value) in values.iter().enumerate().take(NUM_STRIPS) {
                    if self.set_value(strip, value) {
                        changed |= 1 << strip;
                    }
                }
            }
            StripDisplayUpdate::ModesAndColors(data) => {
                for (strip, pair) in data.chunks_exact(2).enumerate().take(NUM_STRIPS) {
                    let display = &mut self.displays[strip];
                    let old = *display;
                    if let Some(mode) = StripMode::from_repr(pair[0]) {
                        display.mode = mode;
                    } else {
                        log::warn!(
                            "Keeping mode {mode:?} of strip {strip}: unknown mode {unknown}",
                            mode = display.mode,
                            unknown = pair[0]
                        );
                    }
                    display.color = pair[1];
                    if *display != old {
                        changed |= 1 << strip;
                    }
                }
            }
        }
        changed
    }

    /// Render the segments of `strip`.
    ///
    /// Returns the offset within the strip LED buffer and the segments.
    #[must_use]
    pub fn render(&self, strip: usize) -> (usize, [u8; NUM_STRIP_SEGMENTS]) {
        (strip * NUM_STRIP_SEGMENTS, self.displays[strip].render())
    }

    pub fn reset(&mut self) {
        self.displays = Default::default();
    }
}
