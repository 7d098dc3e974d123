// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Edge detection on input reports

use strum::{EnumCount, EnumIter, FromRepr};

use super::{
    report::{
        decode_button_bit, decode_knob_nibble, decode_strip, encode_button_bit,
        encode_knob_nibble, encode_strip, ButtonsReport, StripsReport, NUM_BUTTONS, NUM_KNOBS,
        NUM_STRIPS, NUM_STRIP_FINGERS,
    },
    strip::SYSEX_PREFIX,
    Button,
};
use crate::{
    input::{ControlConfig, ControlKind},
    midi::MidiMessage,
};

/// Messages emitted by a strip finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StripInput {
    /// Start and end of a touch
    Touch,
    /// Continuous position while touching
    Position,
}

/// Configuration of all input controls.
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub knobs: [ControlConfig; NUM_KNOBS],
    pub buttons: [ControlConfig; NUM_BUTTONS],
    /// Indexed by strip, finger, and [`StripInput`]
    pub strips: [[[ControlConfig; StripInput::COUNT]; NUM_STRIP_FINGERS]; NUM_STRIPS],
}

#[allow(clippy::cast_possible_truncation)]
impl Default for InputConfig {
    fn default() -> Self {
        let knobs =
            std::array::from_fn(|index| ControlConfig::new(ControlKind::ControlChange, 0, index as u8));
        // Keys 0 and 1 are left for the knobs
        let buttons =
            std::array::from_fn(|index| ControlConfig::new(ControlKind::Note, 0, index as u8 + 2));
        let strips = std::array::from_fn(|strip| {
            std::array::from_fn(|finger| {
                let key = (strip * NUM_STRIP_FINGERS + finger) as u8;
                [
                    ControlConfig::new(ControlKind::Note, 1, key),
                    ControlConfig::new(ControlKind::ControlChange, 1, key),
                ]
            })
        });
        Self {
            knobs,
            buttons,
            strips,
        }
    }
}

const SHIFT_SYSEX_LEN: usize = SYSEX_PREFIX.len() + 2;

fn shift_sysex(pressed: bool) -> [u8; SHIFT_SYSEX_LEN] {
    let mut payload = [0; SHIFT_SYSEX_LEN];
    payload[..SYSEX_PREFIX.len()].copy_from_slice(&SYSEX_PREFIX);
    payload[SYSEX_PREFIX.len()] = 0x4d;
    payload[SYSEX_PREFIX.len() + 1] = u8::from(pressed);
    payload
}

/// Diff the knobs and buttons of a new report against the stored state.
///
/// Emits all messages in order of the control indices, knobs first.
/// The stored state is updated for each changed control.
pub(super) fn diff_buttons_report(
    stored: &mut ButtonsReport,
    report: &ButtonsReport,
    config: &InputConfig,
    mut emit: impl FnMut(MidiMessage<'_>),
) {
    for (index, knob_config) in config.knobs.iter().enumerate() {
        let old = decode_knob_nibble(stored, index);
        let new = decode_knob_nibble(report, index);
        if old == new {
            continue;
        }
        // Only the direction is reported
        let value = u8::from(new == (old + 1) % 16);
        log::trace!("Knob {index}: {old} -> {new}");
        emit(knob_config.message(value).into());
        encode_knob_nibble(stored, index, new);
    }
    if stored[1..] == report[1..] {
        return;
    }
    for (index, button_config) in config.buttons.iter().enumerate() {
        let pressed = decode_button_bit(report, index);
        if decode_button_bit(stored, index) == pressed {
            continue;
        }
        log::trace!("Button {index}: pressed = {pressed}");
        let value = if pressed { button_config.value_max } else { 0 };
        emit(button_config.message(value).into());
        if index == Button::Shift as usize {
            emit(MidiMessage::SystemExclusive(&shift_sysex(pressed)));
        }
        encode_button_bit(stored, index, pressed);
    }
}

/// Diff the strips of a new report against the stored state.
///
/// Emits messages strip by strip and finger by finger. The touch
/// message of a finger precedes its position message.
pub(super) fn diff_strips_report(
    stored: &mut StripsReport,
    report: &StripsReport,
    config: &InputConfig,
    mut emit: impl FnMut(MidiMessage<'_>),
) {
    for (index, finger_configs) in config.strips.iter().enumerate() {
        let old = decode_strip(stored, index);
        let new = decode_strip(report, index);
        if old == new {
            continue;
        }
        for (finger, [touch_config, position_config]) in finger_configs.iter().enumerate() {
            let old_touch = old.touch[finger];
            let new_touch = new.touch[finger];
            if (old_touch == 0) != (new_touch == 0) {
                log::trace!(
                    "Strip {index} finger {finger}: touching = {touching}",
                    touching = new_touch != 0
                );
                let value = if new_touch != 0 {
                    touch_config.value_max
                } else {
                    0
                };
                emit(touch_config.message(value).into());
            }
            if new_touch != 0 && new_touch != old_touch {
                // 10-bit sensor value
                let value = u8::try_from(new_touch >> 3).unwrap_or(u8::MAX);
                emit(position_config.message(position_config.clamp_value(value)).into());
            }
        }
        encode_strip(stored, index, &new);
    }
}
