// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use super::*;

#[test]
fn validate() {
    assert_eq!(
        Ok(()),
        ControlConfig::new(ControlKind::Note, 15, 127).validate()
    );
    assert_eq!(
        Err(ConfigError::InvalidChannel(16)),
        ControlConfig::new(ControlKind::Note, 16, 0).validate()
    );
    assert_eq!(
        Err(ConfigError::InvalidKey(128)),
        ControlConfig::new(ControlKind::ControlChange, 0, 128).validate()
    );
    let config = ControlConfig {
        value_min: 10,
        value_max: 9,
        ..ControlConfig::new(ControlKind::Aftertouch, 0, 0)
    };
    assert_eq!(
        Err(ConfigError::InvalidValueRange { min: 10, max: 9 }),
        config.validate()
    );
    let config = ControlConfig {
        value_max: 128,
        ..ControlConfig::new(ControlKind::Aftertouch, 0, 0)
    };
    assert!(config.validate().is_err());
}

#[test]
fn note_value_zero_is_note_off() {
    let config = ControlConfig::new(ControlKind::Note, 3, 42);
    assert_eq!(ChannelMessage::note_on(3, 42, 127), config.message(127));
    assert_eq!(ChannelMessage::note_off(3, 42), config.message(0));
}

#[test]
fn message_kind_follows_config() {
    assert_eq!(
        ChannelMessage::poly_pressure(1, 2, 0),
        ControlConfig::new(ControlKind::Aftertouch, 1, 2).message(0)
    );
    assert_eq!(
        ChannelMessage::control_change(1, 2, 0),
        ControlConfig::new(ControlKind::ControlChange, 1, 2).message(0)
    );
}

#[test]
fn clamp_value_into_configured_range() {
    let config = ControlConfig {
        value_min: 10,
        value_max: 100,
        ..ControlConfig::new(ControlKind::ControlChange, 0, 0)
    };
    assert_eq!(10, config.clamp_value(0));
    assert_eq!(50, config.clamp_value(50));
    assert_eq!(100, config.clamp_value(127));
}
