// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use super::*;

fn decode_all(decoder: &mut MidiDecoder, input: &[u8]) -> Vec<Result<ChannelMessage, DecodeError>> {
    let mut decoded = Vec::new();
    for &byte in input {
        match decoder.decode_byte(byte) {
            Decoded::Incomplete => (),
            Decoded::Message(MidiMessage::Channel(message)) => decoded.push(Ok(message)),
            Decoded::Message(MidiMessage::SystemExclusive(_)) => {
                panic!("unexpected system exclusive message");
            }
            Decoded::Error(err) => decoded.push(Err(err)),
        }
    }
    decoded
}

#[test]
fn channel_message_kind_from_status() {
    assert_eq!(
        Some(ChannelMessageKind::NoteOff),
        ChannelMessageKind::from_status(0x8f)
    );
    assert_eq!(
        Some(ChannelMessageKind::ControlChange),
        ChannelMessageKind::from_status(0xb3)
    );
    assert_eq!(
        Some(ChannelMessageKind::PitchBend),
        ChannelMessageKind::from_status(0xe0)
    );
    assert_eq!(None, ChannelMessageKind::from_status(0x7f));
    assert_eq!(None, ChannelMessageKind::from_status(0xf0));
}

#[test]
fn decode_note_on() {
    let mut decoder = MidiDecoder::new();
    assert_eq!(Decoded::Incomplete, decoder.decode_byte(0x91));
    assert_eq!(Decoded::Incomplete, decoder.decode_byte(0x05));
    assert_eq!(
        Decoded::Message(ChannelMessage::note_on(1, 5, 64).into()),
        decoder.decode_byte(0x40)
    );
}

#[test]
fn decode_running_status() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0xb1, 0x05, 0x40, 0x06, 0x41, 0x07, 0x42]);
    assert_eq!(
        vec![
            Ok(ChannelMessage::control_change(1, 5, 0x40)),
            Ok(ChannelMessage::control_change(1, 6, 0x41)),
            Ok(ChannelMessage::control_change(1, 7, 0x42)),
        ],
        decoded
    );
}

#[test]
fn decode_single_data_byte_messages() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0xc2, 0x10, 0x11]);
    assert_eq!(
        vec![
            Ok(ChannelMessage {
                kind: ChannelMessageKind::ProgramChange,
                channel: 2,
                key: 0x10,
                value: 0,
            }),
            Ok(ChannelMessage {
                kind: ChannelMessageKind::ProgramChange,
                channel: 2,
                key: 0x11,
                value: 0,
            }),
        ],
        decoded
    );
}

#[test]
fn real_time_bytes_do_not_disturb_running_status() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0x90, 0xf8, 0x01, 0xfe, 0x7f]);
    assert_eq!(vec![Ok(ChannelMessage::note_on(0, 1, 0x7f))], decoded);
}

#[test]
fn data_byte_without_running_status_is_a_recoverable_error() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0x05, 0x40, 0x90, 0x05, 0x40]);
    assert_eq!(
        vec![
            Err(DecodeError::UnexpectedDataByte(0x05)),
            Err(DecodeError::UnexpectedDataByte(0x40)),
            Ok(ChannelMessage::note_on(0, 5, 0x40)),
        ],
        decoded
    );
}

#[test]
fn interrupted_message_resynchronizes_on_new_status() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0x90, 0x05, 0xb0, 0x01, 0x02]);
    assert_eq!(
        vec![
            Err(DecodeError::InterruptedMessage { status: 0xb0 }),
            Ok(ChannelMessage::control_change(0, 1, 2)),
        ],
        decoded
    );
}

#[test]
fn system_common_cancels_running_status() {
    let mut decoder = MidiDecoder::new();
    // Song position pointer with 2 data bytes
    let decoded = decode_all(&mut decoder, &[0x90, 0x05, 0x40, 0xf2, 0x00, 0x01, 0x05]);
    assert_eq!(
        vec![
            Ok(ChannelMessage::note_on(0, 5, 0x40)),
            Err(DecodeError::UnexpectedDataByte(0x05)),
        ],
        decoded
    );
}

#[test]
fn decode_system_exclusive() {
    let mut decoder = MidiDecoder::new();
    for byte in [0xf0, 0x00, 0x21, 0x09] {
        assert_eq!(Decoded::Incomplete, decoder.decode_byte(byte));
    }
    assert_eq!(
        Decoded::Message(MidiMessage::SystemExclusive(&[0x00, 0x21, 0x09])),
        decoder.decode_byte(0xf7)
    );
}

#[test]
fn system_exclusive_overflow_is_reported_at_end_tag() {
    let mut decoder = MidiDecoder::new();
    assert_eq!(Decoded::Incomplete, decoder.decode_byte(SYSEX_START));
    for _ in 0..=MAX_SYSEX_PAYLOAD_LEN {
        assert_eq!(Decoded::Incomplete, decoder.decode_byte(0x01));
    }
    assert_eq!(
        Decoded::Error(DecodeError::ExclusiveOverflow),
        decoder.decode_byte(SYSEX_END)
    );
    // Back in sync
    let decoded = decode_all(&mut decoder, &[0x80, 0x01, 0x00]);
    assert_eq!(vec![Ok(ChannelMessage::note_off(0, 1))], decoded);
}

#[test]
fn unterminated_system_exclusive() {
    let mut decoder = MidiDecoder::new();
    let decoded = decode_all(&mut decoder, &[0xf0, 0x01, 0x02, 0x93, 0x04, 0x05]);
    assert_eq!(
        vec![
            Err(DecodeError::InterruptedExclusive { status: 0x93 }),
            Ok(ChannelMessage::note_on(3, 4, 5)),
        ],
        decoded
    );
}

#[test]
fn stray_end_of_exclusive() {
    let mut decoder = MidiDecoder::new();
    assert_eq!(
        Decoded::Error(DecodeError::UnexpectedEndOfExclusive),
        decoder.decode_byte(SYSEX_END)
    );
    assert_eq!(
        Decoded::Error(DecodeError::UndefinedStatus(0xf4)),
        decoder.decode_byte(0xf4)
    );
}

#[test]
fn encode_channel_message() {
    let mut encoder = MidiEncoder::new(false);
    let mut out = [0; MAX_MESSAGE_LEN];
    let message = ChannelMessage::control_change(1, 5, 64).into();
    assert_eq!(Ok(3), encoder.encode(&message, &mut out));
    assert_eq!([0xb1_u8, 0x05, 0x40], out[..3]);
    // Without running status the status byte is always repeated.
    assert_eq!(Ok(3), encoder.encode(&message, &mut out));
    assert_eq!([0xb1_u8, 0x05, 0x40], out[..3]);
}

#[test]
fn encode_with_running_status() {
    let mut encoder = MidiEncoder::new(true);
    let mut out = [0; MAX_MESSAGE_LEN];
    assert_eq!(
        Ok(3),
        encoder.encode(&ChannelMessage::note_on(0, 2, 127).into(), &mut out)
    );
    assert_eq!(
        Ok(2),
        encoder.encode(&ChannelMessage::note_on(0, 3, 127).into(), &mut out)
    );
    assert_eq!([0x03_u8, 0x7f], out[..2]);
    // Different status
    assert_eq!(
        Ok(3),
        encoder.encode(&ChannelMessage::note_off(0, 3).into(), &mut out)
    );
    // System exclusive cancels the running status
    assert_eq!(
        Ok(3),
        encoder.encode(&MidiMessage::SystemExclusive(&[0x01]), &mut out)
    );
    assert_eq!([SYSEX_START, 0x01, SYSEX_END], out[..3]);
    assert_eq!(
        Ok(3),
        encoder.encode(&ChannelMessage::note_off(0, 3).into(), &mut out)
    );
}

#[test]
fn encode_rejects_invalid_messages() {
    let mut encoder = MidiEncoder::default();
    let mut out = [0; MAX_MESSAGE_LEN];
    assert_eq!(
        Err(EncodeError::InvalidChannel(16)),
        encoder.encode(&ChannelMessage::note_on(16, 0, 0).into(), &mut out)
    );
    assert_eq!(
        Err(EncodeError::InvalidDataByte(0x80)),
        encoder.encode(&ChannelMessage::note_on(0, 0x80, 0).into(), &mut out)
    );
    assert_eq!(
        Err(EncodeError::BufferTooSmall {
            required: 3,
            available: 2
        }),
        encoder.encode(&ChannelMessage::note_on(0, 0, 0).into(), &mut out[..2])
    );
    let payload = [0_u8; MAX_SYSEX_PAYLOAD_LEN + 1];
    assert_eq!(
        Err(EncodeError::ExclusiveTooLong(MAX_SYSEX_PAYLOAD_LEN + 1)),
        encoder.encode(&MidiMessage::SystemExclusive(&payload), &mut out)
    );
}

#[test]
fn encoded_bytes_decode_to_the_same_messages() {
    let messages = [
        ChannelMessage::note_on(0, 5, 127),
        ChannelMessage::note_off(0, 5),
        ChannelMessage::poly_pressure(9, 0x7f, 1),
        ChannelMessage::control_change(15, 0, 0),
    ];
    let mut encoder = MidiEncoder::new(true);
    let mut decoder = MidiDecoder::new();
    let mut stream = Vec::new();
    let mut out = [0; MAX_MESSAGE_LEN];
    for message in messages {
        let len = encoder.encode(&message.into(), &mut out).unwrap();
        stream.extend_from_slice(&out[..len]);
    }
    let decoded = decode_all(&mut decoder, &stream);
    assert_eq!(messages.into_iter().map(Ok).collect::<Vec<_>>(), decoded);
}
