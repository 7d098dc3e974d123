// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use super::thread::ReadSlots;

fn read(slots: &mut ReadSlots, report: &[u8]) -> Option<Vec<u8>> {
    slots.next_buf()[..report.len()].copy_from_slice(report);
    slots.accept(report.len()).map(<[u8]>::to_vec)
}

#[test]
fn consecutive_duplicate_reports_are_discarded() {
    let mut slots = ReadSlots::new();
    let first = [0x01, 0x10, 0x00];
    let second = [0x01, 0x11, 0x00];
    assert_eq!(Some(first.to_vec()), read(&mut slots, &first));
    assert_eq!(None, read(&mut slots, &first));
    assert_eq!(None, read(&mut slots, &first));
    assert_eq!(Some(second.to_vec()), read(&mut slots, &second));
    // Only compared with the last accepted report
    assert_eq!(Some(first.to_vec()), read(&mut slots, &first));
}

#[test]
fn reports_with_different_length_are_not_duplicates() {
    let mut slots = ReadSlots::new();
    assert_eq!(Some(vec![0x02, 0x00]), read(&mut slots, &[0x02, 0x00]));
    assert_eq!(Some(vec![0x02]), read(&mut slots, &[0x02]));
    assert_eq!(
        Some(vec![0x02, 0x00, 0x00]),
        read(&mut slots, &[0x02, 0x00, 0x00])
    );
}

#[test]
fn duplicates_are_detected_across_slots() {
    let mut slots = ReadSlots::new();
    let report = [0x02; 49];
    assert!(read(&mut slots, &report).is_some());
    // The rejected report leaves stale bytes in the spare slot
    assert!(read(&mut slots, &report).is_none());
    let mut next = report;
    next[48] = 0x00;
    assert_eq!(Some(next.to_vec()), read(&mut slots, &next));
    assert!(read(&mut slots, &next).is_none());
}
