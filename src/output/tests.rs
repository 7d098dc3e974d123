// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::*;

fn sentinel(kind: RouteKind, channel: u8, key: u8) -> SentinelId {
    RoutingTable::lookup(kind, channel, key).unwrap()
}

fn bound_nodes(table: &RoutingTable, sentinel: SentinelId) -> Vec<usize> {
    table.nodes(sentinel).map(Into::into).collect()
}

#[test]
fn lookup_rejects_out_of_range_coordinates() {
    assert!(RoutingTable::lookup(RouteKind::Note, 15, 127).is_some());
    assert!(RoutingTable::lookup(RouteKind::Note, 16, 0).is_none());
    assert!(RoutingTable::lookup(RouteKind::ControlChange, 0, 128).is_none());
}

#[test]
fn bind_appends_in_order() {
    let mut table = RoutingTable::new(4);
    let target = sentinel(RouteKind::ControlChange, 1, 5);
    table.bind(2.into(), target);
    table.bind(0.into(), target);
    table.bind(3.into(), target);
    assert_eq!(vec![2, 0, 3], bound_nodes(&table, target));
    assert_eq!(Some(target), table.binding(0.into()));
    assert_eq!(None, table.binding(1.into()));
}

#[test]
fn unbind_relinks_neighbors() {
    let mut table = RoutingTable::new(3);
    let target = sentinel(RouteKind::Note, 0, 0);
    for node in 0..3 {
        table.bind(node.into(), target);
    }
    // Middle
    assert_eq!(Some(target), table.unbind(1.into()));
    assert_eq!(vec![0, 2], bound_nodes(&table, target));
    // Head
    assert_eq!(Some(target), table.unbind(0.into()));
    assert_eq!(vec![2], bound_nodes(&table, target));
    // Tail and last
    assert_eq!(Some(target), table.unbind(2.into()));
    assert!(bound_nodes(&table, target).is_empty());
    // Already unbound
    assert_eq!(None, table.unbind(2.into()));
    // The sentinel is reusable
    table.bind(1.into(), target);
    assert_eq!(vec![1], bound_nodes(&table, target));
}

#[test]
fn rebind_moves_node_between_lists() {
    let mut table = RoutingTable::new(2);
    let first = sentinel(RouteKind::Note, 0, 1);
    let second = sentinel(RouteKind::ControlChange, 0, 1);
    table.bind(0.into(), first);
    table.bind(1.into(), first);
    assert_eq!(Some(first), table.rebind(0.into(), second));
    assert_eq!(vec![1], bound_nodes(&table, first));
    assert_eq!(vec![0], bound_nodes(&table, second));
    // Rebinding to the same sentinel moves the node to the tail
    table.bind(1.into(), second);
    assert_eq!(Some(second), table.rebind(0.into(), second));
    assert_eq!(vec![1, 0], bound_nodes(&table, second));
    assert!(bound_nodes(&table, first).is_empty());
    assert_eq!(2, table.bindings().count());
}

#[test]
fn shadow_buffer_reports_changes() {
    let buffer = ShadowBuffer::new(0x81, 4);
    assert!(buffer.set(1, 7));
    assert!(!buffer.set(1, 7));
    assert!(buffer.set_range(2, &[1, 2]));
    assert!(!buffer.set_range(2, &[1, 2]));
    let mut report = Vec::new();
    buffer.snapshot_into(&mut report);
    assert_eq!(vec![0x81_u8, 0, 7, 1, 2], report);
    buffer.clear();
    buffer.snapshot_into(&mut report);
    assert_eq!(vec![0x81_u8, 0, 0, 0, 0], report);
}

#[test]
fn flush_requests_are_coalesced() {
    let buffer = ShadowBuffer::new(0x80, 1);
    assert!(buffer.request_flush());
    assert!(!buffer.request_flush());
    buffer.begin_flush();
    assert!(!buffer.end_flush());
    assert!(!buffer.is_flush_pending());

    assert!(buffer.request_flush());
    buffer.begin_flush();
    // Modified while running
    assert!(!buffer.request_flush());
    assert!(!buffer.request_flush());
    assert!(buffer.end_flush());
    assert!(!buffer.end_flush());
    assert!(!buffer.is_flush_pending());
}

#[derive(Default)]
struct RecordingOutput {
    reports: Mutex<Vec<Vec<u8>>>,
}

impl ReportOutputConnection for RecordingOutput {
    fn send_report(&self, report: &[u8]) -> Result<()> {
        self.reports.lock().push(report.to_vec());
        Ok(())
    }
}

fn new_groups() -> Arc<[Arc<ShadowBuffer>]> {
    vec![
        Arc::new(ShadowBuffer::new(0x80, 2)),
        Arc::new(ShadowBuffer::new(0x81, 3)),
    ]
    .into()
}

#[test]
fn shutdown_drains_pending_flushes() {
    let output = Arc::new(RecordingOutput::default());
    let groups = new_groups();
    let writer = DeferredWriter::spawn(Arc::clone(&groups), output.clone(), 2).unwrap();
    groups[1].set(2, 9);
    assert!(writer.schedule(1));
    writer.shutdown();
    assert_eq!(vec![vec![0x81_u8, 0, 0, 9]], *output.reports.lock());
    // Requests after shutdown are dropped
    assert!(!writer.schedule(0));
    assert!(!groups[0].is_flush_pending());
    assert_eq!(1, output.reports.lock().len());
}

struct GatedOutput {
    started_tx: Sender<()>,
    gate_rx: Receiver<()>,
    reports: Mutex<Vec<Vec<u8>>>,
}

impl ReportOutputConnection for GatedOutput {
    fn send_report(&self, report: &[u8]) -> Result<()> {
        self.reports.lock().push(report.to_vec());
        self.started_tx.send(()).map_err(|_| Error::Disconnected)?;
        self.gate_rx.recv().map_err(|_| Error::Disconnected)
    }
}

#[test]
fn updates_during_a_flush_result_in_a_single_followup() {
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
    let output = Arc::new(GatedOutput {
        started_tx,
        gate_rx,
        reports: Default::default(),
    });
    let groups = new_groups();
    let writer = DeferredWriter::spawn(Arc::clone(&groups), output.clone(), 1).unwrap();

    groups[0].set(0, 1);
    assert!(writer.schedule(0));
    // Wait until the worker is blocked while sending
    started_rx.recv().unwrap();
    for value in 2..=4 {
        groups[0].set(0, value);
        assert!(!writer.schedule(0));
    }
    gate_tx.send(()).unwrap();
    gate_tx.send(()).unwrap();
    writer.shutdown();

    assert_eq!(
        vec![vec![0x80_u8, 1, 0], vec![0x80, 4, 0]],
        *output.reports.lock()
    );
    assert!(!groups[0].is_flush_pending());
}
