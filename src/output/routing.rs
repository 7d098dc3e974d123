// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

use derive_more::{Display, From, Into};
use strum::{EnumCount, EnumIter, FromRepr};

use crate::midi::{ChannelMessage, ChannelMessageKind, NUM_CHANNELS, NUM_U7_VALUES};

/// Message kinds that can be routed to indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RouteKind {
    Note,
    ControlChange,
}

impl RouteKind {
    /// The route kind and value of a channel message.
    ///
    /// Note-Off is routed as a Note with value 0.
    #[must_use]
    pub const fn of_message(message: &ChannelMessage) -> Option<(Self, u8)> {
        match message.kind {
            ChannelMessageKind::NoteOn => Some((Self::Note, message.value)),
            ChannelMessageKind::NoteOff => Some((Self::Note, 0)),
            ChannelMessageKind::ControlChange => Some((Self::ControlChange, message.value)),
            _ => None,
        }
    }
}

const SENTINELS_PER_KIND: usize = NUM_CHANNELS * NUM_U7_VALUES;

/// Index of an indicator element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
pub struct NodeId(usize);

/// Identifies the `(kind, channel, key)` coordinates of a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("{kind:?} ch = {channel} key = {key}")]
pub struct SentinelId {
    kind: RouteKind,
    channel: u8,
    key: u8,
}

impl SentinelId {
    /// Returns `None` if `channel` or `key` are out of range.
    #[must_use]
    pub fn new(kind: RouteKind, channel: u8, key: u8) -> Option<Self> {
        if usize::from(channel) >= NUM_CHANNELS || usize::from(key) >= NUM_U7_VALUES {
            return None;
        }
        Some(Self { kind, channel, key })
    }

    #[must_use]
    pub const fn kind(self) -> RouteKind {
        self.kind
    }

    #[must_use]
    pub const fn channel(self) -> u8 {
        self.channel
    }

    #[must_use]
    pub const fn key(self) -> u8 {
        self.key
    }

    fn index(self) -> usize {
        usize::from(self.kind as u8) * SENTINELS_PER_KIND
            + usize::from(self.channel) * NUM_U7_VALUES
            + usize::from(self.key)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Node {
    sentinel: Option<SentinelId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sentinel {
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

/// Many-to-one mapping from `(kind, channel, key)` to indicator nodes.
///
/// Nodes live in an arena and are linked into the list of at most one
/// sentinel. Both bind and unbind only update a constant number of
/// links. Node ids outside of the arena panic.
#[derive(Debug)]
pub struct RoutingTable {
    nodes: Box<[Node]>,
    sentinels: Box<[Sentinel]>,
}

impl RoutingTable {
    /// Create a table with `num_nodes` unbound nodes.
    #[must_use]
    pub fn new(num_nodes: usize) -> Self {
        Self {
            nodes: vec![Node::default(); num_nodes].into_boxed_slice(),
            sentinels: vec![Sentinel::default(); RouteKind::COUNT * SENTINELS_PER_KIND]
                .into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn lookup(kind: RouteKind, channel: u8, key: u8) -> Option<SentinelId> {
        SentinelId::new(kind, channel, key)
    }

    /// The sentinel that `node` is currently bound to.
    #[must_use]
    pub fn binding(&self, node: NodeId) -> Option<SentinelId> {
        self.nodes[node.0].sentinel
    }

    /// Append `node` to the list of `sentinel`.
    ///
    /// The node is unlinked from its current list first.
    pub fn bind(&mut self, node: NodeId, sentinel: SentinelId) {
        self.unbind(node);
        let tail = {
            let entry = &mut self.sentinels[sentinel.index()];
            let tail = entry.tail.replace(node);
            if tail.is_none() {
                debug_assert!(entry.head.is_none());
                entry.head = Some(node);
            }
            tail
        };
        if let Some(tail) = tail {
            debug_assert!(self.nodes[tail.0].next.is_none());
            self.nodes[tail.0].next = Some(node);
        }
        let entry = &mut self.nodes[node.0];
        entry.sentinel = Some(sentinel);
        entry.prev = tail;
        debug_assert!(entry.next.is_none());
    }

    /// Unlink `node` from its current list.
    ///
    /// Returns the previous binding or `None` if `node` was unbound.
    pub fn unbind(&mut self, node: NodeId) -> Option<SentinelId> {
        let Node {
            sentinel,
            prev,
            next,
        } = std::mem::take(&mut self.nodes[node.0]);
        let sentinel = sentinel?;
        let entry = &mut self.sentinels[sentinel.index()];
        if prev.is_none() {
            debug_assert_eq!(entry.head, Some(node));
            entry.head = next;
        }
        if next.is_none() {
            debug_assert_eq!(entry.tail, Some(node));
            entry.tail = prev;
        }
        if let Some(prev) = prev {
            self.nodes[prev.0].next = next;
        }
        if let Some(next) = next {
            self.nodes[next.0].prev = prev;
        }
        Some(sentinel)
    }

    /// Move `node` to the list of `sentinel`.
    ///
    /// Returns the previous binding.
    pub fn rebind(&mut self, node: NodeId, sentinel: SentinelId) -> Option<SentinelId> {
        let previous = self.binding(node);
        self.bind(node, sentinel);
        previous
    }

    /// Iterate the nodes bound to `sentinel` in the order of binding.
    pub fn nodes(&self, sentinel: SentinelId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.sentinels[sentinel.index()].head;
        std::iter::from_fn(move || {
            let node = next?;
            next = self.nodes[node.0].next;
            Some(node)
        })
    }

    /// Iterate all nodes that are bound to a sentinel.
    pub fn bindings(&self) -> impl Iterator<Item = (NodeId, SentinelId)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| node.sentinel.map(|sentinel| (NodeId(index), sentinel)))
    }
}
