// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Indicator groups and their routing nodes

use std::fmt;

use strum::{EnumCount, EnumIter, FromRepr, IntoEnumIterator as _};

use super::report::{
    BUTTON_LEDS_REPORT_ID, NUM_BUTTON_LEDS, NUM_PAD_LEDS, NUM_STRIPS, NUM_STRIP_LEDS,
    PAD_LEDS_REPORT_ID, STRIP_LEDS_REPORT_ID,
};
use crate::{
    input::ConfigError,
    output::{NodeId, RouteKind, RoutingTable, ShadowBuffer},
};

/// Independently flushed output reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter, EnumCount)]
#[repr(u8)]
pub enum IndicatorGroup {
    ButtonLeds,
    PadLeds,
    Strips,
}

impl IndicatorGroup {
    #[must_use]
    pub const fn report_id(self) -> u8 {
        match self {
            Self::ButtonLeds => BUTTON_LEDS_REPORT_ID,
            Self::PadLeds => PAD_LEDS_REPORT_ID,
            Self::Strips => STRIP_LEDS_REPORT_ID,
        }
    }

    /// Length of the report without the id.
    #[must_use]
    pub const fn report_len(self) -> usize {
        match self {
            Self::ButtonLeds => NUM_BUTTON_LEDS,
            Self::PadLeds => NUM_PAD_LEDS,
            Self::Strips => NUM_STRIP_LEDS,
        }
    }

    /// Number of routing nodes, one per LED or per strip.
    #[must_use]
    pub const fn num_nodes(self) -> usize {
        match self {
            Self::ButtonLeds => NUM_BUTTON_LEDS,
            Self::PadLeds => NUM_PAD_LEDS,
            Self::Strips => NUM_STRIPS,
        }
    }

    const fn first_node(self) -> usize {
        match self {
            Self::ButtonLeds => 0,
            Self::PadLeds => NUM_BUTTON_LEDS,
            Self::Strips => NUM_BUTTON_LEDS + NUM_PAD_LEDS,
        }
    }

    /// Routing of the default configuration.
    #[must_use]
    pub const fn default_route(self) -> (RouteKind, u8) {
        match self {
            Self::ButtonLeds => (RouteKind::Note, 0),
            Self::PadLeds => (RouteKind::Note, 1),
            Self::Strips => (RouteKind::ControlChange, 2),
        }
    }

    pub(super) fn new_shadow_buffer(self) -> ShadowBuffer {
        ShadowBuffer::new(self.report_id(), self.report_len())
    }
}

pub(super) const NUM_OUTPUT_NODES: usize = NUM_BUTTON_LEDS + NUM_PAD_LEDS + NUM_STRIPS;

/// An addressable indicator element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputNode {
    pub group: IndicatorGroup,
    pub index: usize,
}

impl OutputNode {
    pub fn new(group: IndicatorGroup, index: usize) -> Result<Self, ConfigError> {
        let count = group.num_nodes();
        if index >= count {
            return Err(ConfigError::IndexOutOfRange { index, count });
        }
        Ok(Self { group, index })
    }

    #[must_use]
    pub const fn button_led(index: usize) -> Self {
        debug_assert!(index < NUM_BUTTON_LEDS);
        Self {
            group: IndicatorGroup::ButtonLeds,
            index,
        }
    }

    #[must_use]
    pub const fn pad_led(index: usize) -> Self {
        debug_assert!(index < NUM_PAD_LEDS);
        Self {
            group: IndicatorGroup::PadLeds,
            index,
        }
    }

    #[must_use]
    pub const fn strip(index: usize) -> Self {
        debug_assert!(index < NUM_STRIPS);
        Self {
            group: IndicatorGroup::Strips,
            index,
        }
    }

    pub(super) fn id(self) -> NodeId {
        debug_assert!(self.index < self.group.num_nodes());
        (self.group.first_node() + self.index).into()
    }

    pub(super) fn from_id(id: NodeId) -> Self {
        let id = usize::from(id);
        debug_assert!(id < NUM_OUTPUT_NODES);
        let group = if id >= IndicatorGroup::Strips.first_node() {
            IndicatorGroup::Strips
        } else if id >= IndicatorGroup::PadLeds.first_node() {
            IndicatorGroup::PadLeds
        } else {
            IndicatorGroup::ButtonLeds
        };
        Self {
            group,
            index: id - group.first_node(),
        }
    }
}

impl fmt::Display for OutputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { group, index } = self;
        write!(f, "{group:?}[{index}]")
    }
}

/// Bind every node to its default coordinates.
#[allow(clippy::cast_possible_truncation)]
pub(super) fn default_routing_table() -> RoutingTable {
    let mut routing = RoutingTable::new(NUM_OUTPUT_NODES);
    for group in IndicatorGroup::iter() {
        let (kind, channel) = group.default_route();
        for index in 0..group.num_nodes() {
            let Some(sentinel) = RoutingTable::lookup(kind, channel, index as u8) else {
                continue;
            };
            routing.bind(OutputNode { group, index }.id(), sentinel);
        }
    }
    routing
}
