// SPDX-FileCopyrightText: The jamio authors
// SPDX-License-Identifier: MPL-2.0

//! Indicator output: routing, shadow buffers, and deferred writes

use std::borrow::Cow;

use thiserror::Error;

mod routing;
pub use self::routing::{NodeId, RouteKind, RoutingTable, SentinelId};

mod shadow;
pub use self::shadow::ShadowBuffer;

mod writer;
pub use self::writer::DeferredWriter;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Send: {msg}")]
    Send { msg: Cow<'static, str> },
    #[error("disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Sink for outbound device reports.
///
/// Only ever invoked from the writer threads, never while handling
/// input. Implementations may block.
pub trait ReportOutputConnection: Send + Sync {
    /// Send a complete report, starting with the report id.
    fn send_report(&self, report: &[u8]) -> Result<()>;
}

impl<C> ReportOutputConnection for std::sync::Arc<C>
where
    C: ReportOutputConnection + ?Sized,
{
    fn send_report(&self, report: &[u8]) -> Result<()> {
        self.as_ref().send_report(report)
    }
}
