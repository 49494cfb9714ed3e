#![deny(warnings)]

//! News event sources for the Fed simulator.
//!
//! The tick engine only needs a function from "current indicators + calendar
//! position" to an [`Event`]. This crate defines that seam ([`EventSource`]),
//! a local table-backed implementation ([`TableSource`]) and an adapter that
//! turns failures and timeouts into the canned fallback event
//! ([`WithFallback`]).

mod fallback;
mod table;

use std::future::Future;
use std::time::Duration;

use fedsim_core::{Event, IndicatorSet, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fallback::WithFallback;
pub use table::{EventTable, EventTemplate, TableError, TableSource, Theme};

/// Context handed to a source when a new event is needed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub indicators: IndicatorSet,
    pub year: i32,
    /// Calendar quarter, 1..=4.
    pub quarter: u32,
}

/// Failures a source may report.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("event source unavailable: {0}")]
    Unavailable(String),
    #[error("event source timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed event: {0}")]
    Invalid(#[from] ValidationError),
    #[error("event table has no entries")]
    EmptyTable,
}

/// Asynchronous supplier of news events.
///
/// Calls are fire-and-forget from the engine's point of view: the returned
/// future is driven on its own task and may resolve at any later tick.
pub trait EventSource: Send + Sync + 'static {
    fn generate(
        &self,
        request: EventRequest,
    ) -> impl Future<Output = Result<Event, EventSourceError>> + Send;
}
