//! Event lifecycle: activation, expiry and the single outstanding fetch.

use fedsim_core::EventState;
use fedsim_events::EventRequest;
use serde::Serialize;
use tracing::{debug, info};

/// What the activation/expiry step did this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStep {
    /// No event active and nothing queued.
    Idle,
    /// Queue head became active this tick.
    Activated,
    /// Active event kept applying pressure.
    Continuing,
    /// Active event ran past its duration and was cleared.
    Expired,
}

/// Run activation then expiry on the event state.
///
/// The counter increments before the strict `>` comparison, so an event with
/// duration `d` is active on `d` ticks and cleared on the next one.
pub fn step(events: &mut EventState) -> LifecycleStep {
    let mut activated = false;
    if events.current.is_none() {
        if let Some(next) = events.queue.pop_front() {
            info!(id = %next.id, headline = %next.headline, duration = next.duration_ticks, "event activated");
            events.current = Some(next);
            events.active_ticks = 0;
            activated = true;
        }
    }

    let Some(current) = &events.current else {
        return LifecycleStep::Idle;
    };
    let duration = current.duration_ticks;
    events.active_ticks += 1;
    if events.active_ticks > duration {
        debug!(id = %current.id, "event expired");
        events.current = None;
        events.active_ticks = 0;
        return LifecycleStep::Expired;
    }
    if activated {
        LifecycleStep::Activated
    } else {
        LifecycleStep::Continuing
    }
}

/// Identifies one event fetch and the game epoch it was issued in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub epoch: u64,
    pub serial: u64,
}

/// A fetch the driver must hand to the event source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub request: EventRequest,
}

/// Holds at most one outstanding fetch. Survives resets, so a fetch issued
/// before a reset still occupies the slot until it resolves.
#[derive(Debug, Default)]
pub struct FetchSlot {
    outstanding: Option<FetchTicket>,
    issued: u64,
}

impl FetchSlot {
    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Reserve the slot for a new fetch, or `None` if one is outstanding.
    pub fn claim(&mut self, epoch: u64) -> Option<FetchTicket> {
        if self.outstanding.is_some() {
            return None;
        }
        self.issued += 1;
        let ticket = FetchTicket {
            epoch,
            serial: self.issued,
        };
        self.outstanding = Some(ticket);
        Some(ticket)
    }

    /// Free the slot if `ticket` is the outstanding fetch.
    pub fn release(&mut self, ticket: FetchTicket) -> bool {
        if self.outstanding == Some(ticket) {
            self.outstanding = None;
            true
        } else {
            false
        }
    }
}
