//! Tick orchestration and player actions over the single live [`GameState`].

use chrono::Datelike;
use fedsim_core::{
    calendar, validate_config, validate_event, validate_tools, Event, GameState, HistoryRecord,
    Phase, SimConfig, ToolSettings, ValidationError,
};
use fedsim_econ::DynamicsParams;
use fedsim_events::{EventRequest, EventSourceError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::lifecycle::{self, FetchRequest, FetchSlot, FetchTicket, LifecycleStep};
use crate::term::{self, TransitionError, Trigger};

/// What one clock firing did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickReport {
    /// Not playing; the state is untouched.
    Idle,
    /// A term milestone ended the tick after advancing the calendar.
    Milestone { tick: u64, phase: Phase },
    /// Full tick committed with one history record.
    Advanced {
        tick: u64,
        lifecycle: LifecycleStep,
        /// Event fetch the driver should start, if one was requested.
        fetch: Option<FetchRequest>,
        phase: Phase,
    },
}

/// How a resolved fetch was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchDisposition {
    /// Event appended to the queue with this duration.
    Enqueued { duration: u32 },
    /// Source failed; nothing enqueued.
    Failed,
    /// Issued before the last reset; discarded.
    Stale,
}

/// Owns the game state, the engine RNG and the fetch slot.
///
/// Synchronous and deterministic for a fixed seed; the async event source is
/// driven by [`crate::GameHandle`], which feeds results back through
/// [`Simulation::complete_fetch`].
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    params: DynamicsParams,
    state: GameState,
    rng: ChaCha8Rng,
    /// Bumped on every reset; fetches from older epochs are stale.
    epoch: u64,
    fetch: FetchSlot,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ValidationError> {
        validate_config(&config)?;
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let params = DynamicsParams::default().with_noise(config.noise_amplitude);
        let state = GameState::initial(&config);
        Ok(Self {
            config,
            params,
            state,
            rng,
            epoch: 0,
            fetch: FetchSlot::default(),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn history(&self) -> &[HistoryRecord] {
        self.state.history.records()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch.is_busy()
    }

    /// Advance one simulated month if playing.
    pub fn tick(&mut self) -> TickReport {
        if !self.state.is_playing() {
            return TickReport::Idle;
        }

        let tick = self.state.current_tick + 1;
        let date = calendar::add_months(self.state.current_date, 1);
        let months = calendar::months_between(self.state.start_date, date);

        if let Some(trigger) = term::milestone(months, self.state.term_number, &self.state.indicators)
        {
            self.state.current_tick = tick;
            self.state.current_date = date;
            self.apply(trigger);
            info!(tick, months, phase = ?self.state.phase, "term milestone reached");
            return TickReport::Milestone {
                tick,
                phase: self.state.phase,
            };
        }

        let lifecycle = lifecycle::step(&mut self.state.events);
        let fetch = self.maybe_request_event(date.year(), calendar::quarter_of(date));

        let impact = self
            .state
            .events
            .current
            .as_ref()
            .map(|e| e.impact_modifiers);
        let indicators = fedsim_econ::advance(
            &self.state.indicators,
            &self.state.tools,
            impact.as_ref(),
            &self.params,
            &mut self.rng,
        );

        let quarter_start = tick % self.config.ticks_per_quarter == 0;
        let label = if quarter_start {
            calendar::quarter_label(date)
        } else {
            String::new()
        };

        self.state.current_tick = tick;
        self.state.current_date = date;
        self.state.indicators = indicators;
        self.state.history.push(HistoryRecord {
            tick,
            date,
            label,
            indicators,
            tools: self.state.tools,
        });

        if let Some(cause) = term::crash_cause(&indicators) {
            self.apply(Trigger::Crash(cause));
            warn!(tick, ?cause, inflation = indicators.inflation, unemployment = indicators.unemployment, "economy crashed");
        } else if quarter_start && self.config.pause_each_quarter {
            self.apply(Trigger::QuarterBoundary);
            debug!(tick, "paused at quarter boundary");
        }

        debug!(tick, ?lifecycle, inflation = indicators.inflation, unemployment = indicators.unemployment, approval = indicators.public_approval, "tick committed");
        TickReport::Advanced {
            tick,
            lifecycle,
            fetch,
            phase: self.state.phase,
        }
    }

    /// Apply a trigger the tick itself produced. These are always valid from
    /// `Playing`, which the tick guard guarantees.
    fn apply(&mut self, trigger: Trigger) {
        match term::transition(self.state.phase, trigger) {
            Ok(next) => self.state.phase = next,
            Err(err) => warn!(%err, "ignored phase trigger"),
        }
    }

    fn maybe_request_event(&mut self, year: i32, quarter: u32) -> Option<FetchRequest> {
        if !self.state.events.queue.is_empty() || self.fetch.is_busy() {
            return None;
        }
        if !self.rng.gen_bool(self.config.event_fetch_probability) {
            return None;
        }
        let ticket = self.fetch.claim(self.epoch)?;
        debug!(?ticket, year, quarter, "requesting event");
        Some(FetchRequest {
            ticket,
            request: EventRequest {
                indicators: self.state.indicators,
                year,
                quarter,
            },
        })
    }

    /// Merge a resolved fetch. Stale results (issued before a reset) only free
    /// the slot.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Event, EventSourceError>,
    ) -> FetchDisposition {
        if !self.fetch.release(ticket) {
            debug!(?ticket, "completion for a fetch that is not outstanding");
        }
        if ticket.epoch != self.epoch {
            warn!(?ticket, epoch = self.epoch, "discarding stale event fetch");
            return FetchDisposition::Stale;
        }
        let event = match result.and_then(|e| validate_event(&e).map(|_| e).map_err(Into::into)) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "event fetch failed");
                return FetchDisposition::Failed;
            }
        };
        let duration = self
            .rng
            .gen_range(self.config.event_duration_min..=self.config.event_duration_max);
        info!(id = %event.id, headline = %event.headline, duration, "event queued");
        self.state.events.queue.push_back(event.with_duration(duration));
        FetchDisposition::Enqueued { duration }
    }

    /// Replace the player's tools. Values are clamped into range; non-finite
    /// input is rejected and leaves the tools unchanged.
    pub fn set_tools(&mut self, tools: ToolSettings) -> Result<&GameState, ValidationError> {
        validate_tools(&tools)?;
        self.state.tools = tools.clamped();
        Ok(&self.state)
    }

    /// Play/pause. A no-op while a milestone or terminal dialog is showing.
    pub fn toggle_play(&mut self) -> &GameState {
        match term::transition(self.state.phase, Trigger::TogglePlay) {
            Ok(next) => self.state.phase = next,
            Err(err) => debug!(%err, "toggle ignored"),
        }
        &self.state
    }

    pub fn accept_second_term(&mut self) -> Result<&GameState, TransitionError> {
        let next = term::transition(self.state.phase, Trigger::AcceptSecondTerm)?;
        self.state.phase = next;
        self.state.term_number = 2;
        info!("second term accepted");
        Ok(&self.state)
    }

    /// Start a fresh game. Any fetch still running belongs to the old epoch.
    pub fn reset(&mut self) -> &GameState {
        self.epoch += 1;
        self.state = GameState::initial(&self.config);
        info!(epoch = self.epoch, "game reset");
        &self.state
    }
}
