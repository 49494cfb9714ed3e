//! Async driver: a shared handle over [`Simulation`] plus the real-time clock.
//!
//! The simulation lock is only taken for synchronous sections and is never
//! held across an await. Event fetches run as spawned tasks and merge back
//! through [`Simulation::complete_fetch`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fedsim_core::{GameState, HistoryRecord, ToolSettings, ValidationError};
use fedsim_events::EventSource;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::lifecycle::FetchRequest;
use crate::simulation::{FetchDisposition, Simulation, TickReport};
use crate::term::TransitionError;

/// Result of one clock firing.
#[derive(Debug)]
pub struct Fired {
    pub report: TickReport,
    /// The fetch task spawned by this tick, if any. Dropping it detaches the
    /// task; it still merges its result.
    pub fetch: Option<JoinHandle<FetchDisposition>>,
}

/// Cloneable handle shared by the clock task, fetch tasks and the player.
pub struct GameHandle<S> {
    sim: Arc<Mutex<Simulation>>,
    source: Arc<S>,
}

impl<S> Clone for GameHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sim: Arc::clone(&self.sim),
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: EventSource> GameHandle<S> {
    pub fn new(sim: Simulation, source: S) -> Self {
        Self {
            sim: Arc::new(Mutex::new(sim)),
            source: Arc::new(source),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Simulation> {
        // State stays consistent between statements, so a poisoned lock is
        // still usable.
        self.sim.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> GameState {
        self.lock().state().clone()
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.lock().history().to_vec()
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.lock().fetch_in_flight()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.lock().config().tick_period_ms)
    }

    pub fn set_tools(&self, tools: ToolSettings) -> Result<GameState, ValidationError> {
        self.lock().set_tools(tools).cloned()
    }

    pub fn toggle_play(&self) -> GameState {
        self.lock().toggle_play().clone()
    }

    pub fn accept_second_term(&self) -> Result<GameState, TransitionError> {
        self.lock().accept_second_term().cloned()
    }

    pub fn reset(&self) -> GameState {
        self.lock().reset().clone()
    }

    /// Run one tick and start its event fetch, if it requested one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fire(&self) -> Fired {
        let report = self.lock().tick();
        let fetch = match &report {
            TickReport::Advanced {
                fetch: Some(req), ..
            } => Some(self.dispatch(*req)),
            _ => None,
        };
        Fired { report, fetch }
    }

    fn dispatch(&self, req: FetchRequest) -> JoinHandle<FetchDisposition> {
        let sim = Arc::clone(&self.sim);
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let result = source.generate(req.request).await;
            let disposition = sim
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .complete_fetch(req.ticket, result);
            debug!(ticket = ?req.ticket, ?disposition, "event fetch merged");
            disposition
        })
    }

    /// Fire the tick every `tick_period_ms` until the returned [`Clock`] is
    /// stopped or dropped. Firings while not playing are no-ops, so the clock
    /// can run for the whole session.
    pub fn start_clock(&self) -> Clock {
        let handle = self.clone();
        let period = self.tick_period();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                handle.fire();
            }
        });
        info!(?period, "simulation clock started");
        Clock { task }
    }
}

/// Running clock task. Aborted on drop.
#[derive(Debug)]
pub struct Clock {
    task: JoinHandle<()>,
}

impl Clock {
    pub fn stop(self) {}
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.task.abort();
        debug!("simulation clock stopped");
    }
}
