#![deny(warnings)]

//! Tick engine for the Fed simulator.
//!
//! [`Simulation`] is the synchronous core: one call to [`Simulation::tick`]
//! advances a simulated month (event lifecycle, optional event request,
//! dynamics, history, crash and term checks). [`GameHandle`] wraps it for a
//! tokio runtime, running event fetches as tasks and firing ticks from a
//! real-time [`Clock`].

pub mod driver;
pub mod lifecycle;
pub mod simulation;
pub mod term;

pub use driver::{Clock, Fired, GameHandle};
pub use lifecycle::{FetchRequest, FetchTicket, LifecycleStep};
pub use simulation::{FetchDisposition, Simulation, TickReport};
pub use term::{TransitionError, Trigger};

/// Run `ticks` clock firings synchronously, dropping any event requests.
///
/// Used by benchmarks and headless sweeps where no event source is wired.
pub fn run_ticks(sim: &mut Simulation, ticks: u32) -> u32 {
    let mut advanced = 0;
    for _ in 0..ticks {
        match sim.tick() {
            TickReport::Idle => break,
            TickReport::Advanced {
                fetch: Some(req), ..
            } => {
                sim.complete_fetch(
                    req.ticket,
                    Err(fedsim_events::EventSourceError::Unavailable(
                        "no event source".into(),
                    )),
                );
                advanced += 1;
            }
            _ => advanced += 1,
        }
    }
    advanced
}
