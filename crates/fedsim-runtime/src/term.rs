//! Term and election state machine.
//!
//! All phase changes go through [`transition`]. Milestones and crash detection
//! only produce [`Trigger`]s; the tick orchestration decides when to apply them.

use fedsim_core::{CrashCause, IndicatorSet, Phase, ReelectionOutcome};
use thiserror::Error;

/// Months into the game at which the first term ends.
pub const FIRST_TERM_MONTHS: i32 = 48;
/// Months into the game at which the second term ends.
pub const SECOND_TERM_MONTHS: i32 = 96;

const REELECTION_MIN_APPROVAL: f64 = 45.0;
const REELECTION_MAX_INFLATION: f64 = 6.0;
const REELECTION_MAX_UNEMPLOYMENT: f64 = 8.0;

const CRASH_INFLATION_ABOVE: f64 = 20.0;
const CRASH_UNEMPLOYMENT_ABOVE: f64 = 20.0;
const CRASH_INFLATION_BELOW: f64 = -5.0;

/// Inputs that can move the phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Player pressed play/pause.
    TogglePlay,
    /// A quarter-start tick completed.
    QuarterBoundary,
    /// First term ended with this verdict.
    Reelection(ReelectionOutcome),
    /// Second term ended.
    TermComplete,
    /// Indicators crossed a collapse threshold.
    Crash(CrashCause),
    /// Player took the second term after a successful review.
    AcceptSecondTerm,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{trigger:?} is not allowed while {phase:?}")]
    NotAllowed { phase: Phase, trigger: Trigger },
}

/// The single phase transition function.
pub fn transition(phase: Phase, trigger: Trigger) -> Result<Phase, TransitionError> {
    let next = match (phase, trigger) {
        (Phase::Playing, Trigger::TogglePlay) => Phase::Paused,
        (Phase::Paused, Trigger::TogglePlay) => Phase::Playing,
        (Phase::Playing, Trigger::QuarterBoundary) => Phase::Paused,
        (Phase::Playing, Trigger::Reelection(outcome)) => Phase::AwaitingReelection(outcome),
        (Phase::Playing, Trigger::TermComplete) => Phase::Retired,
        (Phase::Playing, Trigger::Crash(cause)) => Phase::Crashed(cause),
        (Phase::AwaitingReelection(ReelectionOutcome::Success), Trigger::AcceptSecondTerm) => {
            Phase::Playing
        }
        (phase, trigger) => return Err(TransitionError::NotAllowed { phase, trigger }),
    };
    Ok(next)
}

/// End-of-first-term review.
pub fn reelection_verdict(indicators: &IndicatorSet) -> ReelectionOutcome {
    let approval_good = indicators.public_approval > REELECTION_MIN_APPROVAL;
    let economy_okay = indicators.inflation < REELECTION_MAX_INFLATION
        && indicators.unemployment < REELECTION_MAX_UNEMPLOYMENT;
    if approval_good && economy_okay {
        ReelectionOutcome::Success
    } else {
        ReelectionOutcome::Fail
    }
}

/// Milestone reached on entering `months_elapsed`, if any.
pub fn milestone(months_elapsed: i32, term_number: u8, indicators: &IndicatorSet) -> Option<Trigger> {
    if months_elapsed == FIRST_TERM_MONTHS && term_number == 1 {
        return Some(Trigger::Reelection(reelection_verdict(indicators)));
    }
    if months_elapsed == SECOND_TERM_MONTHS {
        return Some(Trigger::TermComplete);
    }
    None
}

/// Collapse check, run after dynamics.
pub fn crash_cause(indicators: &IndicatorSet) -> Option<CrashCause> {
    if indicators.inflation > CRASH_INFLATION_ABOVE {
        Some(CrashCause::Hyperinflation)
    } else if indicators.unemployment > CRASH_UNEMPLOYMENT_ABOVE
        || indicators.inflation < CRASH_INFLATION_BELOW
    {
        Some(CrashCause::Depression)
    } else {
        None
    }
}
