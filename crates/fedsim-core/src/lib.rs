#![deny(warnings)]

//! Core domain model for the Fed simulator.
//!
//! This crate defines the serializable state shared by the dynamics model, the
//! event pipeline and the tick engine, together with validation helpers for
//! the values a player or a content source can feed into the simulation.

pub mod calendar;
pub mod config;
pub mod history;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

pub use config::{validate_config, SimConfig};
pub use history::{Assessment, HistoryLog, HistoryRecord, Trend};

/// Inflation target in percent.
pub const TARGET_INFLATION: f64 = 2.0;
/// Unemployment target in percent.
pub const TARGET_UNEMPLOYMENT: f64 = 4.0;
/// GDP growth target in percent.
pub const TARGET_GDP_GROWTH: f64 = 2.5;

/// Macro indicators observed by the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// CPI, year over year (%).
    pub inflation: f64,
    /// Unemployment rate (%).
    pub unemployment: f64,
    /// Real GDP growth (%).
    pub gdp_growth: f64,
    /// Public approval of the chair, always within [0, 100].
    pub public_approval: f64,
}

impl IndicatorSet {
    /// Indicators at game start.
    pub const INITIAL: IndicatorSet = IndicatorSet {
        inflation: 3.4,
        unemployment: 4.1,
        gdp_growth: 2.1,
        public_approval: 60.0,
    };

    /// Read a single indicator.
    pub fn get(&self, kind: IndicatorKind) -> f64 {
        match kind {
            IndicatorKind::Inflation => self.inflation,
            IndicatorKind::Unemployment => self.unemployment,
            IndicatorKind::GdpGrowth => self.gdp_growth,
            IndicatorKind::PublicApproval => self.public_approval,
        }
    }
}

/// Selector for one of the four indicators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Inflation,
    Unemployment,
    GdpGrowth,
    PublicApproval,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Inflation,
        IndicatorKind::Unemployment,
        IndicatorKind::GdpGrowth,
        IndicatorKind::PublicApproval,
    ];

    /// Policy target for the indicator, if it has one.
    pub fn target(self) -> Option<f64> {
        match self {
            IndicatorKind::Inflation => Some(TARGET_INFLATION),
            IndicatorKind::Unemployment => Some(TARGET_UNEMPLOYMENT),
            IndicatorKind::GdpGrowth => Some(TARGET_GDP_GROWTH),
            IndicatorKind::PublicApproval => None,
        }
    }
}

/// Allowed range and slider step of a policy lever.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToolRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ToolRange {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Round to the nearest slider step, then clamp.
    pub fn snap(&self, value: f64) -> f64 {
        let steps = ((value - self.min) / self.step).round();
        self.clamp(self.min + steps * self.step)
    }
}

pub const FED_FUNDS_RANGE: ToolRange = ToolRange {
    min: 0.0,
    max: 12.0,
    step: 0.25,
};
pub const RESERVE_RANGE: ToolRange = ToolRange {
    min: 0.0,
    max: 20.0,
    step: 0.5,
};
pub const OMO_RANGE: ToolRange = ToolRange {
    min: -100.0,
    max: 100.0,
    step: 5.0,
};

/// Policy levers owned by the player.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Federal funds rate (%), in [0, 12].
    pub fed_funds_rate: f64,
    /// Reserve requirement (%), in [0, 20].
    pub reserve_requirement: f64,
    /// Open market operations, in [-100, 100]. Positive is buying (easing).
    pub open_market_operations: f64,
}

impl ToolSettings {
    /// Tool settings at game start.
    pub const INITIAL: ToolSettings = ToolSettings {
        fed_funds_rate: 5.25,
        reserve_requirement: 10.0,
        open_market_operations: 0.0,
    };

    /// Clamp every lever into its allowed range.
    pub fn clamped(self) -> Self {
        Self {
            fed_funds_rate: FED_FUNDS_RANGE.clamp(self.fed_funds_rate),
            reserve_requirement: RESERVE_RANGE.clamp(self.reserve_requirement),
            open_market_operations: OMO_RANGE.clamp(self.open_market_operations),
        }
    }

    /// Quantize every lever to its slider step.
    pub fn snapped(self) -> Self {
        Self {
            fed_funds_rate: FED_FUNDS_RANGE.snap(self.fed_funds_rate),
            reserve_requirement: RESERVE_RANGE.snap(self.reserve_requirement),
            open_market_operations: OMO_RANGE.snap(self.open_market_operations),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Total shock an event exerts on the economy, spread over its active ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactModifiers {
    pub inflation: f64,
    pub unemployment: f64,
    pub gdp_growth: f64,
}

/// A news event perturbing the economy for a limited number of ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub headline: String,
    pub description: String,
    /// Fictional outlet reporting the event.
    pub source: String,
    pub impact_modifiers: ImpactModifiers,
    /// Ticks of pressure. Overwritten when the event is enqueued.
    pub duration_ticks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisor_comment: Option<String>,
}

impl Event {
    /// Canned event used when a content source fails or times out.
    pub fn fallback() -> Self {
        Self {
            id: "fallback".to_string(),
            headline: "Market Stability Continues".to_string(),
            description: "Markets remain relatively calm as traders await the Fed's next move. \
                          No major shocks reported."
                .to_string(),
            source: "System Backup".to_string(),
            impact_modifiers: ImpactModifiers {
                inflation: 0.1,
                unemployment: 0.0,
                gdp_growth: 0.1,
            },
            duration_ticks: 8,
            advisor_comment: Some("Steady as she goes, Chair.".to_string()),
        }
    }

    pub fn with_duration(mut self, ticks: u32) -> Self {
        self.duration_ticks = ticks;
        self
    }
}

/// Pending and active events plus the activity counter of the active one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventState {
    pub current: Option<Event>,
    pub queue: VecDeque<Event>,
    /// Ticks since `current` became active; zero whenever `current` is `None`.
    pub active_ticks: u32,
}

/// Result of the end-of-first-term review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReelectionOutcome {
    Success,
    Fail,
}

/// Why the economy collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashCause {
    Hyperinflation,
    Depression,
}

impl CrashCause {
    pub fn message(self) -> &'static str {
        match self {
            CrashCause::Hyperinflation => "Hyperinflation has destroyed the currency.",
            CrashCause::Depression => "The economy has entered a deep depression.",
        }
    }
}

/// Exclusive play phase. Only `Playing` lets the clock advance the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Playing,
    Paused,
    AwaitingReelection(ReelectionOutcome),
    Crashed(CrashCause),
    Retired,
}

impl Phase {
    pub fn is_playing(self) -> bool {
        matches!(self, Phase::Playing)
    }

    /// Blocking dialog the presentation layer should show for this phase.
    pub fn modal(self) -> ModalState {
        match self {
            Phase::Playing | Phase::Paused => ModalState::None,
            Phase::AwaitingReelection(ReelectionOutcome::Success) => ModalState::ReelectionSuccess,
            Phase::AwaitingReelection(ReelectionOutcome::Fail) => ModalState::ReelectionFail,
            Phase::Crashed(_) => ModalState::Crash,
            Phase::Retired => ModalState::Retirement,
        }
    }

    /// Phases that can only be left through a reset.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Crashed(_) | Phase::Retired | Phase::AwaitingReelection(ReelectionOutcome::Fail)
        )
    }
}

/// Presentation view of [`Phase`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalState {
    None,
    Crash,
    ReelectionSuccess,
    ReelectionFail,
    Retirement,
}

/// The single live game. Replaced wholesale on reset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub current_tick: u64,
    pub start_date: NaiveDate,
    pub current_date: NaiveDate,
    pub indicators: IndicatorSet,
    pub tools: ToolSettings,
    pub history: HistoryLog,
    pub events: EventState,
    pub phase: Phase,
    /// 1 or 2.
    pub term_number: u8,
}

impl GameState {
    /// Fresh game with the "Start" snapshot as history index 0.
    pub fn initial(config: &SimConfig) -> Self {
        let mut history = HistoryLog::new(config.history_capacity);
        history.push(HistoryRecord {
            tick: 0,
            date: config.start_date,
            label: "Start".to_string(),
            indicators: IndicatorSet::INITIAL,
            tools: ToolSettings::INITIAL,
        });
        Self {
            current_tick: 0,
            start_date: config.start_date,
            current_date: config.start_date,
            indicators: IndicatorSet::INITIAL,
            tools: ToolSettings::INITIAL,
            history,
            events: EventState::default(),
            phase: Phase::Paused,
            term_number: 1,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.phase.is_playing()
    }

    pub fn modal_state(&self) -> ModalState {
        self.phase.modal()
    }

    pub fn game_won(&self) -> bool {
        self.phase == Phase::Retired
    }

    pub fn months_elapsed(&self) -> i32 {
        calendar::months_between(self.start_date, self.current_date)
    }
}

/// Validation errors for player and content inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    /// Numeric field outside its allowed range.
    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
    /// Text field must not be blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Event duration bounds are inverted or zero.
    #[error("invalid duration range [{min}, {max}]")]
    InvalidDurationRange { min: u32, max: u32 },
}

/// Reject non-finite lever values. Range is enforced by clamping, not here.
pub fn validate_tools(tools: &ToolSettings) -> Result<(), ValidationError> {
    if !tools.fed_funds_rate.is_finite() {
        return Err(ValidationError::NonFinite("fed_funds_rate"));
    }
    if !tools.reserve_requirement.is_finite() {
        return Err(ValidationError::NonFinite("reserve_requirement"));
    }
    if !tools.open_market_operations.is_finite() {
        return Err(ValidationError::NonFinite("open_market_operations"));
    }
    Ok(())
}

/// Validate an event produced by a content source.
pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    if event.headline.trim().is_empty() {
        return Err(ValidationError::Empty("headline"));
    }
    if event.source.trim().is_empty() {
        return Err(ValidationError::Empty("source"));
    }
    let m = &event.impact_modifiers;
    if !(m.inflation.is_finite() && m.unemployment.is_finite() && m.gdp_growth.is_finite()) {
        return Err(ValidationError::NonFinite("impact_modifiers"));
    }
    Ok(())
}
