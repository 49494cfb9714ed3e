//! Table-backed event source.
//!
//! Templates carry a [`Theme`]; the source prefers themes that fit the current
//! economy (supply shocks while inflation runs hot, labour-market news while
//! unemployment is high) and otherwise draws from the whole table.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use fedsim_core::{validate_event, Event, ImpactModifiers, ValidationError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{EventRequest, EventSource, EventSourceError};

/// Inflation above this favours inflationary templates.
const HOT_INFLATION: f64 = 4.0;
/// Unemployment above this favours labour-market templates.
const HIGH_UNEMPLOYMENT: f64 = 6.0;
/// Duration proposed by the source; the engine re-rolls it on enqueue.
const PROPOSED_DURATION: u32 = 8;

/// Broad category of a template, used for context-aware selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Inflationary,
    LaborMarket,
    #[default]
    General,
}

/// Authored event without id or duration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    #[serde(default)]
    pub theme: Theme,
    pub headline: String,
    pub description: String,
    pub source: String,
    pub impact_modifiers: ImpactModifiers,
    #[serde(default)]
    pub advisor_comment: Option<String>,
}

impl EventTemplate {
    fn instantiate(&self, id: String) -> Event {
        Event {
            id,
            headline: self.headline.clone(),
            description: self.description.clone(),
            source: self.source.clone(),
            impact_modifiers: self.impact_modifiers,
            duration_ticks: PROPOSED_DURATION,
            advisor_comment: self.advisor_comment.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("template {index}: {source}")]
    Invalid {
        index: usize,
        source: ValidationError,
    },
    #[error("event table has no entries")]
    Empty,
}

/// A validated, non-empty list of templates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventTable {
    events: Vec<EventTemplate>,
}

impl EventTable {
    /// Build a table, validating every template.
    pub fn new(events: Vec<EventTemplate>) -> Result<Self, TableError> {
        if events.is_empty() {
            return Err(TableError::Empty);
        }
        for (index, t) in events.iter().enumerate() {
            validate_event(&t.instantiate(String::new()))
                .map_err(|source| TableError::Invalid { index, source })?;
        }
        Ok(Self { events })
    }

    /// Parse a table from YAML of the form `events: [ ... ]`.
    pub fn from_yaml_str(text: &str) -> Result<Self, TableError> {
        #[derive(Deserialize)]
        struct TableFile {
            events: Vec<EventTemplate>,
        }
        let file: TableFile = serde_yaml::from_str(text)?;
        Self::new(file.events)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn templates(&self) -> &[EventTemplate] {
        &self.events
    }

    /// Stock headlines shipped with the simulator.
    pub fn builtin() -> Self {
        fn t(
            theme: Theme,
            headline: &str,
            description: &str,
            source: &str,
            (inflation, unemployment, gdp_growth): (f64, f64, f64),
            advisor: &str,
        ) -> EventTemplate {
            EventTemplate {
                theme,
                headline: headline.to_string(),
                description: description.to_string(),
                source: source.to_string(),
                impact_modifiers: ImpactModifiers {
                    inflation,
                    unemployment,
                    gdp_growth,
                },
                advisor_comment: Some(advisor.to_string()),
            }
        }
        Self {
            events: vec![
                t(
                    Theme::Inflationary,
                    "Oil Prices Spike on Supply Cuts",
                    "Major producers announce surprise output cuts. Energy costs ripple through \
                     transport and manufacturing.",
                    "Global Markets Daily",
                    (1.2, 0.1, -0.5),
                    "Supply shocks are hard to fight with rates alone, Chair.",
                ),
                t(
                    Theme::Inflationary,
                    "Wage Spiral Fears Grow",
                    "Union settlements come in well above expectations. Businesses signal they \
                     will pass costs on to consumers.",
                    "The Financial Ledger",
                    (0.8, -0.2, 0.3),
                    "Expectations are drifting. Credibility matters now.",
                ),
                t(
                    Theme::Inflationary,
                    "Shipping Bottlenecks Return",
                    "Port congestion and container shortages delay imports. Retailers warn of \
                     higher shelf prices.",
                    "Harbor & Trade Weekly",
                    (0.6, 0.0, -0.3),
                    "This should be transitory, but watch core prices.",
                ),
                t(
                    Theme::LaborMarket,
                    "Major Retailer Files for Bankruptcy",
                    "A national chain closes hundreds of stores. Tens of thousands of jobs are at \
                     risk.",
                    "Main Street Journal",
                    (-0.1, 0.9, -0.6),
                    "Layoffs could snowball if credit tightens further.",
                ),
                t(
                    Theme::LaborMarket,
                    "Manufacturing Orders Slump",
                    "Factory orders fall for a third straight month. Purchasing managers report \
                     shrinking backlogs.",
                    "Industrial Review",
                    (-0.3, 0.6, -0.8),
                    "The recession indicators are flashing amber.",
                ),
                t(
                    Theme::General,
                    "Breakthrough in Battery Technology",
                    "A new cell chemistry promises cheaper storage. Investors pour money into \
                     grid and vehicle projects.",
                    "Tech & Capital",
                    (-0.2, -0.3, 1.0),
                    "A productivity boom is the best kind of growth.",
                ),
                t(
                    Theme::General,
                    "Hurricane Disrupts Gulf Coast",
                    "Refineries and ports along the coast shut down ahead of landfall. Rebuilding \
                     will take months.",
                    "National Weather Desk",
                    (0.5, 0.3, -0.7),
                    "Temporary, but it will muddy the next few prints.",
                ),
                t(
                    Theme::General,
                    "Trade Agreement Signed",
                    "A broad tariff reduction deal clears its final vote. Exporters expect a lift \
                     in orders.",
                    "Global Markets Daily",
                    (-0.3, -0.2, 0.6),
                    "Cheaper imports help us on prices. Good news, Chair.",
                ),
            ],
        }
    }
}

/// Event source drawing from an [`EventTable`].
pub struct TableSource {
    table: EventTable,
    rng: Mutex<ChaCha8Rng>,
    issued: AtomicU64,
}

impl TableSource {
    /// `seed` fixes the draw sequence; `None` seeds from OS entropy.
    pub fn new(table: EventTable, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            table,
            rng: Mutex::new(rng),
            issued: AtomicU64::new(0),
        }
    }

    pub fn builtin(seed: Option<u64>) -> Self {
        Self::new(EventTable::builtin(), seed)
    }

    pub fn table(&self) -> &EventTable {
        &self.table
    }

    /// Themes that fit the requested economy, most pressing first.
    fn preferred_theme(request: &EventRequest) -> Option<Theme> {
        if request.indicators.inflation > HOT_INFLATION {
            Some(Theme::Inflationary)
        } else if request.indicators.unemployment > HIGH_UNEMPLOYMENT {
            Some(Theme::LaborMarket)
        } else {
            None
        }
    }

    fn pick(&self, request: &EventRequest) -> Result<Event, EventSourceError> {
        let templates = self.table.templates();
        let candidates: Vec<&EventTemplate> = match Self::preferred_theme(request) {
            Some(theme) => templates.iter().filter(|t| t.theme == theme).collect(),
            None => Vec::new(),
        };
        let pool: Vec<&EventTemplate> = if candidates.is_empty() {
            templates.iter().collect()
        } else {
            candidates
        };
        if pool.is_empty() {
            return Err(EventSourceError::EmptyTable);
        }
        let idx = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..pool.len());
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{}-Q{}-{}", request.year, request.quarter, n);
        debug!(%id, headline = %pool[idx].headline, "drew table event");
        Ok(pool[idx].instantiate(id))
    }
}

impl EventSource for TableSource {
    fn generate(
        &self,
        request: EventRequest,
    ) -> impl Future<Output = Result<Event, EventSourceError>> + Send {
        std::future::ready(self.pick(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedsim_core::IndicatorSet;
    use proptest::prelude::*;

    fn request(inflation: f64, unemployment: f64) -> EventRequest {
        EventRequest {
            indicators: IndicatorSet {
                inflation,
                unemployment,
                ..IndicatorSet::INITIAL
            },
            year: 2025,
            quarter: 3,
        }
    }

    fn theme_of(source: &TableSource, event: &Event) -> Theme {
        source
            .table
            .templates()
            .iter()
            .find(|t| t.headline == event.headline)
            .map(|t| t.theme)
            .unwrap()
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = EventTable::builtin();
        EventTable::new(table.templates().to_vec()).unwrap();
    }

    #[tokio::test]
    async fn hot_inflation_draws_inflationary_events() {
        let src = TableSource::builtin(Some(3));
        for _ in 0..20 {
            let e = src.generate(request(7.5, 4.0)).await.unwrap();
            assert_eq!(theme_of(&src, &e), Theme::Inflationary);
        }
    }

    #[tokio::test]
    async fn high_unemployment_draws_labor_events() {
        let src = TableSource::builtin(Some(3));
        for _ in 0..20 {
            let e = src.generate(request(2.0, 9.0)).await.unwrap();
            assert_eq!(theme_of(&src, &e), Theme::LaborMarket);
        }
    }

    #[tokio::test]
    async fn ids_carry_calendar_and_counter() {
        let src = TableSource::builtin(Some(9));
        let a = src.generate(request(2.0, 4.0)).await.unwrap();
        let b = src.generate(request(2.0, 4.0)).await.unwrap();
        assert_eq!(a.id, "2025-Q3-1");
        assert_eq!(b.id, "2025-Q3-2");
        assert_eq!(a.duration_ticks, PROPOSED_DURATION);
    }

    #[tokio::test]
    async fn missing_theme_falls_back_to_whole_table() {
        let table = EventTable::from_yaml_str(
            r#"
events:
  - headline: Quiet Quarter
    description: Nothing much happens.
    source: Wire
    impact_modifiers: { inflation: 0.0, unemployment: 0.0, gdp_growth: 0.1 }
"#,
        )
        .unwrap();
        let src = TableSource::new(table, Some(1));
        let e = src.generate(request(9.0, 9.0)).await.unwrap();
        assert_eq!(e.headline, "Quiet Quarter");
        assert!(e.advisor_comment.is_none());
    }

    #[test]
    fn yaml_rejects_bad_tables() {
        assert!(matches!(
            EventTable::from_yaml_str("events: []"),
            Err(TableError::Empty)
        ));
        let bad = r#"
events:
  - headline: ""
    description: x
    source: y
    impact_modifiers: { inflation: 0.0, unemployment: 0.0, gdp_growth: 0.0 }
"#;
        assert!(matches!(
            EventTable::from_yaml_str(bad),
            Err(TableError::Invalid { index: 0, .. })
        ));
        assert!(matches!(
            EventTable::from_yaml_str("events: 3"),
            Err(TableError::Yaml(_))
        ));
    }

    proptest! {
        #[test]
        fn draws_are_valid_and_numbered(seed in any::<u64>(),
                                        inflation in -10.0f64..30.0,
                                        unemployment in 0.0f64..30.0,
                                        year in 2000i32..2100,
                                        quarter in 1u32..=4,
                                        draws in 1u64..20) {
            let source = TableSource::builtin(Some(seed));
            let req = EventRequest {
                indicators: IndicatorSet { inflation, unemployment, ..IndicatorSet::INITIAL },
                year,
                quarter,
            };
            for n in 1..=draws {
                let event = source.pick(&req).unwrap();
                prop_assert!(validate_event(&event).is_ok());
                prop_assert_eq!(event.duration_ticks, PROPOSED_DURATION);
                prop_assert_eq!(event.id, format!("{year}-Q{quarter}-{n}"));
            }
        }
    }
}
