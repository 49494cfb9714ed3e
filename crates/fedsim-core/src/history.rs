//! Append-only history of per-tick snapshots, consumed for charting.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{IndicatorKind, IndicatorSet, ToolSettings};

/// Changes smaller than this are reported as flat.
const TREND_DEAD_BAND: f64 = 0.01;

/// Snapshot of indicators and tools at the end of a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Logical timestamp: tick index at commit.
    pub tick: u64,
    /// Simulated month of the snapshot.
    pub date: NaiveDate,
    /// Quarter label on quarter-start ticks, empty otherwise.
    pub label: String,
    pub indicators: IndicatorSet,
    pub tools: ToolSettings,
}

/// Ordered history. Unbounded unless a capacity is set, in which case the
/// oldest records are evicted first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
    capacity: Option<usize>,
}

impl HistoryLog {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            records: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
        if let Some(cap) = self.capacity {
            if self.records.len() > cap {
                let excess = self.records.len() - cap;
                self.records.drain(..excess);
                trace!(excess, cap, "evicted oldest history records");
            }
        }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// The last `n` records, oldest first (the chart shows 10).
    pub fn window(&self, n: usize) -> &[HistoryRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Movement of one indicator between the last two records.
    ///
    /// With fewer than two records the change is zero and the assessment is
    /// neutral.
    pub fn trend(&self, kind: IndicatorKind) -> Trend {
        let n = self.records.len();
        let Some(latest) = self.records.last() else {
            return Trend::flat();
        };
        let value = latest.indicators.get(kind);
        let prev = if n > 1 {
            self.records[n - 2].indicators.get(kind)
        } else {
            value
        };
        Trend::between(kind, prev, value)
    }
}

/// Whether a move is good news for the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Improving,
    Worsening,
    Neutral,
}

/// Change of an indicator since the previous record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub change: f64,
    pub assessment: Assessment,
}

impl Trend {
    fn flat() -> Self {
        Self {
            change: 0.0,
            assessment: Assessment::Neutral,
        }
    }

    /// Targeted indicators improve when they close on the target; approval
    /// improves when it rises past the dead band.
    pub fn between(kind: IndicatorKind, prev: f64, value: f64) -> Self {
        let change = value - prev;
        let assessment = match kind.target() {
            Some(target) => {
                let dist = (value - target).abs();
                let prev_dist = (prev - target).abs();
                if dist < prev_dist {
                    Assessment::Improving
                } else if dist > prev_dist {
                    Assessment::Worsening
                } else {
                    Assessment::Neutral
                }
            }
            None if change > TREND_DEAD_BAND => Assessment::Improving,
            None if change < -TREND_DEAD_BAND => Assessment::Worsening,
            None => Assessment::Neutral,
        };
        Self { change, assessment }
    }

    /// Direction arrow: +1 up, -1 down, 0 flat within the dead band.
    pub fn direction(&self) -> i8 {
        if self.change > TREND_DEAD_BAND {
            1
        } else if self.change < -TREND_DEAD_BAND {
            -1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::default_start_date;

    fn record(tick: u64, inflation: f64, approval: f64) -> HistoryRecord {
        HistoryRecord {
            tick,
            date: default_start_date(),
            label: String::new(),
            indicators: IndicatorSet {
                inflation,
                public_approval: approval,
                ..IndicatorSet::INITIAL
            },
            tools: ToolSettings::INITIAL,
        }
    }

    #[test]
    fn window_returns_tail() {
        let mut log = HistoryLog::new(None);
        for t in 0..25 {
            log.push(record(t, 3.0, 60.0));
        }
        let w = log.window(10);
        assert_eq!(w.len(), 10);
        assert_eq!(w[0].tick, 15);
        assert_eq!(w[9].tick, 24);
        assert_eq!(log.window(100).len(), 25);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut log = HistoryLog::new(Some(3));
        for t in 0..5 {
            log.push(record(t, 3.0, 60.0));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.records()[0].tick, 2);
        assert_eq!(log.latest().map(|r| r.tick), Some(4));
    }

    #[test]
    fn trend_toward_target_is_improving() {
        let mut log = HistoryLog::new(None);
        log.push(record(0, 3.4, 60.0));
        log.push(record(1, 3.1, 59.0));
        let t = log.trend(IndicatorKind::Inflation);
        assert!((t.change + 0.3).abs() < 1e-9);
        assert_eq!(t.assessment, Assessment::Improving);
        assert_eq!(t.direction(), -1);

        let a = log.trend(IndicatorKind::PublicApproval);
        assert_eq!(a.assessment, Assessment::Worsening);
    }

    #[test]
    fn overshooting_target_is_worsening() {
        let t = Trend::between(IndicatorKind::Inflation, 2.1, 1.5);
        assert_eq!(t.assessment, Assessment::Worsening);
    }

    #[test]
    fn single_record_trend_is_neutral() {
        let mut log = HistoryLog::new(None);
        assert_eq!(log.trend(IndicatorKind::GdpGrowth).assessment, Assessment::Neutral);
        log.push(record(0, 3.4, 60.0));
        let t = log.trend(IndicatorKind::Inflation);
        assert_eq!(t.change, 0.0);
        assert_eq!(t.assessment, Assessment::Neutral);
    }
}
