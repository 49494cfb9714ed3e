#![deny(warnings)]

//! Indicator dynamics for the Fed simulator.
//!
//! [`advance`] integrates one monthly tick:
//! - policy pressure from the funds rate (relative to neutral) and from open
//!   market operations
//! - shock pressure from the active news event, if any
//! - uniform noise drawn from an injected RNG
//! - soft floors on inflation and unemployment, then smoothed approval
//!
//! The noise term is the only source of non-determinism. Passing a seeded RNG,
//! or a zero noise amplitude, makes a step repeatable.

use fedsim_core::{
    ImpactModifiers, IndicatorSet, ToolSettings, TARGET_INFLATION, TARGET_UNEMPLOYMENT,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Funds rate at which policy neither heats nor cools the economy (r*).
pub const NEUTRAL_RATE: f64 = 3.5;
/// Default width of the per-tick uniform noise.
pub const NOISE: f64 = 0.02;
/// Event modifiers are authored as totals; each tick applies this fraction.
pub const EVENT_SPREAD: f64 = 10.0;

const INFLATION_FLOOR: f64 = 0.5;
const UNEMPLOYMENT_FLOOR: f64 = 2.0;
const FLOOR_NUDGE: f64 = 0.1;
const APPROVAL_SMOOTHING: f64 = 0.1;

/// Per-unit response of one indicator to the two pressures.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    /// Change per tick per point of funds rate above neutral.
    pub rate: f64,
    /// Change per tick per unit of open market operations.
    pub omo: f64,
}

/// Coefficients of the dynamics model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicsParams {
    pub neutral_rate: f64,
    pub inflation: Sensitivity,
    pub unemployment: Sensitivity,
    pub gdp_growth: Sensitivity,
    /// Noise width; each derivative gets `(u - 0.5) * noise`, u in [0, 1).
    pub noise: f64,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            neutral_rate: NEUTRAL_RATE,
            // Higher rates cool inflation and growth and raise unemployment.
            inflation: Sensitivity {
                rate: -0.05,
                omo: 0.001,
            },
            unemployment: Sensitivity {
                rate: 0.03,
                omo: -0.0005,
            },
            gdp_growth: Sensitivity {
                rate: -0.04,
                omo: 0.002,
            },
            noise: NOISE,
        }
    }
}

impl DynamicsParams {
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }
}

/// Per-tick change of the three driven indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Derivatives {
    pub inflation: f64,
    pub unemployment: f64,
    pub gdp_growth: f64,
}

/// Deterministic part of the derivative: policy pressure plus event pressure.
pub fn pressure(
    tools: &ToolSettings,
    impact: Option<&ImpactModifiers>,
    params: &DynamicsParams,
) -> Derivatives {
    let rate_pressure = tools.fed_funds_rate - params.neutral_rate;
    let omo_pressure = tools.open_market_operations;
    let mut d = Derivatives {
        inflation: rate_pressure * params.inflation.rate + omo_pressure * params.inflation.omo,
        unemployment: rate_pressure * params.unemployment.rate
            + omo_pressure * params.unemployment.omo,
        gdp_growth: rate_pressure * params.gdp_growth.rate + omo_pressure * params.gdp_growth.omo,
    };
    if let Some(m) = impact {
        d.inflation += m.inflation / EVENT_SPREAD;
        d.unemployment += m.unemployment / EVENT_SPREAD;
        d.gdp_growth += m.gdp_growth / EVENT_SPREAD;
    }
    d
}

fn noise<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    if width == 0.0 {
        return 0.0;
    }
    (rng.gen::<f64>() - 0.5) * width
}

/// Approval the public would settle at for the given economy.
pub fn target_approval(inflation: f64, unemployment: f64, gdp_growth: f64) -> f64 {
    100.0
        - (inflation - TARGET_INFLATION).abs() * 10.0
        - (unemployment - TARGET_UNEMPLOYMENT).abs() * 10.0
        + gdp_growth * 2.0
}

/// Integrate one tick of the economy.
///
/// `impact` is the active event's modifiers, if an event is active this tick.
pub fn advance<R: Rng + ?Sized>(
    indicators: &IndicatorSet,
    tools: &ToolSettings,
    impact: Option<&ImpactModifiers>,
    params: &DynamicsParams,
    rng: &mut R,
) -> IndicatorSet {
    let mut d = pressure(tools, impact, params);
    d.inflation += noise(rng, params.noise);
    d.unemployment += noise(rng, params.noise);
    d.gdp_growth += noise(rng, params.noise);

    let mut inflation = indicators.inflation + d.inflation;
    let mut unemployment = indicators.unemployment + d.unemployment;
    let gdp_growth = indicators.gdp_growth + d.gdp_growth;

    // Damped floors: a nudge back up, not a clamp.
    if inflation < INFLATION_FLOOR {
        inflation += FLOOR_NUDGE;
    }
    if unemployment < UNEMPLOYMENT_FLOOR {
        unemployment += FLOOR_NUDGE;
    }

    let target = target_approval(inflation, unemployment, gdp_growth);
    let approval = indicators.public_approval
        + (target - indicators.public_approval) * APPROVAL_SMOOTHING;

    let next = IndicatorSet {
        inflation,
        unemployment,
        gdp_growth,
        public_approval: approval.clamp(0.0, 100.0),
    };
    trace!(?d, ?next, "dynamics step");
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn quiet() -> DynamicsParams {
        DynamicsParams::default().with_noise(0.0)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn opening_tick_is_deterministic_without_noise() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let next = advance(
            &IndicatorSet::INITIAL,
            &ToolSettings::INITIAL,
            None,
            &quiet(),
            &mut rng,
        );
        // rate pressure 5.25 - 3.5 = 1.75
        assert!(close(next.inflation, 3.3125));
        assert!(close(next.unemployment, 4.1525));
        assert!(close(next.gdp_growth, 2.03));
        // target 100 - 13.125 - 1.525 + 4.06 = 89.41
        assert!(close(next.public_approval, 62.941));
    }

    #[test]
    fn event_pressure_is_a_tenth_per_tick() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tools = ToolSettings {
            fed_funds_rate: NEUTRAL_RATE,
            ..ToolSettings::INITIAL
        };
        let impact = ImpactModifiers {
            inflation: 1.0,
            unemployment: -0.5,
            gdp_growth: 2.0,
        };
        let next = advance(
            &IndicatorSet::INITIAL,
            &tools,
            Some(&impact),
            &quiet(),
            &mut rng,
        );
        assert!(close(next.inflation, 3.5));
        assert!(close(next.unemployment, 4.05));
        assert!(close(next.gdp_growth, 2.3));
    }

    #[test]
    fn soft_floors_nudge_back_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tools = ToolSettings {
            fed_funds_rate: NEUTRAL_RATE,
            ..ToolSettings::INITIAL
        };
        let low = IndicatorSet {
            inflation: 0.45,
            unemployment: 1.5,
            ..IndicatorSet::INITIAL
        };
        let next = advance(&low, &tools, None, &quiet(), &mut rng);
        assert!(close(next.inflation, 0.55));
        assert!(close(next.unemployment, 1.6));
    }

    #[test]
    fn approval_clamps_at_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let awful = IndicatorSet {
            inflation: 19.0,
            unemployment: 19.0,
            gdp_growth: -10.0,
            public_approval: 0.5,
        };
        let next = advance(&awful, &ToolSettings::INITIAL, None, &quiet(), &mut rng);
        assert_eq!(next.public_approval, 0.0);
    }

    #[test]
    fn noise_is_seeded_and_bounded() {
        let params = DynamicsParams::default();
        let tools = ToolSettings {
            fed_funds_rate: NEUTRAL_RATE,
            ..ToolSettings::INITIAL
        };
        let a = advance(
            &IndicatorSet::INITIAL,
            &tools,
            None,
            &params,
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        let b = advance(
            &IndicatorSet::INITIAL,
            &tools,
            None,
            &params,
            &mut ChaCha8Rng::seed_from_u64(42),
        );
        assert_eq!(a, b);
        assert!((a.inflation - IndicatorSet::INITIAL.inflation).abs() <= NOISE / 2.0);
        assert!((a.gdp_growth - IndicatorSet::INITIAL.gdp_growth).abs() <= NOISE / 2.0);
    }

    proptest! {
        #[test]
        fn tight_policy_cools_inflation(rate in 3.75f64..=12.0,
                                        inflation in 1.0f64..15.0,
                                        unemployment in 2.0f64..15.0) {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let start = IndicatorSet { inflation, unemployment, ..IndicatorSet::INITIAL };
            let tools = ToolSettings { fed_funds_rate: rate, ..ToolSettings::INITIAL };
            let next = advance(&start, &tools, None, &quiet(), &mut rng);
            prop_assert!(next.inflation < start.inflation);
            prop_assert!(next.unemployment > start.unemployment);
            prop_assert!(next.gdp_growth < start.gdp_growth);
        }

        #[test]
        fn approval_stays_in_bounds(seed in any::<u64>(),
                                    rates in proptest::collection::vec(0.0f64..=12.0, 1..60),
                                    omo in -100.0f64..=100.0,
                                    shock in -5.0f64..5.0) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let params = DynamicsParams::default();
            let impact = ImpactModifiers { inflation: shock, unemployment: -shock, gdp_growth: shock };
            let mut ind = IndicatorSet::INITIAL;
            for (i, rate) in rates.iter().enumerate() {
                let tools = ToolSettings { fed_funds_rate: *rate, reserve_requirement: 10.0, open_market_operations: omo };
                let active = if i % 2 == 0 { Some(&impact) } else { None };
                ind = advance(&ind, &tools, active, &params, &mut rng);
                prop_assert!((0.0..=100.0).contains(&ind.public_approval));
            }
        }
    }
}
