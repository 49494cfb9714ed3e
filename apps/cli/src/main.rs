#![deny(warnings)]

//! Headless runner for the Fed simulator.
//!
//! Plays a scripted policy for a number of simulated months, resuming at each
//! quarter pause the way a player would, and prints a summary. With
//! `--realtime` the run is paced by the tick clock instead of firing ticks
//! back to back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use fedsim_core::{
    validate_config, IndicatorKind, IndicatorSet, Phase, ReelectionOutcome, SimConfig,
    ToolSettings, Trend,
};
use fedsim_events::{EventSource, EventTable, TableSource, WithFallback};
use fedsim_runtime::{GameHandle, Simulation, TickReport};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FEDSIM_GIT_SHA"),
    " ",
    env!("FEDSIM_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "fedsim")]
#[command(about = "Run the Fed chair simulation without a UI")]
#[command(version, long_version = LONG_VERSION)]
struct Args {
    /// Simulation config (YAML). Missing keys use defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Event table (YAML) replacing the built-in news events
    #[arg(long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// Simulated months to run
    #[arg(long, default_value_t = 48)]
    months: i32,

    /// RNG seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Federal funds rate (%)
    #[arg(long)]
    rate: Option<f64>,

    /// Reserve requirement (%)
    #[arg(long)]
    reserve: Option<f64>,

    /// Open market operations (billions, negative sells)
    #[arg(long, allow_negative_numbers = true)]
    omo: Option<f64>,

    /// Take the second term when reelection succeeds
    #[arg(long)]
    accept_second_term: bool,

    /// Pace ticks with the real-time clock
    #[arg(long)]
    realtime: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct TrendLine {
    indicator: IndicatorKind,
    #[serde(flatten)]
    trend: Trend,
}

#[derive(Serialize)]
struct Summary {
    months: i32,
    ticks: u64,
    date: NaiveDate,
    phase: Phase,
    term: u8,
    won: bool,
    indicators: IndicatorSet,
    tools: ToolSettings,
    trends: Vec<TrendLine>,
    recent_quarters: Vec<String>,
    ending: Ending,
}

/// Why the run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum Ending {
    /// Reached `--months`; the phase may be a quarter auto-pause.
    MonthLimit,
    /// Reelection succeeded but `--accept-second-term` was not given.
    SecondTermDeclined,
    /// Crash, failed reelection or retirement.
    GameOver,
}

/// What the runner does after looking at the phase.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop(Ending),
}

/// `RUST_LOG`-style directives, defaulting to `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = Some(seed);
    }
    validate_config(&config).context("invalid simulation config")?;
    Ok(config)
}

fn load_table(path: Option<&Path>) -> Result<EventTable> {
    match path {
        Some(path) => {
            EventTable::load(path).with_context(|| format!("loading events {}", path.display()))
        }
        None => Ok(EventTable::builtin()),
    }
}

fn scripted_tools(args: &Args) -> ToolSettings {
    let base = ToolSettings::INITIAL;
    ToolSettings {
        fed_funds_rate: args.rate.unwrap_or(base.fed_funds_rate),
        reserve_requirement: args.reserve.unwrap_or(base.reserve_requirement),
        open_market_operations: args.omo.unwrap_or(base.open_market_operations),
    }
    .snapped()
}

/// Resume at quarter pauses, handle the reelection dialog, stop at the end.
fn settle<S: EventSource>(game: &GameHandle<S>, args: &Args) -> Result<Flow> {
    let state = game.snapshot();
    if state.months_elapsed() >= args.months {
        info!(month = state.months_elapsed(), "month limit reached");
        return Ok(Flow::Stop(Ending::MonthLimit));
    }
    match state.phase {
        Phase::Playing => Ok(Flow::Continue),
        Phase::Paused => {
            game.toggle_play();
            Ok(Flow::Continue)
        }
        Phase::AwaitingReelection(ReelectionOutcome::Success) if args.accept_second_term => {
            game.accept_second_term()
                .context("accepting second term")?;
            Ok(Flow::Continue)
        }
        phase if phase.is_terminal() => {
            info!(?phase, "game over");
            Ok(Flow::Stop(Ending::GameOver))
        }
        phase => {
            info!(?phase, "second term not taken");
            Ok(Flow::Stop(Ending::SecondTermDeclined))
        }
    }
}

async fn run_headless<S: EventSource>(game: &GameHandle<S>, args: &Args) -> Result<Ending> {
    loop {
        if let Flow::Stop(ending) = settle(game, args)? {
            return Ok(ending);
        }
        let fired = game.fire();
        // Wait for the fetch so runs are repeatable for a fixed seed.
        if let Some(fetch) = fired.fetch {
            fetch.await.context("event fetch task")?;
        }
        if let TickReport::Advanced { tick, phase, .. } = fired.report {
            if let Phase::Crashed(cause) = phase {
                warn!(tick, "{}", cause.message());
            }
        }
    }
}

async fn run_realtime<S: EventSource>(game: &GameHandle<S>, args: &Args) -> Result<Ending> {
    let clock = game.start_clock();
    let mut poll = tokio::time::interval(game.tick_period() / 4);
    let ending = loop {
        if let Flow::Stop(ending) = settle(game, args)? {
            break ending;
        }
        poll.tick().await;
    };
    clock.stop();
    Ok(ending)
}

fn summarize<S: EventSource>(game: &GameHandle<S>, ending: Ending) -> Summary {
    let state = game.snapshot();
    let trends = IndicatorKind::ALL
        .iter()
        .map(|&kind| TrendLine {
            indicator: kind,
            trend: state.history.trend(kind),
        })
        .collect();
    let recent_quarters = state
        .history
        .window(10)
        .iter()
        .filter(|r| !r.label.is_empty())
        .map(|r| r.label.clone())
        .collect();
    Summary {
        months: state.months_elapsed(),
        ticks: state.current_tick,
        date: state.current_date,
        phase: state.phase,
        term: state.term_number,
        won: state.game_won(),
        indicators: state.indicators,
        tools: state.tools,
        trends,
        recent_quarters,
        ending,
    }
}

fn print_summary(summary: &Summary) {
    let outcome = match summary.ending {
        Ending::MonthLimit => format!("ended at month {}", summary.months),
        Ending::SecondTermDeclined => "second term declined".to_string(),
        Ending::GameOver if summary.won => "retired with honors".to_string(),
        Ending::GameOver => format!("{:?}", summary.phase),
    };
    println!(
        "{} | month {} | term {} | {}",
        summary.date, summary.months, summary.term, outcome
    );
    println!(
        "Economy | inflation: {:.2}% | unemployment: {:.2}% | GDP: {:.2}% | approval: {:.1}%",
        summary.indicators.inflation,
        summary.indicators.unemployment,
        summary.indicators.gdp_growth,
        summary.indicators.public_approval
    );
    println!(
        "Policy | rate: {:.2}% | reserve: {:.1}% | OMO: {:+.0}B",
        summary.tools.fed_funds_rate,
        summary.tools.reserve_requirement,
        summary.tools.open_market_operations
    );
    for line in &summary.trends {
        println!(
            "Trend | {:?}: {:+.2} ({:?})",
            line.indicator, line.trend.change, line.trend.assessment
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let table = load_table(args.events.as_deref())?;
    info!(
        months = args.months,
        seed = ?config.rng_seed,
        events = table.templates().len(),
        realtime = args.realtime,
        "starting simulation"
    );

    let source = WithFallback::new(
        TableSource::new(table, config.rng_seed),
        Duration::from_millis(config.event_timeout_ms),
    );
    let sim = Simulation::new(config).context("invalid simulation config")?;
    let game = GameHandle::new(sim, source);
    game.set_tools(scripted_tools(&args))
        .context("invalid policy settings")?;

    let ending = if args.realtime {
        run_realtime(&game, &args).await?
    } else {
        run_headless(&game, &args).await?
    };

    let summary = summarize(&game, ending);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn scripted_policy_snaps_to_slider_steps() {
        let args = Args::parse_from(["fedsim", "--rate", "4.1", "--omo", "-12"]);
        let tools = scripted_tools(&args);
        assert_eq!(tools.fed_funds_rate, 4.0);
        assert_eq!(tools.reserve_requirement, 10.0);
        assert_eq!(tools.open_market_operations, -10.0);
    }

    #[test]
    fn defaults_run_one_term() {
        let args = Args::parse_from(["fedsim"]);
        assert_eq!(args.months, 48);
        assert!(!args.accept_second_term);
        let config = load_config(&args).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn demo_files_load() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let config_path = demos.join("fedsim.yaml");
        let args = Args::parse_from([
            OsStr::new("fedsim"),
            OsStr::new("--config"),
            config_path.as_os_str(),
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.rng_seed, Some(2024));
        assert_eq!(config.history_capacity, Some(240));
        let table = load_table(Some(demos.join("events.yaml").as_path())).unwrap();
        assert_eq!(table.templates().len(), 3);
    }

    #[test]
    fn log_filter_follows_directives() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("warn")).to_string(), "warn");
        assert_eq!(
            log_filter(Some("fedsim_runtime=debug")).to_string(),
            "fedsim_runtime=debug"
        );
    }

    fn quiet_game() -> GameHandle<TableSource> {
        let config = SimConfig {
            event_fetch_probability: 0.0,
            ..SimConfig::default().seeded(7)
        };
        GameHandle::new(Simulation::new(config).unwrap(), TableSource::builtin(Some(7)))
    }

    #[test]
    fn month_limit_at_quarter_pause_is_not_reported_as_paused() {
        let game = quiet_game();
        let args = Args::parse_from(["fedsim", "--months", "3"]);
        game.toggle_play();
        while game.snapshot().is_playing() {
            let report = game.fire().report;
            assert!(matches!(report, TickReport::Advanced { .. }));
        }
        assert_eq!(game.snapshot().phase, Phase::Paused);
        assert_eq!(settle(&game, &args).unwrap(), Flow::Stop(Ending::MonthLimit));
        let summary = summarize(&game, Ending::MonthLimit);
        assert_eq!(summary.months, 3);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["ending"], "month_limit");
    }

    #[test]
    fn settle_resumes_quarter_pauses_and_stops_on_game_over() {
        let game = quiet_game();
        let args = Args::parse_from(["fedsim", "--months", "12"]);
        assert_eq!(settle(&game, &args).unwrap(), Flow::Continue);
        assert!(game.snapshot().is_playing());

        game.set_tools(ToolSettings {
            fed_funds_rate: 0.0,
            open_market_operations: 100.0,
            ..ToolSettings::INITIAL
        })
        .unwrap();
        let long_run = Args::parse_from(["fedsim", "--months", "600"]);
        loop {
            match settle(&game, &long_run).unwrap() {
                Flow::Continue => {
                    game.fire();
                }
                Flow::Stop(ending) => {
                    assert_eq!(ending, Ending::GameOver);
                    break;
                }
            }
        }
        assert!(game.snapshot().phase.is_terminal());
    }
}
