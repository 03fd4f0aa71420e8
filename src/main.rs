// =============================================================================
// Exit Engine - batch driver
// =============================================================================
//
// Reads a JSON array of profiled tracked trades, evaluates each one through
// the exit engine in a single fresh backtest run, and prints the outcomes
// plus a run summary as JSON on stdout. Logs go to stderr.
//
// Usage:
//   exit-engine [trades.json]
//
// Environment:
//   EXIT_ENGINE_TRADES    trades file when no argument is given
//   EXIT_ENGINE_SETTINGS  settings file (default: exit_engine.json; a missing
//                         file means defaults, a malformed one is fatal)
//   RUST_LOG              log filter (default: info)
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use options_exit_engine::backtest::{BacktestRun, ProfiledTrade, RunSummary, TradeOutcome};
use options_exit_engine::runtime_config::EngineSettings;

const DEFAULT_SETTINGS_PATH: &str = "exit_engine.json";

#[derive(Serialize)]
struct Report {
    summary: RunSummary,
    outcomes: Vec<TradeOutcome>,
}

fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path =
        std::env::var("EXIT_ENGINE_SETTINGS").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.into());
    let settings = EngineSettings::load(&settings_path)?;

    let trades_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EXIT_ENGINE_TRADES").ok())
        .context("no trades file given (argument or EXIT_ENGINE_TRADES)")?;

    // ── 2. Build engine (fails fast on bad profiles) ─────────────────────
    let engine = settings.build_engine()?;
    info!(
        profiles = ?engine.registry().profile_ids(),
        follow_remainder = settings.follow_remainder,
        "Exit engine ready"
    );

    // ── 3. Load trades ───────────────────────────────────────────────────
    let content = std::fs::read_to_string(&trades_path)
        .with_context(|| format!("failed to read trades from {trades_path}"))?;
    let trades: Vec<ProfiledTrade> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse trades from {trades_path}"))?;
    info!(count = trades.len(), path = %trades_path, "Trades loaded");

    // ── 4. One run, one fresh tracker ────────────────────────────────────
    let mut run = BacktestRun::new(&engine, settings.follow_remainder);
    run.evaluate_all(&trades);

    let report = Report {
        summary: run.summary(),
        outcomes: run.into_outcomes(),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialise report")?
    );
    Ok(())
}
