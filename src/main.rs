// =============================================================================
// vwap-signal — Main Entry Point
// =============================================================================
//
// Runs every configured (frequency, instrument) pair over the trading days of
// the configured range and prints one probability table per pair.  Days are
// processed on the blocking pool and merged deterministically afterwards.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vwap_signal::analysis::analyse;
use vwap_signal::market_data::{JsonDirTickSource, TickSource, TradingCalendar, WeekdayCalendar};
use vwap_signal::multi_day::MultiDayAggregator;
use vwap_signal::runtime_config::AnalysisConfig;
use vwap_signal::session::{ProductCatalog, SessionCalendar};

const DEFAULT_CONFIG_PATH: &str = "signal_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("SIGNAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = AnalysisConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AnalysisConfig::default()
    });

    if let Ok(raw) = std::env::var("SIGNAL_INSTRUMENTS") {
        config.override_instruments(&raw);
    }
    config.validate().context("invalid analysis config")?;

    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        instruments = ?config.instruments,
        frequencies_secs = ?config.frequencies_secs,
        start = %config.start_date,
        end = %config.end_date,
        lookback = config.lookback,
        shift_lag = config.shift_lag,
        reset_at_day_boundary = config.reset_at_day_boundary,
        "Analysis run starting"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let catalog =
        ProductCatalog::builtin().with_multiplier_overrides(&config.multiplier_overrides);
    let calendar = Arc::new(SessionCalendar::new(Arc::new(catalog)));
    let source: Arc<dyn TickSource> = Arc::new(JsonDirTickSource::new(&config.tick_dir));

    let dates = WeekdayCalendar::new(config.holidays.iter().copied())
        .trading_days(config.start_date, config.end_date)
        .context("failed to resolve trading days")?;
    info!(days = dates.len(), tick_dir = %config.tick_dir.display(), "Trading days resolved");

    // ── 3. Per-frequency, per-instrument runs ────────────────────────────
    let params = config.analysis_params();
    for frequency in config.frequencies() {
        let aggregator = Arc::new(MultiDayAggregator::new(
            calendar.clone(),
            source.clone(),
            config.pipeline_config(frequency),
        ));

        for instrument in &config.instruments {
            let outcome = aggregator.run_concurrent(instrument, &dates).await;

            for failure in &outcome.failures {
                if failure.error.is_data_gap() {
                    debug!(%run_id, %failure, "Day skipped");
                } else {
                    warn!(%run_id, %failure, "Day failed");
                }
            }

            let frequency = aggregator.config().frequency;
            match analyse(run_id, instrument, outcome, frequency, &params) {
                Ok(report) => {
                    info!(
                        %run_id,
                        instrument_id = %instrument,
                        frequency_secs = frequency.num_seconds(),
                        days_processed = report.days_processed,
                        days_failed = report.failures.len(),
                        rows = report.series.len(),
                        "Analysis complete"
                    );
                    println!("{}", report.table);
                }
                Err(e) => {
                    error!(
                        %run_id,
                        instrument_id = %instrument,
                        frequency_secs = frequency.num_seconds(),
                        error = %e,
                        "Analysis failed"
                    );
                }
            }
        }
    }

    info!(%run_id, "Analysis run finished");
    Ok(())
}
