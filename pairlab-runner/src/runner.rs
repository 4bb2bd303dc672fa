//! Backtest runner — wires together loading, the engine, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: resolves the configured price source, then runs. Used by CLI.
//! - `run_backtest_on_bars()`: takes pre-loaded bars. Used by the parameter sweep.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use pairlab_core::domain::{PairBar, PositionState};
use pairlab_core::engine::{
    run_simulation, ConfigError, SimulationConfig, SimulationError, SimulationParams,
    SimulationResult,
};
use pairlab_core::fingerprint::RunFingerprint;
use pairlab_core::synthetic::generate_pair;

use crate::config::{BacktestConfig, ConfigFileError, PriceSource};
use crate::data_loader::{load_pair, LoadError};
use crate::metrics::PerformanceMetrics;
use crate::stooq::{StooqDownloader, StooqError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    ConfigFile(#[from] ConfigFileError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("download error: {0}")]
    Download(#[from] StooqError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Pair labels and the span of the bars a run covered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub label_a: String,
    pub label_b: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub synthetic: bool,
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub info: RunInfo,
    pub params: SimulationParams,
    pub fingerprint: RunFingerprint,
    pub metrics: PerformanceMetrics,
    pub simulation: SimulationResult,
}

/// The `metrics.json` payload: everything except the per-bar series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub info: RunInfo,
    pub params: SimulationParams,
    pub fingerprint: RunFingerprint,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub signal_bars: usize,
    pub final_position: PositionState,
    pub metrics: PerformanceMetrics,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            schema_version: SCHEMA_VERSION,
            info: self.info.clone(),
            params: self.params,
            fingerprint: self.fingerprint.clone(),
            bar_count: self.simulation.bar_count,
            warmup_bars: self.simulation.warmup_bars,
            signal_bars: self.simulation.signal_bars(),
            final_position: self.simulation.final_position,
            metrics: self.metrics.clone(),
        }
    }
}

/// Resolve the configured price source into aligned bars.
pub fn load_bars(config: &BacktestConfig) -> Result<Vec<PairBar>, RunError> {
    match config.price_source()? {
        PriceSource::Csv { a, b } => Ok(load_pair(&a, &b, &config.load_options())?.bars),
        PriceSource::Stooq {
            ticker_a,
            ticker_b,
            cache_dir,
            force,
        } => {
            let downloader = StooqDownloader::new()?;
            let a = downloader.fetch_to_cache(&ticker_a, &cache_dir, force)?;
            let b = downloader.fetch_to_cache(&ticker_b, &cache_dir, force)?;
            debug!(a = %a.display(), b = %b.display(), "loading cached stooq files");
            Ok(load_pair(&a, &b, &config.load_options())?.bars)
        }
        PriceSource::Synthetic(source) => {
            let opts = config.load_options();
            let bars = generate_pair(source.bars, source.seed, &source.params, source.start)
                .into_iter()
                .filter(|bar| opts.contains(bar.date))
                .collect();
            Ok(bars)
        }
    }
}

/// Run a single backtest from a `BacktestConfig`.
///
/// Parameters are validated before any data is read.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    let sim_config = config.simulation_config()?;
    let bars = load_bars(config)?;
    let info = RunInfo {
        label_a: config.pair.label_a.clone(),
        label_b: config.pair.label_b.clone(),
        start_date: None,
        end_date: None,
        synthetic: config.pair.synthetic.is_some(),
    };
    let result = run_backtest_on_bars(&bars, &sim_config, info)?;

    info!(
        pair = %format!("{}/{}", result.info.label_a, result.info.label_b),
        fingerprint = result.fingerprint.short(),
        total_return = result.metrics.total_return,
        sharpe = result.metrics.sharpe,
        max_drawdown = result.metrics.max_drawdown,
        trades = result.metrics.trade_count,
        "backtest complete"
    );
    Ok(result)
}

/// Run a backtest on pre-loaded bars — no I/O.
pub fn run_backtest_on_bars(
    bars: &[PairBar],
    config: &SimulationConfig,
    mut info: RunInfo,
) -> Result<BacktestResult, RunError> {
    let simulation = run_simulation(bars, config)?;
    let metrics = PerformanceMetrics::compute(
        &simulation.equity_curve,
        &simulation.trades,
        config.annualization_factor(),
    );
    let fingerprint = RunFingerprint::compute(config.params(), bars);

    info.start_date = bars.first().map(|b| b.date.to_string());
    info.end_date = bars.last().map(|b| b.date.to_string());

    debug!(
        lookback = config.lookback(),
        entry_z = config.thresholds().entry_z,
        exit_z = config.thresholds().exit_z,
        sharpe = metrics.sharpe,
        "run finished"
    );

    Ok(BacktestResult {
        info,
        params: *config.params(),
        fingerprint,
        metrics,
        simulation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_run_end_to_end() {
        let mut config = BacktestConfig::synthetic(42, 400);
        config.strategy.lookback = 30;
        let result = run_backtest(&config).unwrap();

        assert_eq!(result.simulation.equity_curve.len(), 400);
        assert_eq!(result.simulation.warmup_bars, 29);
        assert!(result.info.synthetic);
        assert_eq!(result.metrics.final_equity, result.simulation.final_equity());
        assert_eq!(result.metrics.trade_count, result.simulation.trades.len());
    }

    #[test]
    fn invalid_parameters_fail_before_loading() {
        let mut config = BacktestConfig::csv("missing_a.csv".into(), "missing_b.csv".into());
        config.strategy.lookback = 0;
        let err = run_backtest(&config).unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let config = BacktestConfig::csv("missing_a.csv".into(), "missing_b.csv".into());
        let err = run_backtest(&config).unwrap_err();
        assert!(matches!(err, RunError::Data(LoadError::Io { .. })));
    }

    #[test]
    fn date_window_applies_to_synthetic_bars() {
        let mut config = BacktestConfig::synthetic(1, 300);
        config.backtest.start = chrono::NaiveDate::from_ymd_opt(2015, 3, 1);
        let bars = load_bars(&config).unwrap();
        assert!(!bars.is_empty());
        assert!(bars.len() < 300);
        assert!(bars[0].date >= chrono::NaiveDate::from_ymd_opt(2015, 3, 1).unwrap());
    }

    #[test]
    fn repeated_runs_share_fingerprint_and_metrics() {
        let config = BacktestConfig::synthetic(9, 300);
        let a = run_backtest(&config).unwrap();
        let b = run_backtest(&config).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.metrics.final_equity.to_bits(), b.metrics.final_equity.to_bits());
        assert_eq!(a.metrics.sharpe.to_bits(), b.metrics.sharpe.to_bits());
    }

    #[test]
    fn summary_carries_schema_version() {
        let result = run_backtest(&BacktestConfig::synthetic(3, 100)).unwrap();
        let summary = result.summary();
        assert_eq!(summary.schema_version, SCHEMA_VERSION);
        assert_eq!(summary.bar_count, 100);
        assert_eq!(summary.info.start_date, result.info.start_date);
    }
}
