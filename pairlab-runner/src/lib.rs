//! PairLab Runner — backtest orchestration on top of `pairlab-core`.
//!
//! This crate provides:
//! - Config files (TOML) and price-source resolution
//! - Stooq daily CSV download into a local cache
//! - CSV loading and date alignment of the two legs
//! - Single-backtest runner with fingerprinting and metrics
//! - Artifact export (equity/fills/trades CSV, metrics JSON)
//! - Parallel parameter sweeps with deterministic ranking

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod stooq;
pub mod sweep;

pub use config::{BacktestConfig, ConfigFileError, PriceSource};
pub use data_loader::{load_pair, LoadError, LoadOptions, LoadedPair};
pub use export::{export_sweep_csv, save_artifacts};
pub use metrics::PerformanceMetrics;
pub use runner::{
    load_bars, run_backtest, run_backtest_on_bars, BacktestResult, RunError, RunInfo, RunSummary,
};
pub use stooq::{StooqDownloader, StooqError};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepResults};
