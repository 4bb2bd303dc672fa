//! Serializable backtest configuration, read from TOML.
//!
//! ```toml
//! [pair]
//! label_a = "KO"
//! label_b = "PEP"
//! csv_a = "data/ko.csv"
//! csv_b = "data/pep.csv"
//!
//! [strategy]
//! lookback = 60
//! entry_z = 2.0
//! exit_z = 0.5
//! notional_per_leg = 10000.0
//!
//! [backtest]
//! initial_cash = 100000.0
//! annualization_factor = 252
//! start = "2015-01-01"
//! end = "2024-12-31"
//! ```
//!
//! Instead of two CSV files, `ticker_a`/`ticker_b` name Stooq symbols that
//! are downloaded into `cache_dir` (default `data`, reused unless
//! `force_download = true`), or `[pair.synthetic]` (`seed`, `bars`, optional
//! `start` and `[pair.synthetic.params]`) selects the seeded generator.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::engine::{ConfigError, SimulationConfig, SimulationParams};
use pairlab_core::synthetic::SyntheticPairParams;

use crate::data_loader::LoadOptions;

/// Problems reading or interpreting a config file.
///
/// Parameter range checks are `pairlab_core::engine::ConfigError`.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(
        "[pair] needs both `csv_a` and `csv_b`, both `ticker_a` and `ticker_b`, \
         or a `[pair.synthetic]` table"
    )]
    MissingSource,

    #[error("[pair] sets more than one of CSV files, tickers and `[pair.synthetic]`; pick one")]
    AmbiguousSource,

    #[error("[backtest] start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Complete configuration for one backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub pair: PairConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    #[serde(default = "default_label_a")]
    pub label_a: String,
    #[serde(default = "default_label_b")]
    pub label_b: String,
    pub csv_a: Option<PathBuf>,
    pub csv_b: Option<PathBuf>,
    /// Stooq symbols, e.g. `ko.us`.
    pub ticker_a: Option<String>,
    pub ticker_b: Option<String>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub force_download: bool,
    pub synthetic: Option<SyntheticSource>,
}

impl PairConfig {
    fn with_labels(label_a: String, label_b: String) -> Self {
        Self {
            label_a,
            label_b,
            csv_a: None,
            csv_b: None,
            ticker_a: None,
            ticker_b: None,
            cache_dir: default_cache_dir(),
            force_download: false,
            synthetic: None,
        }
    }
}

fn default_label_a() -> String {
    "A".into()
}

fn default_label_b() -> String {
    "B".into()
}

pub fn default_cache_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Seeded synthetic pair in place of CSV files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSource {
    pub seed: u64,
    pub bars: usize,
    #[serde(default = "default_synthetic_start")]
    pub start: NaiveDate,
    #[serde(default)]
    pub params: SyntheticPairParams,
}

pub fn default_synthetic_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default()
}

/// Strategy parameters. Missing keys take the `SimulationParams` defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub lookback: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    pub notional_per_leg: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let p = SimulationParams::default();
        Self {
            lookback: p.lookback,
            entry_z: p.entry_z,
            exit_z: p.exit_z,
            notional_per_leg: p.notional_per_leg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_cash: f64,
    pub annualization_factor: u32,
    /// Inclusive date window applied after alignment.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        let p = SimulationParams::default();
        Self {
            initial_cash: p.initial_cash,
            annualization_factor: p.annualization_factor,
            start: None,
            end: None,
        }
    }
}

/// Where the bars come from, after the `[pair]` table is checked.
#[derive(Debug, Clone, PartialEq)]
pub enum PriceSource {
    Csv { a: PathBuf, b: PathBuf },
    Stooq {
        ticker_a: String,
        ticker_b: String,
        cache_dir: PathBuf,
        force: bool,
    },
    Synthetic(SyntheticSource),
}

impl BacktestConfig {
    /// Read and parse a TOML file.
    ///
    /// Relative CSV and cache paths are resolved against the config file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text)?;
        if let Some(dir) = path.parent() {
            config.rebase_paths(dir);
        }
        Ok(config)
    }

    /// Parse TOML text and check the structural rules.
    pub fn from_toml(text: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(text)?;
        config.price_source()?;
        if let (Some(start), Some(end)) = (config.backtest.start, config.backtest.end) {
            if start > end {
                return Err(ConfigFileError::InvertedRange { start, end });
            }
        }
        Ok(config)
    }

    /// Build a config for a synthetic pair with default strategy settings.
    pub fn synthetic(seed: u64, bars: usize) -> Self {
        Self {
            pair: PairConfig {
                synthetic: Some(SyntheticSource {
                    seed,
                    bars,
                    start: default_synthetic_start(),
                    params: SyntheticPairParams::default(),
                }),
                ..PairConfig::with_labels(default_label_a(), default_label_b())
            },
            strategy: StrategyConfig::default(),
            backtest: BacktestSettings::default(),
        }
    }

    /// Build a config for two CSV files with default strategy settings.
    pub fn csv(csv_a: PathBuf, csv_b: PathBuf) -> Self {
        Self {
            pair: PairConfig {
                csv_a: Some(csv_a),
                csv_b: Some(csv_b),
                ..PairConfig::with_labels(default_label_a(), default_label_b())
            },
            strategy: StrategyConfig::default(),
            backtest: BacktestSettings::default(),
        }
    }

    /// Build a config for two Stooq symbols, labelled by their tickers.
    pub fn stooq(ticker_a: &str, ticker_b: &str, cache_dir: PathBuf) -> Self {
        Self {
            pair: PairConfig {
                ticker_a: Some(ticker_a.to_string()),
                ticker_b: Some(ticker_b.to_string()),
                cache_dir,
                ..PairConfig::with_labels(ticker_a.to_uppercase(), ticker_b.to_uppercase())
            },
            strategy: StrategyConfig::default(),
            backtest: BacktestSettings::default(),
        }
    }

    /// Exactly one of the CSV pair, the ticker pair or the synthetic table
    /// must be set. A half-given pair counts as set but incomplete.
    pub fn price_source(&self) -> Result<PriceSource, ConfigFileError> {
        let pair = &self.pair;
        let csv_set = pair.csv_a.is_some() || pair.csv_b.is_some();
        let tickers_set = pair.ticker_a.is_some() || pair.ticker_b.is_some();
        let chosen = [csv_set, tickers_set, pair.synthetic.is_some()]
            .iter()
            .filter(|&&b| b)
            .count();
        if chosen > 1 {
            return Err(ConfigFileError::AmbiguousSource);
        }

        if let (Some(a), Some(b)) = (&pair.csv_a, &pair.csv_b) {
            return Ok(PriceSource::Csv {
                a: a.clone(),
                b: b.clone(),
            });
        }
        if let (Some(a), Some(b)) = (&pair.ticker_a, &pair.ticker_b) {
            return Ok(PriceSource::Stooq {
                ticker_a: a.clone(),
                ticker_b: b.clone(),
                cache_dir: pair.cache_dir.clone(),
                force: pair.force_download,
            });
        }
        match &pair.synthetic {
            Some(s) => Ok(PriceSource::Synthetic(s.clone())),
            None => Err(ConfigFileError::MissingSource),
        }
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            lookback: self.strategy.lookback,
            entry_z: self.strategy.entry_z,
            exit_z: self.strategy.exit_z,
            notional_per_leg: self.strategy.notional_per_leg,
            annualization_factor: self.backtest.annualization_factor,
            initial_cash: self.backtest.initial_cash,
        }
    }

    /// Validate the numeric parameters.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        SimulationConfig::new(self.simulation_params())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            start: self.backtest.start,
            end: self.backtest.end,
        }
    }

    fn rebase_paths(&mut self, dir: &Path) {
        let pair = &mut self.pair;
        for path in [&mut pair.csv_a, &mut pair.csv_b]
            .into_iter()
            .flatten()
            .chain(std::iter::once(&mut pair.cache_dir))
        {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
    }
}
