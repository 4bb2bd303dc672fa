//! Simulation parameters and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Thresholds;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Raw, unvalidated simulation parameters (what a TOML file or CLI supplies).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Rolling window length for the spread statistics.
    pub lookback: usize,
    /// Enter when |z| exceeds this.
    pub entry_z: f64,
    /// Exit when |z| falls below this.
    pub exit_z: f64,
    /// Cash notional traded on each leg when a position opens.
    pub notional_per_leg: f64,
    /// Periods per year, used to annualize the Sharpe ratio.
    pub annualization_factor: u32,
    pub initial_cash: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            lookback: 60,
            entry_z: 2.0,
            exit_z: 0.5,
            notional_per_leg: 10_000.0,
            annualization_factor: 252,
            initial_cash: 100_000.0,
        }
    }
}

/// Validated, immutable configuration for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationConfig {
    params: SimulationParams,
}

impl SimulationConfig {
    /// Validate `params`.
    ///
    /// Requires `lookback > 0`, `entry_z > 0`, `0 <= exit_z < entry_z`,
    /// `notional_per_leg > 0`, `annualization_factor > 0` and
    /// `initial_cash > 0`. NaN fails every check.
    pub fn new(params: SimulationParams) -> Result<Self, ConfigError> {
        if params.lookback == 0 {
            return Err(ConfigError::invalid("lookback", "must be > 0"));
        }
        if !(params.entry_z > 0.0 && params.entry_z.is_finite()) {
            return Err(ConfigError::invalid(
                "entry_z",
                format!("must be a finite number > 0, got {}", params.entry_z),
            ));
        }
        if !(params.exit_z >= 0.0) {
            return Err(ConfigError::invalid(
                "exit_z",
                format!("must be >= 0, got {}", params.exit_z),
            ));
        }
        if params.exit_z >= params.entry_z {
            return Err(ConfigError::invalid(
                "exit_z",
                format!(
                    "must be < entry_z ({}), got {}",
                    params.entry_z, params.exit_z
                ),
            ));
        }
        if !(params.notional_per_leg > 0.0 && params.notional_per_leg.is_finite()) {
            return Err(ConfigError::invalid(
                "notional_per_leg",
                format!("must be a finite number > 0, got {}", params.notional_per_leg),
            ));
        }
        if params.annualization_factor == 0 {
            return Err(ConfigError::invalid("annualization_factor", "must be > 0"));
        }
        if !(params.initial_cash > 0.0 && params.initial_cash.is_finite()) {
            return Err(ConfigError::invalid(
                "initial_cash",
                format!("must be a finite number > 0, got {}", params.initial_cash),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn lookback(&self) -> usize {
        self.params.lookback
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            entry_z: self.params.entry_z,
            exit_z: self.params.exit_z,
        }
    }

    pub fn notional_per_leg(&self) -> f64 {
        self.params.notional_per_leg
    }

    pub fn annualization_factor(&self) -> u32 {
        self.params.annualization_factor
    }

    pub fn initial_cash(&self) -> f64 {
        self.params.initial_cash
    }
}

impl TryFrom<SimulationParams> for SimulationConfig {
    type Error = ConfigError;

    fn try_from(params: SimulationParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}
