//! Mutable per-run state and the run result.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Leg, PairTrade, PositionState};

use super::ledger::{EquityPoint, PortfolioLedger};

/// State carried from one bar to the next.
///
/// The signal source's rolling window is the third piece of persistent state;
/// it lives with the signal source and is passed alongside.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub position: PositionState,
    pub ledger: PortfolioLedger,
    /// Highest equity marked so far, for the running drawdown.
    pub peak_equity: f64,
}

impl SimulationState {
    pub fn new(initial_cash: f64, bars: usize) -> Self {
        Self {
            position: PositionState::Flat,
            ledger: PortfolioLedger::with_capacity(initial_cash, bars),
            peak_equity: f64::NEG_INFINITY,
        }
    }

    /// Fold `equity` into the running peak and return the drawdown from it.
    ///
    /// Non-positive fraction, `equity / peak - 1`; 0 while the peak is not positive.
    pub fn drawdown(&mut self, equity: f64) -> f64 {
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            (equity / self.peak_equity - 1.0).min(0.0)
        } else {
            0.0
        }
    }
}

/// What happened on one bar, for diagnostics and export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub date: NaiveDate,
    pub spread: f64,
    /// `None` while the signal is undefined.
    pub zscore: Option<f64>,
    /// Position after this bar's transition.
    pub position: PositionState,
    /// Cash after this bar's fills.
    pub cash: f64,
    pub qty_a: f64,
    pub qty_b: f64,
    /// `cash + qty_a * price_a + qty_b * price_b` at the close.
    pub equity: f64,
    /// `equity / running max - 1`, never positive.
    pub drawdown: f64,
}

/// Result of a complete simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Equity at each bar close, one point per bar.
    pub equity_curve: Vec<EquityPoint>,
    /// All fills, in execution order.
    pub fills: Vec<Fill>,
    /// Completed round trips.
    pub trades: Vec<PairTrade>,
    pub bar_log: Vec<BarRecord>,
    pub initial_cash: f64,
    pub final_cash: f64,
    /// Position still open at the end of the run (marked, not closed).
    pub final_position: PositionState,
    pub open_quantities: BTreeMap<Leg, f64>,
    pub bar_count: usize,
    pub warmup_bars: usize,
}

impl SimulationResult {
    /// Equity at the last bar, or the initial cash for an empty run.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }

    /// Equity values without dates.
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }

    /// Number of bars that produced a defined z-score.
    pub fn signal_bars(&self) -> usize {
        self.bar_log.iter().filter(|r| r.zscore.is_some()).count()
    }
}
