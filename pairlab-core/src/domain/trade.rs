use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fill::Fill;
use super::position::SpreadDirection;

/// A completed round trip: opening fill pair followed by its closing pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    pub direction: SpreadDirection,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    /// Bars between the entry bar and the exit bar.
    pub bars_held: usize,
    pub entry_fills: [Fill; 2],
    pub exit_fills: [Fill; 2],
    /// Cash after the exit minus cash before the entry.
    pub pnl: f64,
}

impl PairTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
