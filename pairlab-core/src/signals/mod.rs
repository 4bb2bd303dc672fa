//! Signal generation — one z-score (or nothing) per bar.
//!
//! Signals are portfolio-agnostic: they see the current bar and their own
//! rolling state, never positions or cash. `update` is called exactly once per
//! bar in date order, so a source can only use data up to the current bar.

pub mod scripted;
pub mod spread;
pub mod window;

pub use scripted::ScriptedSignal;
pub use spread::{SpreadSignalGenerator, MIN_STD};
pub use window::{SpreadWindow, RESYNC_INTERVAL};

use crate::domain::PairBar;

/// Per-bar source of the trading z-score.
pub trait SignalSource: Send {
    /// Human-readable name (e.g., "spread_zscore").
    fn name(&self) -> &str;

    /// Number of leading bars that can never produce a value.
    fn warmup_bars(&self) -> usize;

    /// Consume the next bar and return its z-score, or `None` when undefined.
    fn update(&mut self, bar: &PairBar) -> Option<f64>;
}

/// Build bars on consecutive days from `(price_a, price_b)` pairs.
#[cfg(test)]
pub fn test_bars(prices: &[(f64, f64)]) -> Vec<PairBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &(a, b))| PairBar::new(base_date + chrono::Duration::days(i as i64), a, b))
        .collect()
}
