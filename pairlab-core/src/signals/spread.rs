//! Rolling z-score of the log-spread.

use crate::domain::PairBar;

use super::window::SpreadWindow;
use super::SignalSource;

/// Standard deviations at or below this are treated as zero. Log-spreads of
/// prices whose ratio never changes still differ in the last few ulps.
pub const MIN_STD: f64 = 1e-12;

/// Emits `(spread - mean) / std` over the last `lookback` spreads, including
/// the current bar's spread.
///
/// Returns `None` while fewer than `lookback` spreads have been seen and
/// whenever the window's standard deviation is (numerically) zero.
#[derive(Debug, Clone)]
pub struct SpreadSignalGenerator {
    window: SpreadWindow,
}

impl SpreadSignalGenerator {
    pub fn new(lookback: usize) -> Self {
        Self {
            window: SpreadWindow::new(lookback),
        }
    }

    pub fn window(&self) -> &SpreadWindow {
        &self.window
    }
}

impl SignalSource for SpreadSignalGenerator {
    fn name(&self) -> &str {
        "spread_zscore"
    }

    fn warmup_bars(&self) -> usize {
        self.window.capacity().saturating_sub(1)
    }

    fn update(&mut self, bar: &PairBar) -> Option<f64> {
        let spread = bar.log_spread();
        self.window.push(spread);

        let mean = self.window.mean()?;
        let std = self.window.std_dev()?;
        if std <= MIN_STD {
            return None;
        }
        let z = (spread - mean) / std;
        z.is_finite().then_some(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_bars;

    #[test]
    fn undefined_during_warmup() {
        let bars = test_bars(&[(10.0, 10.0), (11.0, 10.0), (12.0, 10.0)]);
        let mut sig = SpreadSignalGenerator::new(3);
        assert_eq!(sig.warmup_bars(), 2);
        assert_eq!(sig.update(&bars[0]), None);
        assert_eq!(sig.update(&bars[1]), None);
        assert!(sig.update(&bars[2]).is_some());
    }

    #[test]
    fn zscore_matches_direct_computation() {
        let prices = [(10.0, 10.0), (11.0, 10.0), (12.0, 10.0), (9.0, 10.0)];
        let bars = test_bars(&prices);
        let mut sig = SpreadSignalGenerator::new(3);
        let z: Vec<Option<f64>> = bars.iter().map(|b| sig.update(b)).collect();

        let spreads: Vec<f64> = prices.iter().map(|&(a, b)| a.ln() - b.ln()).collect();
        let window = &spreads[1..4];
        let mean = window.iter().sum::<f64>() / 3.0;
        let std = (window.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
        let expected = (spreads[3] - mean) / std;

        assert!((z[3].unwrap() - expected).abs() < 1e-10);
        assert!(z[3].unwrap() < 0.0);
    }

    #[test]
    fn constant_spread_never_signals() {
        // Prices move, the ratio does not.
        let prices: Vec<(f64, f64)> = (0..30)
            .map(|i| {
                let b = 20.0 + i as f64;
                (2.0 * b, b)
            })
            .collect();
        let bars = test_bars(&prices);
        let mut sig = SpreadSignalGenerator::new(5);
        for bar in &bars {
            assert_eq!(sig.update(bar), None);
        }
    }

    #[test]
    fn lookback_of_one_never_signals() {
        let bars = test_bars(&[(10.0, 10.0), (15.0, 10.0), (8.0, 11.0)]);
        let mut sig = SpreadSignalGenerator::new(1);
        for bar in &bars {
            assert_eq!(sig.update(bar), None);
        }
    }
}
