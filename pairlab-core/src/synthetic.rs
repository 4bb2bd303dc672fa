//! Deterministic synthetic pair generator.
//!
//! Leg B follows a geometric random walk. The log-spread `ln A - ln B` is an
//! Ornstein-Uhlenbeck process around `spread_mean`, so the pair is
//! cointegrated by construction and the z-score strategy has something to
//! trade. Dates are consecutive weekdays. The same seed always produces the
//! same bars.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::PairBar;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticPairParams {
    pub start_price_b: f64,
    /// Daily log-return volatility of leg B.
    pub daily_vol_b: f64,
    /// Long-run log-spread.
    pub spread_mean: f64,
    /// Fraction of the gap to `spread_mean` closed per bar (0..1).
    pub reversion: f64,
    /// Daily volatility of the spread innovations.
    pub spread_vol: f64,
}

impl Default for SyntheticPairParams {
    fn default() -> Self {
        Self {
            start_price_b: 50.0,
            daily_vol_b: 0.012,
            spread_mean: 0.25,
            reversion: 0.08,
            spread_vol: 0.01,
        }
    }
}

/// Generate `n` weekday bars starting at (or after) `start`.
pub fn generate_pair(
    n: usize,
    seed: u64,
    params: &SyntheticPairParams,
    start: NaiveDate,
) -> Vec<PairBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut log_b = params.start_price_b.ln();
    let mut spread = params.spread_mean;
    let mut date = next_weekday(start);
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        if i > 0 {
            log_b += params.daily_vol_b * standard_normal(&mut rng);
            spread += params.reversion * (params.spread_mean - spread)
                + params.spread_vol * standard_normal(&mut rng);
            date = next_weekday(date + Duration::days(1));
        }
        let price_b = log_b.exp();
        let price_a = (log_b + spread).exp();
        bars.push(PairBar::new(date, price_a, price_b));
    }
    bars
}

fn next_weekday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + Duration::days(2),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Box-Muller transform over two uniform draws.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // gen::<f64>() is in [0, 1); shift away from 0 so ln() stays finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
