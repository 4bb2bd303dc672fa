//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Curve length — one equity point per bar, first point equals initial cash
//! 2. Equity accounting — final equity equals cash plus marked open quantities
//! 3. Round trips — every closing pair exactly offsets its opening pair
//! 4. Constant spread — never signals, never trades
//! 5. Rolling window — running statistics agree with a direct recomputation

use chrono::NaiveDate;
use proptest::prelude::*;
use pairlab_core::domain::{Leg, PairBar, PositionState};
use pairlab_core::engine::{run_simulation, SimulationConfig, SimulationParams};
use pairlab_core::signals::SpreadWindow;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Price paths as compounded daily log-returns from a starting price.
fn arb_price_path(len: usize) -> impl Strategy<Value = Vec<f64>> {
    (
        10.0..200.0_f64,
        prop::collection::vec(-0.05..0.05_f64, len),
    )
        .prop_map(|(start, rets)| {
            let mut price = start;
            rets.into_iter()
                .map(|r| {
                    price *= r.exp();
                    price
                })
                .collect()
        })
}

fn arb_bars() -> impl Strategy<Value = Vec<PairBar>> {
    (5usize..120).prop_flat_map(|n| {
        (arb_price_path(n), arb_price_path(n)).prop_map(|(a, b)| to_bars(&a, &b))
    })
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (1usize..30, 0.5..3.0_f64, 0.0..1.0_f64).prop_map(|(lookback, entry_z, exit_frac)| {
        SimulationConfig::new(SimulationParams {
            lookback,
            entry_z,
            exit_z: entry_z * exit_frac * 0.99,
            notional_per_leg: 5_000.0,
            annualization_factor: 252,
            initial_cash: 50_000.0,
        })
        .unwrap()
    })
}

fn to_bars(a: &[f64], b: &[f64]) -> Vec<PairBar> {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (&pa, &pb))| PairBar::new(base + chrono::Duration::days(i as i64), pa, pb))
        .collect()
}

proptest! {
    // ── 1. Curve length ──────────────────────────────────────────────

    #[test]
    fn one_point_per_bar(bars in arb_bars(), config in arb_config()) {
        let result = run_simulation(&bars, &config).unwrap();
        prop_assert_eq!(result.equity_curve.len(), bars.len());
        prop_assert_eq!(result.equity_curve[0].equity, config.initial_cash());
    }

    // ── 2. Equity accounting ─────────────────────────────────────────

    #[test]
    fn final_equity_is_cash_plus_marked_positions(bars in arb_bars(), config in arb_config()) {
        let result = run_simulation(&bars, &config).unwrap();
        let last = bars.last().unwrap();
        let qty = |leg| result.open_quantities.get(&leg).copied().unwrap_or(0.0);
        let expected = result.final_cash + qty(Leg::A) * last.price_a + qty(Leg::B) * last.price_b;
        prop_assert!((result.final_equity() - expected).abs() < 1e-6);
    }

    // ── 3. Round trips ───────────────────────────────────────────────

    #[test]
    fn closing_pairs_offset_opening_pairs(bars in arb_bars(), config in arb_config()) {
        let result = run_simulation(&bars, &config).unwrap();
        prop_assert_eq!(result.fills.len() % 2, 0);
        for trade in &result.trades {
            for (open, close) in trade.entry_fills.iter().zip(&trade.exit_fills) {
                prop_assert_eq!(open.leg, close.leg);
                prop_assert_eq!(close.quantity, -open.quantity);
            }
        }
        if result.final_position == PositionState::Flat {
            prop_assert_eq!(result.open_quantities.get(&Leg::A).copied().unwrap_or(0.0), 0.0);
            prop_assert_eq!(result.open_quantities.get(&Leg::B).copied().unwrap_or(0.0), 0.0);
        }
    }

    // ── 4. Constant spread ───────────────────────────────────────────

    #[test]
    fn constant_spread_never_trades(
        path in arb_price_path(80),
        ratio in 0.2..5.0_f64,
        config in arb_config(),
    ) {
        let a: Vec<f64> = path.iter().map(|b| b * ratio).collect();
        let bars = to_bars(&a, &path);
        let result = run_simulation(&bars, &config).unwrap();
        prop_assert!(result.bar_log.iter().all(|r| r.zscore.is_none()));
        prop_assert!(result.fills.is_empty());
    }

    // ── 5. Rolling window ────────────────────────────────────────────

    #[test]
    fn window_matches_direct_recomputation(
        values in prop::collection::vec(-2.0..2.0_f64, 1..1500),
        capacity in 1usize..50,
    ) {
        let mut window = SpreadWindow::new(capacity);
        for (i, &v) in values.iter().enumerate() {
            window.push(v);
            if i + 1 >= capacity {
                let slice = &values[i + 1 - capacity..=i];
                let n = slice.len() as f64;
                let mean = slice.iter().sum::<f64>() / n;
                let var = slice.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
                prop_assert!((window.mean().unwrap() - mean).abs() < 1e-9);
                prop_assert!((window.std_dev().unwrap() - var.sqrt()).abs() < 1e-6);
            } else {
                prop_assert!(window.mean().is_none());
            }
        }
    }
}
