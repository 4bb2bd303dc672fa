//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! No dependencies on the loader, exporter, or CLI.
//!
//! Undefined statistics are reported as `NaN` rather than a sentinel zero:
//! a flat curve has no Sharpe ratio, an empty trade list has no win rate.

use serde::{Deserialize, Serialize};

use pairlab_core::domain::PairTrade;
use pairlab_core::engine::EquityPoint;

/// Standard deviations below this are treated as zero.
const MIN_RETURN_STD: f64 = 1e-15;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub cagr: f64,
    pub annualized_volatility: f64,
    pub trade_count: usize,
    pub win_rate: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[PairTrade],
        annualization_factor: u32,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        Self {
            final_equity: equity.last().copied().unwrap_or(f64::NAN),
            total_return: total_return(&equity),
            sharpe: sharpe_ratio(&equity, annualization_factor),
            max_drawdown: max_drawdown(&equity),
            cagr: cagr(equity_curve),
            annualized_volatility: annualized_volatility(&equity, annualization_factor),
            trade_count: trades.len(),
            win_rate: win_rate(trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial - 1. NaN for an empty curve.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&first), Some(&last)) => last / first - 1.0,
        _ => f64::NAN,
    }
}

/// Simple per-bar returns: `r[i] = e[i] / e[i-1] - 1` for i >= 1.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized Sharpe ratio from per-bar returns, zero risk-free rate.
///
/// Sharpe = mean(r) / std(r) * sqrt(annualization_factor), sample std.
/// NaN with fewer than 2 returns or zero dispersion.
pub fn sharpe_ratio(equity_curve: &[f64], annualization_factor: u32) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return f64::NAN;
    }
    let std = sample_std(&returns);
    if std.is_nan() || std <= MIN_RETURN_STD {
        return f64::NAN;
    }
    mean_f64(&returns) / std * f64::from(annualization_factor).sqrt()
}

/// Annualized volatility: sample std of per-bar returns times sqrt(af).
///
/// NaN with fewer than 2 returns.
pub fn annualized_volatility(equity_curve: &[f64], annualization_factor: u32) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return f64::NAN;
    }
    sample_std(&returns) * f64::from(annualization_factor).sqrt()
}

/// Maximum drawdown as a non-positive fraction (e.g., -0.15 = 15% drawdown).
///
/// 0.0 for an empty, constant, or non-decreasing curve.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = eq / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Compound annual growth rate over the calendar span of the curve.
///
/// Years are calendar days / 365.25. NaN with fewer than two points,
/// a zero-day span, or a non-positive endpoint.
pub fn cagr(equity_curve: &[EquityPoint]) -> f64 {
    let (first, last) = match (equity_curve.first(), equity_curve.last()) {
        (Some(f), Some(l)) if equity_curve.len() >= 2 => (f, l),
        _ => return f64::NAN,
    };
    let days = (last.date - first.date).num_days();
    if days <= 0 || first.equity <= 0.0 || last.equity <= 0.0 {
        return f64::NAN;
    }
    let years = days as f64 / 365.25;
    (last.equity / first.equity).powf(1.0 / years) - 1.0
}

/// Fraction of completed round trips with positive pnl. NaN with zero trades.
pub fn win_rate(trades: &[PairTrade]) -> f64 {
    if trades.is_empty() {
        return f64::NAN;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (divide by n - 1).
fn sample_std(values: &[f64]) -> f64 {
    let mean = mean_f64(values);
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}
