//! Artifact export — CSV series and the JSON run summary.
//!
//! A run directory holds:
//! - `equity.csv` — per-bar spread, z-score, position, cash, quantities,
//!   equity and drawdown
//! - `fills.csv` — every fill in execution order
//! - `trades.csv` — completed round trips
//! - `metrics.json` — the `RunSummary` (parameters, fingerprint, metrics)
//!
//! Floats are written with Rust's shortest round-trip formatting so two runs
//! with equal fingerprints produce byte-identical files. Undefined metrics
//! (NaN) appear as `null` in JSON and undefined z-scores as empty CSV cells.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use pairlab_core::domain::{Fill, Leg, PairTrade};
use pairlab_core::engine::BarRecord;

use crate::runner::{BacktestResult, RunSummary};
use crate::sweep::SweepResults;

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-bar series. Columns: date, spread, zscore, position, cash, qty_a,
/// qty_b, equity, drawdown.
pub fn export_equity_csv(bar_log: &[BarRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date", "spread", "zscore", "position", "cash", "qty_a", "qty_b", "equity", "drawdown",
    ])?;
    for r in bar_log {
        wtr.write_record([
            r.date.to_string(),
            r.spread.to_string(),
            r.zscore.map(|z| z.to_string()).unwrap_or_default(),
            r.position.to_string(),
            r.cash.to_string(),
            r.qty_a.to_string(),
            r.qty_b.to_string(),
            r.equity.to_string(),
            r.drawdown.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Fill tape. Columns: date, leg, label, quantity, price, cash_flow.
pub fn export_fills_csv(fills: &[Fill], label_a: &str, label_b: &str) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "leg", "label", "quantity", "price", "cash_flow"])?;
    for f in fills {
        let label = match f.leg {
            Leg::A => label_a,
            Leg::B => label_b,
        };
        wtr.write_record([
            f.date.to_string(),
            f.leg.to_string(),
            label.to_string(),
            f.quantity.to_string(),
            f.price.to_string(),
            f.cash_flow().to_string(),
        ])?;
    }
    finish(wtr)
}

/// Round trips. Columns: direction, entry_date, exit_date, bars_held,
/// qty_a, qty_b, entry_price_a, entry_price_b, exit_price_a, exit_price_b, pnl.
pub fn export_trades_csv(trades: &[PairTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "direction",
        "entry_date",
        "exit_date",
        "bars_held",
        "qty_a",
        "qty_b",
        "entry_price_a",
        "entry_price_b",
        "exit_price_a",
        "exit_price_b",
        "pnl",
    ])?;
    for t in trades {
        let [entry_a, entry_b] = t.entry_fills;
        let [exit_a, exit_b] = t.exit_fills;
        wtr.write_record([
            t.direction.to_string(),
            t.entry_date.to_string(),
            t.exit_date.to_string(),
            t.bars_held.to_string(),
            entry_a.quantity.to_string(),
            entry_b.quantity.to_string(),
            entry_a.price.to_string(),
            entry_b.price.to_string(),
            exit_a.price.to_string(),
            exit_b.price.to_string(),
            t.pnl.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Sweep leaderboard in rank order. Undefined metrics are written as `NaN`.
pub fn export_sweep_csv(results: &SweepResults) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "lookback",
        "entry_z",
        "exit_z",
        "sharpe",
        "total_return",
        "max_drawdown",
        "cagr",
        "trade_count",
        "win_rate",
        "final_equity",
        "fingerprint",
    ])?;
    for (rank, e) in results.ranked().iter().enumerate() {
        let m = &e.metrics;
        wtr.write_record([
            (rank + 1).to_string(),
            e.params.lookback.to_string(),
            e.params.entry_z.to_string(),
            e.params.exit_z.to_string(),
            m.sharpe.to_string(),
            m.total_return.to_string(),
            m.max_drawdown.to_string(),
            m.cagr.to_string(),
            m.trade_count.to_string(),
            m.win_rate.to_string(),
            m.final_equity.to_string(),
            e.fingerprint.to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunSummary` to pretty JSON.
pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize run summary to JSON")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set for one run into `output_dir`.
///
/// The directory is created if needed; existing files are overwritten.
/// Returns the paths written, in the order listed in the module docs.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let sim = &result.simulation;
    let artifacts = [
        ("equity.csv", export_equity_csv(&sim.bar_log)?),
        (
            "fills.csv",
            export_fills_csv(&sim.fills, &result.info.label_a, &result.info.label_b)?,
        ),
        ("trades.csv", export_trades_csv(&sim.trades)?),
        ("metrics.json", export_summary_json(&result.summary())?),
    ];

    let mut written = Vec::with_capacity(artifacts.len());
    for (name, body) in artifacts {
        let path = output_dir.join(name);
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    info!(dir = %output_dir.display(), files = written.len(), "artifacts saved");
    Ok(written)
}
