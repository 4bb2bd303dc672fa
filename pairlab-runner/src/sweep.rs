//! Parameter sweep over lookback / entry / exit grids.
//!
//! Every combination runs an independent simulation over the same read-only
//! bars, in parallel on the rayon pool. Results are ranked afterwards by
//! Sharpe ratio (descending, NaN last) with ties broken by grid order, so the
//! ranking never depends on thread scheduling.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pairlab_core::domain::PairBar;
use pairlab_core::engine::{SimulationConfig, SimulationParams};
use pairlab_core::fingerprint::RunFingerprint;

use crate::metrics::PerformanceMetrics;
use crate::runner::{run_backtest_on_bars, RunError, RunInfo};

/// Axes of a parameter sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub lookbacks: Vec<usize>,
    pub entry_zs: Vec<f64>,
    pub exit_zs: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            lookbacks: vec![20, 40, 60, 90],
            entry_zs: vec![1.5, 2.0, 2.5],
            exit_zs: vec![0.0, 0.25, 0.5, 1.0],
        }
    }
}

impl ParamGrid {
    /// Number of raw combinations, before invalid ones are skipped.
    pub fn size(&self) -> usize {
        self.lookbacks.len() * self.entry_zs.len() * self.exit_zs.len()
    }

    /// All combinations with `exit_z < entry_z`, in lookback-major order.
    ///
    /// Fields not swept (notional, cash, annualization) come from `base`.
    pub fn generate_params(&self, base: &SimulationParams) -> Vec<SimulationParams> {
        let mut out = Vec::with_capacity(self.size());
        for &lookback in &self.lookbacks {
            for &entry_z in &self.entry_zs {
                for &exit_z in &self.exit_zs {
                    // Skip invalid combinations (exit >= entry)
                    if exit_z >= entry_z {
                        continue;
                    }
                    out.push(SimulationParams {
                        lookback,
                        entry_z,
                        exit_z,
                        ..*base
                    });
                }
            }
        }
        out
    }
}

/// One combination's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Position in `ParamGrid::generate_params` order.
    pub grid_index: usize,
    pub params: SimulationParams,
    pub fingerprint: RunFingerprint,
    pub metrics: PerformanceMetrics,
}

/// Parameter sweep executor.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every valid combination of `grid` over `bars`.
    ///
    /// Parameters outside the grid's axes are validated like a single run; the
    /// first invalid combination aborts the sweep.
    pub fn sweep(
        &self,
        grid: &ParamGrid,
        base: &SimulationParams,
        bars: &[PairBar],
    ) -> Result<SweepResults, RunError> {
        let configs = grid
            .generate_params(base)
            .into_iter()
            .map(SimulationConfig::new)
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            combinations = configs.len(),
            skipped = grid.size() - configs.len(),
            bars = bars.len(),
            parallel = self.parallel,
            "starting sweep"
        );

        let run_one =
            |(grid_index, config): (usize, &SimulationConfig)| run_point(bars, grid_index, config);

        let entries = if self.parallel {
            configs
                .par_iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, RunError>>()?
        } else {
            configs
                .iter()
                .enumerate()
                .map(run_one)
                .collect::<Result<Vec<_>, RunError>>()?
        };

        Ok(SweepResults::new(entries))
    }
}

fn run_point(
    bars: &[PairBar],
    grid_index: usize,
    config: &SimulationConfig,
) -> Result<SweepEntry, RunError> {
    let result = run_backtest_on_bars(bars, config, RunInfo::default())?;
    debug!(grid_index, sharpe = result.metrics.sharpe, "sweep point done");
    Ok(SweepEntry {
        grid_index,
        params: result.params,
        fingerprint: result.fingerprint,
        metrics: result.metrics,
    })
}

/// Sharpe descending, NaN last, then grid order.
fn rank_order(a: &SweepEntry, b: &SweepEntry) -> Ordering {
    let (sa, sb) = (a.metrics.sharpe, b.metrics.sharpe);
    let by_sharpe = match (sa.is_nan(), sb.is_nan()) {
        (false, false) => sb.total_cmp(&sa),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    };
    by_sharpe.then(a.grid_index.cmp(&b.grid_index))
}

/// Results from a parameter sweep, ranked best first.
#[derive(Debug, Clone)]
pub struct SweepResults {
    entries: Vec<SweepEntry>,
}

impl SweepResults {
    fn new(mut entries: Vec<SweepEntry>) -> Self {
        entries.sort_by(rank_order);
        Self { entries }
    }

    /// All entries in rank order.
    pub fn ranked(&self) -> &[SweepEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the best result by Sharpe.
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    /// Returns the top N results.
    pub fn top_n(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}
