//! PairLab CLI — run and sweep commands.
//!
//! Commands:
//! - `run` — execute one backtest and write its artifacts
//! - `sweep` — run a lookback / entry / exit grid and print the leaderboard
//!
//! Both take their bars from exactly one of `--config <toml>`,
//! `--csv-a <file> --csv-b <file>`, `--ticker-a <sym> --ticker-b <sym>`
//! (Stooq download), or `--synthetic [--seed N --bars N]`.
//! Strategy flags override whatever the config file says.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pairlab_runner::config::default_cache_dir;
use pairlab_runner::runner::load_bars;
use pairlab_runner::{
    export_sweep_csv, run_backtest, save_artifacts, BacktestConfig, BacktestResult, ParamGrid,
    ParamSweep, SweepResults,
};

#[derive(Parser)]
#[command(name = "pairlab", about = "PairLab CLI — z-score pairs-trading backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest and save equity, fills, trades and metrics.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Output directory for the artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run every combination of a parameter grid over the same bars.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Lookbacks to try, comma separated.
        #[arg(long, value_delimiter = ',')]
        lookbacks: Vec<usize>,

        /// Entry thresholds to try, comma separated.
        #[arg(long, value_delimiter = ',')]
        entry_zs: Vec<f64>,

        /// Exit thresholds to try, comma separated.
        #[arg(long, value_delimiter = ',')]
        exit_zs: Vec<f64>,

        /// Number of leaderboard rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Run combinations one at a time instead of on the thread pool.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the full ranked leaderboard to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SourceArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file (Date, Close columns) for leg A.
    #[arg(long)]
    csv_a: Option<PathBuf>,

    /// CSV file (Date, Close columns) for leg B.
    #[arg(long)]
    csv_b: Option<PathBuf>,

    /// Stooq symbol for leg A, e.g. ko.us.
    #[arg(long)]
    ticker_a: Option<String>,

    /// Stooq symbol for leg B, e.g. pep.us.
    #[arg(long)]
    ticker_b: Option<String>,

    /// Directory for downloaded Stooq CSVs [default: data].
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Download again even when a cached CSV exists.
    #[arg(long, default_value_t = false)]
    force_download: bool,

    /// Use a seeded synthetic cointegrated pair.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Seed for --synthetic.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of bars for --synthetic.
    #[arg(long, default_value_t = 2520)]
    bars: usize,

    /// Display label for leg A.
    #[arg(long)]
    label_a: Option<String>,

    /// Display label for leg B.
    #[arg(long)]
    label_b: Option<String>,

    /// First date to keep (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,
}

#[derive(Args, Debug, Clone, Default)]
struct StrategyArgs {
    /// Rolling window length.
    #[arg(long)]
    lookback: Option<usize>,

    /// Enter when |z| exceeds this.
    #[arg(long)]
    entry_z: Option<f64>,

    /// Exit when |z| falls below this.
    #[arg(long)]
    exit_z: Option<f64>,

    /// Cash notional per leg.
    #[arg(long)]
    notional: Option<f64>,

    /// Starting cash.
    #[arg(long)]
    initial_cash: Option<f64>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            strategy,
            output_dir,
        } => run_cmd(&source, &strategy, output_dir),
        Commands::Sweep {
            source,
            strategy,
            lookbacks,
            entry_zs,
            exit_zs,
            top,
            sequential,
            output,
        } => {
            let grid = build_grid(lookbacks, entry_zs, exit_zs);
            sweep_cmd(&source, &strategy, &grid, top, sequential, output)
        }
    }
}

/// Resolve the price source and apply flag overrides.
fn build_config(source: &SourceArgs, strategy: &StrategyArgs) -> Result<BacktestConfig> {
    let csv_given = source.csv_a.is_some() || source.csv_b.is_some();
    let tickers_given = source.ticker_a.is_some() || source.ticker_b.is_some();
    let chosen = [
        source.config.is_some(),
        csv_given,
        tickers_given,
        source.synthetic,
    ]
    .iter()
    .filter(|&&b| b)
    .count();
    if chosen != 1 {
        bail!("pick exactly one of --config, --csv-a/--csv-b, --ticker-a/--ticker-b, or --synthetic");
    }

    let mut config = if let Some(path) = &source.config {
        BacktestConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
    } else if source.synthetic {
        BacktestConfig::synthetic(source.seed, source.bars)
    } else if tickers_given {
        match (&source.ticker_a, &source.ticker_b) {
            (Some(a), Some(b)) => BacktestConfig::stooq(a, b, default_cache_dir()),
            _ => bail!("--ticker-a and --ticker-b must be given together"),
        }
    } else {
        match (&source.csv_a, &source.csv_b) {
            (Some(a), Some(b)) => BacktestConfig::csv(a.clone(), b.clone()),
            _ => bail!("--csv-a and --csv-b must be given together"),
        }
    };

    if let Some(dir) = &source.cache_dir {
        config.pair.cache_dir = dir.clone();
    }
    if source.force_download {
        config.pair.force_download = true;
    }
    if let Some(label) = &source.label_a {
        config.pair.label_a = label.clone();
    }
    if let Some(label) = &source.label_b {
        config.pair.label_b = label.clone();
    }
    if source.start.is_some() {
        config.backtest.start = source.start;
    }
    if source.end.is_some() {
        config.backtest.end = source.end;
    }
    if let (Some(start), Some(end)) = (config.backtest.start, config.backtest.end) {
        if start > end {
            bail!("start {start} is after end {end}");
        }
    }

    if let Some(lookback) = strategy.lookback {
        config.strategy.lookback = lookback;
    }
    if let Some(entry_z) = strategy.entry_z {
        config.strategy.entry_z = entry_z;
    }
    if let Some(exit_z) = strategy.exit_z {
        config.strategy.exit_z = exit_z;
    }
    if let Some(notional) = strategy.notional {
        config.strategy.notional_per_leg = notional;
    }
    if let Some(cash) = strategy.initial_cash {
        config.backtest.initial_cash = cash;
    }

    Ok(config)
}

/// Empty axes fall back to the default grid.
fn build_grid(lookbacks: Vec<usize>, entry_zs: Vec<f64>, exit_zs: Vec<f64>) -> ParamGrid {
    let default = ParamGrid::default();
    ParamGrid {
        lookbacks: if lookbacks.is_empty() {
            default.lookbacks
        } else {
            lookbacks
        },
        entry_zs: if entry_zs.is_empty() {
            default.entry_zs
        } else {
            entry_zs
        },
        exit_zs: if exit_zs.is_empty() {
            default.exit_zs
        } else {
            exit_zs
        },
    }
}

fn run_cmd(source: &SourceArgs, strategy: &StrategyArgs, output_dir: PathBuf) -> Result<()> {
    let config = build_config(source, strategy)?;
    let result = run_backtest(&config)?;

    print_summary(&result);

    let written = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", output_dir.display());
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn sweep_cmd(
    source: &SourceArgs,
    strategy: &StrategyArgs,
    grid: &ParamGrid,
    top: usize,
    sequential: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = build_config(source, strategy)?;
    let bars = load_bars(&config)?;
    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(grid, &config.simulation_params(), &bars)?;

    print_leaderboard(&results, top);

    if let Some(path) = output {
        let body = export_sweep_csv(&results)?;
        std::fs::write(&path, body)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Leaderboard saved to: {}", path.display());
    }
    Ok(())
}

/// Percentage with a fixed number of decimals, or `n/a` for NaN.
fn pct(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".into()
    } else {
        format!("{:.*}%", decimals, value * 100.0)
    }
}

fn num(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".into()
    } else {
        format!("{:.*}", decimals, value)
    }
}

fn print_summary(result: &BacktestResult) {
    let info = &result.info;
    let sim = &result.simulation;
    let m = &result.metrics;

    println!();
    println!("=== Backtest Result ===");
    println!("Pair:           {} / {}", info.label_a, info.label_b);
    println!(
        "Period:         {} to {}",
        info.start_date.as_deref().unwrap_or("-"),
        info.end_date.as_deref().unwrap_or("-")
    );
    println!(
        "Bars:           {} ({} warmup)",
        sim.bar_count, sim.warmup_bars
    );
    println!(
        "Parameters:     lookback={} entry_z={} exit_z={} notional={}",
        result.params.lookback,
        result.params.entry_z,
        result.params.exit_z,
        result.params.notional_per_leg
    );
    println!("Fingerprint:    {}", result.fingerprint.short());
    println!("Trades:         {}", m.trade_count);
    println!("Final position: {}", sim.final_position);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {}", num(m.final_equity, 2));
    println!("Total Return:   {}", pct(m.total_return, 2));
    println!("CAGR:           {}", pct(m.cagr, 2));
    println!("Sharpe:         {}", num(m.sharpe, 3));
    println!("Volatility:     {}", pct(m.annualized_volatility, 2));
    println!("Max Drawdown:   {}", pct(m.max_drawdown, 2));
    println!("Win Rate:       {}", pct(m.win_rate, 1));
    if info.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_leaderboard(results: &SweepResults, top: usize) {
    println!();
    println!("=== Sweep: {} combinations ===", results.len());
    println!(
        "{:>4} {:>8} {:>7} {:>7} {:>8} {:>10} {:>10} {:>7}",
        "Rank", "Lookback", "Entry", "Exit", "Sharpe", "Return", "MaxDD", "Trades"
    );
    println!("{}", "-".repeat(68));
    for (rank, e) in results.top_n(top).iter().enumerate() {
        println!(
            "{:>4} {:>8} {:>7} {:>7} {:>8} {:>10} {:>10} {:>7}",
            rank + 1,
            e.params.lookback,
            e.params.entry_z,
            e.params.exit_z,
            num(e.metrics.sharpe, 3),
            pct(e.metrics.total_return, 2),
            pct(e.metrics.max_drawdown, 2),
            e.metrics.trade_count
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairlab_runner::PriceSource;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn run_flags_override_synthetic_defaults() {
        let Commands::Run {
            source, strategy, ..
        } = parse(&[
            "pairlab",
            "run",
            "--synthetic",
            "--seed",
            "7",
            "--bars",
            "300",
            "--lookback",
            "20",
            "--exit-z",
            "0.25",
        ])
        else {
            panic!("expected run");
        };
        let config = build_config(&source, &strategy).unwrap();
        assert_eq!(config.strategy.lookback, 20);
        assert_eq!(config.strategy.exit_z, 0.25);
        assert_eq!(config.strategy.entry_z, 2.0);
        let synthetic = config.pair.synthetic.unwrap();
        assert_eq!((synthetic.seed, synthetic.bars), (7, 300));
    }

    #[test]
    fn sources_are_mutually_exclusive() {
        let source = SourceArgs {
            synthetic: true,
            csv_a: Some("a.csv".into()),
            csv_b: Some("b.csv".into()),
            ..Default::default()
        };
        assert!(build_config(&source, &StrategyArgs::default()).is_err());
        assert!(build_config(&SourceArgs::default(), &StrategyArgs::default()).is_err());
    }

    #[test]
    fn lone_csv_leg_is_rejected() {
        let source = SourceArgs {
            csv_a: Some("a.csv".into()),
            ..Default::default()
        };
        assert!(build_config(&source, &StrategyArgs::default()).is_err());
    }

    #[test]
    fn ticker_flags_select_stooq_source() {
        let Commands::Run {
            source, strategy, ..
        } = parse(&[
            "pairlab",
            "run",
            "--ticker-a",
            "ko.us",
            "--ticker-b",
            "pep.us",
            "--cache-dir",
            "prices",
            "--force-download",
        ])
        else {
            panic!("expected run");
        };
        let config = build_config(&source, &strategy).unwrap();
        assert_eq!(
            config.price_source().unwrap(),
            PriceSource::Stooq {
                ticker_a: "ko.us".into(),
                ticker_b: "pep.us".into(),
                cache_dir: "prices".into(),
                force: true,
            }
        );
        assert_eq!(config.pair.label_a, "KO.US");
    }

    #[test]
    fn tickers_need_both_legs_and_no_other_source() {
        let lone = SourceArgs {
            ticker_a: Some("ko.us".into()),
            ..Default::default()
        };
        assert!(build_config(&lone, &StrategyArgs::default()).is_err());

        let mixed = SourceArgs {
            ticker_a: Some("ko.us".into()),
            ticker_b: Some("pep.us".into()),
            synthetic: true,
            ..Default::default()
        };
        assert!(build_config(&mixed, &StrategyArgs::default()).is_err());
    }

    #[test]
    fn inverted_date_flags_are_rejected() {
        let Commands::Run {
            source, strategy, ..
        } = parse(&[
            "pairlab",
            "run",
            "--synthetic",
            "--start",
            "2020-06-01",
            "--end",
            "2020-01-01",
        ])
        else {
            panic!("expected run");
        };
        assert!(build_config(&source, &strategy).is_err());
    }

    #[test]
    fn sweep_grid_parses_comma_lists() {
        let Commands::Sweep {
            lookbacks,
            entry_zs,
            exit_zs,
            ..
        } = parse(&[
            "pairlab",
            "sweep",
            "--synthetic",
            "--lookbacks",
            "20,40",
            "--entry-zs",
            "1.5,2.5",
        ])
        else {
            panic!("expected sweep");
        };
        let grid = build_grid(lookbacks, entry_zs, exit_zs);
        assert_eq!(grid.lookbacks, vec![20, 40]);
        assert_eq!(grid.entry_zs, vec![1.5, 2.5]);
        assert_eq!(grid.exit_zs, ParamGrid::default().exit_zs);
    }
}
