//! Bar loading and alignment for the runner.
//!
//! Reads two daily price CSVs (Stooq or Yahoo layout) and turns them into one
//! date-ordered `PairBar` sequence:
//! 1. Each file needs `Date` and `Close` columns; other columns are ignored
//! 2. Rows whose close is missing, non-numeric, or not positive are dropped
//! 3. The two series are inner-joined on date; one-sided dates are dropped
//! 4. An optional inclusive `start`/`end` window is applied to the joined bars
//!
//! Every drop is counted and logged so a silently thin dataset is visible.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use pairlab_core::domain::PairBar;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} has no `{column}` column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{} line {line}: unparseable date '{value}'", .path.display())]
    InvalidDate {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{} lists {date} more than once", .path.display())]
    DuplicateDate { path: PathBuf, date: NaiveDate },

    #[error("{} contains no usable rows", .path.display())]
    EmptySeries { path: PathBuf },

    #[error("{} and {} share no dates", .a.display(), .b.display())]
    NoOverlap { a: PathBuf, b: PathBuf },

    #[error("no aligned bars between {start:?} and {end:?}")]
    EmptyRange {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Options controlling which bars are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// First date to keep (inclusive).
    pub start: Option<NaiveDate>,
    /// Last date to keep (inclusive).
    pub end: Option<NaiveDate>,
}

impl LoadOptions {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// One leg's close prices keyed by date.
#[derive(Debug, Clone)]
pub struct CloseSeries {
    pub path: PathBuf,
    pub closes: BTreeMap<NaiveDate, f64>,
    /// Rows skipped for a missing or unusable close.
    pub dropped_rows: usize,
}

/// Aligned pair plus the bookkeeping of what was thrown away.
#[derive(Debug, Clone)]
pub struct LoadedPair {
    pub bars: Vec<PairBar>,
    pub dropped_rows_a: usize,
    pub dropped_rows_b: usize,
    /// Dates present in A but not B.
    pub unmatched_a: usize,
    /// Dates present in B but not A.
    pub unmatched_b: usize,
}

/// Load both legs from CSV and align them.
///
/// This is the primary entry point for the runner to get bar data.
pub fn load_pair(
    path_a: &Path,
    path_b: &Path,
    opts: &LoadOptions,
) -> Result<LoadedPair, LoadError> {
    let a = load_close_series(path_a)?;
    let b = load_close_series(path_b)?;
    align_pair(&a, &b, opts)
}

/// Read one CSV's `Date` and `Close` columns.
pub fn load_close_series(path: &Path) -> Result<CloseSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_close_series(file, path)
}

/// Parse close prices from any reader. `path` is only used in errors.
pub fn read_close_series<R: std::io::Read>(
    reader: R,
    path: &Path,
) -> Result<CloseSeries, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let date_idx = column("Date")?;
    let close_idx = column("Close")?;

    let mut closes = BTreeMap::new();
    let mut dropped_rows = 0;

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let line = record.position().map_or(i as u64 + 2, |p| p.line());

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| {
            LoadError::InvalidDate {
                path: path.to_path_buf(),
                line,
                value: raw_date.to_string(),
            }
        })?;

        let close = match record.get(close_idx).and_then(parse_close) {
            Some(c) => c,
            None => {
                dropped_rows += 1;
                continue;
            }
        };

        if closes.insert(date, close).is_some() {
            return Err(LoadError::DuplicateDate {
                path: path.to_path_buf(),
                date,
            });
        }
    }

    if dropped_rows > 0 {
        warn!(path = %path.display(), dropped_rows, "dropped rows without a usable close");
    }
    if closes.is_empty() {
        return Err(LoadError::EmptySeries {
            path: path.to_path_buf(),
        });
    }

    Ok(CloseSeries {
        path: path.to_path_buf(),
        closes,
        dropped_rows,
    })
}

fn parse_close(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|c| c.is_finite() && *c > 0.0)
}

/// Inner-join two series on date and apply the date window.
pub fn align_pair(
    a: &CloseSeries,
    b: &CloseSeries,
    opts: &LoadOptions,
) -> Result<LoadedPair, LoadError> {
    let mut joined = Vec::with_capacity(a.closes.len().min(b.closes.len()));
    let mut unmatched_a = 0;

    for (&date, &price_a) in &a.closes {
        match b.closes.get(&date) {
            Some(&price_b) => joined.push(PairBar::new(date, price_a, price_b)),
            None => unmatched_a += 1,
        }
    }
    let unmatched_b = b.closes.len() - joined.len();

    if unmatched_a > 0 || unmatched_b > 0 {
        warn!(unmatched_a, unmatched_b, "dropped dates missing from one leg");
    }
    if joined.is_empty() {
        return Err(LoadError::NoOverlap {
            a: a.path.clone(),
            b: b.path.clone(),
        });
    }

    let bars: Vec<PairBar> = joined
        .into_iter()
        .filter(|bar| opts.contains(bar.date))
        .collect();
    if bars.is_empty() {
        return Err(LoadError::EmptyRange {
            start: opts.start,
            end: opts.end,
        });
    }

    info!(
        bars = bars.len(),
        first = %bars[0].date,
        last = %bars[bars.len() - 1].date,
        "aligned pair"
    );

    Ok(LoadedPair {
        bars,
        dropped_rows_a: a.dropped_rows,
        dropped_rows_b: b.dropped_rows,
        unmatched_a,
        unmatched_b,
    })
}
