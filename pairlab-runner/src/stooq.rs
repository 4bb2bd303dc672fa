//! Stooq daily CSV download with a local file cache.
//!
//! Each symbol is fetched from `https://stooq.com/q/d/l/?s=<symbol>&i=d` and
//! stored as `<cache_dir>/<symbol>_stooq_d.csv`. An existing cache file is
//! reused unless the caller forces a refresh. The stored file is the raw
//! Stooq body (`Date,Open,High,Low,Close,Volume`), which `data_loader` reads
//! directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

const BASE_URL: &str = "https://stooq.com/q/d/l/";

#[derive(Debug, Error)]
pub enum StooqError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for {symbol}")]
    Status { symbol: String, status: u16 },

    #[error("no data from Stooq for symbol '{symbol}'")]
    NoData { symbol: String },

    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("download failed after retries for {symbol}")]
    RetriesExhausted { symbol: String },
}

/// Daily CSV endpoint for `symbol`, trimmed and lowercased.
pub fn stooq_csv_url(symbol: &str) -> String {
    format!("{BASE_URL}?s={}&i=d", symbol.trim().to_lowercase())
}

/// Cache file for `symbol`. Slashes become underscores so a symbol never
/// escapes `cache_dir`.
pub fn cache_path(cache_dir: &Path, symbol: &str) -> PathBuf {
    let stem = symbol.trim().to_lowercase().replace('/', "_");
    cache_dir.join(format!("{stem}_stooq_d.csv"))
}

/// Blocking Stooq client with retry and exponential backoff.
pub struct StooqDownloader {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

impl StooqDownloader {
    pub fn new() -> Result<Self, StooqError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!("pairlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StooqError::Client)?;
        Ok(Self {
            client,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Return the cache file for `symbol`, downloading it first when it is
    /// missing or `force` is set.
    pub fn fetch_to_cache(
        &self,
        symbol: &str,
        cache_dir: &Path,
        force: bool,
    ) -> Result<PathBuf, StooqError> {
        let path = cache_path(cache_dir, symbol);
        if path.is_file() && !force {
            debug!(symbol, path = %path.display(), "stooq cache hit");
            return Ok(path);
        }

        std::fs::create_dir_all(cache_dir).map_err(|source| StooqError::Io {
            path: cache_dir.to_path_buf(),
            source,
        })?;

        let body = self.download(symbol)?;
        std::fs::write(&path, &body).map_err(|source| StooqError::Io {
            path: path.clone(),
            source,
        })?;
        info!(symbol, bytes = body.len(), path = %path.display(), "downloaded from stooq");
        Ok(path)
    }

    fn download(&self, symbol: &str) -> Result<Vec<u8>, StooqError> {
        let url = stooq_csv_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(symbol, attempt, ?delay, "retrying stooq download");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    {
                        last_error = Some(StooqError::Status {
                            symbol: symbol.to_string(),
                            status: status.as_u16(),
                        });
                        continue;
                    }
                    if !status.is_success() {
                        return Err(StooqError::Status {
                            symbol: symbol.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    let body = resp
                        .bytes()
                        .map_err(|e| StooqError::NetworkUnreachable(e.to_string()))?;
                    return check_body(symbol, body.to_vec());
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(StooqError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(StooqError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| StooqError::RetriesExhausted {
            symbol: symbol.to_string(),
        }))
    }
}

/// Stooq answers unknown symbols with 200 and a `No data` body; only a body
/// that opens with a CSV header is accepted.
fn check_body(symbol: &str, body: Vec<u8>) -> Result<Vec<u8>, StooqError> {
    let head = String::from_utf8_lossy(&body[..body.len().min(64)]).to_ascii_lowercase();
    if head.trim_start().starts_with("date") {
        Ok(body)
    } else {
        Err(StooqError::NoData {
            symbol: symbol.to_string(),
        })
    }
}
