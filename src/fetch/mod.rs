// src/fetch/mod.rs

use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::FetchError;

/// Statistics Canada table id for the New Housing Price Index.
/// Bumped manually when a new monthly vintage is published.
pub const DEFAULT_TABLE_ID: u32 = 18_100_205;

/// Deadline for the whole download; a hung transfer must not block the
/// caller past this.
const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

fn table_url(table_id: u32) -> String {
    format!("https://www150.statcan.gc.ca/n1/tbl/csv/{table_id}-eng.zip")
}

/// Download the ZIP archive for `table_id` and return its raw bytes.
///
/// One outbound GET per call, no retries: a failure here is terminal for
/// the current load cycle and surfaces to the caller as a single
/// [`FetchError`]. Callers holding a fresh cache entry must not call this
/// directly; going through the cache is what keeps this to one request.
pub async fn download_table_zip(client: &Client, table_id: u32) -> Result<Vec<u8>, FetchError> {
    let url = table_url(table_id);
    debug!(%url, "downloading table archive");
    let start = Instant::now();

    let resp = client
        .get(&url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { url, status });
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.clone(),
            source,
        })?;

    info!(
        table_id,
        bytes = bytes.len(),
        elapsed = ?start.elapsed(),
        "downloaded table archive"
    );
    Ok(bytes.to_vec())
}
