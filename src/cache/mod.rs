// src/cache/mod.rs

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::extract::{self, RawRow};
use crate::fetch;

/// The memoized table: the full parsed row set plus when it was fetched.
/// Replaced wholesale on refresh, never merged.
pub struct CacheEntry {
    pub rows: Arc<Vec<RawRow>>,
    pub fetched_at: DateTime<Utc>,
}

/// In-process freshness cache for one table id.
///
/// Holds at most one [`CacheEntry`]; the TTL is fixed at construction.
/// There is no invalidation API — an entry ages out and is replaced on the
/// next request. The entry sits behind an async mutex that is held across
/// the refresh, so concurrent cache-miss callers queue on the same
/// in-flight fetch instead of each hitting the host; late arrivals
/// re-check freshness under the lock and return the entry the first one
/// stored.
pub struct TableCache {
    table_id: u32,
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl TableCache {
    pub fn new(table_id: u32, ttl: Duration) -> Self {
        Self {
            table_id,
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Return the cached rows if the entry is younger than the TTL,
    /// otherwise fetch, extract, and parse a fresh row set and store it.
    ///
    /// A failed refresh leaves the previous state untouched and surfaces
    /// the error to that caller only; there is no automatic retry.
    pub async fn get_or_fetch(&self, client: &Client) -> Result<Arc<Vec<RawRow>>, LoadError> {
        self.get_or_fetch_with(|| load_table(client, self.table_id))
            .await
    }

    async fn get_or_fetch_with<F, Fut>(&self, load: F) -> Result<Arc<Vec<RawRow>>, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RawRow>, LoadError>>,
    {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            let age = Utc::now() - cached.fetched_at;
            if age < self.ttl {
                debug!(
                    table_id = self.table_id,
                    rows = cached.rows.len(),
                    age_minutes = age.num_minutes(),
                    "cache hit"
                );
                return Ok(Arc::clone(&cached.rows));
            }
            info!(
                table_id = self.table_id,
                age_hours = age.num_hours(),
                "cache entry expired"
            );
        }

        let rows = Arc::new(load().await?);
        info!(
            table_id = self.table_id,
            rows = rows.len(),
            "cache refreshed"
        );
        *entry = Some(CacheEntry {
            rows: Arc::clone(&rows),
            fetched_at: Utc::now(),
        });
        Ok(rows)
    }
}

/// Fetch the archive for `table_id`, pull out `<table_id>.csv`, and parse
/// it into rows. This is what the cache runs on a miss.
pub async fn load_table(client: &Client, table_id: u32) -> Result<Vec<RawRow>, LoadError> {
    let bytes = fetch::download_table_zip(client, table_id).await?;
    let member = format!("{table_id}.csv");
    let text = extract::unzip_member(&bytes, &member)?;
    Ok(extract::parse_table(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(period: &str) -> RawRow {
        [("REF_DATE".to_string(), period.to_string())]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn second_request_within_ttl_does_not_reload() {
        let cache = TableCache::new(1, Duration::hours(24));
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let rows = cache
                .get_or_fetch_with(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![row("2020-01")])
                })
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_replaced_wholesale() {
        // Zero TTL: every request sees an expired entry.
        let cache = TableCache::new(1, Duration::zero());
        let loads = AtomicUsize::new(0);

        for expected in ["2020-01", "2020-02"] {
            let rows = cache
                .get_or_fetch_with(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![row(expected)])
                })
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0]["REF_DATE"], expected);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_load() {
        let cache = TableCache::new(1, Duration::hours(24));
        let loads = AtomicUsize::new(0);

        let load = || async {
            loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(vec![row("2020-01")])
        };

        let (a, b) = tokio::join!(cache.get_or_fetch_with(load), cache.get_or_fetch_with(load));
        assert_eq!(a.unwrap().len(), 1);
        assert_eq!(b.unwrap().len(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_leaves_cache_empty() {
        let cache = TableCache::new(1, Duration::hours(24));
        let loads = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch_with(|| async {
                loads.fetch_add(1, Ordering::SeqCst);
                Err(LoadError::Archive(ArchiveError::MemberNotFound {
                    name: "1.csv".to_string(),
                }))
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Archive(ArchiveError::MemberNotFound { .. })
        ));

        // Next request loads again rather than serving a poisoned entry.
        let rows = cache
            .get_or_fetch_with(|| async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(vec![row("2020-01")])
            })
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
