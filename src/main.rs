use anyhow::Result;
use chrono::Duration;
use nhpiscraper::{
    cache::TableCache,
    fetch::DEFAULT_TABLE_ID,
    series::{self, SeriesFilter, TOTAL_INDEX},
    stats,
};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) build client + cache ─────────────────────────────────────
    let client = Client::new();
    let cache = TableCache::new(DEFAULT_TABLE_ID, Duration::hours(24));

    // ─── 3) load the table ───────────────────────────────────────────
    let rows = cache.get_or_fetch(&client).await?;
    if rows.is_empty() {
        anyhow::bail!("table {} parsed to zero rows", DEFAULT_TABLE_ID);
    }

    // ─── 4) organize per-geography series ────────────────────────────
    let (start, end) = series::period_range(&rows)
        .ok_or_else(|| anyhow::anyhow!("no valid reference periods in table"))?;
    let geos = series::distinct_geos(&rows);
    info!(geos = geos.len(), %start, %end, "table coverage");

    let filter = SeriesFilter {
        index_type: TOTAL_INDEX.to_string(),
        start,
        end,
        geos,
    };
    let by_geo = series::organize(&rows, &filter);

    // ─── 5) per-geography statistics ─────────────────────────────────
    let mut summaries = Vec::new();
    for (geo, obs) in &by_geo {
        match stats::summarize(geo, obs) {
            Some(summary) => summaries.push(summary),
            None => warn!(geo = %geo, points = obs.len(), "not enough observations"),
        }
    }
    summaries.sort_by(|a, b| b.total_growth_pct.total_cmp(&a.total_growth_pct));

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    info!(geos = summaries.len(), "done");
    Ok(())
}
