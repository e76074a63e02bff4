// src/series/mod.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::extract::RawRow;

/// Header column holding the reference period (`YYYY-MM`).
pub const REF_DATE: &str = "REF_DATE";
/// Header column holding the geography name (city or province).
pub const GEO: &str = "GEO";
/// Header column holding the index value (or the ".." sentinel).
pub const VALUE: &str = "VALUE";
/// Header column holding the index-variant label.
pub const INDEX_TYPE: &str = "New housing price indexes";

/// The composite index variant, the default selection.
pub const TOTAL_INDEX: &str = "Total (house and land)";

/// Not-available sentinel used by the dataset's value column.
const NOT_AVAILABLE: &str = "..";

static PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());

/// One monthly observation of a geography's index. Period ordering is
/// lexicographic, which for `YYYY-MM` is chronological.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub period: String,
    pub value: f64,
}

/// What the caller wants out of the raw table. Rebuilt on every change of
/// index variant, date range, or geography selection.
#[derive(Debug, Clone)]
pub struct SeriesFilter {
    pub index_type: String,
    /// Inclusive `YYYY-MM` bounds.
    pub start: String,
    pub end: String,
    pub geos: Vec<String>,
}

/// Organize raw rows into one sorted observation series per requested
/// geography.
///
/// Keeps rows matching the filter's index variant, geography set, and
/// period range; the ".." sentinel, empty or non-numeric value tokens, and
/// malformed periods never produce an observation. Each series is sorted
/// by period with duplicate periods collapsed (first occurrence wins), so
/// downstream analytics see strictly increasing, unique periods. Every
/// requested geography gets an entry, possibly empty.
pub fn organize(rows: &[RawRow], filter: &SeriesFilter) -> BTreeMap<String, Vec<Observation>> {
    let wanted: HashSet<&str> = filter.geos.iter().map(String::as_str).collect();

    let mut by_geo: BTreeMap<String, Vec<Observation>> = filter
        .geos
        .iter()
        .map(|geo| (geo.clone(), Vec::new()))
        .collect();

    for row in rows {
        let (Some(period), Some(geo), Some(index_type), Some(token)) = (
            row.get(REF_DATE),
            row.get(GEO),
            row.get(INDEX_TYPE),
            row.get(VALUE),
        ) else {
            continue;
        };
        if index_type != &filter.index_type || !wanted.contains(geo.as_str()) {
            continue;
        }
        if !PERIOD_RE.is_match(period) || *period < filter.start || *period > filter.end {
            continue;
        }
        let Some(value) = parse_value(token) else {
            continue;
        };
        if let Some(series) = by_geo.get_mut(geo) {
            series.push(Observation {
                period: period.clone(),
                value,
            });
        }
    }

    for series in by_geo.values_mut() {
        series.sort_by(|a, b| a.period.cmp(&b.period));
        series.dedup_by(|a, b| a.period == b.period);
    }

    by_geo
}

/// Earliest and latest valid `YYYY-MM` periods present in the table.
pub fn period_range(rows: &[RawRow]) -> Option<(String, String)> {
    let mut range: Option<(String, String)> = None;
    for row in rows {
        let Some(period) = row.get(REF_DATE) else {
            continue;
        };
        if !PERIOD_RE.is_match(period) {
            continue;
        }
        range = Some(match range {
            None => (period.clone(), period.clone()),
            Some((min, max)) => (
                if *period < min { period.clone() } else { min },
                if *period > max { period.clone() } else { max },
            ),
        });
    }
    range
}

/// Sorted unique geography names present in the table.
pub fn distinct_geos(rows: &[RawRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(GEO))
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

fn parse_value(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}
