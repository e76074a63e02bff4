// src/stats/mod.rs

use serde::Serialize;
use std::collections::HashMap;

use crate::series::Observation;

/// Deepest peak-to-trough decline of a series, with recovery tracking.
///
/// The default value is the degenerate result for series with fewer than
/// two observations: zero drawdown, no periods. When `recovered` is true,
/// `recovery_period` is set and falls after `trough_period`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Drawdown {
    pub max_drawdown_pct: f64,
    pub peak_period: Option<String>,
    pub trough_period: Option<String>,
    pub recovery_period: Option<String>,
    pub recovered: bool,
    pub duration_months: i32,
}

/// Per-geography statistics card: the four metrics over one series.
#[derive(Debug, Clone, Serialize)]
pub struct GeoSummary {
    pub geo: String,
    pub latest: f64,
    pub total_growth_pct: f64,
    /// `None` when the opening value makes the rate undefined.
    pub cagr_pct: Option<f64>,
    pub years: f64,
    pub drawdown: Drawdown,
}

/// Cumulative growth from the first to the last observation, in percent.
/// `0.0` for series with fewer than two observations.
pub fn total_growth(series: &[Observation]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let first = series[0].value;
    let last = series[series.len() - 1].value;
    (last - first) / first * 100.0
}

/// Compound annual growth rate, in percent.
///
/// The year divisor is the observation count over 12, not the elapsed
/// calendar span; the two agree only on gap-free monthly series, and this
/// dataset is one. `Some(0.0)` for fewer than two observations; `None`
/// when the opening or closing value is not positive (the rate is
/// undefined there, and a NaN must never reach a renderer).
pub fn cagr(series: &[Observation]) -> Option<f64> {
    if series.len() < 2 {
        return Some(0.0);
    }
    let first = series[0].value;
    let last = series[series.len() - 1].value;
    if first <= 0.0 || last <= 0.0 {
        return None;
    }
    let years = series.len() as f64 / 12.0;
    Some(((last / first).powf(1.0 / years) - 1.0) * 100.0)
}

/// Year-over-year change per observation, in percent, aligned with the
/// input.
///
/// The prior value is looked up at the period exactly one calendar year
/// back, not twelve positions earlier — the series may have gaps. A slot
/// is `None` when that period is absent or its value is exactly zero;
/// gaps must stay gaps downstream, never interpolated.
pub fn year_over_year(series: &[Observation]) -> Vec<Option<f64>> {
    let by_period: HashMap<&str, f64> = series
        .iter()
        .map(|obs| (obs.period.as_str(), obs.value))
        .collect();

    series
        .iter()
        .map(|obs| {
            let (year, month) = year_month(&obs.period)?;
            let prior_period = format!("{}-{:02}", year - 1, month);
            let prior = *by_period.get(prior_period.as_str())?;
            if prior == 0.0 {
                return None;
            }
            Some((obs.value - prior) / prior * 100.0)
        })
        .collect()
}

/// Single forward pass tracking the running peak; only the deepest
/// drawdown episode across the whole series is kept.
///
/// A value strictly above the running peak moves the peak (and with it
/// what any in-progress decline measures against). A value merely equal
/// to the peak does not move it, but does satisfy the recovery condition:
/// the recorded episode is marked recovered at the first later-than-trough
/// period whose value reaches the running peak again.
pub fn max_drawdown(series: &[Observation]) -> Drawdown {
    if series.len() < 2 {
        return Drawdown::default();
    }
    let first = &series[0];

    let mut worst = Drawdown {
        max_drawdown_pct: 0.0,
        peak_period: Some(first.period.clone()),
        trough_period: Some(first.period.clone()),
        recovery_period: None,
        recovered: false,
        duration_months: 0,
    };
    // Most negative drawdown seen so far.
    let mut deepest = 0.0f64;
    let mut running_peak = first.value;
    let mut running_peak_period = first.period.as_str();

    for obs in &series[1..] {
        if obs.value > running_peak {
            running_peak = obs.value;
            running_peak_period = obs.period.as_str();
        }

        let drawdown = (obs.value - running_peak) / running_peak * 100.0;
        if drawdown < deepest {
            deepest = drawdown;
            worst = Drawdown {
                max_drawdown_pct: drawdown.abs(),
                peak_period: Some(running_peak_period.to_string()),
                trough_period: Some(obs.period.clone()),
                recovery_period: None,
                recovered: false,
                duration_months: months_between(running_peak_period, &obs.period),
            };
        }

        if !worst.recovered && obs.value >= running_peak {
            if let Some(trough) = worst.trough_period.as_deref() {
                if obs.period.as_str() > trough {
                    worst.recovery_period = Some(obs.period.clone());
                    worst.recovered = true;
                }
            }
        }
    }

    worst
}

/// Calendar month difference between two `YYYY-MM` periods. `0` when
/// either period is malformed.
pub fn months_between(start: &str, end: &str) -> i32 {
    match (year_month(start), year_month(end)) {
        (Some((sy, sm)), Some((ey, em))) => (ey - sy) * 12 + (em as i32 - sm as i32),
        _ => 0,
    }
}

/// All four metrics for one geography. `None` below two observations,
/// matching where the stats are meaningful at all.
pub fn summarize(geo: &str, series: &[Observation]) -> Option<GeoSummary> {
    if series.len() < 2 {
        return None;
    }
    Some(GeoSummary {
        geo: geo.to_string(),
        latest: series[series.len() - 1].value,
        total_growth_pct: total_growth(series),
        cagr_pct: cagr(series),
        years: series.len() as f64 / 12.0,
        drawdown: max_drawdown(series),
    })
}

// Fast parse of "YYYY-MM" → (year, month). Never panics on odd input.
fn year_month(period: &str) -> Option<(i32, u32)> {
    if period.len() != 7 || period.as_bytes()[4] != b'-' {
        return None;
    }
    let year: i32 = period.get(0..4)?.parse().ok()?;
    let month: u32 = period.get(5..7)?.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}
