/// Robust estimation of the current ticket-sales velocity.
///
/// Two regimes over a lookback window: a filtered linear regression with
/// MAD-based outlier clipping when enough well-spaced samples exist, and a
/// recency-weighted average of interval rates otherwise. Output is always
/// tickets/second, never negative.

use std::borrow::Borrow;

use tracing::warn;

use super::reconstruct::sorted_points;
use super::regression::{linear_fit, median, median_abs_deviation, std_dev};
use crate::models::SeatHistoryRecord;

/// Samples closer together than this are collapsed before estimation; the
/// poller runs far more often than demand actually moves, and the
/// quantization noise otherwise dominates short intervals.
pub const MIN_SAMPLE_SPACING_SECS: i64 = 900;

/// Default analysis window for "current" velocity.
pub const DEFAULT_LOOKBACK_HOURS: f64 = 24.0;

/// Regression needs this many well-spaced points to beat the weighted
/// average on noisy data.
const REGRESSION_MIN_POINTS: usize = 7;

const MAD_CLIP_FACTOR: f64 = 3.0;
const STD_CLIP_FACTOR: f64 = 2.0;

/// Drop points closer than `MIN_SAMPLE_SPACING_SECS` to the previously
/// kept one. Input must be sorted by timestamp.
pub(crate) fn collapse_min_spacing(points: &[(i64, i64)], min_spacing: i64) -> Vec<(i64, i64)> {
    let mut kept: Vec<(i64, i64)> = Vec::with_capacity(points.len());
    for &p in points {
        match kept.last() {
            Some(&(last_ts, _)) if p.0 - last_ts < min_spacing => {}
            _ => kept.push(p),
        }
    }
    kept
}

/// Regression-based rate in tickets/second: fit seats against hours, clip
/// residual outliers at 3x MAD (2x STD when MAD collapses to zero), refit
/// on the survivors. `None` when the fit is degenerate.
fn regression_rate(points: &[(i64, i64)]) -> Option<f64> {
    let t0 = points[0].0;
    let xs: Vec<f64> = points.iter().map(|p| (p.0 - t0) as f64 / 3600.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1 as f64).collect();

    let (mut slope, intercept) = linear_fit(&xs, &ys)?;

    let residuals: Vec<f64> = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| y - (slope * x + intercept))
        .collect();

    let center = median(&residuals).unwrap_or(0.0);
    let mad = median_abs_deviation(&residuals).unwrap_or(0.0);

    let keep: Vec<bool> = if mad > f64::EPSILON {
        residuals
            .iter()
            .map(|r| (r - center).abs() <= MAD_CLIP_FACTOR * mad)
            .collect()
    } else {
        let sd = std_dev(&residuals);
        residuals
            .iter()
            .map(|r| sd <= f64::EPSILON || r.abs() <= STD_CLIP_FACTOR * sd)
            .collect()
    };

    let clipped_xs: Vec<f64> = xs
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(&x, _)| x)
        .collect();
    let clipped_ys: Vec<f64> = ys
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(&y, _)| y)
        .collect();

    if clipped_xs.len() >= 2 && clipped_xs.len() < xs.len() {
        if let Some((refit_slope, _)) = linear_fit(&clipped_xs, &clipped_ys) {
            slope = refit_slope;
        }
    }

    // slope is seats/hour; selling means a negative slope.
    Some((-slope / 3600.0).max(0.0))
}

/// Recency-weighted average of per-interval rates, used below the
/// regression threshold. Intervals are weighted by
/// `exp(-age_hours / (lookback / 2))`.
fn weighted_interval_rate(points: &[(i64, i64)], latest_ts: i64, lookback_hours: f64) -> Option<f64> {
    let mut rates = Vec::new();
    let mut weights = Vec::new();

    for pair in points.windows(2) {
        let dt = pair[1].0 - pair[0].0;
        if dt <= 0 {
            continue;
        }
        let rate = (pair[0].1 - pair[1].1) as f64 / dt as f64;
        let age_hours = (latest_ts - pair[1].0) as f64 / 3600.0;
        rates.push(rate);
        weights.push((-age_hours / (lookback_hours / 2.0)).exp());
    }

    if rates.is_empty() || !rates.iter().any(|r| *r > 0.0) {
        return None;
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return None;
    }
    let avg = rates
        .iter()
        .zip(&weights)
        .map(|(r, w)| r * w)
        .sum::<f64>()
        / weight_sum;

    if avg > 0.0 {
        Some(avg)
    } else {
        None
    }
}

/// Estimate the current sales velocity in tickets/second from a history
/// window of `lookback_hours` before the latest observation.
///
/// `None` when fewer than two well-spaced points remain, when the trend is
/// flat or reversed, or when the lookback is non-positive (a caller bug,
/// logged rather than panicked on).
pub fn estimate_sales_rate<R: Borrow<SeatHistoryRecord>>(
    history: &[R],
    lookback_hours: f64,
) -> Option<f64> {
    if lookback_hours <= 0.0 {
        warn!(lookback_hours, "estimate_sales_rate called with non-positive lookback");
        return None;
    }
    if history.len() < 2 {
        return None;
    }

    let points = sorted_points(history);
    let latest_ts = points[points.len() - 1].0;
    let cutoff = latest_ts - (lookback_hours * 3600.0) as i64;

    let recent: Vec<(i64, i64)> = points.into_iter().filter(|p| p.0 >= cutoff).collect();
    if recent.len() < 2 {
        return None;
    }

    let spaced = collapse_min_spacing(&recent, MIN_SAMPLE_SPACING_SECS);
    if spaced.len() < 2 {
        return None;
    }

    if spaced.len() >= REGRESSION_MIN_POINTS {
        if let Some(rate) = regression_rate(&spaced) {
            return if rate > 0.0 { Some(rate) } else { None };
        }
        // Degenerate fit, fall through to the weighted average.
    }

    weighted_interval_rate(&spaced, latest_ts, lookback_hours)
}
