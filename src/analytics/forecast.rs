/// Sold-out forecasting: project the timestamp at which free seats reach
/// zero from the recent trend.
///
/// Primary method is a degree-2 polynomial fit over a 7-day window; when
/// no applicable quadratic root exists the forecaster falls back to linear
/// extrapolation at the window's average sales rate. Either way the result
/// is a point forecast validated against "now", the scheduled show date
/// and a one-year horizon.

use std::borrow::Borrow;

use chrono::Utc;

use super::rate::{collapse_min_spacing, MIN_SAMPLE_SPACING_SECS};
use super::reconstruct::sorted_points;
use super::regression::quadratic_fit;
use crate::models::SeatHistoryRecord;

const LOOKBACK_SECS: i64 = 7 * 24 * 3600;
const MAX_HORIZON_SECS: i64 = 365 * 24 * 3600;

/// A fitted parabola flatter than this is treated as linear; dividing by a
/// near-zero leading coefficient throws the root to numeric noise.
const MIN_LEADING_COEFF: f64 = 1e-9;

/// Quadratic window needs one more point than the generic minimum so the
/// fit is not exactly determined.
const QUADRATIC_MIN_POINTS: usize = 4;

fn admissible(candidate: i64, show_ts: Option<i64>, now_ts: i64) -> bool {
    if let Some(show) = show_ts {
        if candidate > show {
            return false;
        }
    }
    candidate > now_ts && candidate <= now_ts + MAX_HORIZON_SECS
}

/// Root of the fitted parabola beyond the last observation, if any.
fn quadratic_candidate(points: &[(i64, i64)]) -> Option<i64> {
    if points.len() < QUADRATIC_MIN_POINTS {
        return None;
    }

    let t_min = points[0].0;
    let xs: Vec<f64> = points.iter().map(|p| (p.0 - t_min) as f64 / 3600.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1 as f64).collect();

    let (a, b, c) = quadratic_fit(&xs, &ys)?;
    if a.abs() < MIN_LEADING_COEFF {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = (-b - discriminant.sqrt()) / (2.0 * a);
    let last_x = xs[xs.len() - 1];
    if root <= last_x {
        return None;
    }

    Some(t_min + (root * 3600.0) as i64)
}

/// Extrapolate linearly at the window's average sold-per-second rate.
fn linear_candidate(points: &[(i64, i64)]) -> Option<i64> {
    let (first, last) = (points.first()?, points.last()?);
    let total_time = last.0 - first.0;
    let total_sold = first.1 - last.1;
    if total_time <= 0 || total_sold <= 0 {
        return None;
    }

    let avg_rate = total_sold as f64 / total_time as f64;
    let seconds_left = last.1 as f64 / avg_rate;
    if seconds_left <= 0.0 || seconds_left >= MAX_HORIZON_SECS as f64 {
        return None;
    }

    Some(last.0 + seconds_left as i64)
}

/// Forecast the unix timestamp at which the show sells out, or `None` when
/// no admissible forecast exists.
///
/// `show_ts` caps the forecast at the scheduled performance time when
/// known. `now_ts` defaults to the current wall clock; tests pin it.
///
/// When the quadratic fit produces a future root that then fails the
/// sanity checks, the forecast is rejected outright rather than handed to
/// the linear fallback; the fallback only covers windows where no usable
/// parabola exists.
pub fn forecast_sold_out<R: Borrow<SeatHistoryRecord>>(
    history: &[R],
    show_ts: Option<i64>,
    now_ts: Option<i64>,
) -> Option<i64> {
    if history.len() < 3 {
        return None;
    }

    let points = sorted_points(history);
    let now = now_ts.unwrap_or_else(|| Utc::now().timestamp());

    let cutoff = points[0].0.max(now - LOOKBACK_SECS);
    let mut recent: Vec<(i64, i64)> = points.iter().copied().filter(|p| p.0 >= cutoff).collect();
    if recent.len() < 3 {
        // Too little inside the window; use the freshest raw samples.
        recent = points[points.len().saturating_sub(10)..].to_vec();
    }

    let spaced = collapse_min_spacing(&recent, MIN_SAMPLE_SPACING_SECS);

    if let Some(candidate) = quadratic_candidate(&spaced) {
        return admissible(candidate, show_ts, now).then_some(candidate);
    }

    let candidate = linear_candidate(&spaced)?;
    admissible(candidate, show_ts, now).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = 3600;

    fn hist(rows: &[(i64, i64)]) -> Vec<SeatHistoryRecord> {
        rows.iter()
            .map(|&(ts, seats)| SeatHistoryRecord::new("s1", ts, seats))
            .collect()
    }

    /// seats(t) = 100 - t^2 in hours: accelerating decline, hits zero at
    /// t = 10h.
    fn accelerating() -> Vec<SeatHistoryRecord> {
        hist(
            &(0..6)
                .map(|i| (i * HOUR, 100 - i * i))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn quadratic_path_projects_root() {
        let h = accelerating();
        let forecast = forecast_sold_out(&h, None, Some(5 * HOUR)).unwrap();
        // Exact fit, root at 10 hours.
        assert!((forecast - 10 * HOUR).abs() < 60, "got {forecast}");
    }

    #[test]
    fn forecast_is_future_and_before_show() {
        let h = accelerating();
        let now = 5 * HOUR;
        let show = 20 * HOUR;
        let forecast = forecast_sold_out(&h, Some(show), Some(now)).unwrap();
        assert!(forecast > now);
        assert!(forecast <= show);
    }

    #[test]
    fn show_date_caps_the_forecast() {
        let h = accelerating();
        // Show scheduled before the projected sell-out: no forecast.
        assert!(forecast_sold_out(&h, Some(8 * HOUR), Some(5 * HOUR)).is_none());
    }

    #[test]
    fn rerun_at_predicted_moment_is_none() {
        let h = accelerating();
        let first = forecast_sold_out(&h, None, Some(5 * HOUR)).unwrap();
        // Pretend we are already at the predicted sell-out moment: the
        // same root is no longer in the future and nothing further-future
        // can be derived.
        assert!(forecast_sold_out(&h, None, Some(first)).is_none());
    }

    #[test]
    fn linear_fallback_with_three_points() {
        // 100 -> 90 -> 80 hourly: 10/h, 80 seats left, sold out 8h after
        // the last observation.
        let h = hist(&[(0, 100), (HOUR, 90), (2 * HOUR, 80)]);
        let forecast = forecast_sold_out(&h, None, Some(2 * HOUR)).unwrap();
        assert_eq!(forecast, 2 * HOUR + 8 * 3600);
    }

    #[test]
    fn linear_fallback_rerun_is_none() {
        let h = hist(&[(0, 100), (HOUR, 90), (2 * HOUR, 80)]);
        let first = forecast_sold_out(&h, None, Some(2 * HOUR)).unwrap();
        assert!(forecast_sold_out(&h, None, Some(first)).is_none());
    }

    #[test]
    fn too_little_data_is_none() {
        assert!(forecast_sold_out::<SeatHistoryRecord>(&[], None, Some(0)).is_none());
        assert!(forecast_sold_out(&hist(&[(0, 10), (HOUR, 5)]), None, Some(HOUR)).is_none());
    }

    #[test]
    fn rising_seats_is_none() {
        let h = hist(&[(0, 50), (HOUR, 60), (2 * HOUR, 70)]);
        assert!(forecast_sold_out(&h, None, Some(2 * HOUR)).is_none());
    }

    #[test]
    fn forecast_beyond_a_year_is_rejected() {
        // One ticket per hour with a huge inventory: sell-out is years out.
        let h = hist(&[(0, 100_000), (HOUR, 99_999), (2 * HOUR, 99_998)]);
        assert!(forecast_sold_out(&h, None, Some(2 * HOUR)).is_none());
    }
}
