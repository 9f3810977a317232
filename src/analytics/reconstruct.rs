/// Sold / returned reconstruction from a seat-count time series.

use std::borrow::Borrow;

use crate::models::SeatHistoryRecord;

/// Collapse a history into `(ts, seats)` pairs sorted by timestamp.
pub(crate) fn sorted_points<R: Borrow<SeatHistoryRecord>>(history: &[R]) -> Vec<(i64, i64)> {
    let mut points: Vec<(i64, i64)> = history
        .iter()
        .map(|r| {
            let r = r.borrow();
            (r.timestamp, r.seats)
        })
        .collect();
    points.sort_by_key(|&(ts, _)| ts);
    points
}

/// Reconstruct `(sold, returned)` from a seat-count series.
///
/// Sums positive deltas (seats decreased) into `sold` and negative deltas
/// (seats increased) into `returned`, interval by interval. This is not
/// the endpoint difference: a sell-return-sell sequence yields gross sales
/// strictly above `first - last`. Fewer than two records give `(0, 0)`.
pub fn sales_and_returns<R: Borrow<SeatHistoryRecord>>(history: &[R]) -> (i64, i64) {
    if history.len() < 2 {
        return (0, 0);
    }

    let points = sorted_points(history);
    let mut sold = 0;
    let mut returned = 0;

    for pair in points.windows(2) {
        let delta = pair[0].1 - pair[1].1;
        if delta > 0 {
            sold += delta;
        } else if delta < 0 {
            returned += -delta;
        }
    }

    (sold, returned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(rows: &[(i64, i64)]) -> Vec<SeatHistoryRecord> {
        rows.iter()
            .map(|&(ts, seats)| SeatHistoryRecord::new("s1", ts, seats))
            .collect()
    }

    #[test]
    fn empty_and_single_are_zero() {
        assert_eq!(sales_and_returns::<SeatHistoryRecord>(&[]), (0, 0));
        assert_eq!(sales_and_returns(&hist(&[(10, 100)])), (0, 0));
    }

    #[test]
    fn monotonic_decrease_is_all_sold() {
        let h = hist(&[(10, 10), (20, 8), (30, 5)]);
        assert_eq!(sales_and_returns(&h), (5, 0));
    }

    #[test]
    fn oscillation_exceeds_endpoint_difference() {
        // 100 -> 90 -> 95 -> 85: interval summation sees 20 sold and 5
        // returned, the naive endpoint diff only 15.
        let h = hist(&[(10, 100), (20, 90), (30, 95), (40, 85)]);
        let (sold, returned) = sales_and_returns(&h);
        assert_eq!((sold, returned), (20, 5));

        let endpoint = 100 - 85;
        assert_ne!(sold, endpoint);
        assert_eq!(sold - returned, endpoint);
    }

    #[test]
    fn returns_only() {
        let h = hist(&[(10, 100), (20, 90), (30, 95)]);
        assert_eq!(sales_and_returns(&h), (10, 5));
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let h = hist(&[(30, 5), (10, 10), (20, 8)]);
        assert_eq!(sales_and_returns(&h), (5, 0));
    }

    #[test]
    fn flat_series_contributes_nothing() {
        let h = hist(&[(10, 7), (20, 7), (30, 7)]);
        assert_eq!(sales_and_returns(&h), (0, 0));
    }
}
