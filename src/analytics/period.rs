/// Period filtering: restrict a show + history universe to a (month, year)
/// window or all time, and bucket histories by event id.

use std::collections::{HashMap, HashSet};

use crate::models::{SeatHistoryRecord, Show};

/// History observations grouped by `Show.id`. Bucket contents carry no
/// ordering guarantee; consumers sort by timestamp themselves.
pub type HistoryBuckets<'a> = HashMap<&'a str, Vec<&'a SeatHistoryRecord>>;

/// Keep only shows matching the period (`None` means all time) and bucket
/// their history rows.
///
/// `include_past` keeps soft-deleted (past/removed) shows in the result;
/// point-in-time reports leave it off, velocity and historical analysis
/// turn it on.
pub fn filter_by_period<'a>(
    shows: &'a [Show],
    histories: &'a [SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
) -> (Vec<&'a Show>, HistoryBuckets<'a>) {
    let filtered: Vec<&Show> = shows
        .iter()
        .filter(|s| match period {
            Some((month, year)) => s.month == month && s.year == year,
            None => true,
        })
        .filter(|s| include_past || !s.is_deleted)
        .collect();

    let kept_ids: HashSet<&str> = filtered.iter().map(|s| s.id.as_str()).collect();

    let mut buckets: HistoryBuckets = HashMap::new();
    for h in histories {
        if kept_ids.contains(h.show_id.as_str()) {
            buckets.entry(h.show_id.as_str()).or_default().push(h);
        }
    }

    (filtered, buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(id: &str, month: u32, year: i32, deleted: bool) -> Show {
        Show {
            id: id.to_string(),
            month,
            year,
            is_deleted: deleted,
            ..Default::default()
        }
    }

    #[test]
    fn month_filter_drops_other_periods_and_deleted() {
        let shows = vec![
            show("a", 1, 2024, false),
            show("b", 2, 2024, false),
            show("c", 1, 2024, true),
        ];
        let histories = vec![
            SeatHistoryRecord::new("a", 10, 5),
            SeatHistoryRecord::new("b", 10, 5),
            SeatHistoryRecord::new("c", 10, 5),
        ];

        let (kept, buckets) = filter_by_period(&shows, &histories, Some((1, 2024)), false);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "a");
        assert!(buckets.contains_key("a"));
        assert!(!buckets.contains_key("b"));
        assert!(!buckets.contains_key("c"));
    }

    #[test]
    fn include_past_keeps_deleted() {
        let shows = vec![show("a", 1, 2024, true)];
        let histories = vec![SeatHistoryRecord::new("a", 10, 5)];

        let (kept, buckets) = filter_by_period(&shows, &histories, Some((1, 2024)), true);
        assert_eq!(kept.len(), 1);
        assert_eq!(buckets.get("a").map(Vec::len), Some(1));
    }

    #[test]
    fn all_time_keeps_every_period() {
        let shows = vec![
            show("a", 1, 2024, false),
            show("b", 6, 2025, false),
            show("c", 6, 2025, true),
        ];
        let histories = vec![];

        let (kept, _) = filter_by_period(&shows, &histories, None, false);
        assert_eq!(kept.len(), 2);

        let (all, _) = filter_by_period(&shows, &histories, None, true);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn buckets_group_rows_per_event() {
        let shows = vec![show("a", 1, 2024, false)];
        let histories = vec![
            SeatHistoryRecord::new("a", 30, 3),
            SeatHistoryRecord::new("a", 10, 5),
            SeatHistoryRecord::new("orphan", 10, 5),
        ];

        let (_, buckets) = filter_by_period(&shows, &histories, None, false);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets.get("a").map(Vec::len), Some(2));
    }
}
