/// Aggregation and ranking reports over the show + seat-history universe.
///
/// All reports share the period filter and the reconstructor, group
/// repeated performances of one production via `models::group_key`, and
/// degrade to empty output (or `None` for single-entity lookups) when no
/// qualifying data exists.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use super::dates::parse_show_date;
use super::forecast::forecast_sold_out;
use super::period::filter_by_period;
use super::rate::{estimate_sales_rate, DEFAULT_LOOKBACK_HOURS};
use super::reconstruct::sales_and_returns;
use crate::models::{group_key, SeatHistoryRecord, Show};

/// Honorific titles and awards that the feed mixes into actor lists.
/// Matched as lowercase substrings, never ranked as artists.
const TITLES_TO_SKIP: [&str; 7] = [
    "народный артист россии",
    "народная артистка россии",
    "заслуженный артист россии",
    "заслуженная артистка россии",
    "лауреат государственных премий",
    "заслуженный деятель искусств",
    "лауреат премии",
];

/// Shows below this gross activity are noise for the return-rate ranking.
const MIN_SOLD_FOR_RETURN_RATE: i64 = 10;

/// Velocity ranking needs this many raw history rows per show to even try.
const MIN_ROWS_FOR_VELOCITY: usize = 3;

/// Per-group sales accumulator; replaces the dict-of-dicts shape the
/// reports would otherwise grow.
#[derive(Debug, Clone)]
struct ShowSales {
    name: String,
    gross: i64,
    net: i64,
    id: String,
}

fn desc_then_name(metric_cmp: Ordering, a_name: &str, b_name: &str) -> Ordering {
    metric_cmp.then_with(|| a_name.cmp(b_name))
}

/// Top productions by gross tickets sold, `(name, gross, group id)`.
pub fn top_shows_by_sales(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    n: usize,
) -> Vec<(String, i64, String)> {
    top_shows_by_sales_detailed(shows, histories, period, n)
        .into_iter()
        .map(|(name, gross, _net, id)| (name, gross, id))
        .collect()
}

/// Top productions by gross sales with the net figure alongside,
/// `(name, gross, net, group id)`, descending by gross.
pub fn top_shows_by_sales_detailed(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    n: usize,
) -> Vec<(String, i64, i64, String)> {
    let (filtered, buckets) = filter_by_period(shows, histories, period, false);

    let mut sales: HashMap<&str, ShowSales> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= 2 => rows,
            _ => continue,
        };
        let (sold, returned) = sales_and_returns(rows);
        if sold <= 0 {
            continue;
        }
        let key = group_key(show);
        let entry = sales.entry(key).or_insert_with(|| ShowSales {
            name: show.show_name.clone(),
            gross: 0,
            net: 0,
            id: key.to_string(),
        });
        entry.gross += sold;
        entry.net += sold - returned;
    }

    let mut ordered: Vec<ShowSales> = sales.into_values().collect();
    ordered.sort_by(|a, b| desc_then_name(b.gross.cmp(&a.gross), &a.name, &b.name));
    ordered
        .into_iter()
        .take(n)
        .map(|s| (s.name, s.gross, s.net, s.id))
        .collect()
}

/// Top productions by returned tickets, `(name, returned, group id)`.
pub fn top_shows_by_returns(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
    n: usize,
) -> Vec<(String, i64, String)> {
    let (filtered, buckets) = filter_by_period(shows, histories, period, include_past);

    let mut returns: HashMap<&str, ShowSales> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= 2 => rows,
            _ => continue,
        };
        let (_, returned) = sales_and_returns(rows);
        if returned <= 0 {
            continue;
        }
        let key = group_key(show);
        let entry = returns.entry(key).or_insert_with(|| ShowSales {
            name: show.show_name.clone(),
            gross: 0,
            net: 0,
            id: key.to_string(),
        });
        entry.gross += returned;
    }

    let mut ordered: Vec<ShowSales> = returns.into_values().collect();
    ordered.sort_by(|a, b| desc_then_name(b.gross.cmp(&a.gross), &a.name, &b.name));
    ordered
        .into_iter()
        .take(n)
        .map(|s| (s.name, s.gross, s.id))
        .collect()
}

/// Top productions by return rate (`returned / sold`), `(name, rate, group
/// id)`. Shows with fewer than 10 gross sales are skipped as noise; rates
/// of repeated performances merge as a running weighted average.
pub fn top_shows_by_return_rate(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
    n: usize,
) -> Vec<(String, f64, String)> {
    struct RateAcc {
        name: String,
        rate: f64,
        weight: f64,
        id: String,
    }

    let (filtered, buckets) = filter_by_period(shows, histories, period, include_past);

    let mut stats: HashMap<&str, RateAcc> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= 2 => rows,
            _ => continue,
        };
        let (sold, returned) = sales_and_returns(rows);
        if sold < MIN_SOLD_FOR_RETURN_RATE {
            continue;
        }
        let rate = returned as f64 / sold as f64;
        let weight = sold as f64;

        let key = group_key(show);
        match stats.get_mut(key) {
            Some(acc) => {
                let total = acc.weight + weight;
                acc.rate = (acc.rate * acc.weight + rate * weight) / total;
                acc.weight = total;
            }
            None => {
                stats.insert(
                    key,
                    RateAcc {
                        name: show.show_name.clone(),
                        rate,
                        weight,
                        id: key.to_string(),
                    },
                );
            }
        }
    }

    let mut ordered: Vec<RateAcc> = stats.into_values().collect();
    ordered.sort_by(|a, b| {
        desc_then_name(
            b.rate.partial_cmp(&a.rate).unwrap_or(Ordering::Equal),
            &a.name,
            &b.name,
        )
    });
    ordered
        .into_iter()
        .take(n)
        .map(|s| (s.name, s.rate, s.id))
        .collect()
}

fn is_title(name_lower: &str) -> bool {
    TITLES_TO_SKIP.iter().any(|t| name_lower.contains(t))
}

/// Top artists by net tickets sold across every show they appear in,
/// `(name, net)`. Honorific titles in the actor lists are never ranked.
/// Names group case-insensitively, first-seen casing is displayed.
pub fn top_artists_by_sales(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
    n: usize,
) -> Vec<(String, i64)> {
    let (filtered, buckets) = filter_by_period(shows, histories, period, include_past);

    let mut totals: HashMap<String, (String, i64)> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= 2 => rows,
            _ => continue,
        };
        let (sold, returned) = sales_and_returns(rows);
        let net = sold - returned;
        if net <= 0 {
            continue;
        }

        for actor in show.actor_list() {
            let name = actor.trim();
            if name.is_empty() {
                continue;
            }
            let lower = name.to_lowercase();
            if is_title(&lower) {
                continue;
            }
            let entry = totals.entry(lower).or_insert_with(|| (name.to_string(), 0));
            entry.1 += net;
        }
    }

    let mut ordered: Vec<(String, i64)> = totals.into_values().collect();
    ordered.sort_by(|a, b| desc_then_name(b.1.cmp(&a.1), &a.0, &b.0));
    ordered.truncate(n);
    ordered
}

/// Top productions by current sales velocity in tickets/second,
/// `(name, rate, group id)`. Past shows are included when asked so
/// historical pace is visible; per-group rates average weighted by the
/// number of observed intervals behind each estimate.
pub fn top_shows_by_sales_velocity(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
    n: usize,
) -> Vec<(String, f64, String)> {
    struct SpeedAcc {
        name: String,
        rate: f64,
        weight: f64,
        id: String,
    }

    let (filtered, buckets) = filter_by_period(shows, histories, period, include_past);

    let mut speeds: HashMap<&str, SpeedAcc> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= MIN_ROWS_FOR_VELOCITY => rows,
            _ => continue,
        };
        let rate = match estimate_sales_rate(rows, DEFAULT_LOOKBACK_HOURS) {
            Some(r) if r > 0.0 => r,
            _ => continue,
        };
        let weight = (rows.len() - 1) as f64;

        let key = group_key(show);
        match speeds.get_mut(key) {
            Some(acc) => {
                let total = acc.weight + weight;
                acc.rate = (acc.rate * acc.weight + rate * weight) / total;
                acc.weight = total;
            }
            None => {
                speeds.insert(
                    key,
                    SpeedAcc {
                        name: show.show_name.clone(),
                        rate,
                        weight,
                        id: key.to_string(),
                    },
                );
            }
        }
    }

    let mut ordered: Vec<SpeedAcc> = speeds.into_values().collect();
    ordered.sort_by(|a, b| {
        desc_then_name(
            b.rate.partial_cmp(&a.rate).unwrap_or(Ordering::Equal),
            &a.name,
            &b.name,
        )
    });
    ordered
        .into_iter()
        .take(n)
        .map(|s| (s.name, s.rate, s.id))
        .collect()
}

/// Shows forecast to sell out soonest, `(name, forecast ts, event id, raw
/// date)`, ascending by forecast. Only future-dated shows with a parsable
/// date qualify; this report stays per event, not grouped.
pub fn soonest_sold_out(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    now_ts: Option<i64>,
    n: usize,
) -> Vec<(String, i64, String, String)> {
    let (filtered, buckets) = filter_by_period(shows, histories, period, false);
    let now = now_ts.unwrap_or_else(|| Utc::now().timestamp());

    let mut predictions: Vec<(String, i64, String, String)> = Vec::new();
    for show in &filtered {
        let show_dt = match parse_show_date(&show.date) {
            Some(dt) => dt,
            None => continue,
        };
        let show_ts = show_dt.and_utc().timestamp();
        if show_ts <= now {
            continue;
        }

        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= MIN_ROWS_FOR_VELOCITY => rows,
            _ => continue,
        };
        if let Some(ts) = forecast_sold_out(rows, Some(show_ts), Some(now)) {
            predictions.push((show.show_name.clone(), ts, show.id.clone(), show.date.clone()));
        }
    }

    predictions.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    predictions.truncate(n);
    predictions
}

/// Columnar per-date totals for the pace dashboard. Parallel arrays keep
/// the presentation layer free to plot or tabulate without reshaping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalendarPace {
    pub dates: Vec<String>,
    pub gross_sales: Vec<i64>,
    pub net_sales: Vec<i64>,
    pub refunds: Vec<i64>,
    pub show_names: Vec<Vec<String>>,
}

/// Demand curve per calendar date: gross/net/refund totals plus the names
/// contributing on each date. Dates sort chronologically via the parsed
/// show date; unparsable dates sort last by raw string. Empty input gives
/// the empty structure, never an error.
pub fn calendar_pace(
    shows: &[Show],
    histories: &[SeatHistoryRecord],
    period: Option<(u32, i32)>,
    include_past: bool,
) -> CalendarPace {
    #[derive(Default)]
    struct DayAcc {
        gross: i64,
        net: i64,
        refunds: i64,
        names: Vec<String>,
    }

    let (filtered, buckets) = filter_by_period(shows, histories, period, include_past);

    let mut days: HashMap<&str, DayAcc> = HashMap::new();
    for show in &filtered {
        let rows = match buckets.get(show.id.as_str()) {
            Some(rows) if rows.len() >= 2 => rows,
            _ => continue,
        };
        let (sold, returned) = sales_and_returns(rows);

        let acc = days.entry(show.date.as_str()).or_default();
        acc.gross += sold;
        acc.net += sold - returned;
        acc.refunds += returned;
        acc.names.push(show.show_name.clone());
    }

    let mut keys: Vec<&str> = days.keys().copied().collect();
    keys.sort_by(|a, b| match (parse_show_date(a), parse_show_date(b)) {
        (Some(da), Some(db)) => da.cmp(&db).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });

    let mut pace = CalendarPace::default();
    for key in keys {
        if let Some(acc) = days.remove(key) {
            pace.dates.push(key.to_string());
            pace.gross_sales.push(acc.gross);
            pace.net_sales.push(acc.net);
            pace.refunds.push(acc.refunds);
            pace.show_names.push(acc.names);
        }
    }
    pace
}

/// Gross/net financial rollup for one production across all its dated
/// performances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub group_id: String,
    pub show_names: Vec<String>,
    pub show_dates: Vec<String>,
    pub gross_sales: i64,
    pub net_sales: i64,
    pub total_refunds: i64,
    /// Refunds as a percentage of gross, rounded to 2 decimals.
    pub refund_rate_percent: f64,
    /// Current velocity scaled to tickets/hour, rounded to 2 decimals.
    pub sales_rate_per_hour: Option<f64>,
    pub performances: usize,
}

/// Financial summary for the production identified by `group_id`. `None`
/// when the production is unknown or has zero gross sales.
pub fn show_financial_summary(
    group_id: &str,
    shows: &[Show],
    histories: &[SeatHistoryRecord],
) -> Option<FinancialSummary> {
    let targets: Vec<&Show> = shows
        .iter()
        .filter(|s| group_key(s) == group_id && !s.is_deleted)
        .collect();
    if targets.is_empty() {
        return None;
    }

    let mut gross = 0;
    let mut net = 0;
    let mut refunds = 0;
    let mut names: Vec<String> = Vec::new();
    let mut dates: Vec<String> = Vec::new();
    let mut pooled: Vec<&SeatHistoryRecord> = Vec::new();

    for show in &targets {
        let rows: Vec<&SeatHistoryRecord> = histories
            .iter()
            .filter(|h| h.show_id == show.id)
            .collect();
        if rows.len() < 2 {
            continue;
        }

        let (sold, returned) = sales_and_returns(&rows);
        gross += sold;
        refunds += returned;
        net += sold - returned;
        dates.push(show.date.clone());
        if !names.contains(&show.show_name) {
            names.push(show.show_name.clone());
        }
        pooled.extend(rows);
    }

    if gross == 0 {
        return None;
    }

    let refund_rate_percent = (refunds as f64 / gross as f64 * 10_000.0).round() / 100.0;
    let sales_rate_per_hour = estimate_sales_rate(&pooled, DEFAULT_LOOKBACK_HOURS)
        .map(|r| (r * 3600.0 * 100.0).round() / 100.0);

    Some(FinancialSummary {
        group_id: group_id.to_string(),
        show_names: names,
        show_dates: dates,
        gross_sales: gross,
        net_sales: net,
        total_refunds: refunds,
        refund_rate_percent,
        sales_rate_per_hour,
        performances: targets.len(),
    })
}
