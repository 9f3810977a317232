/// Show date parsing: the upstream feed mixes ISO timestamps with a
/// Russian natural-language format like "20 мая 2025, вт, 20:00".

use chrono::NaiveDateTime;
use tracing::warn;

/// Genitive month names as the widget renders them.
const MONTHS_RU: [(&str, u32); 12] = [
    ("января", 1),
    ("февраля", 2),
    ("марта", 3),
    ("апреля", 4),
    ("мая", 5),
    ("июня", 6),
    ("июля", 7),
    ("августа", 8),
    ("сентября", 9),
    ("октября", 10),
    ("ноября", 11),
    ("декабря", 12),
];

fn month_from_ru(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS_RU
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|&(_, m)| m)
}

/// "20 мая 2025, вт, 20:00" -> datetime. The weekday token is ignored.
fn parse_ru_format(text: &str) -> Option<NaiveDateTime> {
    let mut parts = text.split(',');
    let date_part = parts.next()?.trim();
    let _weekday = parts.next()?;
    let time_part = parts.next()?.trim();

    let mut tokens = date_part.split_whitespace();
    let day: u32 = tokens.next()?.parse().ok()?;
    let month = month_from_ru(tokens.next()?)?;
    let year: i32 = tokens.next()?.parse().ok()?;

    let (hour_s, minute_s) = time_part.split_once(':')?;
    let hour: u32 = hour_s.trim().parse().ok()?;
    let minute: u32 = minute_s.trim().parse().ok()?;

    chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

/// Parse a free-text show date. Tries ISO-8601 (with or without a UTC
/// offset), then `YYYY-MM-DD HH:MM`, then the Russian widget format.
/// Offset-bearing timestamps normalize to UTC. Unparsable input logs a
/// warning and returns `None`; callers treat such shows as unschedulable
/// rather than failing the whole report.
pub fn parse_show_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M") {
        return Some(dt);
    }
    if let Some(dt) = parse_ru_format(text) {
        return Some(dt);
    }

    warn!(date = %text, "failed to parse show date in any known format");
    None
}
