/// Data model shared by the snapshot service and the analytics engine

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One ticketed event instance, latest snapshot state.
///
/// `id` is unique per scheduled performance; `show_id` groups the dated
/// performances of one production and may be absent, in which case `id`
/// doubles as the group key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    pub show_id: Option<String>,
    pub show_name: String,
    pub theater: String,
    pub scene: String,
    /// Free-text date, multiple upstream formats. See `analytics::dates`.
    pub date: String,
    pub duration: String,
    pub age: String,
    /// JSON-encoded list of actor names, may contain honorific titles.
    pub actors: String,
    pub image: String,
    pub annotation: String,
    pub buy_link: String,
    /// Current free-seat count.
    pub seats: i64,
    /// Seat count from the previous snapshot, if any.
    pub previous_seats: Option<i64>,
    pub min_price: i64,
    pub max_price: i64,
    pub pushkin: bool,
    /// Denormalized from `date` for fast period filtering.
    pub month: u32,
    pub year: i32,
    /// Unix timestamp of the last snapshot write.
    pub updated_at: i64,
    /// Set when the event drops out of the upstream feed.
    pub is_deleted: bool,
}

impl Default for Show {
    fn default() -> Self {
        Self {
            id: String::new(),
            show_id: None,
            show_name: String::new(),
            theater: String::new(),
            scene: String::new(),
            date: String::new(),
            duration: String::new(),
            age: String::new(),
            actors: "[]".to_string(),
            image: String::new(),
            annotation: String::new(),
            buy_link: String::new(),
            seats: 0,
            previous_seats: None,
            min_price: 0,
            max_price: 0,
            pushkin: false,
            month: 1,
            year: 1970,
            updated_at: 0,
            is_deleted: false,
        }
    }
}

impl Show {
    /// Decode the JSON `actors` column. Malformed payloads are logged and
    /// yield an empty list rather than failing the caller.
    pub fn actor_list(&self) -> Vec<String> {
        if self.actors.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<serde_json::Value>(&self.actors) {
            Ok(serde_json::Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Ok(_) => {
                warn!(show = %self.id, "actors column is not a JSON list, ignoring");
                Vec::new()
            }
            Err(e) => {
                warn!(show = %self.id, error = %e, "failed to decode actors JSON");
                Vec::new()
            }
        }
    }
}

/// One append-only seat observation for a single event.
///
/// `show_id` references `Show.id` (the per-event identity, not the group
/// key). A single row carries no signal; at least two are needed for a
/// delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatHistoryRecord {
    pub show_id: String,
    pub timestamp: i64,
    pub seats: i64,
}

impl SeatHistoryRecord {
    pub fn new(show_id: impl Into<String>, timestamp: i64, seats: i64) -> Self {
        Self {
            show_id: show_id.into(),
            timestamp,
            seats,
        }
    }
}

/// The key used to merge repeated performances of one production into a
/// single ranking entry: `show_id` when present and non-empty, the event
/// `id` otherwise. Every report uses this one function.
pub fn group_key(show: &Show) -> &str {
    match &show.show_id {
        Some(gid) if !gid.is_empty() => gid,
        _ => &show.id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_key_prefers_show_id() {
        let show = Show {
            id: "e1".to_string(),
            show_id: Some("g7".to_string()),
            ..Default::default()
        };
        assert_eq!(group_key(&show), "g7");
    }

    #[test]
    fn group_key_falls_back_to_id() {
        let bare = Show {
            id: "e1".to_string(),
            show_id: None,
            ..Default::default()
        };
        assert_eq!(group_key(&bare), "e1");

        let empty = Show {
            id: "e2".to_string(),
            show_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(group_key(&empty), "e2");
    }

    #[test]
    fn actor_list_decodes_names() {
        let show = Show {
            actors: r#"["Иван Петров", "Мария Иванова"]"#.to_string(),
            ..Default::default()
        };
        assert_eq!(show.actor_list(), vec!["Иван Петров", "Мария Иванова"]);
    }

    #[test]
    fn actor_list_tolerates_garbage() {
        let broken = Show {
            actors: "{not json".to_string(),
            ..Default::default()
        };
        assert!(broken.actor_list().is_empty());

        let not_a_list = Show {
            actors: r#"{"a": 1}"#.to_string(),
            ..Default::default()
        };
        assert!(not_a_list.actor_list().is_empty());

        let blank = Show {
            actors: String::new(),
            ..Default::default()
        };
        assert!(blank.actor_list().is_empty());
    }
}
