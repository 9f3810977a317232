/// Snapshot service: turns connector output into `Show` rows and appends
/// the seat-history ledger, one cycle per polling interval.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::connector::{ConnectorError, EventInfo, TicketingClient};
use crate::models::{SeatHistoryRecord, Show};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("connector failure: {0}")]
    Connector(#[from] ConnectorError),
}

/// Where snapshots land. The ledger is append-only: history records are
/// written once and never updated or deleted.
pub trait SnapshotStore {
    fn month_shows(&self, month: u32, year: i32) -> Vec<Show>;
    fn replace_month(&mut self, month: u32, year: i32, shows: Vec<Show>);
    fn last_seats(&self, show_id: &str) -> Option<i64>;
    fn append_history(&mut self, record: SeatHistoryRecord);
    fn all_shows(&self) -> Vec<Show>;
    fn all_history(&self) -> Vec<SeatHistoryRecord>;
}

/// In-memory store; real persistence lives outside this crate.
#[derive(Debug, Default)]
pub struct MemoryStore {
    shows: HashMap<String, Show>,
    history: Vec<SeatHistoryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn month_shows(&self, month: u32, year: i32) -> Vec<Show> {
        self.shows
            .values()
            .filter(|s| s.month == month && s.year == year)
            .cloned()
            .collect()
    }

    fn replace_month(&mut self, month: u32, year: i32, shows: Vec<Show>) {
        self.shows.retain(|_, s| !(s.month == month && s.year == year));
        for show in shows {
            self.shows.insert(show.id.clone(), show);
        }
    }

    fn last_seats(&self, show_id: &str) -> Option<i64> {
        self.history
            .iter()
            .filter(|h| h.show_id == show_id)
            .max_by_key(|h| h.timestamp)
            .map(|h| h.seats)
    }

    fn append_history(&mut self, record: SeatHistoryRecord) {
        self.history.push(record);
    }

    fn all_shows(&self) -> Vec<Show> {
        self.shows.values().cloned().collect()
    }

    fn all_history(&self) -> Vec<SeatHistoryRecord> {
        self.history.clone()
    }
}

/// Upstream event feed, abstracted so cycles are testable without the
/// network.
pub trait EventSource {
    fn collect_full_info(
        &self,
        month: u32,
        year: i32,
    ) -> impl Future<Output = Result<HashMap<String, EventInfo>, ConnectorError>> + Send;
}

impl EventSource for TicketingClient {
    fn collect_full_info(
        &self,
        month: u32,
        year: i32,
    ) -> impl Future<Output = Result<HashMap<String, EventInfo>, ConnectorError>> + Send {
        TicketingClient::collect_full_info(self, month, year)
    }
}

fn next_month(month: u32, year: i32) -> (u32, i32) {
    if month == 12 {
        (1, year + 1)
    } else {
        (month + 1, year)
    }
}

/// Build the month's new `Show` rows from the feed, carrying
/// `previous_seats` over from the prior snapshot and marking events that
/// vanished from the feed as deleted.
fn merge_snapshot(
    events: &HashMap<String, EventInfo>,
    previous: Vec<Show>,
    month: u32,
    year: i32,
    now_ts: i64,
) -> Vec<Show> {
    let prev_seats: HashMap<&str, i64> =
        previous.iter().map(|s| (s.id.as_str(), s.seats)).collect();

    let mut rows: Vec<Show> = events
        .values()
        .map(|e| {
            let actors: Vec<&str> = e
                .actors
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .collect();
            Show {
                id: e.id.clone(),
                show_id: if e.show_id.is_empty() {
                    None
                } else {
                    Some(e.show_id.clone())
                },
                show_name: e.show_name.clone(),
                theater: e.theater.clone(),
                scene: e.scene.clone(),
                date: e.date.clone(),
                duration: e.duration.clone(),
                age: e.age.clone(),
                actors: serde_json::to_string(&actors).unwrap_or_else(|_| "[]".to_string()),
                image: e.image.clone(),
                annotation: e.annotation.clone(),
                buy_link: e.buy_link.clone(),
                seats: e.seats,
                previous_seats: prev_seats.get(e.id.as_str()).copied(),
                min_price: e.min_price,
                max_price: e.max_price,
                pushkin: e.pushkin,
                month,
                year,
                updated_at: now_ts,
                is_deleted: false,
            }
        })
        .collect();

    // Events that dropped out of the feed stay as soft-deleted rows so
    // historical reports can still see them.
    for mut old in previous {
        if !events.contains_key(&old.id) {
            old.is_deleted = true;
            old.updated_at = now_ts;
            rows.push(old);
        }
    }

    rows
}

pub struct SnapshotService<C: EventSource, S: SnapshotStore> {
    client: C,
    store: S,
    max_consecutive_errors: u32,
    consecutive_errors: u32,
}

impl<C: EventSource, S: SnapshotStore> SnapshotService<C, S> {
    pub fn new(client: C, store: S, max_consecutive_errors: u32) -> Self {
        Self {
            client,
            store,
            max_consecutive_errors,
            consecutive_errors: 0,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch one month and commit it: replace the month's show rows and
    /// append a history record per live show whose seat count actually
    /// changed (identical consecutive counts are skipped; the analytics
    /// minimum-interval filters assume meaningful deltas).
    pub async fn update_month(
        &mut self,
        month: u32,
        year: i32,
        now_ts: i64,
    ) -> Result<bool, SnapshotError> {
        let events = self.client.collect_full_info(month, year).await?;
        if events.is_empty() {
            warn!(month, year, "no events in upstream feed");
            return Ok(false);
        }

        let previous = self.store.month_shows(month, year);
        let rows = merge_snapshot(&events, previous, month, year, now_ts);

        let live: Vec<(String, i64)> = rows
            .iter()
            .filter(|s| !s.is_deleted)
            .map(|s| (s.id.clone(), s.seats))
            .collect();

        self.store.replace_month(month, year, rows);

        let mut appended = 0;
        for (id, seats) in live {
            if self.store.last_seats(&id) != Some(seats) {
                self.store
                    .append_history(SeatHistoryRecord::new(id, now_ts, seats));
                appended += 1;
            }
        }

        info!(month, year, events = events.len(), appended, "snapshot committed");
        Ok(true)
    }

    /// One polling cycle: current month plus the next.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) {
        let current = (now.month(), now.year());
        let upcoming = next_month(current.0, current.1);
        let now_ts = now.timestamp();

        let mut failed = false;
        for (month, year) in [current, upcoming] {
            if let Err(e) = self.update_month(month, year, now_ts).await {
                failed = true;
                self.consecutive_errors += 1;
                if self.consecutive_errors >= self.max_consecutive_errors {
                    error!(
                        month,
                        year,
                        consecutive = self.consecutive_errors,
                        error = %e,
                        "snapshot cycle keeps failing"
                    );
                } else {
                    warn!(month, year, error = %e, "snapshot cycle failed");
                }
            }
        }
        if !failed {
            self.consecutive_errors = 0;
        }
    }

    /// Poll forever at the given interval.
    pub async fn update_loop(mut self, interval: Duration) {
        loop {
            self.run_cycle(Utc::now()).await;
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSource {
        data: HashMap<String, EventInfo>,
    }

    impl EventSource for StubSource {
        fn collect_full_info(
            &self,
            _month: u32,
            _year: i32,
        ) -> impl Future<Output = Result<HashMap<String, EventInfo>, ConnectorError>> + Send
        {
            let data = self.data.clone();
            async move { Ok(data) }
        }
    }

    fn event(id: &str, seats: i64) -> EventInfo {
        EventInfo {
            id: id.to_string(),
            show_id: "1".to_string(),
            theater: "т".to_string(),
            scene: "с".to_string(),
            show_name: "н".to_string(),
            date: "д".to_string(),
            duration: "1h".to_string(),
            age: "0+".to_string(),
            seats,
            image: "i".to_string(),
            annotation: "a".to_string(),
            min_price: 0,
            max_price: 0,
            pushkin: false,
            buy_link: "b".to_string(),
            actors: vec!["ак".to_string(), "".to_string()],
        }
    }

    fn service(data: HashMap<String, EventInfo>) -> SnapshotService<StubSource, MemoryStore> {
        SnapshotService::new(StubSource { data }, MemoryStore::new(), 5)
    }

    #[tokio::test]
    async fn history_created_on_first_snapshot() {
        let mut svc = service(HashMap::from([("e1".to_string(), event("e1", 5))]));
        svc.update_month(1, 2024, 100).await.unwrap();

        let history = svc.store().all_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].show_id, "e1");
        assert_eq!(history[0].seats, 5);

        let shows = svc.store().all_shows();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].actors, r#"["ак"]"#); // empty actor dropped
        assert_eq!(shows[0].previous_seats, None);
    }

    #[tokio::test]
    async fn unchanged_seats_append_nothing() {
        let mut svc = service(HashMap::from([("e1".to_string(), event("e1", 5))]));
        svc.update_month(1, 2024, 100).await.unwrap();
        svc.update_month(1, 2024, 200).await.unwrap();

        assert_eq!(svc.store().all_history().len(), 1);

        // A real change appends exactly one more record and carries the
        // previous seat count onto the show row.
        svc.client.data.get_mut("e1").unwrap().seats = 3;
        svc.update_month(1, 2024, 300).await.unwrap();

        let history = svc.store().all_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].seats, 3);

        let show = &svc.store().all_shows()[0];
        assert_eq!(show.previous_seats, Some(5));
        assert_eq!(show.seats, 3);
    }

    #[tokio::test]
    async fn vanished_event_is_soft_deleted() {
        let mut svc = service(HashMap::from([
            ("e1".to_string(), event("e1", 5)),
            ("e2".to_string(), event("e2", 9)),
        ]));
        svc.update_month(1, 2024, 100).await.unwrap();

        svc.client.data.remove("e2");
        svc.update_month(1, 2024, 200).await.unwrap();

        let shows = svc.store().all_shows();
        assert_eq!(shows.len(), 2);
        let gone = shows.iter().find(|s| s.id == "e2").unwrap();
        assert!(gone.is_deleted);
        let alive = shows.iter().find(|s| s.id == "e1").unwrap();
        assert!(!alive.is_deleted);

        // Deleted events gain no further history rows.
        assert_eq!(
            svc.store()
                .all_history()
                .iter()
                .filter(|h| h.show_id == "e2")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn empty_feed_is_a_noop() {
        let mut svc = service(HashMap::new());
        let updated = svc.update_month(1, 2024, 100).await.unwrap();
        assert!(!updated);
        assert!(svc.store().all_shows().is_empty());
    }

    #[test]
    fn month_rollover() {
        assert_eq!(next_month(12, 2024), (1, 2025));
        assert_eq!(next_month(3, 2024), (4, 2024));
    }
}
