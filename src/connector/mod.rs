/// Ticketing widget connector: fetches raw event, seat and show data from
/// the upstream HTTP API. The analytics engine never calls this directly;
/// the snapshot service consumes its output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::Settings;

#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("widget request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid widget URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected widget payload: {0}")]
    BadPayload(String),
}

/// One event as the snapshot service wants it: flattened, typed, with the
/// seat count and buy link already merged in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: String,
    pub show_id: String,
    pub theater: String,
    pub scene: String,
    pub show_name: String,
    pub date: String,
    pub duration: String,
    pub age: String,
    pub seats: i64,
    pub image: String,
    pub annotation: String,
    pub min_price: i64,
    pub max_price: i64,
    pub pushkin: bool,
    pub buy_link: String,
    pub actors: Vec<String>,
}

/// The widget sends ids and durations as either strings or numbers
/// depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Num(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Num(n) => n.to_string(),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Str(String::new())
    }
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    response: Option<ListResponse>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: Scalar,
    #[serde(default)]
    show_name: String,
    #[serde(default)]
    location_name: String,
    #[serde(default)]
    location_scene: String,
    #[serde(default)]
    date_formatted: String,
    #[serde(default)]
    annotation: String,
    #[serde(default)]
    min_price: Option<i64>,
    #[serde(default)]
    max_price: Option<i64>,
    show: RawShow,
    #[serde(default)]
    pushkin_card: PushkinCard,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    show_id: Scalar,
    #[serde(default)]
    duration: Option<Scalar>,
    #[serde(default)]
    age: Option<Scalar>,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    actors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PushkinCard {
    #[serde(default)]
    can_buy: bool,
}

#[derive(Debug, Deserialize)]
struct PlacesPayload {
    events: Option<HashMap<String, PlaceEntry>>,
}

#[derive(Debug, Deserialize)]
struct PlaceEntry {
    #[serde(default)]
    seats: Option<i64>,
}

/// Decode one event-list page into its raw events. A missing `response`
/// key means the upstream rejected the query.
fn parse_list_page(payload: ListPayload) -> Result<Vec<RawEvent>, ConnectorError> {
    let response = payload
        .response
        .ok_or_else(|| ConnectorError::BadPayload("missing response key".to_string()))?;
    Ok(response.items.into_iter().flat_map(|i| i.events).collect())
}

fn parse_places(payload: PlacesPayload) -> Result<HashMap<String, i64>, ConnectorError> {
    let events = payload
        .events
        .ok_or_else(|| ConnectorError::BadPayload("missing events key".to_string()))?;
    Ok(events
        .into_iter()
        .map(|(id, entry)| (id, entry.seats.unwrap_or(0)))
        .collect())
}

pub struct TicketingClient {
    http: reqwest::Client,
    company_id: String,
    list_url: String,
    events_data_url: String,
    customer_url: String,
}

impl TicketingClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            company_id: settings.company_id.clone(),
            list_url: settings.list_url.clone(),
            events_data_url: settings.events_data_url.clone(),
            customer_url: settings.customer_url.clone(),
        }
    }

    fn list_page_url(&self, month: u32, year: i32, page: u32) -> Result<Url, ConnectorError> {
        let raw = format!(
            "{}{}&type=events&page={}&period_id=4&hall_id=&date={}.{}&name=&language=ru-RU",
            self.list_url, self.company_id, page, year, month
        );
        Ok(Url::parse(&raw)?)
    }

    fn buy_link(&self, show_id: &str, event_id: &str) -> String {
        format!(
            "{}{}/shows/{}?eventsIds%5B%5D={}&language=ru-RU",
            self.customer_url, self.company_id, show_id, event_id
        )
    }

    /// Page through the event list for one month until an empty page.
    async fn load_events(&self, month: u32, year: i32) -> Result<Vec<RawEvent>, ConnectorError> {
        let mut events = Vec::new();
        let mut page = 1;

        loop {
            let url = self.list_page_url(month, year, page)?;
            let payload: ListPayload = self.http.get(url).send().await?.json().await?;
            let page_events = parse_list_page(payload)?;
            if page_events.is_empty() {
                break;
            }
            events.extend(page_events);
            page += 1;
        }

        debug!(month, year, count = events.len(), "loaded event pages");
        Ok(events)
    }

    /// Free-seat counts per event id.
    async fn free_seats(&self) -> Result<HashMap<String, i64>, ConnectorError> {
        let raw = format!("{}{}/", self.events_data_url, self.company_id);
        let url = Url::parse(&raw)?;
        let payload: PlacesPayload = self.http.get(url).send().await?.json().await?;
        parse_places(payload)
    }

    /// Fetch and merge the month's events with seat counts and buy links,
    /// keyed by event id.
    pub async fn collect_full_info(
        &self,
        month: u32,
        year: i32,
    ) -> Result<HashMap<String, EventInfo>, ConnectorError> {
        let events = self.load_events(month, year).await?;
        let seats = self.free_seats().await?;

        let mut result = HashMap::with_capacity(events.len());
        for event in events {
            let event_id = event.id.into_string();
            let show_id = event.show.show_id.into_string();
            let buy_link = self.buy_link(&show_id, &event_id);

            result.insert(
                event_id.clone(),
                EventInfo {
                    seats: seats.get(&event_id).copied().unwrap_or(0),
                    id: event_id,
                    show_id,
                    theater: event.location_name,
                    scene: event.location_scene,
                    show_name: event.show_name,
                    date: event.date_formatted,
                    duration: event.show.duration.map(Scalar::into_string).unwrap_or_default(),
                    age: event.show.age.map(Scalar::into_string).unwrap_or_default(),
                    image: event.show.image_url,
                    annotation: event.annotation,
                    min_price: event.min_price.unwrap_or(0),
                    max_price: event.max_price.unwrap_or(0),
                    pushkin: event.pushkin_card.can_buy,
                    buy_link,
                    actors: event.show.actors,
                },
            );
        }
        Ok(result)
    }
}
