//! Gateway to the Ticketmaster Discovery API.
//!
//! One outbound call per `/events` request. The provider's nested response is
//! flattened into [`EventRecord`]s; missing nested fields degrade to absent or
//! default values instead of failing the whole response.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const UNKNOWN_VENUE: &str = "Unknown Venue";

/// Flat event shape served by `/events` and accepted back by `/save_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub venue: String,
    pub image: Option<String>,
    pub url: Option<String>,
}

#[async_trait]
pub trait EventsProvider: Send + Sync + 'static {
    /// Events in `city` starting at or after `now`, earliest first.
    async fn fetch(&self, city: &str, now: DateTime<Utc>) -> AppResult<Vec<EventRecord>>;
}

// ============================================================================
// Provider payload
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryResponse {
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<DiscoveryEmbedded>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryEmbedded {
    #[serde(default)]
    pub events: Option<Vec<DiscoveryEvent>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryEvent {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub dates: Option<EventDates>,
    #[serde(default)]
    pub images: Option<Vec<EventImage>>,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<EventEmbedded>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventDates {
    pub start: Option<EventStart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStart {
    pub local_date: Option<String>,
    pub local_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventImage {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventEmbedded {
    #[serde(default)]
    pub venues: Option<Vec<Venue>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Venue {
    pub name: Option<String>,
}

impl From<DiscoveryEvent> for EventRecord {
    fn from(event: DiscoveryEvent) -> Self {
        let start = event.dates.and_then(|d| d.start);
        let (date, time) = match start {
            Some(s) => (s.local_date, s.local_time),
            None => (None, None),
        };

        let venue = event
            .embedded
            .and_then(|e| e.venues)
            .and_then(|v| v.into_iter().next())
            .and_then(|v| v.name)
            .unwrap_or_else(|| UNKNOWN_VENUE.to_string());

        let image = event.images.into_iter().flatten().next().and_then(|i| i.url);

        Self {
            id: event.id,
            name: event.name,
            date,
            time,
            venue,
            image,
            url: event.url,
        }
    }
}

/// Flatten a decoded provider response. A response without `_embedded`
/// (no matches) yields an empty list.
pub fn reshape(response: DiscoveryResponse) -> Vec<EventRecord> {
    response
        .embedded
        .and_then(|e| e.events)
        .unwrap_or_default()
        .into_iter()
        .map(EventRecord::from)
        .collect()
}

// ============================================================================
// HTTP client
// ============================================================================

#[derive(Debug, Clone)]
pub struct TicketmasterService {
    client: Client,
    api_key: String,
    base_url: String,
    page_size: u32,
}

impl TicketmasterService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            client,
            api_key: config.ticketmaster.api_key.clone(),
            base_url: config.ticketmaster.base_url.trim_end_matches('/').to_string(),
            page_size: config.ticketmaster.page_size,
        })
    }

    fn events_url(&self) -> String {
        format!("{}/events.json", self.base_url)
    }
}

#[async_trait]
impl EventsProvider for TicketmasterService {
    async fn fetch(&self, city: &str, now: DateTime<Utc>) -> AppResult<Vec<EventRecord>> {
        let start = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let size = self.page_size.to_string();

        let response = self
            .client
            .get(self.events_url())
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("city", city),
                ("startDateTime", start.as_str()),
                ("size", size.as_str()),
                ("sort", "date,asc"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to reach Ticketmaster: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Ticketmaster API error ({}): {}",
                status, error_text
            )));
        }

        let body: DiscoveryResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("Failed to decode Ticketmaster response: {}", e))
        })?;

        let events = reshape(body);
        tracing::debug!("Ticketmaster returned {} events for {}", events.len(), city);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Vec<EventRecord> {
        reshape(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn reshapes_full_event() {
        let events = parse(json!({
            "_embedded": {
                "events": [{
                    "id": "E1",
                    "name": "Knicks vs Celtics",
                    "url": "https://tm.example/E1",
                    "dates": { "start": { "localDate": "2026-11-01", "localTime": "19:30:00" } },
                    "images": [
                        { "url": "https://img.example/first.jpg", "width": 640 },
                        { "url": "https://img.example/second.jpg" }
                    ],
                    "_embedded": { "venues": [{ "name": "Madison Square Garden" }] }
                }]
            },
            "page": { "size": 20 }
        }));

        assert_eq!(
            events,
            vec![EventRecord {
                id: Some("E1".to_string()),
                name: Some("Knicks vs Celtics".to_string()),
                date: Some("2026-11-01".to_string()),
                time: Some("19:30:00".to_string()),
                venue: "Madison Square Garden".to_string(),
                image: Some("https://img.example/first.jpg".to_string()),
                url: Some("https://tm.example/E1".to_string()),
            }]
        );
    }

    #[test]
    fn missing_venues_defaults_to_unknown_venue() {
        let events = parse(json!({
            "_embedded": { "events": [
                { "id": "A", "name": "No embedded" },
                { "id": "B", "name": "Empty venues", "_embedded": { "venues": [] } },
                { "id": "C", "name": "Nameless venue", "_embedded": { "venues": [{}] } }
            ]}
        }));

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.venue == UNKNOWN_VENUE));
    }

    #[test]
    fn missing_images_leaves_image_absent() {
        let events = parse(json!({
            "_embedded": { "events": [
                { "id": "A", "name": "No images" },
                { "id": "B", "name": "Empty images", "images": [] }
            ]}
        }));

        assert!(events.iter().all(|e| e.image.is_none()));
    }

    #[test]
    fn missing_dates_leave_date_and_time_absent() {
        let events = parse(json!({
            "_embedded": { "events": [
                { "id": "A", "name": "No dates" },
                { "id": "B", "name": "Date only", "dates": { "start": { "localDate": "2026-12-24" } } }
            ]}
        }));

        assert_eq!(events[0].date, None);
        assert_eq!(events[0].time, None);
        assert_eq!(events[1].date.as_deref(), Some("2026-12-24"));
        assert_eq!(events[1].time, None);
    }

    #[test]
    fn null_arrays_degrade_to_defaults() {
        let events = parse(json!({
            "_embedded": { "events": [
                { "id": "A", "name": "Nulls", "images": null, "_embedded": { "venues": null } }
            ]}
        }));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].venue, UNKNOWN_VENUE);
        assert!(events[0].image.is_none());

        assert!(parse(json!({ "_embedded": { "events": null } })).is_empty());
    }

    #[test]
    fn response_without_results_is_empty() {
        assert!(parse(json!({ "page": { "totalElements": 0 } })).is_empty());
        assert!(parse(json!({ "_embedded": {} })).is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_provider_error() {
        let mut config = Config::default();
        // Nothing listens on the discard port locally.
        config.ticketmaster.base_url = "http://127.0.0.1:9".to_string();
        let service = TicketmasterService::new(&config).unwrap();

        let res = service.fetch("New York", Utc::now()).await;
        assert!(matches!(res, Err(AppError::Provider(_))));
    }
}
