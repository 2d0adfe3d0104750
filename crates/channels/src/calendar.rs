use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use leadflow_core::domain::booking::BusyInterval;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEventId(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected request (status {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

/// Calendar backend. The provider offers no compare-and-swap across
/// query+insert; the booking allocator serializes access per day on top of
/// this interface.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError>;

    async fn insert(
        &self,
        event: CalendarEventRequest,
    ) -> Result<CalendarEventId, CalendarError>;
}

/// REST calendar client (events list/insert under a calendar resource,
/// optional bearer auth).
pub struct HttpCalendarProvider {
    client: Client,
    api_url: String,
    api_key: Option<SecretString>,
    calendar_id: String,
}

impl HttpCalendarProvider {
    pub fn new(
        api_url: impl Into<String>,
        api_key: Option<SecretString>,
        calendar_id: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, CalendarError> {
        let client = Client::builder().timeout(Duration::from_secs(timeout_secs.max(1))).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            api_key,
            calendar_id: calendar_id.into(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_url, self.calendar_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => request.bearer_auth(api_key.expose_secret()),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsListResponse {
    #[serde(default)]
    items: Vec<EventResource>,
}

#[derive(Debug, Deserialize)]
struct EventResource {
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: String,
}

#[derive(Debug, Deserialize)]
struct EventInsertResponse {
    id: String,
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let response = self
            .authorize(self.client.get(self.events_url()))
            .query(&[
                ("timeMin", window_start.to_rfc3339()),
                ("timeMax", window_end.to_rfc3339()),
                ("singleEvents", "true".to_owned()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Rejected { status: status.as_u16(), body });
        }

        let payload: EventsListResponse = response
            .json()
            .await
            .map_err(|error| CalendarError::Decode(format!("events list: {error}")))?;

        payload
            .items
            .into_iter()
            .map(|item| {
                Ok(BusyInterval {
                    start: parse_event_time(&item.start.date_time)?,
                    end: parse_event_time(&item.end.date_time)?,
                })
            })
            .collect()
    }

    async fn insert(
        &self,
        event: CalendarEventRequest,
    ) -> Result<CalendarEventId, CalendarError> {
        let response = self
            .authorize(self.client.post(self.events_url()))
            .json(&json!({
                "summary": event.summary,
                "start": { "dateTime": event.start.to_rfc3339() },
                "end": { "dateTime": event.end.to_rfc3339() },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Rejected { status: status.as_u16(), body });
        }

        let payload: EventInsertResponse = response
            .json()
            .await
            .map_err(|error| CalendarError::Decode(format!("event insert: {error}")))?;

        Ok(CalendarEventId(payload.id))
    }
}

fn parse_event_time(raw: &str) -> Result<DateTime<Utc>, CalendarError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| CalendarError::Decode(format!("event time `{raw}`: {error}")))
}

/// In-memory calendar for development and tests. Interior mutability keeps
/// the provider shareable across concurrent reservation attempts.
#[derive(Default)]
pub struct InMemoryCalendarProvider {
    events: Mutex<Vec<CalendarEventRequest>>,
}

impl InMemoryCalendarProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CalendarEventRequest> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendarProvider {
    async fn list_busy(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, CalendarError> {
        let events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };

        Ok(events
            .iter()
            .filter(|event| event.start < window_end && event.end > window_start)
            .map(|event| BusyInterval { start: event.start, end: event.end })
            .collect())
    }

    async fn insert(
        &self,
        event: CalendarEventRequest,
    ) -> Result<CalendarEventId, CalendarError> {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
        Ok(CalendarEventId(format!("mem-{}", Uuid::new_v4())))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{CalendarEventRequest, CalendarProvider, InMemoryCalendarProvider};

    fn event(start_hour: u32, end_hour: u32) -> CalendarEventRequest {
        CalendarEventRequest {
            summary: "Inspection".to_owned(),
            start: Utc.with_ymd_and_hms(2026, 8, 7, start_hour, 0, 0).single().expect("valid"),
            end: Utc.with_ymd_and_hms(2026, 8, 7, end_hour, 0, 0).single().expect("valid"),
        }
    }

    #[tokio::test]
    async fn list_busy_returns_overlapping_events_only() {
        let provider = InMemoryCalendarProvider::new();
        provider.insert(event(10, 11)).await.expect("insert");
        provider.insert(event(18, 19)).await.expect("insert");

        let window_start = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).single().expect("valid");
        let window_end = Utc.with_ymd_and_hms(2026, 8, 7, 16, 0, 0).single().expect("valid");

        let busy = provider.list_busy(window_start, window_end).await.expect("list");
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].start, event(10, 11).start);
    }

    #[tokio::test]
    async fn adjacent_events_do_not_count_as_overlap() {
        let provider = InMemoryCalendarProvider::new();
        provider.insert(event(8, 10)).await.expect("insert");

        let window_start = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).single().expect("valid");
        let window_end = Utc.with_ymd_and_hms(2026, 8, 7, 16, 0, 0).single().expect("valid");

        let busy = provider.list_busy(window_start, window_end).await.expect("list");
        assert!(busy.is_empty());
    }
}
