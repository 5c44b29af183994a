use crate::calendar::Event;
use crate::sync::google_auth::{AuthError, TokenProvider};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MAX_RESULTS: u32 = 20;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Calendar not found: {0}")]
    NotFound(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Token error: {0}")]
    Token(#[from] AuthError),
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Which slice of the calendar to list.
#[derive(Debug, Clone, Copy)]
pub struct UpcomingQuery {
    pub time_min: DateTime<Utc>,
    pub max_results: u32,
}

impl UpcomingQuery {
    pub fn from_now(max_results: u32) -> Self {
        Self {
            time_min: Utc::now(),
            max_results,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: Option<String>,
    summary: Option<String>,
    start: Option<GoogleDateTime>,
    end: Option<GoogleDateTime>,
}

#[derive(Debug, Deserialize)]
struct GoogleDateTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventListResponse {
    items: Option<Vec<GoogleEvent>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Single occurrences from `query.time_min` onward, ordered by start time.
    async fn list_upcoming(
        &self,
        calendar_id: &str,
        query: UpcomingQuery,
    ) -> Result<Vec<Event>, ApiError>;
}

pub struct GoogleCalendarClient {
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl GoogleCalendarClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
            tokens,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn convert_from_google_event(ge: GoogleEvent) -> Result<Event, ApiError> {
        let start = ge
            .start
            .as_ref()
            .ok_or_else(|| ApiError::ParseError("Missing start".to_string()))
            .and_then(parse_google_time)?;
        let end = ge.end.as_ref().map(parse_google_time).transpose()?;

        Ok(Event {
            id: ge.id.ok_or_else(|| ApiError::ParseError("Missing event id".to_string()))?,
            title: ge.summary.unwrap_or_default(),
            start,
            end,
            is_test: false,
        })
    }
}

fn parse_google_time(gdt: &GoogleDateTime) -> Result<DateTime<Utc>, ApiError> {
    if let Some(date_time) = &gdt.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ApiError::ParseError(format!("Invalid dateTime: {}", e)));
    }

    if let Some(date) = &gdt.date {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| ApiError::ParseError(format!("Invalid date: {}", e)))?;
        return day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| ApiError::ParseError("Invalid date".to_string()));
    }

    Err(ApiError::ParseError("Missing dateTime and date".to_string()))
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_upcoming(
        &self,
        calendar_id: &str,
        query: UpcomingQuery,
    ) -> Result<Vec<Event>, ApiError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );
        let time_min = query.time_min.to_rfc3339();
        let max_results = query.max_results.to_string();

        tracing::info!(calendar_id, time_min = %time_min, "Fetching upcoming events");

        let response = self.client
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", max_results.as_str()),
                ("maxAttendees", "1"),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("List events response status: {}", status);

        if status == 401 {
            tracing::error!("Authentication failed when fetching events");
            return Err(ApiError::AuthenticationFailed);
        }

        if status == 404 {
            tracing::error!("Calendar not found: {}", calendar_id);
            return Err(ApiError::NotFound(calendar_id.to_string()));
        }

        if status == 429 {
            tracing::warn!("Rate limit exceeded");
            return Err(ApiError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!("Failed to fetch events. Status: {}, Body: {}", status, body);
            return Err(ApiError::RequestError(format!("Status {}: {}", status, body)));
        }

        let event_list: EventListResponse = response.json().await?;

        let events: Vec<Event> = event_list.items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|ge| match Self::convert_from_google_event(ge) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!("Skipping calendar item: {}", e);
                    None
                }
            })
            .collect();

        tracing::info!("Fetched {} events successfully", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::google_auth::StaticToken;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GoogleCalendarClient {
        GoogleCalendarClient::new(Arc::new(StaticToken::new("token")))
            .with_base_url(server.uri())
    }

    #[test]
    fn google_calendar_client_has_default_base_url() {
        let client = GoogleCalendarClient::new(Arc::new(StaticToken::new("token")));

        assert_eq!(client.base_url, "https://www.googleapis.com/calendar/v3");
    }

    #[test]
    fn all_day_start_is_midnight_utc() {
        let parsed = parse_google_time(&GoogleDateTime {
            date_time: None,
            date: Some("2025-04-25".to_string()),
        })
        .unwrap();

        assert_eq!(parsed.to_rfc3339(), "2025-04-25T00:00:00+00:00");
    }

    #[tokio::test]
    async fn lists_upcoming_single_events_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/choir%40group.calendar.google.com/events"))
            .and(header("authorization", "Bearer token"))
            .and(query_param("maxResults", "20"))
            .and(query_param("maxAttendees", "1"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {
                        "id": "event1",
                        "summary": "Rehearsal",
                        "start": { "dateTime": "2025-04-25T19:00:00Z" }
                    },
                    {
                        "id": "event2",
                        "summary": "Performance",
                        "start": { "dateTime": "2025-04-28T20:00:00+02:00" },
                        "end": { "dateTime": "2025-04-28T22:00:00+02:00" }
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let events = client_for(&server)
            .list_upcoming("choir@group.calendar.google.com", UpcomingQuery::from_now(20))
            .await
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "event1");
        assert_eq!(events[0].title, "Rehearsal");
        assert_eq!(events[0].end, None);
        assert_eq!(events[1].start.to_rfc3339(), "2025-04-28T18:00:00+00:00");
        assert_eq!(events[1].end.map(|end| end.to_rfc3339()), Some("2025-04-28T20:00:00+00:00".to_string()));
        assert!(events.iter().all(|e| !e.is_test));
    }

    #[tokio::test]
    async fn missing_items_is_an_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let events = client_for(&server)
            .list_upcoming("primary", UpcomingQuery::from_now(20))
            .await
            .unwrap();

        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn items_without_start_are_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "broken", "summary": "No start" },
                    { "id": "ok", "summary": "Rehearsal", "start": { "date": "2025-05-01" } }
                ]
            })))
            .mount(&server)
            .await;

        let events = client_for(&server)
            .list_upcoming("primary", UpcomingQuery::from_now(20))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "ok");
    }

    #[tokio::test]
    async fn unauthorized_status_maps_to_authentication_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .list_upcoming("primary", UpcomingQuery::from_now(20))
            .await;

        assert!(matches!(result, Err(ApiError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn unknown_calendar_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .list_upcoming("missing", UpcomingQuery::from_now(20))
            .await;

        assert!(matches!(result, Err(ApiError::NotFound(id)) if id == "missing"));
    }
}
