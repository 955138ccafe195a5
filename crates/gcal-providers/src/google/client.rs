//! Google Calendar API v3 client.
//!
//! Thin request layer over `reqwest`: builds the URLs, pages through lists
//! and turns non-2xx answers into [`ProviderError`]s carrying Google's own
//! reason string.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ListQuery, SendUpdates};
use crate::raw_event::RawEvent;

/// Largest page Google serves for events.list.
const MAX_PAGE_SIZE: usize = 2500;

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gcal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// events.list with recurring events expanded, in start order, following
    /// `nextPageToken` until `max_results` is reached or the pages run out.
    pub async fn list_events(&self, token: &str, query: &ListQuery) -> ProviderResult<Vec<RawEvent>> {
        let mut events = Vec::new();
        if query.max_results == Some(0) {
            return Ok(events);
        }
        let mut page_token: Option<String> = None;

        loop {
            let page_size = query
                .max_results
                .map_or(MAX_PAGE_SIZE, |max| (max - events.len()).min(MAX_PAGE_SIZE));

            let mut request = self
                .http_client
                .get(self.events_url())
                .bearer_auth(token)
                .query(&[
                    ("timeMin", query.window.start.to_rfc3339()),
                    ("timeMax", query.window.end.to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                    ("maxResults", page_size.to_string()),
                ]);
            if let Some(ref q) = query.query {
                request = request.query(&[("q", q)]);
            }
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page)]);
            }

            let page: EventList = self.send(request).await?;
            events.extend(page.items);

            if let Some(max) = query.max_results
                && events.len() >= max
            {
                events.truncate(max);
                break;
            }
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(
            count = events.len(),
            calendar = %self.calendar_id,
            "listed events"
        );
        Ok(events)
    }

    pub async fn get_event(&self, token: &str, event_id: &str) -> ProviderResult<RawEvent> {
        let request = self.http_client.get(self.event_url(event_id)).bearer_auth(token);
        self.send(request).await
    }

    pub async fn insert_event(
        &self,
        token: &str,
        event: &RawEvent,
        send_updates: SendUpdates,
    ) -> ProviderResult<RawEvent> {
        let request = self
            .http_client
            .post(self.events_url())
            .bearer_auth(token)
            .query(&[("sendUpdates", send_updates.as_str())])
            .json(event);
        self.send(request).await
    }

    /// Full replacement (PUT) of the event body.
    pub async fn update_event(
        &self,
        token: &str,
        event_id: &str,
        event: &RawEvent,
    ) -> ProviderResult<RawEvent> {
        let request = self
            .http_client
            .put(self.event_url(event_id))
            .bearer_auth(token)
            .json(event);
        self.send(request).await
    }

    pub async fn delete_event(&self, token: &str, event_id: &str) -> ProviderResult<()> {
        let request = self
            .http_client
            .delete(self.event_url(event_id))
            .bearer_auth(token);
        self.execute(request).await.map(|_| ())
    }

    pub async fn quick_add(&self, token: &str, text: &str) -> ProviderResult<RawEvent> {
        let request = self
            .http_client
            .post(format!("{}/quickAdd", self.events_url()))
            .bearer_auth(token)
            .query(&[("text", text)]);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ProviderResult<T> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {e}"))
        })
    }

    /// Sends the request and returns the body of a 2xx answer.
    async fn execute(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timed out")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {e}"))
            } else {
                ProviderError::network(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {e}")))?;

        if status.is_success() {
            return Ok(body);
        }
        let reason = error_reason(&body)
            .or_else(|| status.canonical_reason().map(String::from))
            .unwrap_or_else(|| status.to_string());
        debug!(status = status.as_u16(), %reason, "calendar API error");
        Err(ProviderError::from_status(status.as_u16(), reason))
    }
}

/// `error.message` from a Google JSON error body.
fn error_reason(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error.message)
        .filter(|m| !m.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use gcal_core::TimeWindow;
    use mockito::Matcher;

    const EVENTS_PATH: &str = "/calendars/primary/events";

    fn client(server: &mockito::Server) -> GoogleCalendarClient {
        GoogleCalendarClient::new(server.url(), "primary", Duration::from_secs(5)).unwrap()
    }

    fn week() -> ListQuery {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        ListQuery::new(TimeWindow::new(start, start + ChronoDuration::days(7)).unwrap())
    }

    #[tokio::test]
    async fn list_sends_window_and_expansion_flags() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", EVENTS_PATH)
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("timeMin".into(), "2026-03-02T00:00:00+00:00".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                Matcher::UrlEncoded("q".into(), "standup".into()),
                Matcher::UrlEncoded("maxResults".into(), "5".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": [{"id": "a", "summary": "Standup"}]}"#)
            .create_async()
            .await;

        let events = client(&server)
            .list_events("tok", &week().with_query("standup").with_max_results(5))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Standup"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_follows_pages_until_limit() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", EVENTS_PATH)
            .match_query(Matcher::UrlEncoded("maxResults".into(), "3".into()))
            .with_status(200)
            .with_body(r#"{"items": [{"id": "a"}, {"id": "b"}], "nextPageToken": "p2"}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", EVENTS_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("pageToken".into(), "p2".into()),
                Matcher::UrlEncoded("maxResults".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"items": [{"id": "c"}], "nextPageToken": "p3"}"#)
            .create_async()
            .await;

        let events = client(&server)
            .list_events("tok", &week().with_max_results(3))
            .await
            .unwrap();
        let ids: Vec<_> = events.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn insert_passes_send_updates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", EVENTS_PATH)
            .match_query(Matcher::UrlEncoded("sendUpdates".into(), "all".into()))
            .match_body(Matcher::PartialJson(serde_json::json!({
                "summary": "Review",
                "attendees": [{"email": "ana@example.com"}]
            })))
            .with_status(200)
            .with_body(r#"{"id": "new", "summary": "Review", "htmlLink": "https://calendar/new"}"#)
            .create_async()
            .await;

        let event = RawEvent::new("Review").with_attendees(["ana@example.com"]);
        let created = client(&server)
            .insert_event("tok", &event, SendUpdates::All)
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("new"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn quick_add_encodes_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendars/primary/events/quickAdd")
            .match_query(Matcher::UrlEncoded("text".into(), "Lunch with Bo tomorrow 1pm".into()))
            .with_status(200)
            .with_body(r#"{"id": "q1", "summary": "Lunch with Bo"}"#)
            .create_async()
            .await;

        let event = client(&server)
            .quick_add("tok", "Lunch with Bo tomorrow 1pm")
            .await
            .unwrap();
        assert_eq!(event.id.as_deref(), Some("q1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn event_ids_are_path_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/calendars/primary/events/a%2Fb")
            .with_status(204)
            .create_async()
            .await;

        client(&server).delete_event("tok", "a/b").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn google_reason_is_kept() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/calendars/primary/events/missing")
            .with_status(404)
            .with_body(r#"{"error": {"code": 404, "message": "Not Found", "errors": []}}"#)
            .create_async()
            .await;

        let err = client(&server).get_event("tok", "missing").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert_eq!(err.message(), "Not Found");
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn non_json_error_uses_status_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", EVENTS_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(&server).list_events("tok", &week()).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert_eq!(err.message(), "Service Unavailable");
        assert!(err.is_retryable());
    }

    #[test]
    fn error_reason_parsing() {
        assert_eq!(
            error_reason(r#"{"error": {"message": "Rate Limit Exceeded"}}"#).as_deref(),
            Some("Rate Limit Exceeded")
        );
        assert_eq!(error_reason("<html>"), None);
        assert_eq!(error_reason(r#"{"error": {"message": ""}}"#), None);
    }
}
