//! Provider-shaped event records.
//!
//! [`RawEvent`] mirrors the Google Calendar v3 `Event` resource with the
//! fields the service reads or writes. Everything else rides along in
//! [`RawEvent::extra`] so an update can PUT back the full body it fetched.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Start or end of a raw event: `dateTime` for timed events, `date` for
/// all-day ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    pub fn instant(dt: DateTime<FixedOffset>) -> Self {
        Self {
            date_time: Some(dt.to_rfc3339()),
            ..Self::default()
        }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Self::default()
        }
    }

    /// True when only the whole-day field is present.
    pub fn is_date_only(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttendee {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAttendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<RawEventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<RawEventTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<RawAttendee>,
    /// Fields the service does not interpret, kept for round trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawEvent {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_times(mut self, start: RawEventTime, end: RawEventTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_attendees<I, S>(mut self, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attendees = emails.into_iter().map(RawAttendee::new).collect();
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_google_event() {
        let event: RawEvent = serde_json::from_value(json!({
            "id": "evt1",
            "summary": "Planning",
            "htmlLink": "https://www.google.com/calendar/event?eid=evt1",
            "start": {"dateTime": "2026-03-02T10:00:00+01:00", "timeZone": "Europe/Paris"},
            "end": {"dateTime": "2026-03-02T11:00:00+01:00"},
            "attendees": [{"email": "ana@example.com", "responseStatus": "accepted"}],
            "etag": "\"3381\"",
            "reminders": {"useDefault": true}
        }))
        .unwrap();

        assert_eq!(event.id.as_deref(), Some("evt1"));
        assert_eq!(
            event.html_link.as_deref(),
            Some("https://www.google.com/calendar/event?eid=evt1")
        );
        assert_eq!(event.attendees[0].email, "ana@example.com");
        assert_eq!(event.attendees[0].extra["responseStatus"], json!("accepted"));
        assert_eq!(event.extra["reminders"], json!({"useDefault": true}));
        assert!(!event.start.unwrap().is_date_only());
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let body = json!({
            "id": "evt1",
            "summary": "Planning",
            "start": {"date": "2026-03-02"},
            "end": {"date": "2026-03-03"},
            "colorId": "5",
            "conferenceData": {"entryPoints": [{"uri": "https://meet.google.com/abc"}]}
        });
        let event: RawEvent = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), body);
    }

    #[test]
    fn builder_shape() {
        let start = DateTime::parse_from_rfc3339("2026-03-02T10:00:00Z").unwrap();
        let end = DateTime::parse_from_rfc3339("2026-03-02T10:30:00Z").unwrap();
        let event = RawEvent::new("Sync")
            .with_times(RawEventTime::instant(start), RawEventTime::instant(end))
            .with_location("Room 4")
            .with_attendees(["bo@example.com"]);

        insta::assert_json_snapshot!(event, @r#"
        {
          "summary": "Sync",
          "location": "Room 4",
          "start": {
            "dateTime": "2026-03-02T10:00:00+00:00"
          },
          "end": {
            "dateTime": "2026-03-02T10:30:00+00:00"
          },
          "attendees": [
            {
              "email": "bo@example.com"
            }
          ]
        }
        "#);
    }

    #[test]
    fn cancelled_status() {
        let mut event = RawEvent::new("Gone");
        assert!(!event.is_cancelled());
        event.status = Some("cancelled".into());
        assert!(event.is_cancelled());
    }
}
