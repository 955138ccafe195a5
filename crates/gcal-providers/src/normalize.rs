//! RawEvent to [`Event`] conversion.
//!
//! Normalization is total: every record yields an [`Event`]. Times that
//! cannot be read become `None` and are dropped later by the busy-interval
//! extractor rather than failing the whole call.

use chrono::{DateTime, NaiveDate};
use gcal_core::{Event, EventTime, UNTITLED, truncate_description};
use tracing::debug;

use crate::raw_event::{RawEvent, RawEventTime};

/// Converts a [`RawEvent`] to an [`Event`].
///
/// The precise `dateTime` wins over the whole-day `date`. A `dateTime` that
/// is not RFC 3339 falls back to `date` when present and is otherwise
/// unresolvable.
pub fn normalize_event(raw: &RawEvent) -> Event {
    let start = raw.start.as_ref().and_then(convert_time);
    let end = raw.end.as_ref().and_then(convert_time);
    let is_all_day = raw.start.as_ref().is_some_and(RawEventTime::is_date_only);

    Event {
        id: raw.id.clone().unwrap_or_default(),
        summary: raw.summary.clone().unwrap_or_else(|| UNTITLED.to_string()),
        start,
        end,
        location: raw.location.clone(),
        description: raw
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(truncate_description),
        html_link: raw.html_link.clone(),
        is_all_day,
    }
}

fn convert_time(raw: &RawEventTime) -> Option<EventTime> {
    if let Some(ref dt) = raw.date_time {
        match DateTime::parse_from_rfc3339(dt) {
            Ok(parsed) => return Some(EventTime::DateTime(parsed)),
            Err(e) => debug!(value = %dt, error = %e, "unparseable dateTime"),
        }
    }

    let date = raw.date.as_deref()?;
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => Some(EventTime::AllDay(parsed)),
        Err(e) => {
            debug!(value = %date, error = %e, "unparseable date");
            None
        }
    }
}

/// Normalizes a batch, dropping cancelled records.
pub fn normalize_events(raw_events: &[RawEvent]) -> Vec<Event> {
    raw_events
        .iter()
        .filter(|e| !e.is_cancelled())
        .map(normalize_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn timed_event() {
        let event = normalize_event(&raw(json!({
            "id": "evt1",
            "summary": "Review",
            "htmlLink": "https://calendar.google.com/event?eid=evt1",
            "start": {"dateTime": "2026-03-02T10:00:00+01:00"},
            "end": {"dateTime": "2026-03-02T11:00:00+01:00"}
        })));

        assert_eq!(event.id, "evt1");
        assert_eq!(event.summary, "Review");
        assert!(!event.is_all_day);
        assert_eq!(
            event.start,
            Some(EventTime::DateTime(
                DateTime::parse_from_rfc3339("2026-03-02T10:00:00+01:00").unwrap()
            ))
        );
        assert_eq!(
            event.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=evt1")
        );
        assert_eq!(event.description, None);
    }

    #[test]
    fn all_day_event() {
        let event = normalize_event(&raw(json!({
            "id": "off",
            "summary": "Holiday",
            "start": {"date": "2026-03-06"},
            "end": {"date": "2026-03-07"}
        })));

        assert!(event.is_all_day);
        assert_eq!(
            event.end,
            Some(EventTime::AllDay(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()))
        );
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let event = normalize_event(&raw(json!({"id": "x"})));
        assert_eq!(event.summary, UNTITLED);
        assert_eq!(event.start, None);
        assert_eq!(event.end, None);
        assert!(!event.is_all_day);
    }

    #[test]
    fn bad_datetime_is_unresolvable() {
        let event = normalize_event(&raw(json!({
            "id": "x",
            "start": {"dateTime": "next tuesday"},
            "end": {"dateTime": "2026-03-02T11:00:00Z"}
        })));
        assert_eq!(event.start, None);
        assert!(event.end.is_some());
    }

    #[test]
    fn empty_description_is_absent() {
        let event = normalize_event(&raw(json!({"id": "x", "description": ""})));
        assert_eq!(event.description, None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["description"], serde_json::Value::Null);
    }

    #[test]
    fn description_is_truncated_by_chars() {
        let long = "é".repeat(250);
        let event = normalize_event(&raw(json!({"id": "x", "description": long})));
        assert_eq!(event.description.unwrap().chars().count(), 200);
    }

    #[test]
    fn cancelled_events_are_dropped() {
        let events = normalize_events(&[
            raw(json!({"id": "a", "status": "confirmed"})),
            raw(json!({"id": "b", "status": "cancelled"})),
            raw(json!({"id": "c"})),
        ]);
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }
}
