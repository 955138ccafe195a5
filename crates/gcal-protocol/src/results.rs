//! Typed result payloads, one per method.

use chrono::NaiveDate;
use gcal_core::{Event, EventTime, FreeSlot};
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// `calendar.today`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEvents {
    pub date: NaiveDate,
    pub events: Vec<Event>,
    pub count: usize,
}

impl DayEvents {
    pub fn new(date: NaiveDate, events: Vec<Event>) -> Self {
        let count = events.len();
        Self { date, events, count }
    }
}

/// `calendar.upcoming`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingEvents {
    pub days: u32,
    pub events: Vec<Event>,
    pub count: usize,
}

impl UpcomingEvents {
    pub fn new(days: u32, events: Vec<Event>) -> Self {
        let count = events.len();
        Self { days, events, count }
    }
}

/// `calendar.search`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub events: Vec<Event>,
    pub count: usize,
}

impl SearchResults {
    pub fn new(query: impl Into<String>, events: Vec<Event>) -> Self {
        let count = events.len();
        Self {
            query: query.into(),
            events,
            count,
        }
    }
}

/// `calendar.create`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
    pub created: bool,
    pub event_id: Option<String>,
    pub html_link: Option<String>,
    pub summary: Option<String>,
}

/// `calendar.quick`: a creation plus the times the provider inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickCreated {
    #[serde(flatten)]
    pub created: Created,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
}

/// `calendar.update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    pub updated: bool,
    pub event_id: Option<String>,
    pub html_link: Option<String>,
    pub summary: Option<String>,
}

/// `calendar.delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
    pub event_id: String,
}

impl Deleted {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            deleted: true,
            event_id: event_id.into(),
        }
    }
}

/// `calendar.free_slots`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlots {
    pub duration_minutes: i64,
    pub days: u32,
    pub free_slots: Vec<FreeSlot>,
    pub count: usize,
}

impl FreeSlots {
    pub fn new(duration_minutes: i64, days: u32, free_slots: Vec<FreeSlot>) -> Self {
        let count = free_slots.len();
        Self {
            duration_minutes,
            days,
            free_slots,
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub ok: bool,
    pub message: String,
}

/// `health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub calendar_service: ComponentHealth,
    pub provider: String,
    pub protocol_version: String,
    pub version: String,
}

impl Health {
    pub fn new(provider: impl Into<String>, calendar_service: ComponentHealth) -> Self {
        Self {
            calendar_service,
            provider: provider.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_follow_contents() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let events = vec![Event::new(
            "a",
            "Standup",
            EventTime::AllDay(date),
            EventTime::AllDay(date),
        )];
        let day = DayEvents::new(date, events);
        assert_eq!(day.count, 1);
        assert_eq!(serde_json::to_value(&day).unwrap()["date"], json!("2026-03-02"));

        assert_eq!(FreeSlots::new(30, 7, Vec::new()).count, 0);
    }

    #[test]
    fn quick_created_is_flat() {
        let quick = QuickCreated {
            created: Created {
                created: true,
                event_id: Some("evt".into()),
                html_link: None,
                summary: Some("Lunch".into()),
            },
            start: Some(EventTime::AllDay(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap())),
            end: None,
        };
        assert_eq!(
            serde_json::to_value(&quick).unwrap(),
            json!({
                "created": true,
                "event_id": "evt",
                "html_link": null,
                "summary": "Lunch",
                "start": "2026-03-03",
                "end": null
            })
        );
    }

    #[test]
    fn deleted_shape() {
        assert_eq!(
            serde_json::to_value(Deleted::new("evt")).unwrap(),
            json!({"deleted": true, "event_id": "evt"})
        );
    }
}
