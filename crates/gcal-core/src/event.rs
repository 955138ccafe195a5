//! The canonical event record returned to callers.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// Title used when the provider record has none.
pub const UNTITLED: &str = "(No title)";

/// Maximum number of characters kept from an event description.
pub const DESCRIPTION_LIMIT: usize = 200;

/// A provider-agnostic calendar event.
///
/// The service never owns event state; this is a read-only snapshot of a
/// provider record. `start` and `end` are `None` only when the provider
/// carried neither a precise nor a whole-day value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub html_link: Option<String>,
    #[serde(rename = "all_day")]
    pub is_all_day: bool,
}

impl Event {
    /// Creates an event with a precise or whole-day span and no optional
    /// fields set.
    pub fn new(id: impl Into<String>, summary: impl Into<String>, start: EventTime, end: EventTime) -> Self {
        let is_all_day = start.is_all_day();
        Self {
            id: id.into(),
            summary: summary.into(),
            start: Some(start),
            end: Some(end),
            location: None,
            description: None,
            html_link: None,
            is_all_day,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the description, truncated to [`DESCRIPTION_LIMIT`] characters.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(truncate_description(description));
        self
    }

    #[must_use]
    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }
}

/// Keeps at most [`DESCRIPTION_LIMIT`] characters of `text`.
pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
