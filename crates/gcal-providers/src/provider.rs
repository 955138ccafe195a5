//! CalendarProvider trait definition.
//!
//! A provider is the only thing in the system that talks to a calendar
//! backend. It deals in [`RawEvent`] records; normalization happens above it.
//! Every operation is a single round trip and is never retried here.

use std::future::Future;
use std::pin::Pin;

use gcal_core::TimeWindow;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// Boxed future returned by provider methods, keeping the trait object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether the backend should notify attendees of a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendUpdates {
    All,
    None,
}

impl SendUpdates {
    /// Notify only when there is someone to notify.
    pub fn for_attendees(has_attendees: bool) -> Self {
        if has_attendees { Self::All } else { Self::None }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::None => "none",
        }
    }
}

/// Parameters for [`CalendarProvider::list_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Events overlapping this window are returned.
    pub window: TimeWindow,
    /// Upper bound on returned events; `None` means every page.
    pub max_results: Option<usize>,
    /// Free-text filter matched by the backend.
    pub query: Option<String>,
}

impl ListQuery {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            max_results: None,
            query: None,
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// A calendar backend.
///
/// Recurring events are expanded into single instances and listed in start
/// order.
pub trait CalendarProvider: Send + Sync {
    /// Name used in logs and error messages (e.g. `"google:primary"`).
    fn name(&self) -> &str;

    fn list_events(&self, query: ListQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>>;

    /// Creates an event and returns the stored record.
    fn insert_event<'a>(
        &'a self,
        event: &'a RawEvent,
        send_updates: SendUpdates,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>>;

    /// Replaces an event with `event` and returns the stored record.
    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        event: &'a RawEvent,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>>;

    fn delete_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;

    /// Creates an event from a natural-language description.
    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>>;

    /// Whether credentials are present. Says nothing about their validity.
    fn is_authenticated(&self) -> bool;

    /// Why the provider cannot serve calls at all, if it cannot.
    fn unavailable_reason(&self) -> Option<String> {
        None
    }
}

/// A provider that fails every call with the same error.
///
/// Stands in when the real provider could not be built, so the daemon can
/// still answer `health` and `methods`.
#[derive(Debug)]
pub struct ErrorProvider {
    name: String,
    error: ProviderError,
}

impl ErrorProvider {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn fail<'a, T: Send + 'a>(&self) -> BoxFuture<'a, ProviderResult<T>> {
        let error =
            ProviderError::new(self.error.code(), self.error.message()).with_provider(&self.name);
        Box::pin(async move { Err(error) })
    }
}

impl CalendarProvider for ErrorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events(&self, _query: ListQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        self.fail()
    }

    fn get_event<'a>(&'a self, _event_id: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        self.fail()
    }

    fn insert_event<'a>(
        &'a self,
        _event: &'a RawEvent,
        _send_updates: SendUpdates,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        self.fail()
    }

    fn update_event<'a>(
        &'a self,
        _event_id: &'a str,
        _event: &'a RawEvent,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        self.fail()
    }

    fn delete_event<'a>(&'a self, _event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        self.fail()
    }

    fn quick_add<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        self.fail()
    }

    fn is_authenticated(&self) -> bool {
        false
    }

    fn unavailable_reason(&self) -> Option<String> {
        Some(self.error.message().to_string())
    }
}
