//! An in-process provider holding events in memory.
//!
//! Backs the service and dispatcher tests. List results follow the Google
//! provider's contract: they overlap the window, come back in start order
//! and respect `max_results`.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::normalize_event;
use crate::provider::{BoxFuture, CalendarProvider, ListQuery, SendUpdates};
use crate::raw_event::{RawEvent, RawEventTime};

#[derive(Debug, Default)]
struct State {
    events: Vec<RawEvent>,
    fail_next: Option<ProviderError>,
    last_query: Option<ListQuery>,
    last_send_updates: Option<SendUpdates>,
    quick_span: Option<(RawEventTime, RawEventTime)>,
}

#[derive(Debug)]
pub struct InMemoryProvider {
    name: String,
    state: Mutex<State>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            state: Mutex::new(State::default()),
            next_id: AtomicU64::new(1),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Seeds the store. Events without an id get one assigned.
    #[must_use]
    pub fn with_events(self, events: impl IntoIterator<Item = RawEvent>) -> Self {
        for event in events {
            let event = self.assign_id(event);
            self.lock().events.push(event);
        }
        self
    }

    /// Times given to events created by [`CalendarProvider::quick_add`].
    #[must_use]
    pub fn with_quick_add_span(self, start: RawEventTime, end: RawEventTime) -> Self {
        self.lock().quick_span = Some((start, end));
        self
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: ProviderError) {
        self.lock().fail_next = Some(error);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.lock().last_query.clone()
    }

    pub fn last_send_updates(&self) -> Option<SendUpdates> {
        self.lock().last_send_updates
    }

    pub fn events(&self) -> Vec<RawEvent> {
        self.lock().events.clone()
    }

    fn assign_id(&self, mut event: RawEvent) -> RawEvent {
        if event.id.is_none() {
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let id = format!("mem-{n}");
            event.html_link = Some(format!("memory://events/{id}"));
            event.id = Some(id);
        }
        event
    }

    // A panicking test thread leaves the store usable.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the store unless a failure is pending.
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> ProviderResult<T>) -> ProviderResult<T> {
        let mut state = self.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }
        f(&mut state)
    }

    fn not_found(&self) -> ProviderError {
        ProviderError::from_status(404, "Not Found").with_provider(&self.name)
    }
}

fn span(event: &RawEvent) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let normalized = normalize_event(event);
    let utc = Utc.fix();
    Some((
        normalized.start?.to_instant(utc),
        normalized.end?.to_instant(utc),
    ))
}

fn matches_text(event: &RawEvent, query: &str) -> bool {
    let needle = query.to_lowercase();
    [&event.summary, &event.description, &event.location]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}

impl CalendarProvider for InMemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events(&self, query: ListQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.with_state(|state| {
            let mut found: Vec<_> = state
                .events
                .iter()
                .filter(|e| !e.is_cancelled())
                .filter_map(|e| {
                    let (start, end) = span(e)?;
                    let overlaps = start < query.window.end && end > query.window.start;
                    overlaps.then_some((start, e.clone()))
                })
                .filter(|(_, e)| query.query.as_deref().is_none_or(|q| matches_text(e, q)))
                .collect();
            found.sort_by_key(|(start, _)| *start);

            let mut events: Vec<_> = found.into_iter().map(|(_, e)| e).collect();
            if let Some(max) = query.max_results {
                events.truncate(max);
            }
            state.last_query = Some(query);
            Ok(events)
        });
        Box::pin(async move { result })
    }

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        let result = self.with_state(|state| {
            state
                .events
                .iter()
                .find(|e| e.id.as_deref() == Some(event_id))
                .cloned()
                .ok_or_else(|| self.not_found())
        });
        Box::pin(async move { result })
    }

    fn insert_event<'a>(
        &'a self,
        event: &'a RawEvent,
        send_updates: SendUpdates,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        let result = self.with_state(|state| {
            let stored = self.assign_id(RawEvent {
                id: None,
                ..event.clone()
            });
            state.events.push(stored.clone());
            state.last_send_updates = Some(send_updates);
            Ok(stored)
        });
        Box::pin(async move { result })
    }

    fn update_event<'a>(
        &'a self,
        event_id: &'a str,
        event: &'a RawEvent,
    ) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        let result = self.with_state(|state| {
            let slot = state
                .events
                .iter_mut()
                .find(|e| e.id.as_deref() == Some(event_id))
                .ok_or_else(|| self.not_found())?;
            *slot = RawEvent {
                id: Some(event_id.to_string()),
                ..event.clone()
            };
            Ok(slot.clone())
        });
        Box::pin(async move { result })
    }

    fn delete_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        let result = self.with_state(|state| {
            let before = state.events.len();
            state.events.retain(|e| e.id.as_deref() != Some(event_id));
            if state.events.len() == before {
                return Err(self.not_found());
            }
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, ProviderResult<RawEvent>> {
        let result = self.with_state(|state| {
            let mut event = self.assign_id(RawEvent::new(text));
            if let Some((start, end)) = state.quick_span.clone() {
                event.start = Some(start);
                event.end = Some(end);
            }
            state.events.push(event.clone());
            Ok(event)
        });
        Box::pin(async move { result })
    }

    fn is_authenticated(&self) -> bool {
        true
    }
}
