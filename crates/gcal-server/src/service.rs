//! Calendar operations on top of a [`CalendarProvider`].
//!
//! Each operation makes one provider call, except `update`, which fetches
//! the event before writing it back. Free-slot search lists the horizon once
//! and runs the availability engine locally. A list call follows
//! `nextPageToken` on the Google provider, so one listing can take several
//! HTTP requests when the horizon holds more than a page of events.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, instrument};

use gcal_core::{
    Event, SearchRequest, TimeWindow, WorkingHoursPolicy, extract_busy, find_slots,
};
use gcal_core::availability::{DEFAULT_MAX_RESULTS, DEFAULT_STEP_MINUTES};
use gcal_protocol::param;
use gcal_protocol::results::{
    ComponentHealth, Created, DayEvents, Deleted, FreeSlots, Health, QuickCreated, SearchResults,
    UpcomingEvents, Updated,
};
use gcal_providers::{
    CalendarProvider, ListQuery, RawEvent, RawEventTime, SendUpdates, normalize_event,
    normalize_events,
};

use crate::error::{CommandError, CommandResult};

/// Source of "now". Swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Working calendar and scan tuning for free-slot search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySettings {
    pub policy: WorkingHoursPolicy,
    pub step: Duration,
    pub max_results: usize,
}

impl Default for AvailabilitySettings {
    fn default() -> Self {
        Self {
            policy: WorkingHoursPolicy::default(),
            step: Duration::minutes(DEFAULT_STEP_MINUTES),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

/// Fields for a new event. Times are already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
}

/// Fields to overwrite on an existing event. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl EventPatch {
    fn apply(self, event: &mut RawEvent) {
        if let Some(summary) = self.summary {
            event.summary = Some(summary);
        }
        if let Some(description) = self.description {
            event.description = Some(description);
        }
        if let Some(location) = self.location {
            event.location = Some(location);
        }
        if let Some(start) = self.start {
            event.start = Some(RawEventTime::instant(start));
        }
        if let Some(end) = self.end {
            event.end = Some(RawEventTime::instant(end));
        }
    }
}

pub struct CalendarService {
    provider: Arc<dyn CalendarProvider>,
    settings: AvailabilitySettings,
    clock: Clock,
}

impl fmt::Debug for CalendarService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarService")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CalendarService {
    pub fn new(provider: Arc<dyn CalendarProvider>) -> Self {
        Self {
            provider,
            settings: AvailabilitySettings::default(),
            clock: Arc::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AvailabilitySettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The offset caller-supplied local times are read in.
    pub fn offset(&self) -> FixedOffset {
        self.settings.policy.utc_offset
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn window(&self, days: u32) -> CommandResult<TimeWindow> {
        TimeWindow::next_days(self.now(), days)
            .ok_or_else(|| CommandError::invalid(param::DAYS, "too far in the future"))
    }

    async fn list(&self, query: ListQuery) -> CommandResult<Vec<Event>> {
        let raw = self.provider.list_events(query).await?;
        Ok(normalize_events(&raw))
    }

    /// Events overlapping the current day in the policy offset.
    #[instrument(skip(self))]
    pub async fn today(&self) -> CommandResult<DayEvents> {
        let now = self.now();
        let date = now.with_timezone(&self.offset()).date_naive();
        let events = self
            .list(ListQuery::new(TimeWindow::day_of(now, self.offset())))
            .await?;
        Ok(DayEvents::new(date, events))
    }

    #[instrument(skip(self))]
    pub async fn upcoming(&self, days: u32, limit: u32) -> CommandResult<UpcomingEvents> {
        let query = ListQuery::new(self.window(days)?).with_max_results(limit as usize);
        let events = self.list(query).await?;
        Ok(UpcomingEvents::new(days, events))
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, days: u32) -> CommandResult<SearchResults> {
        let events = self
            .list(ListQuery::new(self.window(days)?).with_query(query))
            .await?;
        Ok(SearchResults::new(query, events))
    }

    /// Creates an event. Invitations go out only when there are attendees.
    #[instrument(skip(self, event), fields(summary = %event.summary))]
    pub async fn create(&self, event: NewEvent) -> CommandResult<Created> {
        if event.end < event.start {
            return Err(CommandError::invalid(param::END, "end is before start"));
        }

        let send_updates = SendUpdates::for_attendees(!event.attendees.is_empty());
        let mut raw = RawEvent::new(event.summary).with_times(
            RawEventTime::instant(event.start),
            RawEventTime::instant(event.end),
        );
        raw.description = event.description;
        raw.location = event.location;
        let raw = raw.with_attendees(event.attendees);

        let stored = self.provider.insert_event(&raw, send_updates).await?;
        debug!(event_id = ?stored.id, "event created");
        Ok(Created {
            created: true,
            event_id: stored.id,
            html_link: stored.html_link,
            summary: stored.summary,
        })
    }

    pub async fn get(&self, event_id: &str) -> CommandResult<Event> {
        let raw = self.provider.get_event(event_id).await?;
        Ok(normalize_event(&raw))
    }

    /// Fetches the event, overwrites the patched fields and writes the whole
    /// record back.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, event_id: &str, patch: EventPatch) -> CommandResult<Updated> {
        if let (Some(start), Some(end)) = (patch.start, patch.end)
            && end < start
        {
            return Err(CommandError::invalid(param::END, "end is before start"));
        }

        let mut raw = self.provider.get_event(event_id).await?;
        patch.apply(&mut raw);
        let stored = self.provider.update_event(event_id, &raw).await?;
        Ok(Updated {
            updated: true,
            event_id: stored.id,
            html_link: stored.html_link,
            summary: stored.summary,
        })
    }

    pub async fn delete(&self, event_id: &str) -> CommandResult<Deleted> {
        self.provider.delete_event(event_id).await?;
        Ok(Deleted::new(event_id))
    }

    /// Creates an event from free text; the provider decides the times.
    #[instrument(skip(self))]
    pub async fn quick(&self, text: &str) -> CommandResult<QuickCreated> {
        let stored = self.provider.quick_add(text).await?;
        let normalized = normalize_event(&stored);
        Ok(QuickCreated {
            created: Created {
                created: true,
                event_id: stored.id,
                html_link: stored.html_link,
                summary: stored.summary,
            },
            start: normalized.start,
            end: normalized.end,
        })
    }

    /// Open slots of `duration_minutes` within the next `days` days.
    #[instrument(skip(self))]
    pub async fn free_slots(&self, duration_minutes: i64, days: u32) -> CommandResult<FreeSlots> {
        let duration = Duration::try_minutes(duration_minutes)
            .ok_or_else(|| CommandError::invalid(param::DURATION_MINUTES, "out of range"))?;
        let window = self.window(days)?;

        let request = SearchRequest::new(window.start, window.end, duration)
            .with_max_results(self.settings.max_results)
            .with_step(self.settings.step);
        // Reject bad input before spending a provider call on it.
        request.validate()?;
        self.settings.policy.validate()?;

        let events = self.list(ListQuery::new(window)).await?;
        let busy = extract_busy(&events, self.offset());
        let slots = find_slots(&busy, &request, &self.settings.policy)?;
        debug!(
            events = events.len(),
            busy = busy.len(),
            slots = slots.len(),
            "free slot search finished"
        );
        Ok(FreeSlots::new(duration_minutes, days, slots))
    }

    pub fn health(&self) -> Health {
        let component = match self.provider.unavailable_reason() {
            Some(reason) => ComponentHealth {
                ok: false,
                message: format!("Service not initialized: {reason}"),
            },
            None if self.provider.is_authenticated() => ComponentHealth {
                ok: true,
                message: "Calendar service initialized".to_string(),
            },
            None => ComponentHealth {
                ok: false,
                message: "Not authenticated - run 'gcal auth google'".to_string(),
            },
        };
        Health::new(self.provider.name(), component)
    }
}
