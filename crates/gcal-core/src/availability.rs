//! Free-slot discovery inside working hours.
//!
//! [`find_slots`] walks a cursor forward from `now`, normalising it into the
//! working-hours window of a working weekday, testing a candidate of the
//! requested duration against every busy interval, and emitting it when
//! nothing conflicts. On a conflict the cursor jumps to the end of the first
//! conflicting interval in input order. Busy intervals need not be sorted or
//! merged.
//!
//! Every start between the cursor and the end of a conflicting interval
//! conflicts with that same interval, so the jump never skips a valid start.
//! The output is therefore the same for any ordering of the busy input.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::busy::BusyInterval;
use crate::time::{at_hour, rfc3339};

pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_STEP_MINUTES: i64 = 15;

/// Rejected search parameters. No scan work happens when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(Duration),

    #[error("step must be positive, got {0}")]
    NonPositiveStep(Duration),

    #[error("horizon {horizon} is before now {now}")]
    HorizonBeforeNow {
        now: DateTime<Utc>,
        horizon: DateTime<Utc>,
    },

    #[error("invalid working hours {start}:00-{end}:00")]
    InvalidWorkingHours { start: u32, end: u32 },

    #[error("no working weekdays configured")]
    NoWorkingDays,
}

/// The daily window and weekdays during which slots may be offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingHoursPolicy {
    /// First bookable hour (inclusive).
    pub start_hour: u32,
    /// Hour at which the working day ends; a slot may end exactly on it.
    pub end_hour: u32,
    pub working_weekdays: Vec<Weekday>,
    /// Offset in which hours and weekdays are read.
    pub utc_offset: FixedOffset,
}

impl Default for WorkingHoursPolicy {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            working_weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            utc_offset: Utc.fix(),
        }
    }
}

impl WorkingHoursPolicy {
    #[must_use]
    pub fn with_hours(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.start_hour = start_hour;
        self.end_hour = end_hour;
        self
    }

    #[must_use]
    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.working_weekdays = weekdays.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn validate(&self) -> Result<(), AvailabilityError> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(AvailabilityError::InvalidWorkingHours {
                start: self.start_hour,
                end: self.end_hour,
            });
        }
        if self.working_weekdays.is_empty() {
            return Err(AvailabilityError::NoWorkingDays);
        }
        Ok(())
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_weekdays.contains(&day)
    }

    fn day_start(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        at_hour(date, self.start_hour, self.utc_offset)
    }

    fn day_end(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        at_hour(date, self.end_hour, self.utc_offset)
    }

    /// Start of the working day after `date`, whatever weekday it is.
    fn next_day_start(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        date.succ_opt().map(|next| self.day_start(next))
    }

    /// Start of the first working weekday after `date`.
    fn next_working_day_start(&self, date: NaiveDate) -> Option<DateTime<FixedOffset>> {
        let mut next = date.succ_opt()?;
        while !self.is_working_day(next.weekday()) {
            next = next.succ_opt()?;
        }
        Some(self.day_start(next))
    }
}

/// Scan parameters for [`find_slots`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub now: DateTime<Utc>,
    /// No slot starts at or after this instant.
    pub horizon: DateTime<Utc>,
    pub duration: Duration,
    pub max_results: usize,
    /// Cursor advance after each emitted slot.
    pub step: Duration,
}

impl SearchRequest {
    /// A request with the default cap and step.
    pub fn new(now: DateTime<Utc>, horizon: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            now,
            horizon,
            duration,
            max_results: DEFAULT_MAX_RESULTS,
            step: Duration::minutes(DEFAULT_STEP_MINUTES),
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub fn validate(&self) -> Result<(), AvailabilityError> {
        if self.duration <= Duration::zero() {
            return Err(AvailabilityError::NonPositiveDuration(self.duration));
        }
        if self.step <= Duration::zero() {
            return Err(AvailabilityError::NonPositiveStep(self.step));
        }
        if self.horizon < self.now {
            return Err(AvailabilityError::HorizonBeforeNow {
                now: self.now,
                horizon: self.horizon,
            });
        }
        Ok(())
    }
}

/// An open interval of exactly the requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    #[serde(with = "rfc3339")]
    pub start: DateTime<FixedOffset>,
    #[serde(with = "rfc3339")]
    pub end: DateTime<FixedOffset>,
}

/// Enumerates free slots in discovery order.
///
/// # Errors
///
/// Returns an [`AvailabilityError`] for a non-positive duration or step, a
/// horizon before `now`, or an invalid policy.
pub fn find_slots(
    busy: &[BusyInterval],
    req: &SearchRequest,
    policy: &WorkingHoursPolicy,
) -> Result<Vec<FreeSlot>, AvailabilityError> {
    req.validate()?;
    policy.validate()?;

    let mut slots = Vec::new();
    if req.max_results == 0 {
        return Ok(slots);
    }

    let offset = policy.utc_offset;
    let horizon = req.horizon.with_timezone(&offset);
    let mut cursor = req.now.with_timezone(&offset);

    while cursor < horizon && slots.len() < req.max_results {
        if cursor.hour() < policy.start_hour {
            cursor = policy.day_start(cursor.date_naive());
            if cursor >= horizon {
                break;
            }
        } else if cursor.hour() >= policy.end_hour {
            let Some(next) = policy.next_day_start(cursor.date_naive()) else {
                break;
            };
            cursor = next;
            continue;
        }

        if !policy.is_working_day(cursor.weekday()) {
            let Some(next) = policy.next_working_day_start(cursor.date_naive()) else {
                break;
            };
            cursor = next;
            continue;
        }

        let Some(candidate_end) = cursor.checked_add_signed(req.duration) else {
            break;
        };

        if candidate_end > policy.day_end(cursor.date_naive()) {
            let Some(next) = policy.next_day_start(cursor.date_naive()) else {
                break;
            };
            cursor = next;
            continue;
        }

        if let Some(conflict) = busy.iter().find(|b| b.overlaps(cursor, candidate_end)) {
            cursor = conflict.end.with_timezone(&offset);
            continue;
        }

        slots.push(FreeSlot {
            start: cursor,
            end: candidate_end,
        });
        let Some(next) = cursor.checked_add_signed(req.step) else {
            break;
        };
        cursor = next;
    }

    tracing::debug!(
        busy = busy.len(),
        found = slots.len(),
        duration_minutes = req.duration.num_minutes(),
        "free slot scan finished"
    );
    Ok(slots)
}
