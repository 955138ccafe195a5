//! Busy interval extraction.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// A half-open range `[start, end)` during which the calendar owner is
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl BusyInterval {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
        start < self.end && end > self.start
    }
}

/// Derives one busy interval per event, in input order.
///
/// Events missing either bound are skipped, as are events whose end
/// precedes their start. Whole-day bounds resolve to midnight in `offset`.
/// Overlapping intervals are kept as-is.
pub fn extract_busy(events: &[Event], offset: FixedOffset) -> Vec<BusyInterval> {
    events
        .iter()
        .filter_map(|event| {
            let (Some(start), Some(end)) = (&event.start, &event.end) else {
                tracing::debug!(event_id = %event.id, "skipping event without bounds");
                return None;
            };
            let interval = BusyInterval::new(start.to_instant(offset), end.to_instant(offset));
            if interval.end < interval.start {
                tracing::debug!(event_id = %event.id, "skipping event ending before it starts");
                return None;
            }
            Some(interval)
        })
        .collect()
}
