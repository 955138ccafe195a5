//! Time types for calendar events.
//!
//! [`EventTime`] is the start or end of an event: either a precise instant or
//! an all-day date. [`TimeWindow`] is a half-open query range, and
//! [`parse_instant`] turns caller-supplied strings into instants.

use std::fmt;

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Start or end of a calendar event.
///
/// Serialized as a plain string: RFC 3339 for instants, `YYYY-MM-DD` for
/// all-day dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventTime {
    /// A precise instant, keeping the offset the provider reported.
    DateTime(DateTime<FixedOffset>),
    /// A whole-day marker.
    AllDay(NaiveDate),
}

impl EventTime {
    /// Returns `true` for whole-day markers.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Resolves this time to an instant.
    ///
    /// All-day dates resolve to local midnight in `offset`.
    pub fn to_instant(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => at_local(*date, NaiveTime::MIN, offset),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(dt) => f.write_str(&rfc3339::format(dt)),
            Self::AllDay(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<EventTime> for String {
    fn from(value: EventTime) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for EventTime {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return Ok(Self::DateTime(dt));
        }
        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(Self::AllDay)
            .map_err(|_| TimeParseError::Unrecognized(value))
    }
}

/// `serde(with = "rfc3339")` for instants. UTC is written as `+00:00`,
/// matching [`EventTime`].
pub mod rfc3339 {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn format(dt: &DateTime<FixedOffset>) -> String {
        dt.to_rfc3339()
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw).map_err(de::Error::custom)
    }
}

/// Failure to turn a string into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("empty date/time string")]
    Empty,

    #[error("unrecognized date/time: {0:?}")]
    Unrecognized(String),
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a caller-supplied date/time string.
///
/// Accepts RFC 3339 (`2026-03-02T09:00:00+01:00`), a naive date-time
/// (`2026-03-02T09:00`, `2026-03-02 09:00:00`) read in `offset`, or a bare
/// date read as local midnight in `offset`.
pub fn parse_instant(
    input: &str,
    offset: FixedOffset,
) -> Result<DateTime<FixedOffset>, TimeParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TimeParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(from_local(naive, offset));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(|date| at_local(date, NaiveTime::MIN, offset))
        .map_err(|_| TimeParseError::Unrecognized(input.to_string()))
}

/// Builds the instant for `date` at `time` in `offset`.
pub fn at_local(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    from_local(date.and_time(time), offset)
}

/// Builds the instant for `date` at `hour:00` in `offset`.
///
/// Hour 24 means midnight at the end of `date`.
pub fn at_hour(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<FixedOffset> {
    from_local(
        date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour)),
        offset,
    )
}

// Fixed offsets have exactly one mapping for every local time.
fn from_local(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window, or `None` when `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The calendar day containing `now`, from local midnight to the next
    /// local midnight in `offset`.
    pub fn day_of(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let date = now.with_timezone(&offset).date_naive();
        Self {
            start: at_hour(date, 0, offset).with_timezone(&Utc),
            end: at_hour(date, 24, offset).with_timezone(&Utc),
        }
    }

    /// `[now, now + days)`, or `None` if the end is not representable.
    pub fn next_days(now: DateTime<Utc>, days: u32) -> Option<Self> {
        let end = now.checked_add_signed(Duration::days(i64::from(days)))?;
        Some(Self { start: now, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open containment test.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plus(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    mod event_time {
        use super::*;

        #[test]
        fn serializes_as_plain_strings() {
            let dt = EventTime::DateTime(
                DateTime::parse_from_rfc3339("2026-03-02T09:00:00+01:00").unwrap(),
            );
            assert_eq!(
                serde_json::to_string(&dt).unwrap(),
                r#""2026-03-02T09:00:00+01:00""#
            );

            let day = EventTime::AllDay(date(2026, 3, 2));
            assert_eq!(serde_json::to_string(&day).unwrap(), r#""2026-03-02""#);
        }

        #[test]
        fn utc_instants_use_a_numeric_offset() {
            let dt = EventTime::DateTime(utc(2026, 3, 2, 10, 0).fixed_offset());
            assert_eq!(
                serde_json::to_string(&dt).unwrap(),
                r#""2026-03-02T10:00:00+00:00""#
            );
        }

        #[test]
        fn deserializes_both_forms() {
            let dt: EventTime = serde_json::from_str(r#""2026-03-02T09:00:00Z""#).unwrap();
            assert!(!dt.is_all_day());

            let day: EventTime = serde_json::from_str(r#""2026-03-02""#).unwrap();
            assert_eq!(day.as_date(), Some(&date(2026, 3, 2)));

            assert!(serde_json::from_str::<EventTime>(r#""tomorrow""#).is_err());
        }

        #[test]
        fn all_day_resolves_to_local_midnight() {
            let day = EventTime::AllDay(date(2026, 3, 2));
            let instant = day.to_instant(plus(2));
            assert_eq!(instant.with_timezone(&Utc), utc(2026, 3, 1, 22, 0));
            assert_eq!(instant.hour(), 0);
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn rfc3339_keeps_its_offset() {
            let dt = parse_instant("2026-03-02T09:30:00-05:00", plus(0)).unwrap();
            assert_eq!(dt.with_timezone(&Utc), utc(2026, 3, 2, 14, 30));
        }

        #[test]
        fn naive_forms_use_given_offset() {
            for input in ["2026-03-02T09:30", "2026-03-02 09:30", "2026-03-02T09:30:00"] {
                let dt = parse_instant(input, plus(1)).unwrap();
                assert_eq!(dt.with_timezone(&Utc), utc(2026, 3, 2, 8, 30), "{input}");
            }
        }

        #[test]
        fn bare_date_is_midnight() {
            let dt = parse_instant("2026-03-02", plus(0)).unwrap();
            assert_eq!(dt.with_timezone(&Utc), utc(2026, 3, 2, 0, 0));
        }

        #[test]
        fn rejects_garbage() {
            assert_eq!(parse_instant("  ", plus(0)), Err(TimeParseError::Empty));
            assert!(matches!(
                parse_instant("next tuesday", plus(0)),
                Err(TimeParseError::Unrecognized(_))
            ));
        }
    }

    mod time_window {
        use super::*;

        #[test]
        fn rejects_inverted_range() {
            assert!(TimeWindow::new(utc(2026, 3, 2, 17, 0), utc(2026, 3, 2, 9, 0)).is_none());
            let w = TimeWindow::new(utc(2026, 3, 2, 9, 0), utc(2026, 3, 2, 17, 0)).unwrap();
            assert_eq!(w.duration(), Duration::hours(8));
        }

        #[test]
        fn day_of_follows_offset() {
            // 23:30 UTC on the 2nd is already the 3rd at +02:00.
            let w = TimeWindow::day_of(utc(2026, 3, 2, 23, 30), plus(2));
            assert_eq!(w.start, utc(2026, 3, 2, 22, 0));
            assert_eq!(w.end, utc(2026, 3, 3, 22, 0));
        }

        #[test]
        fn half_open_contains() {
            let w = TimeWindow::next_days(utc(2026, 3, 2, 0, 0), 1).unwrap();
            assert!(w.contains(utc(2026, 3, 2, 0, 0)));
            assert!(!w.contains(utc(2026, 3, 3, 0, 0)));
        }

        #[test]
        fn at_hour_24_is_next_midnight() {
            let end = at_hour(date(2026, 3, 2), 24, plus(0));
            assert_eq!(end.with_timezone(&Utc), utc(2026, 3, 3, 0, 0));
        }
    }
}
