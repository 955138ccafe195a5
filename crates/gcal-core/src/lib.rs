//! Core types: events, time parsing, busy intervals, availability engine

pub mod availability;
pub mod busy;
pub mod event;
pub mod time;
pub mod tracing;

pub use availability::{
    AvailabilityError, FreeSlot, SearchRequest, WorkingHoursPolicy, find_slots,
};
pub use busy::{BusyInterval, extract_busy};
pub use event::{Event, UNTITLED, truncate_description};
pub use time::{EventTime, TimeParseError, TimeWindow, parse_instant};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
