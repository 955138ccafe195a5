//! Calendar backends.
//!
//! - [`CalendarProvider`]: the trait every backend implements
//! - [`RawEvent`]: the provider-shaped event record
//! - [`normalize_event`]: raw record to [`gcal_core::Event`]
//! - [`InMemoryProvider`]: an in-process backend for tests
//! - [`google`]: the Google Calendar backend (feature `google`)
//!
//! ```text
//!   Google Calendar API          in-memory store
//!            │                          │
//!     GoogleProvider             InMemoryProvider
//!            └──── CalendarProvider ────┘
//!                        │
//!                     RawEvent
//!                        │  normalize_event()
//!                        ▼
//!                  gcal_core::Event
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod normalize;
pub mod provider;
pub mod raw_event;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::InMemoryProvider;
pub use normalize::{normalize_event, normalize_events};
pub use provider::{BoxFuture, CalendarProvider, ErrorProvider, ListQuery, SendUpdates};
pub use raw_event::{RawAttendee, RawEvent, RawEventTime};
