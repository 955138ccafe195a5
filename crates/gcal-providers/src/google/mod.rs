//! Google Calendar provider.
//!
//! - [`GoogleProvider`] implements [`CalendarProvider`](crate::CalendarProvider)
//!   over the Calendar API v3 ([`GoogleCalendarClient`]).
//! - [`OAuthClient`] runs the installed-app PKCE flow with a loopback
//!   redirect and refreshes access tokens.
//! - [`GoogleSession`] owns the token set shared by concurrent requests and
//!   persists it through [`TokenStorage`].
//!
//! ```ignore
//! use gcal_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//! if provider.needs_reauth().await {
//!     provider.authenticate().await?;
//! }
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod session;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use session::{GoogleSession, TokenRefresher};
pub use tokens::{RefreshedToken, TokenInfo, TokenStorage};
