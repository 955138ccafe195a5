//! Subcommand implementations.

#[cfg(feature = "google")]
pub mod auth;
pub mod calendar;
pub mod config;
pub mod server;
