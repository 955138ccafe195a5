//! The `gcal` command-line client.
//!
//! Calendar commands build a [`gcal_protocol::Request`] and answer it either
//! in-process through [`gcal_server::RequestHandler`] or by sending it to a
//! running daemon over [`SocketClient`]. Either way the caller sees the same
//! JSON.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod socket;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use socket::SocketClient;
