//! Calendar operations and the daemon that serves them.
//!
//! - [`CalendarService`]: today, upcoming, search, create, get, update,
//!   delete, quick add and free-slot search over a `CalendarProvider`
//! - [`RequestHandler`]: routes `{method, params}` requests to the service
//! - [`SocketServer`]: Unix socket listener speaking the framed protocol
//! - [`SignalHandler`]: SIGTERM/SIGINT to graceful shutdown
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gcal_providers::InMemoryProvider;
//! use gcal_server::{
//!     CalendarService, RequestHandler, ServerConfig, SignalHandler, SocketServer,
//!     make_connection_handler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = CalendarService::new(Arc::new(InMemoryProvider::new()));
//!     let handler = Arc::new(RequestHandler::new(Arc::new(service)));
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener()?;
//!
//!     let server = SocketServer::new(ServerConfig::default()).await?;
//!     server
//!         .run_until_shutdown(make_connection_handler(handler), signals.shutdown().wait())
//!         .await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod params;
mod service;
mod signals;
mod socket;

pub use config::{
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_MAX_CONNECTIONS, ServerConfig, default_socket_path,
};
pub use error::{CommandError, CommandResult, ServerError, ServerResult};
pub use handler::{RequestHandler, make_connection_handler};
pub use service::{AvailabilitySettings, CalendarService, Clock, EventPatch, NewEvent};
pub use signals::{ShutdownSignal, SignalHandler};
pub use socket::{Connection, SocketServer};
