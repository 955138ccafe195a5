//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use gcal_protocol::{Method, Request, param};

use crate::error::{ClientError, ClientResult};

/// gcal - Google Calendar from the command line
///
/// Calendar commands print one JSON object on stdout. Failures print
/// `{"error": "..."}` and exit with status 1.
#[derive(Debug, Parser)]
#[command(name = "gcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "GCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Send calendar commands to a running daemon instead of calling Google directly
    #[arg(long, global = true)]
    pub daemon: bool,

    /// Path to the daemon socket
    #[arg(long, global = true, env = "GCAL_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Today's events
    Today,

    /// Events from now over the next days
    Upcoming {
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Search upcoming events by text
    Search {
        query: String,
        #[arg(long)]
        days: Option<u32>,
    },

    /// Create an event
    Create {
        summary: String,
        /// RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`
        start: String,
        end: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Attendee email; repeat for several. Invitations are sent when present.
        #[arg(long = "attendee", action = clap::ArgAction::Append)]
        attendees: Vec<String>,
    },

    /// Fetch one event
    Get { event_id: String },

    /// Change fields of an event; omitted fields are kept
    Update {
        event_id: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },

    /// Delete an event
    Delete { event_id: String },

    /// Create an event from text, e.g. "Lunch with Sam tomorrow at noon"
    Quick { text: String },

    /// Find open slots inside working hours
    FreeSlots {
        /// Meeting length in minutes
        #[arg(long, allow_negative_numbers = true)]
        duration: i64,
        #[arg(long)]
        days: Option<u32>,
    },

    /// Call a method by name with a JSON object of parameters
    Call {
        method: String,
        #[arg(long)]
        params: Option<String>,
    },

    /// List the available methods and their parameters
    Methods,

    /// Report whether the calendar service is usable
    Health,

    /// Start the daemon in the foreground
    Server,

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// The request a calendar command stands for; `None` for local commands.
    pub fn to_request(&self) -> ClientResult<Option<Request>> {
        let request = match self {
            Self::Today => Request::for_method(Method::Today),
            Self::Upcoming { days, limit } => Request::for_method(Method::Upcoming)
                .with_optional_param(param::DAYS, *days)
                .with_optional_param(param::LIMIT, *limit),
            Self::Search { query, days } => Request::for_method(Method::Search)
                .with_param(param::QUERY, query.as_str())
                .with_optional_param(param::DAYS, *days),
            Self::Create {
                summary,
                start,
                end,
                description,
                location,
                attendees,
            } => Request::for_method(Method::Create)
                .with_param(param::SUMMARY, summary.as_str())
                .with_param(param::START, start.as_str())
                .with_param(param::END, end.as_str())
                .with_optional_param(param::DESCRIPTION, description.as_deref())
                .with_optional_param(param::LOCATION, location.as_deref())
                .with_optional_param(
                    param::ATTENDEES,
                    (!attendees.is_empty()).then(|| attendees.clone()),
                ),
            Self::Get { event_id } => {
                Request::for_method(Method::Get).with_param(param::EVENT_ID, event_id.as_str())
            }
            Self::Update {
                event_id,
                summary,
                start,
                end,
                description,
                location,
            } => Request::for_method(Method::Update)
                .with_param(param::EVENT_ID, event_id.as_str())
                .with_optional_param(param::SUMMARY, summary.as_deref())
                .with_optional_param(param::START, start.as_deref())
                .with_optional_param(param::END, end.as_deref())
                .with_optional_param(param::DESCRIPTION, description.as_deref())
                .with_optional_param(param::LOCATION, location.as_deref()),
            Self::Delete { event_id } => {
                Request::for_method(Method::Delete).with_param(param::EVENT_ID, event_id.as_str())
            }
            Self::Quick { text } => {
                Request::for_method(Method::Quick).with_param(param::TEXT, text.as_str())
            }
            Self::FreeSlots { duration, days } => Request::for_method(Method::FreeSlots)
                .with_param(param::DURATION_MINUTES, *duration)
                .with_optional_param(param::DAYS, *days),
            Self::Call { method, params } => call_request(method, params.as_deref())?,
            Self::Methods => Request::for_method(Method::Methods),
            Self::Health => Request::for_method(Method::Health),
            Self::Server | Self::Auth { .. } | Self::Config { .. } => return Ok(None),
        };
        Ok(Some(request))
    }
}

fn call_request(method: &str, params: Option<&str>) -> ClientResult<Request> {
    let mut request = Request::new(method);
    if let Some(raw) = params {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => request.params = map,
            Ok(_) => return Err(ClientError::Argument("--params must be a JSON object".into())),
            Err(e) => return Err(ClientError::Argument(format!("--params is not valid JSON: {e}"))),
        }
    }
    Ok(request)
}

#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to the credentials JSON downloaded from Google Cloud Console
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Re-authenticate even if tokens are already stored
        #[arg(long, short)]
        force: bool,
    },

    /// Show whether Google tokens are stored and sufficient
    #[cfg(feature = "google")]
    Status,

    /// Remove stored Google tokens
    #[cfg(feature = "google")]
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Dump,

    /// Check the configuration without contacting Google
    Validate,

    /// Show the configuration file path
    Path,
}
