//! Client error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use gcal_core::TracingError;
use gcal_protocol::{ErrorResponse, ProtocolError};
use gcal_providers::ProviderError;
use gcal_server::ServerError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to resolve `{reference}`: {reason}")]
    Secret { reference: String, reason: String },

    #[error("failed to connect to {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("timed out {0}")]
    Timeout(&'static str),

    /// An error response from the handler, in-process or from the daemon.
    #[error("{}", .0.message)]
    Remote(ErrorResponse),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Tracing(#[from] TracingError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn secret(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Secret {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Wire code for errors that came back as a response.
    pub fn code(&self) -> Option<gcal_protocol::ErrorCode> {
        match self {
            Self::Remote(error) => Some(error.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcal_protocol::ErrorCode;

    #[test]
    fn remote_errors_display_the_message() {
        let err = ClientError::Remote(
            ErrorResponse::new(ErrorCode::MissingParameter, "missing required parameter: query")
                .with_parameter("query"),
        );
        assert_eq!(err.to_string(), "missing required parameter: query");
        assert_eq!(err.code(), Some(ErrorCode::MissingParameter));
    }

    #[test]
    fn connection_errors_name_the_socket() {
        let err = ClientError::Connection {
            path: PathBuf::from("/tmp/gcal.sock"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("failed to connect to /tmp/gcal.sock"));
        assert_eq!(err.code(), None);
    }
}
