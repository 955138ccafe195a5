//! Server and command error types.

use std::io;

use gcal_core::AvailabilityError;
use gcal_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use gcal_providers::{ProviderError, ProviderErrorCode};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the daemon itself, outside any single request.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Another daemon answers on the socket.
    #[error("Socket path already in use: {path}")]
    SocketInUse { path: String },

    #[error("Socket directory cannot be used: {path}")]
    SocketPathInvalid { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Server is shutting down")]
    Shutdown,
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn socket_in_use(path: impl Into<String>) -> Self {
        Self::SocketInUse { path: path.into() }
    }

    pub fn socket_path_invalid(path: impl Into<String>) -> Self {
        Self::SocketPathInvalid { path: path.into() }
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Why a single method call failed.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Precondition(#[from] AvailabilityError),
}

impl CommandError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownMethod(_) => ErrorCode::UnknownMethod,
            Self::MissingParameter(_) => ErrorCode::MissingParameter,
            Self::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            Self::Precondition(_) => ErrorCode::PreconditionFailed,
            Self::Provider(err) => match err.code() {
                ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed => {
                    ErrorCode::AuthenticationFailed
                }
                ProviderErrorCode::RateLimited => ErrorCode::RateLimited,
                ProviderErrorCode::NotFound => ErrorCode::NotFound,
                _ => ErrorCode::ProviderError,
            },
        }
    }

    /// The parameter at fault, for parameter errors.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            Self::MissingParameter(name) | Self::InvalidParameter { name, .. } => Some(*name),
            _ => None,
        }
    }
}

impl From<CommandError> for ErrorResponse {
    fn from(err: CommandError) -> Self {
        let response = ErrorResponse::new(err.code(), err.to_string());
        match err.parameter() {
            Some(name) => response.with_parameter(name),
            None => response,
        }
    }
}
