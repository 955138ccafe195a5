//! Request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::PROTOCOL_VERSION;
use crate::methods::Method;

/// Message envelope wrapping all protocol messages.
///
/// Provides versioning and request/response correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub protocol_version: String,
    pub request_id: String,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// A method call: a method name plus a parameter map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
        }
    }

    pub fn for_method(method: Method) -> Self {
        Self::new(method.name())
    }

    #[must_use]
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Adds the parameter only when `value` is `Some`.
    #[must_use]
    pub fn with_optional_param<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with_param(name, value),
            None => self,
        }
    }
}

/// Outcome of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok { result: Value },

    Error {
        #[serde(flatten)]
        error: ErrorResponse,
    },
}

impl Response {
    pub fn ok(result: Value) -> Self {
        Self::Ok { result }
    }

    /// Serializes `result` into a success response.
    ///
    /// A payload that fails to serialize becomes an internal error.
    pub fn from_result<T: Serialize>(result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self::Ok { result },
            Err(e) => Self::from_error(ErrorResponse::internal(format!(
                "failed to serialize result: {e}"
            ))),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorResponse::new(code, message),
        }
    }

    pub fn from_error(error: ErrorResponse) -> Self {
        Self::Error { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error { error } => Some(error),
            Self::Ok { .. } => None,
        }
    }

    /// Converts into the result value, or the error.
    pub fn into_result(self) -> Result<Value, ErrorResponse> {
        match self {
            Self::Ok { result } => Ok(result),
            Self::Error { error } => Err(error),
        }
    }
}

/// Error codes for failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnknownMethod,
    MissingParameter,
    InvalidParameter,
    /// Search parameters the availability engine refuses.
    PreconditionFailed,
    ProviderError,
    AuthenticationFailed,
    RateLimited,
    NotFound,
    InvalidRequest,
    Timeout,
    InternalError,
    ShuttingDown,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            Self::UnknownMethod => "Unknown method",
            Self::MissingParameter => "Missing parameter",
            Self::InvalidParameter => "Invalid parameter",
            Self::PreconditionFailed => "Precondition failed",
            Self::ProviderError => "Calendar provider returned an error",
            Self::AuthenticationFailed => "Authentication failed",
            Self::RateLimited => "Rate limited by calendar provider",
            Self::NotFound => "Requested resource not found",
            Self::InvalidRequest => "The request was invalid",
            Self::Timeout => "The request timed out",
            Self::InternalError => "An internal error occurred",
            Self::ShuttingDown => "Server is shutting down",
        }
    }

    /// Validation failures are the caller's to fix and are never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownMethod | Self::MissingParameter | Self::InvalidParameter
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    /// The offending parameter, for parameter errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            parameter: None,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>) -> Self {
        self.parameter = Some(name.into());
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl std::error::Error for ErrorResponse {}
