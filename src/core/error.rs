//! # Error Handling
//!
//! Error types for the CMS access layer, built on `thiserror`.
//!
//! The taxonomy separates three families that callers must be able to tell apart:
//! - transport-class failures (network, non-2xx status, upstream error envelopes,
//!   GraphQL `errors`), which map to `502 Bad Gateway`
//! - `NotFound`, returned when a by-id lookup resolves to a null/absent entity
//! - `Deserialization`, returned when the upstream payload drifted from the shape
//!   we decode, surfaced with the decoder message instead of being defaulted away
//!
//! Nothing in this crate retries; `is_retryable` is a hint for the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::core::context::Interrupted;

/// Result type used throughout the CMS access layer
pub type CmsResult<T> = Result<T, CmsError>;

/// Errors surfaced by the transport client and resource services
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CmsError {
    /// Network failure, non-2xx status without an error envelope, or a malformed body
    #[error("CMS transport error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    /// Error envelope returned by the upstream REST API
    #[error("CMS upstream error ({status} {name}): {message}")]
    Upstream {
        status: u16,
        name: String,
        message: String,
    },

    /// Non-empty `errors` list in a GraphQL response
    #[error("CMS GraphQL error: {}", .messages.join("; "))]
    GraphQl { messages: Vec<String> },

    /// The upstream returned no entity for a by-id lookup
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The upstream payload did not match the expected shape
    #[error("Failed to decode {resource}: {message}")]
    Deserialization { resource: String, message: String },

    /// The originating request was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// The originating request ran past its deadline
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Cache backend failure that could not be degraded
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CmsError {
    /// Create a transport error with an optional upstream status
    pub fn transport<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error for a resource lookup
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a deserialization error for a resource payload
    pub fn deserialization<R: Into<String>, M: ToString>(resource: R, message: M) -> Self {
        Self::Deserialization {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Upstream HTTP status carried by the error, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error belongs to the transport family
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Upstream { .. } | Self::GraphQl { .. }
        )
    }

    /// Whether the error means the requested entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the caller's context ended the request (cancellation or deadline)
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout { .. })
    }

    /// Get the HTTP status code the gateway should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::GraphQl { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Deserialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if the caller may reasonably retry the request
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status, .. } => status.map_or(true, |s| s >= 500),
            Self::Upstream { status, .. } => *status >= 500,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_error",
            Self::Upstream { .. } => "upstream_error",
            Self::GraphQl { .. } => "graphql_error",
            Self::NotFound { .. } => "not_found",
            Self::Deserialization { .. } => "deserialization_error",
            Self::Cancelled => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::Cache { .. } => "cache_error",
            Self::Configuration { .. } => "configuration_error",
        }
    }
}

impl From<Interrupted> for CmsError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => Self::Cancelled,
            Interrupted::DeadlineExceeded { timeout_ms } => Self::Timeout { timeout_ms },
        }
    }
}

impl From<reqwest::Error> for CmsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Transport {
                status: None,
                message: format!("upstream request timed out: {}", err),
            };
        }
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for CmsError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

/// Renders the error as a JSON body for the gateway HTTP layer
impl IntoResponse for CmsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
                "retryable": self.is_retryable(),
            }
        });

        (status, Json(error_response)).into_response()
    }
}
