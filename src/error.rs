//! Patisserie error types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Patisserie error types
#[derive(Debug, thiserror::Error)]
pub enum PatisserieError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// No API key was configured for the provider. Detected (and warned
    /// about) at construction, reported on every call that needs the key.
    #[error("missing API key for {provider}")]
    MissingCredential { provider: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("data error: {0}")]
    DataError(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Soft errors
    #[error("empty response from model")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Classified reason behind a failed remote call.
///
/// Carried on classification and chat results so callers can tell a network
/// blip from a bad key without matching on error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Auth,
    RateLimited,
    MalformedResponse,
    MissingCredential,
    Api,
    Other,
}

impl FailureKind {
    /// Stable lowercase name, used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::MalformedResponse => "malformed_response",
            Self::MissingCredential => "missing_credential",
            Self::Api => "api",
            Self::Other => "other",
        }
    }
}

impl PatisserieError {
    /// Classify this error for reporting on a degraded result.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Http(_) | Self::Io(_) => FailureKind::Network,
            Self::AuthenticationFailed => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::MissingCredential { .. } => FailureKind::MissingCredential,
            Self::Json(_) | Self::EmptyResponse | Self::MalformedResponse(_) => {
                FailureKind::MalformedResponse
            }
            Self::Api { .. } | Self::ModelNotFound(_) => FailureKind::Api,
            Self::InvalidInput(_) | Self::DataError(_) | Self::Configuration(_) => {
                FailureKind::Other
            }
        }
    }
}

/// Result type alias for Patisserie operations
pub type Result<T> = std::result::Result<T, PatisserieError>;
