//! Error types for every layer of the crate.
//!
//! The HTTP layer reports [`ApiError`], the user store reports [`StoreError`]
//! and the linking coordinator wraps both in [`LinkError`]. Configuration and
//! the callback listener have their own small enums.

use thiserror::Error;

/// Failures surfaced by the Last.fm HTTP client and the layers built on it.
///
/// `Clone` so a single failed network call can be handed to every caller
/// that was waiting on the same deduplicated request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Last.fm API request timeout")]
    Timeout,

    #[error("Last.fm API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Last.fm API server error ({status}). Please try again later.")]
    ServerError { status: u16 },

    #[error("Last.fm API error: {status} {message}")]
    ClientError { status: u16, message: String },

    #[error("User not found or does not exist: {0}")]
    NotFound(String),

    #[error("Operation failed. Please try again: {0}")]
    OperationFailed(String),

    #[error("Last.fm API error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("Invalid Last.fm API response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("This account is linked read-only and cannot perform write operations")]
    Unauthorized,
}

impl ApiError {
    /// Transient failures worth another attempt. Rate limiting is not one.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::ServerError { .. } | ApiError::Network(_) | ApiError::Timeout
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::MalformedResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("user store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid or expired token")]
    ExpiredOrUnknownToken,

    #[error("No authorization found yet")]
    NotYetAuthorized,

    #[error("This authorization belongs to another user")]
    RequesterMismatch,

    #[error("Could not build authorization URL: {0}")]
    InvalidAuthorizationUrl(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to parse server address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("callback server io error: {0}")]
    Io(#[from] std::io::Error),
}
