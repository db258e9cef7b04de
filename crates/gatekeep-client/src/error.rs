//! Error types for the client library.

use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur when sending requests through a controller section.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, timeouts or
    /// socket errors.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error other than an authentication refusal.
    #[error("Middleware error: {0}")]
    MiddlewareError(reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The request was refused before it reached the network.
    ///
    /// Either no token was available for a protected path, or the request
    /// had no target path the anonymous-path rules could be applied to.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthError),

    /// A path could not be joined onto the base address.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Client configuration issue.
    ///
    /// Invalid base address, missing token provider, or incompatible settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The API answered with a non-success status.
    ///
    /// `message` is the response body when it had one, otherwise the
    /// canonical reason phrase of the status.
    #[error("Request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status returned by the API.
        status: StatusCode,
        /// Response body or reason phrase.
        message: String,
    },
}

impl From<reqwest_middleware::Error> for ClientError {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Reqwest(e) => Self::NetworkError(e),
            reqwest_middleware::Error::Middleware(inner) => match inner.downcast::<AuthError>() {
                Ok(auth) => Self::Authentication(auth),
                Err(other) => Self::MiddlewareError(reqwest_middleware::Error::Middleware(other)),
            },
        }
    }
}

impl ClientError {
    /// Check if this error is potentially retryable.
    ///
    /// Returns `true` for network errors, middleware errors, rate limits and
    /// server errors. Authentication refusals are never retryable: the request
    /// did not leave the process.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::MiddlewareError(_) => true,
            Self::RequestFailed { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Check if this is an authentication error, local or remote (HTTP 401).
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Self::Authentication(_) => true,
            Self::RequestFailed { status, .. } => *status == StatusCode::UNAUTHORIZED,
            _ => false,
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::NetworkError(e) => e.status(),
            _ => None,
        }
    }
}
