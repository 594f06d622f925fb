//! Error types for the TomTom address finder.

use std::time::Duration;

use quickroute_http::HttpError;
use thiserror::Error;

use crate::options::ValidationError;

/// Errors that can occur while searching for addresses.
#[derive(Debug, Error)]
pub enum AddressFinderError {
    /// Caller-supplied options failed validation; no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider did not answer within the allotted time.
    #[error("TomTom API request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The caller's cancellation token fired before the response arrived.
    #[error("TomTom API request was cancelled")]
    Cancelled,

    /// TomTom answered with a non-success status.
    #[error("TomTom API request failed with status {status}: {status_text} and body {body}")]
    Provider {
        status: u16,
        status_text: String,
        body: String,
    },

    /// A success status whose body was not the expected JSON payload.
    #[error("malformed TomTom response: {reason}")]
    MalformedResponse { reason: String, body_snippet: String },

    /// Transport failure (DNS, connect, reset...).
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (bad base URL and the like).
    #[error("invalid request: {0}")]
    Request(String),
}

impl AddressFinderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AddressFinderError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AddressFinderError::Cancelled)
    }

    /// HTTP status for provider errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            AddressFinderError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for AddressFinderError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status,
                status_text,
                body,
                ..
            } => AddressFinderError::Provider {
                status: status.as_u16(),
                status_text,
                body,
            },
            HttpError::Decode(reason, body_snippet) => {
                AddressFinderError::MalformedResponse {
                    reason,
                    body_snippet,
                }
            }
            HttpError::Timeout(after) => AddressFinderError::Timeout { after },
            HttpError::Cancelled => AddressFinderError::Cancelled,
            HttpError::Network(msg) => AddressFinderError::Network(msg),
            HttpError::Url(msg) | HttpError::Build(msg) => AddressFinderError::Request(msg),
        }
    }
}
