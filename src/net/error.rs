//! Transport-layer failures.
//!
//! These sit below the envelope: a `TransportError` means no usable envelope
//! arrived with a success status, as opposed to an `ApiError` which the
//! server reported inside a well-formed envelope.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use super::types::ApiError;

/// HTTP statuses treated as transient and eligible for the automatic retry.
pub const TRANSIENT_STATUSES: [u16; 8] = [408, 409, 425, 429, 500, 502, 503, 504];

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    /// Connection, timeout, or body-read failure before a status was usable.
    #[error("{method} {url} failed: {message}")]
    Network { method: String, url: String, message: String },
    /// Non-2xx response. `envelope` holds the failure envelope when the body was one.
    #[error("{}", status_message(.status, .status_text, .envelope))]
    Status { status: u16, status_text: String, body: String, envelope: Option<ApiError> },
    /// A 2xx response whose body was not a valid envelope.
    #[error("invalid response body: {0}")]
    Decode(String),
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::ref_option)]
fn status_message(status: &u16, status_text: &str, envelope: &Option<ApiError>) -> String {
    match envelope {
        Some(error) => error.message.clone(),
        None if status_text.is_empty() => format!("HTTP {status}"),
        None => format!("HTTP {status} {status_text}"),
    }
}

impl TransportError {
    /// HTTP status code, if the failure came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the retry policy may re-issue the request.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => TRANSIENT_STATUSES.contains(status),
            Self::ClientBuild(_) | Self::Decode(_) => false,
        }
    }

    /// Whether the server rejected the session itself (401/403).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}
