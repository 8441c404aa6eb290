//! Error types for cwdesk.
//!
//! This module defines `CwError`, the unified error type used throughout
//! the crate for consistent error handling and propagation.
//!
//! # Security
//!
//! Error messages are sanitized so the Basic auth token and the private key
//! never leak into logs or tool responses. Use `sanitize_message()` when
//! building messages from response bodies or transport errors.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all cwdesk operations.
///
/// There is no retryable/fatal distinction: every variant is returned to the
/// caller of the failing operation as-is.
#[derive(Error, Debug)]
pub enum CwError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A configured header name or value could not be used.
    #[error("invalid header {name}: {reason}")]
    InvalidHeader {
        /// The header name as configured.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// HTTP response returned a non-success status code.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The response body, sanitized and truncated.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} ({operation})")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The remote system returned no record where exactly one was expected.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing record (e.g. "ticket 999").
        what: String,
    },

    /// Input validation failed before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection test failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// Details about why the connection test failed.
        message: String,
    },
}

impl CwError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        CwError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        CwError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        CwError::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        CwError::NotFound { what: what.into() }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        CwError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code, if this error came from a non-success response.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            CwError::HttpStatus { status, .. } => Some(*status),
            CwError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Returns true if the remote record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CwError::NotFound { .. })
            || self.status() == Some(reqwest::StatusCode::NOT_FOUND)
    }

    /// Returns true if the server rejected the credentials (HTTP 401/403).
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(reqwest::StatusCode::UNAUTHORIZED) | Some(reqwest::StatusCode::FORBIDDEN)
        )
    }

    /// Replaces every occurrence of each secret in `message` with `[REDACTED]`.
    ///
    /// Empty secrets are skipped.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|s| !s.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        Self::sanitize_message(&self.to_string(), secrets)
    }
}
