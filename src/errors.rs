/*!
 * Error types for the sceneforge application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. Provider errors carry
 * the classification helpers the retry and key-rotation layers are built on.
 */

// Allow dead code - error helpers are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Message substrings that identify a quota/rate-limit rejection regardless
/// of the HTTP status the service chose to send it with.
const QUOTA_MARKERS: [&str; 3] = ["quota", "rate limit", "resource exhausted"];

/// Message substrings that identify a transient network-level failure.
const NETWORK_MARKERS: [&str; 5] = [
    "connection",
    "timed out",
    "timeout",
    "network",
    "dns",
];

/// Message substrings that identify a credential problem.
const AUTH_MARKERS: [&str; 4] = [
    "api key not valid",
    "invalid api key",
    "missing api key",
    "api key is missing",
];

/// Errors that can occur when calling a generation provider API
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails before a status is received
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when decoding an API response body fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error related to quota or rate limiting
    #[error("Quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// HTTP status code carried by this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::ApiError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Whether this error is a quota/rate-limit rejection.
    ///
    /// Quota errors are expected steady-state behavior under multi-key
    /// operation; they trigger key rotation, not backoff-retry.
    pub fn is_quota(&self) -> bool {
        match self {
            ProviderError::QuotaExceeded(_) => true,
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                matches!(status_code, 429 | 403) || contains_any(message, &QUOTA_MARKERS)
            }
            _ => false,
        }
    }

    /// Whether this error is a credential/configuration failure.
    ///
    /// Auth errors are never retried and never rotated past: rotating into a
    /// second key cannot fix a misconfigured credential set.
    pub fn is_auth(&self) -> bool {
        match self {
            ProviderError::AuthenticationError(_) => true,
            ProviderError::ApiError {
                status_code,
                message,
            } => *status_code == 401 || contains_any(message, &AUTH_MARKERS),
            _ => false,
        }
    }

    /// Whether this error is worth a plain backoff-retry.
    ///
    /// A request that failed without ever producing a status code is treated
    /// as a transient network failure. Server errors (5xx) and recognizable
    /// network failure messages are also retryable. Quota and auth errors are
    /// excluded here because the credential-aware layer above the retry
    /// policy owns those.
    pub fn is_retryable(&self) -> bool {
        if self.is_quota() || self.is_auth() {
            return false;
        }
        match self {
            // No status code at all: assume the network ate it.
            ProviderError::RequestFailed(_) => true,
            ProviderError::ApiError {
                status_code,
                message,
            } => (500..=599).contains(status_code) || contains_any(message, &NETWORK_MARKERS),
            _ => false,
        }
    }
}

fn contains_any(message: &str, markers: &[&str]) -> bool {
    let lowered = message.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

/// Errors raised while validating loosely-structured model output
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The payload could not be parsed as structured data at all.
    /// Carries a short fragment of the offending text for diagnostics.
    #[error("Malformed model output: {0}")]
    Parse(String),

    /// The payload parsed but did not match the expected shape.
    /// Every violation is enumerated, not just the first one found.
    #[error("Schema validation failed: {}", violations.join("; "))]
    Schema {
        /// All violations found in the payload
        violations: Vec<String>,
    },
}

impl ValidationError {
    /// Build a schema error from a list of violations
    pub fn schema(violations: Vec<String>) -> Self {
        ValidationError::Schema { violations }
    }

    /// The violations carried by a schema error, empty for parse errors
    pub fn violations(&self) -> &[String] {
        match self {
            ValidationError::Schema { violations } => violations,
            ValidationError::Parse(_) => &[],
        }
    }
}

/// Errors that terminate a single job's pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the generation provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error validating model output
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for PipelineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}
