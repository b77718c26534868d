//! Collector error types

use crate::models::{BillingRecord, ResourceRecord};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a provider's native API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or TLS failure below the HTTP layer
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status (quota, permission, not found...)
    #[error("API returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// The response body did not have the expected shape
    #[error("Failed to decode API response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            code,
            message: message.into(),
        }
    }
}

/// Records drained from the pages that succeeded before a collection failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialResults {
    Billing(Vec<BillingRecord>),
    Resources(Vec<ResourceRecord>),
}

impl PartialResults {
    pub fn len(&self) -> usize {
        match self {
            PartialResults::Billing(records) => records.len(),
            PartialResults::Resources(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collector error taxonomy
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Credentials invalid, insufficient scope or incomplete configuration.
    /// Reported through `Collector::last_error`, never returned from `authenticate`.
    #[error("Authentication failed: {reason}")]
    AuthenticationFailure { reason: String },

    /// Caller supplied a start after the end
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Collection attempted before a successful `authenticate`
    #[error("Not authenticated - call authenticate() first")]
    NotAuthenticated,

    /// A page fetch failed mid-pagination; the whole call is aborted
    #[error(
        "Collection failed on page {page} ({} records gathered before the failure): {source}",
        .partial.len()
    )]
    Collection {
        page: usize,
        partial: PartialResults,
        #[source]
        source: ApiError,
    },
}

/// Collector result type
pub type CollectorResult<T> = Result<T, CollectorError>;
