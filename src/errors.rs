//! Error types for quaketrack.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that abort a job cycle.
#[derive(Error, Debug)]
pub enum QuakeError {
    /// Feed request failed at the transport level or returned a non-2xx status
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),

    /// Feed body was not a JSON array
    #[error("feed malformed: {0}")]
    FeedMalformed(String),

    /// Persistence failed
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Why a raw feed record was discarded during normalization.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    #[error("missing event id")]
    MissingId,

    #[error("missing timestamp")]
    MissingTimestamp,

    /// Timestamp present but not RFC 3339
    #[error("malformed timestamp")]
    MalformedTimestamp,

    #[error("missing epicenter name")]
    MissingName,

    #[error("missing or non-numeric magnitude")]
    MissingMagnitude,

    #[error("malformed coordinate string")]
    MalformedCoordinate,
}

impl RejectReason {
    /// Stable snake_case label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingId => "missing_id",
            Self::MissingTimestamp => "missing_timestamp",
            Self::MalformedTimestamp => "malformed_timestamp",
            Self::MissingName => "missing_name",
            Self::MissingMagnitude => "missing_magnitude",
            Self::MalformedCoordinate => "malformed_coordinate",
        }
    }
}
