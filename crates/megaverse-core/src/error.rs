//! Error types for Megaverse Core
//!
//! Provides error handling for:
//! - Goal grid parsing failures
//! - Malformed responses from the canvas API
//! - Remote call failures and their retry classification
//! - Caller-supplied coordinates outside the goal map

use crate::client::Operation;
use crate::entity::Position;
use reqwest::StatusCode;
use std::fmt;

/// Main Megaverse error type
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    /// Grid has no rows, or its first row has no columns
    #[error("invalid goal response: empty grid received")]
    EmptyGrid,

    /// A row's length differs from the first row's
    #[error("grid row {row} has {found} columns, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Tag outside the canvas vocabulary
    #[error("unknown astral object: '{0}'")]
    UnknownType(String),

    /// Response body missing a required field
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Caller-supplied coordinates outside the loaded goal map
    #[error("invalid coordinates {position} for map with {rows} rows and {cols} cols")]
    OutOfBounds {
        position: Position,
        rows: usize,
        cols: usize,
    },

    /// Pattern needs a square goal map
    #[error("the goal map must be square (rows == cols), but found {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    /// Single remote call failed terminally
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// At least one call of a batch failed terminally
    #[error("{operation} batch failed for {failed} of {attempted} entities: {source}")]
    Batch {
        operation: Operation,
        failed: usize,
        attempted: usize,
        #[source]
        source: RemoteError,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl CanvasError {
    /// Check if the error must abort the run
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyGrid
                | Self::RaggedGrid { .. }
                | Self::UnknownType(_)
                | Self::MalformedResponse(_)
                | Self::Config(_)
        )
    }

    /// Check if the error is a rejected caller coordinate
    #[inline]
    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Classification of an error status returned by the canvas API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// 429 Too Many Requests
    RateLimited,
    /// 5xx
    Server,
    /// 4xx other than 429
    Client,
    /// Anything outside the classes above
    Unexpected,
}

impl FailureKind {
    /// Classify a response status
    #[must_use]
    pub fn classify(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited
        } else if status.is_server_error() {
            Self::Server
        } else if status.is_client_error() {
            Self::Client
        } else {
            Self::Unexpected
        }
    }

    /// Whether the retry policy applies
    #[inline]
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Server)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RateLimited => "too many requests",
            Self::Server => "server error",
            Self::Client => "client error",
            Self::Unexpected => "unexpected status",
        };
        f.write_str(label)
    }
}

/// Failure of a single call against the canvas API
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Non-success status
    #[error("{kind} (status {status}): {body}")]
    Status {
        status: StatusCode,
        kind: FailureKind,
        body: String,
    },

    /// Connection, timeout or protocol failure
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Success response whose body is not the expected JSON
    #[error("undecodable response body: {0}")]
    Decode(String),

    /// Retry budget spent on retryable failures
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<RemoteError>,
    },
}

impl RemoteError {
    /// Create a status error, classifying it
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            kind: FailureKind::classify(status),
            body: body.into(),
        }
    }

    /// Check if the retry policy applies to this failure
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { kind, .. } => kind.is_retryable(),
            Self::Transport(_) | Self::Decode(_) | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Status of the last response, if any
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            Self::Decode(_) => None,
            Self::RetriesExhausted { last, .. } => last.status_code(),
        }
    }
}
