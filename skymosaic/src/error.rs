//! Error types shared across the tile resolution pipeline.
//!
//! Every failure that can reach a caller is a [`MosaicError`]. Adapters that
//! need to present errors differently (e.g. a "zoom in" hint instead of a
//! failure message) branch on [`MosaicError::kind`] rather than on message
//! text.

use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = MosaicError> = std::result::Result<T, E>;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad coordinates, missing or malformed selector, zoom below floor
    Validation,
    /// Upstream answered with a non-success, non-overload status
    UpstreamRejection,
    /// Deadline elapsed (including overload retried until the deadline)
    Timeout,
    /// Connection-level failure before a status was received
    Transport,
    /// Upstream answered successfully but the payload could not be used
    InvalidResponse,
    /// Fetched tiles disagree on their pixel bounds
    Consistency,
    /// The inbound request was cancelled
    Cancelled,
    /// Local failure unrelated to the upstream (encoding, task panic)
    Internal,
}

/// Errors produced while resolving and compositing a tile.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("upstream rejected request with HTTP {status}: {body}")]
    UpstreamRejection { status: u16, body: String },

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    #[error("tile bounds mismatch: expected {expected:?}, got {found:?}")]
    Consistency {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl MosaicError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UpstreamRejection { .. } => ErrorKind::UpstreamRejection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Self::Consistency { .. } => ErrorKind::Consistency,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the request failed only because the map is zoomed out too far.
    pub fn is_zoom_floor(&self) -> bool {
        matches!(
            self,
            Self::Validation(ValidationError::ZoomBelowFloor { .. })
        )
    }
}

/// Reasons a tile query is rejected before any upstream call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid tile coordinate {field}: {value:?}")]
    InvalidTile { field: &'static str, value: String },

    #[error("tile ({x}, {y}) is outside zoom level {zoom}")]
    TileOutOfRange { x: u32, y: u32, zoom: u8 },

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("zoom in to view satellite tiles (zoom {zoom} is below {min})")]
    ZoomBelowFloor { zoom: u8, min: u8 },

    #[error("missing satellite_id")]
    MissingSatellite,

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid coordinates ({lat}, {lng})")]
    InvalidCoordinates { lat: String, lng: String },
}
