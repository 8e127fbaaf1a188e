//! Error types for Huddle
//!
//! Each failure kind is terminal at the component that detects it: media
//! acquisition failures become the session's error message, playback
//! failures become a tile's error flag, and picture-in-picture failures are
//! only logged. `HuddleError` unifies them for callers that want a `Result`.

use crate::media::MediaKind;
use crate::types::StreamId;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures of the media-acquisition capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("Permission to use {device} was denied")]
    PermissionDenied { device: String },
    #[error("No {device} is available: {reason}")]
    DeviceUnavailable { device: String, reason: String },
    #[error("Display capture was cancelled")]
    CaptureCancelled,
    #[error("Stream {stream_id} has no {kind} track")]
    MissingTrack { stream_id: StreamId, kind: MediaKind },
}

/// Failures of the playback-surface capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("Playback of stream {stream_id} failed: {reason}")]
    PlayFailed { stream_id: StreamId, reason: String },
    #[error("Playback surface {surface} is gone")]
    SurfaceDetached { surface: String },
}

/// Failures of the picture-in-picture capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PictureInPictureError {
    #[error("Picture-in-picture is not supported")]
    Unsupported,
    #[error("Picture-in-picture request for {surface} was rejected: {reason}")]
    Rejected { surface: String, reason: String },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Unified error type for Huddle
#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Picture-in-picture error: {0}")]
    PictureInPicture(#[from] PictureInPictureError),

    /// Channel communication error between tasks
    #[error("Channel error: {message}")]
    Channel { message: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    InvalidConfiguration { reason: String },

    /// Operation attempted in a state that does not allow it
    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },
}

impl HuddleError {
    pub fn channel(message: impl Into<String>) -> Self {
        HuddleError::Channel {
            message: message.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        HuddleError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        HuddleError::InvalidState {
            reason: reason.into(),
        }
    }
}

/// Result type alias for Huddle operations
pub type HuddleResult<T> = Result<T, HuddleError>;
