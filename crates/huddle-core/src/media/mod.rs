//! Media handles and the media-acquisition capability
//!
//! A `MediaStream` is a cheap, cloneable handle over shared tracks: cloning a
//! stream (or composing a new stream out of another stream's tracks) never
//! duplicates the underlying device. Enabling, disabling or stopping a track
//! through any handle is visible through every other handle.
//!
//! Streams are owned by the `SessionManager` that acquired them. Presentation
//! code receives clones for read-only attachment to a playback surface and
//! must not stop tracks itself.

pub mod synthetic;

use core::fmt;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::MediaError;
use crate::types::{StreamId, TrackId};

pub use synthetic::SyntheticMediaDevices;

// ----------------------------------------------------------------------------
// Tracks
// ----------------------------------------------------------------------------

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug)]
struct TrackState {
    enabled: AtomicBool,
    ended: AtomicBool,
}

/// Handle to one audio or video track
#[derive(Debug, Clone)]
pub struct MediaTrack {
    id: TrackId,
    kind: MediaKind,
    label: String,
    state: Arc<TrackState>,
}

impl MediaTrack {
    /// Create a live, enabled track
    pub fn new(id: impl Into<TrackId>, kind: MediaKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            state: Arc::new(TrackState {
                enabled: AtomicBool::new(true),
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the track still produces media
    pub fn is_live(&self) -> bool {
        !self.state.ended.load(Ordering::SeqCst)
    }

    /// Stop the track permanently; returns `true` if this call ended it
    pub fn stop(&self) -> bool {
        !self.state.ended.swap(true, Ordering::SeqCst)
    }

    /// Whether both handles refer to the same underlying track
    pub fn same_track(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

// ----------------------------------------------------------------------------
// Streams
// ----------------------------------------------------------------------------

/// Handle to a set of tracks acquired together
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: StreamId,
    tracks: SmallVec<[MediaTrack; 2]>,
}

impl MediaStream {
    pub fn new(id: impl Into<StreamId>, tracks: impl IntoIterator<Item = MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks: tracks.into_iter().collect(),
        }
    }

    /// Build a new stream sharing `audio`'s audio tracks and `video`'s video tracks
    pub fn compose(id: impl Into<StreamId>, audio: Option<&MediaStream>, video: &MediaStream) -> Self {
        let audio_tracks = audio
            .into_iter()
            .flat_map(|stream| stream.audio_tracks())
            .cloned();
        let video_tracks = video.video_tracks().cloned();
        Self::new(id, audio_tracks.chain(video_tracks))
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == MediaKind::Audio)
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == MediaKind::Video)
    }

    /// Enable or disable every track of `kind`
    pub fn set_enabled(&self, kind: MediaKind, enabled: bool) {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .for_each(|t| t.set_enabled(enabled));
    }

    /// Whether any track of `kind` is live and enabled
    pub fn is_producing(&self, kind: MediaKind) -> bool {
        self.tracks
            .iter()
            .any(|t| t.kind() == kind && t.is_live() && t.is_enabled())
    }

    /// Stop every track, returning how many were still live
    pub fn stop_all(&self) -> usize {
        self.tracks.iter().filter(|t| t.stop()).count()
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }

    pub fn is_active(&self) -> bool {
        self.live_track_count() > 0
    }
}

// ----------------------------------------------------------------------------
// Acquisition Capability
// ----------------------------------------------------------------------------

/// What `user_media` should capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn camera_and_microphone() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::camera_and_microphone()
    }
}

/// Media acquisition supplied by the host environment
///
/// Each call either yields a usable stream or fails with a denial or
/// unavailability reason. Calls may suspend until the user answers a
/// permission prompt.
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request camera and/or microphone
    async fn user_media(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError>;

    /// Request display capture (screen, window or tab)
    async fn display_media(&self) -> Result<MediaStream, MediaError>;
}

#[async_trait::async_trait]
impl<D: MediaDevices + ?Sized> MediaDevices for Arc<D> {
    async fn user_media(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        (**self).user_media(constraints).await
    }

    async fn display_media(&self) -> Result<MediaStream, MediaError> {
        (**self).display_media().await
    }
}
