//! In-process media devices
//!
//! Hands out track handles that carry no media. Used by the demo CLI and by
//! tests, which can deny either kind of request and end a capture the way
//! the browser chrome would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{MediaConstraints, MediaDevices, MediaKind, MediaStream, MediaTrack};
use crate::errors::MediaError;
use crate::types::{IdGenerator, SequentialIdGenerator, StreamId};

/// Media devices backed by nothing
#[derive(Debug, Default)]
pub struct SyntheticMediaDevices {
    ids: SequentialIdGenerator,
    deny_user_media: AtomicBool,
    deny_display_media: AtomicBool,
    issued: Mutex<Vec<MediaStream>>,
}

impl SyntheticMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices whose camera/microphone request is refused
    pub fn denying_user_media() -> Self {
        let devices = Self::default();
        devices.set_user_media_denied(true);
        devices
    }

    pub fn set_user_media_denied(&self, denied: bool) {
        self.deny_user_media.store(denied, Ordering::SeqCst);
    }

    pub fn set_display_media_denied(&self, denied: bool) {
        self.deny_display_media.store(denied, Ordering::SeqCst);
    }

    /// Every stream handed out so far
    pub fn issued_streams(&self) -> Vec<MediaStream> {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Tracks handed out that have not been stopped yet
    pub fn live_track_count(&self) -> usize {
        self.issued_streams()
            .iter()
            .map(MediaStream::live_track_count)
            .sum()
    }

    /// Stop a display capture from outside the session, as the user would
    /// through the browser's "stop sharing" control.
    ///
    /// Returns `false` if no such live stream was issued. The host is
    /// expected to report `Event::ScreenCaptureEnded` afterwards.
    pub fn end_capture(&self, stream_id: &StreamId) -> bool {
        self.issued_streams()
            .iter()
            .find(|s| s.id() == stream_id)
            .map(|s| s.stop_all() > 0)
            .unwrap_or(false)
    }

    fn issue(&self, stream: MediaStream) -> MediaStream {
        self.issued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(stream.clone());
        stream
    }
}

#[async_trait::async_trait]
impl MediaDevices for SyntheticMediaDevices {
    async fn user_media(&self, constraints: MediaConstraints) -> Result<MediaStream, MediaError> {
        if self.deny_user_media.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied {
                device: "camera and microphone".to_string(),
            });
        }
        if !constraints.audio && !constraints.video {
            return Err(MediaError::DeviceUnavailable {
                device: "media".to_string(),
                reason: "neither audio nor video was requested".to_string(),
            });
        }

        let stream_id = self.ids.next_id("camera");
        let mut tracks = Vec::with_capacity(2);
        if constraints.audio {
            tracks.push(MediaTrack::new(
                format!("{}-audio", stream_id),
                MediaKind::Audio,
                "Synthetic microphone",
            ));
        }
        if constraints.video {
            tracks.push(MediaTrack::new(
                format!("{}-video", stream_id),
                MediaKind::Video,
                "Synthetic camera",
            ));
        }
        Ok(self.issue(MediaStream::new(stream_id, tracks)))
    }

    async fn display_media(&self) -> Result<MediaStream, MediaError> {
        if self.deny_display_media.load(Ordering::SeqCst) {
            return Err(MediaError::CaptureCancelled);
        }

        let stream_id = self.ids.next_id("screen");
        let track = MediaTrack::new(
            format!("{}-video", stream_id),
            MediaKind::Video,
            "Synthetic display",
        );
        Ok(self.issue(MediaStream::new(stream_id, [track])))
    }
}
