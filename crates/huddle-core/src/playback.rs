//! Playback surfaces and picture-in-picture
//!
//! Presentation code renders streams it does not own. A `VideoTile` binds
//! one participant's stream to a surface through a `PlaybackBackend` and
//! keeps only a local error flag when playback fails. `PictureInPicture`
//! guarantees at most one surface is detached at a time; its failures are
//! logged and otherwise ignored.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::errors::{PictureInPictureError, PlaybackError};
use crate::media::MediaStream;
use crate::session::{DisplayState, Participant};
use crate::types::{ParticipantId, StreamId, SurfaceId};

// ----------------------------------------------------------------------------
// Backend Capability
// ----------------------------------------------------------------------------

/// Rendering capability supplied by the host environment
#[async_trait::async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Start rendering `stream` on `surface`; may fail after suspending
    async fn attach(&self, surface: &SurfaceId, stream: &MediaStream) -> Result<(), PlaybackError>;

    /// Stop rendering on `surface`. Never touches the stream's tracks.
    fn detach(&self, surface: &SurfaceId);

    fn picture_in_picture_supported(&self) -> bool;

    async fn enter_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError>;

    async fn exit_picture_in_picture(&self, surface: &SurfaceId)
        -> Result<(), PictureInPictureError>;
}

#[async_trait::async_trait]
impl<B: PlaybackBackend + ?Sized> PlaybackBackend for Arc<B> {
    async fn attach(&self, surface: &SurfaceId, stream: &MediaStream) -> Result<(), PlaybackError> {
        (**self).attach(surface, stream).await
    }

    fn detach(&self, surface: &SurfaceId) {
        (**self).detach(surface)
    }

    fn picture_in_picture_supported(&self) -> bool {
        (**self).picture_in_picture_supported()
    }

    async fn enter_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        (**self).enter_picture_in_picture(surface).await
    }

    async fn exit_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        (**self).exit_picture_in_picture(surface).await
    }
}

/// Backend without a display: plays any stream that still has live tracks
#[derive(Debug, Default)]
pub struct HeadlessPlayback {
    attached: Mutex<HashSet<SurfaceId>>,
    picture_in_picture: bool,
}

impl HeadlessPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_picture_in_picture() -> Self {
        Self {
            picture_in_picture: true,
            ..Self::default()
        }
    }

    pub fn is_attached(&self, surface: &SurfaceId) -> bool {
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(surface)
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for HeadlessPlayback {
    async fn attach(&self, surface: &SurfaceId, stream: &MediaStream) -> Result<(), PlaybackError> {
        if !stream.is_active() {
            return Err(PlaybackError::PlayFailed {
                stream_id: stream.id().clone(),
                reason: "stream has no live tracks".to_string(),
            });
        }
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(surface.clone());
        Ok(())
    }

    fn detach(&self, surface: &SurfaceId) {
        self.attached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(surface);
    }

    fn picture_in_picture_supported(&self) -> bool {
        self.picture_in_picture
    }

    async fn enter_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        if !self.picture_in_picture {
            return Err(PictureInPictureError::Unsupported);
        }
        if !self.is_attached(surface) {
            return Err(PictureInPictureError::Rejected {
                surface: surface.to_string(),
                reason: "nothing is playing".to_string(),
            });
        }
        Ok(())
    }

    async fn exit_picture_in_picture(
        &self,
        _surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Video Tile
// ----------------------------------------------------------------------------

/// Proof of a bind in flight; completing a superseded ticket is a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindTicket {
    generation: u64,
    stream_id: StreamId,
}

impl BindTicket {
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }
}

/// One participant's stream bound to one playback surface
#[derive(Debug, Clone)]
pub struct VideoTile {
    surface: SurfaceId,
    participant_id: ParticipantId,
    bound: Option<StreamId>,
    generation: u64,
    has_error: bool,
    mirrored: bool,
}

impl VideoTile {
    pub fn new(surface: impl Into<SurfaceId>, participant: &Participant) -> Self {
        Self {
            surface: surface.into(),
            participant_id: participant.id.clone(),
            bound: None,
            generation: 0,
            has_error: false,
            mirrored: Self::should_mirror(participant),
        }
    }

    /// The local camera is shown mirrored, a shared screen is not
    fn should_mirror(participant: &Participant) -> bool {
        participant.is_local() && !participant.screen_sharing
    }

    /// Point the tile at a new stream (or none). Returns a ticket when a
    /// stream must be attached.
    pub fn begin_bind(&mut self, stream: Option<&MediaStream>) -> Option<BindTicket> {
        self.generation += 1;
        self.has_error = false;
        self.bound = stream.map(|s| s.id().clone());
        stream.map(|s| BindTicket {
            generation: self.generation,
            stream_id: s.id().clone(),
        })
    }

    /// Record the outcome of an attach. Returns `false` when the ticket was
    /// superseded by a later bind and the outcome was discarded.
    pub fn complete_bind(&mut self, ticket: BindTicket, result: Result<(), PlaybackError>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                "Discarding outcome of superseded bind of {} on {}",
                ticket.stream_id, self.surface
            );
            return false;
        }
        if let Err(err) = result {
            warn!("Playback failed on {}: {}", self.surface, err);
            self.has_error = true;
        }
        true
    }

    /// Bind and attach in one step
    pub async fn bind<B: PlaybackBackend + ?Sized>(
        &mut self,
        backend: &B,
        stream: Option<&MediaStream>,
    ) {
        match (self.begin_bind(stream), stream) {
            (Some(ticket), Some(stream)) => {
                let result = backend.attach(&self.surface, stream).await;
                self.complete_bind(ticket, result);
            }
            _ => backend.detach(&self.surface),
        }
    }

    /// Follow changes of the participant. Returns `true` when the tile's
    /// stream no longer matches and must be rebound.
    pub fn sync(&mut self, participant: &Participant) -> bool {
        self.mirrored = Self::should_mirror(participant);
        let current = participant.stream.as_ref().map(|s| s.id());
        current != self.bound.as_ref()
    }

    /// Release the surface; pending binds become stale
    pub fn detach<B: PlaybackBackend + ?Sized>(&mut self, backend: &B) {
        self.generation += 1;
        self.bound = None;
        backend.detach(&self.surface);
    }

    /// What the tile should show for `participant`
    pub fn display_state(&self, participant: &Participant) -> DisplayState {
        if self.has_error {
            return DisplayState::Error;
        }
        match participant.display {
            DisplayState::VideoActive if participant.stream.is_some() && self.bound.is_none() => {
                DisplayState::Loading
            }
            display => display,
        }
    }

    pub fn surface(&self) -> &SurfaceId {
        &self.surface
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn bound_stream(&self) -> Option<&StreamId> {
        self.bound.as_ref()
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }
}

// ----------------------------------------------------------------------------
// Picture-in-Picture
// ----------------------------------------------------------------------------

/// Keeps at most one surface in picture-in-picture mode
#[derive(Debug)]
pub struct PictureInPicture<B: PlaybackBackend> {
    backend: B,
    active: Option<SurfaceId>,
}

impl<B: PlaybackBackend> PictureInPicture<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&SurfaceId> {
        self.active.as_ref()
    }

    pub fn is_active(&self, surface: &SurfaceId) -> bool {
        self.active.as_ref() == Some(surface)
    }

    /// Enter for `surface`, or leave if it is already detached. Any other
    /// detached surface is returned first. Failures leave the state as is.
    pub async fn toggle(&mut self, surface: &SurfaceId) {
        if self.is_active(surface) {
            self.exit().await;
            return;
        }
        if !self.backend.picture_in_picture_supported() {
            warn!("Picture-in-picture is not supported, ignoring request for {}", surface);
            return;
        }

        self.exit().await;
        match self.backend.enter_picture_in_picture(surface).await {
            Ok(()) => {
                debug!("Surface {} entered picture-in-picture", surface);
                self.active = Some(surface.clone());
            }
            Err(err) => warn!("Could not enter picture-in-picture: {}", err),
        }
    }

    /// Leave picture-in-picture if `surface` owns it; used on tile teardown
    pub async fn release(&mut self, surface: &SurfaceId) {
        if self.is_active(surface) {
            self.exit().await;
        }
    }

    async fn exit(&mut self) {
        let Some(surface) = self.active.take() else {
            return;
        };
        if let Err(err) = self.backend.exit_picture_in_picture(&surface).await {
            warn!("Could not exit picture-in-picture for {}: {}", surface, err);
        }
    }
}
