//! Session state manager
//!
//! Owns the local camera/microphone stream and any display capture, the
//! participant roster and the elapsed-time counter of one conferencing
//! session. Every mutation happens through `&mut self`, so operations apply
//! strictly in the order they are issued. Timers are requested as `Effect`s
//! and their firings come back as `SessionEvent`s.

use tracing::{debug, info, warn};

use crate::channel::{AppEvent, Effect, Outbox, ParticipantInfo, SessionEvent, TimerKind};
use crate::config::SessionConfig;
use crate::errors::{HuddleResult, MediaError};
use crate::media::{MediaConstraints, MediaDevices, MediaKind, MediaStream};
use crate::session::layout::{format_duration, GridLayout};
use crate::session::participant::{DisplayState, Participant};
use crate::types::{ParticipantId, StreamId, TimeSource, Timestamp};

/// Shown when camera/microphone acquisition fails
pub const MEDIA_ACCESS_ERROR: &str =
    "Could not access camera or microphone. Please check permissions.";

/// Shown when display capture fails
pub const SCREEN_SHARE_ERROR: &str = "Could not start screen sharing. Please try again.";

/// Point-in-time copy of the session state for presentation
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub active: bool,
    pub participants: Vec<Participant>,
    pub audio_muted: bool,
    pub video_off: bool,
    pub screen_sharing: bool,
    pub duration_secs: u64,
    pub error: Option<String>,
}

impl SessionSnapshot {
    pub fn local_participant(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_local())
    }

    pub fn grid_layout(&self) -> GridLayout {
        GridLayout::for_participants(self.participants.len())
    }
}

/// State machine for one conferencing session
pub struct SessionManager<M: MediaDevices, T: TimeSource> {
    config: SessionConfig,
    devices: M,
    time_source: T,
    outbox: Outbox,
    participants: Vec<Participant>,
    /// Camera and microphone
    camera: Option<MediaStream>,
    /// Active display capture
    screen: Option<MediaStream>,
    audio_muted: bool,
    video_off: bool,
    duration_secs: u64,
    started_at: Option<Timestamp>,
    error: Option<String>,
    active: bool,
}

impl<M: MediaDevices, T: TimeSource> SessionManager<M, T> {
    pub fn new(config: SessionConfig, devices: M, time_source: T) -> Self {
        Self {
            config,
            devices,
            time_source,
            outbox: Outbox::new(),
            participants: Vec::new(),
            camera: None,
            screen: None,
            audio_muted: false,
            video_off: false,
            duration_secs: 0,
            started_at: None,
            error: None,
            active: false,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Acquire camera and microphone and join the session as the local
    /// participant. On failure the error message is set, the roster stays
    /// empty and no retry is attempted.
    pub async fn initialize(&mut self) -> HuddleResult<()> {
        if self.active {
            debug!("Session already initialized, ignoring");
            return Ok(());
        }

        let stream = match self
            .devices
            .user_media(MediaConstraints::camera_and_microphone())
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                warn!("Local media acquisition failed: {}", err);
                self.record_error(MEDIA_ACCESS_ERROR);
                return Err(err.into());
            }
        };

        info!(
            "Local media acquired: stream {} with {} tracks",
            stream.id(),
            stream.tracks().len()
        );

        self.participants = vec![Participant::local(
            self.config.local_display_name.clone(),
            stream.clone(),
        )];
        self.camera = Some(stream);
        self.audio_muted = false;
        self.video_off = false;
        self.duration_secs = 0;
        self.started_at = Some(self.time_source.now());
        self.error = None;
        self.active = true;

        self.outbox.effect(Effect::StartTimer {
            timer: TimerKind::MeetingClock,
            period: self.config.duration_tick,
        });
        self.outbox.effect(Effect::StartTimer {
            timer: TimerKind::SpeakingSimulation,
            period: self.config.speaking_tick,
        });
        self.outbox.app_event(AppEvent::SessionStarted {
            local_participant_id: ParticipantId::local(),
        });
        self.emit_roster_changed();
        self.emit_local_media_changed();
        Ok(())
    }

    /// Release every held track, cancel the session timers and reset all
    /// state. Safe to call repeatedly and before `initialize`.
    pub fn end_meeting(&mut self) {
        let released = self.release_media();
        let was_active = self.active;

        self.participants.clear();
        self.audio_muted = false;
        self.video_off = false;
        self.duration_secs = 0;
        self.started_at = None;
        self.error = None;
        self.active = false;

        if was_active {
            info!("Meeting ended, released {} tracks", released);
            self.outbox.effect(Effect::CancelTimer {
                timer: TimerKind::MeetingClock,
            });
            self.outbox.effect(Effect::CancelTimer {
                timer: TimerKind::SpeakingSimulation,
            });
            self.outbox.app_event(AppEvent::SessionEnded);
        }
    }

    // ------------------------------------------------------------------------
    // Local Media Controls
    // ------------------------------------------------------------------------

    pub fn toggle_audio(&mut self) {
        let Some(camera) = &self.camera else {
            debug!("Ignoring audio toggle without a local stream");
            return;
        };

        self.audio_muted = !self.audio_muted;
        camera.set_enabled(MediaKind::Audio, !self.audio_muted);
        let muted = self.audio_muted;
        if let Some(local) = self.local_mut() {
            local.set_muted(muted);
        }
        debug!("Local audio muted: {}", muted);
        self.emit_local_media_changed();
    }

    pub fn toggle_video(&mut self) {
        let Some(camera) = &self.camera else {
            debug!("Ignoring video toggle without a local stream");
            return;
        };

        self.video_off = !self.video_off;
        camera.set_enabled(MediaKind::Video, !self.video_off);
        let (video_off, sharing) = (self.video_off, self.screen.is_some());
        if let Some(local) = self.local_mut() {
            // The capture keeps the tile live while sharing
            if !sharing {
                local.set_video_off(video_off);
            }
        }
        debug!("Local video off: {}", video_off);
        self.emit_local_media_changed();
    }

    /// Start or stop sharing the screen. Starting substitutes the local
    /// participant's stream with the local audio plus the captured video;
    /// a failed capture request sets the error message and changes nothing
    /// else.
    pub async fn toggle_screen_share(&mut self) -> HuddleResult<()> {
        if self.screen.is_some() {
            self.stop_screen_share();
            return Ok(());
        }
        if !self.active {
            debug!("Ignoring screen share toggle outside an active session");
            return Ok(());
        }

        let screen = match self.devices.display_media().await {
            Ok(screen) => screen,
            Err(err) => {
                warn!("Display capture failed: {}", err);
                self.record_error(SCREEN_SHARE_ERROR);
                return Err(err.into());
            }
        };

        if screen.video_tracks().next().is_none() {
            screen.stop_all();
            self.record_error(SCREEN_SHARE_ERROR);
            return Err(MediaError::MissingTrack {
                stream_id: screen.id().clone(),
                kind: MediaKind::Video,
            }
            .into());
        }

        let composite_id = match &self.camera {
            Some(camera) => format!("{}+{}", camera.id(), screen.id()),
            None => screen.id().to_string(),
        };
        let composite = MediaStream::compose(composite_id, self.camera.as_ref(), &screen);
        info!("Screen sharing started with capture {}", screen.id());

        if let Some(local) = self.local_mut() {
            local.stream = Some(composite);
            local.screen_sharing = true;
            local.display = DisplayState::VideoActive;
        }
        self.screen = Some(screen);
        self.emit_local_media_changed();
        Ok(())
    }

    fn stop_screen_share(&mut self) {
        let Some(screen) = self.screen.take() else {
            return;
        };
        screen.stop_all();

        // Mute state survives a share cycle
        if let Some(camera) = &self.camera {
            camera.set_enabled(MediaKind::Audio, !self.audio_muted);
            camera.set_enabled(MediaKind::Video, !self.video_off);
        }

        let (camera, video_off) = (self.camera.clone(), self.video_off);
        if let Some(local) = self.local_mut() {
            local.stream = camera;
            local.screen_sharing = false;
            local.set_video_off(video_off);
        }
        info!("Screen sharing stopped, capture {} released", screen.id());
        self.emit_local_media_changed();
    }

    // ------------------------------------------------------------------------
    // Roster Controls
    // ------------------------------------------------------------------------

    /// Spotlight a participant, clearing any other spotlight; toggling the
    /// spotlighted participant clears it.
    pub fn toggle_spotlight(&mut self, participant_id: &ParticipantId) {
        let Some(target) = self.participants.iter().position(|p| &p.id == participant_id) else {
            debug!("Ignoring spotlight for unknown participant {}", participant_id);
            return;
        };

        let spotlight = !self.participants[target].spotlighted;
        for (index, participant) in self.participants.iter_mut().enumerate() {
            participant.spotlighted = spotlight && index == target;
        }
        self.outbox.app_event(AppEvent::SpotlightChanged {
            participant_id: spotlight.then(|| participant_id.clone()),
        });
    }

    // ------------------------------------------------------------------------
    // Inbound Events
    // ------------------------------------------------------------------------

    pub fn handle_event(&mut self, event: SessionEvent) {
        if let SessionEvent::ScreenCaptureEnded { stream_id } = &event {
            self.handle_capture_ended(stream_id);
            return;
        }
        if !self.active {
            debug!("Dropping session event outside an active session: {:?}", event);
            return;
        }

        match event {
            SessionEvent::ClockTick => {
                self.duration_secs += 1;
                self.outbox.app_event(AppEvent::MeetingClock {
                    elapsed_secs: self.duration_secs,
                });
            }
            SessionEvent::SpeakingTick { sample, level } => {
                let speaker = if self.participants.is_empty() {
                    None
                } else {
                    let slot = (sample % self.participants.len() as u64) as usize;
                    Some(self.participants[slot].id.clone())
                };
                self.apply_speaker(speaker, Some(level));
            }
            SessionEvent::ActiveSpeaker {
                participant_id,
                level,
            } => self.apply_speaker(participant_id, level),
            SessionEvent::ParticipantJoined { participant } => self.handle_joined(participant),
            SessionEvent::ParticipantLeft { participant_id } => self.handle_left(&participant_id),
            SessionEvent::ParticipantMediaChanged {
                participant_id,
                muted,
                video_off,
            } => {
                let Some(participant) = self.remote_mut(&participant_id) else {
                    return;
                };
                if let Some(muted) = muted {
                    participant.set_muted(muted);
                }
                if let Some(video_off) = video_off {
                    participant.set_video_off(video_off);
                }
                self.outbox
                    .app_event(AppEvent::ParticipantUpdated { participant_id });
            }
            SessionEvent::NetworkQualityChanged {
                participant_id,
                quality,
            } => {
                let Some(participant) = self.remote_mut(&participant_id) else {
                    return;
                };
                participant.network_quality = quality;
                self.outbox
                    .app_event(AppEvent::ParticipantUpdated { participant_id });
            }
            SessionEvent::ScreenCaptureEnded { .. } => {}
        }
    }

    fn handle_capture_ended(&mut self, stream_id: &StreamId) {
        match &self.screen {
            Some(screen) if screen.id() == stream_id => {
                info!("Display capture {} ended externally", stream_id);
                self.stop_screen_share();
            }
            _ => debug!("Ignoring end of unknown capture {}", stream_id),
        }
    }

    fn handle_joined(&mut self, info: ParticipantInfo) {
        if info.id.is_local() {
            warn!("Rejecting remote participant using the local identifier");
            return;
        }

        match self.participants.iter_mut().find(|p| p.id == info.id) {
            Some(existing) => {
                existing.name = info.name.clone();
                existing.set_muted(info.muted);
                existing.set_video_off(info.video_off);
                existing.network_quality = info.network_quality;
            }
            None => {
                info!("Participant {} ({}) joined", info.name, info.id);
                self.participants.push(Participant::remote(&info));
            }
        }
        self.emit_roster_changed();
    }

    fn handle_left(&mut self, participant_id: &ParticipantId) {
        if participant_id.is_local() {
            return;
        }
        let Some(index) = self.participants.iter().position(|p| &p.id == participant_id) else {
            return;
        };

        let removed = self.participants.remove(index);
        info!("Participant {} left", removed.id);
        if removed.spotlighted {
            self.outbox
                .app_event(AppEvent::SpotlightChanged { participant_id: None });
        }
        if removed.speaking {
            self.outbox
                .app_event(AppEvent::SpeakerChanged { participant_id: None });
        }
        self.emit_roster_changed();
    }

    /// Mark at most one non-muted participant as speaking
    fn apply_speaker(&mut self, speaker: Option<ParticipantId>, level: Option<f32>) {
        let previous = self.active_speaker().map(|p| p.id.clone());

        for participant in &mut self.participants {
            let speaking = !participant.muted && speaker.as_ref() == Some(&participant.id);
            participant.speaking = speaking;
            participant.audio_level = if speaking {
                level.map(|l| l.clamp(0.0, 1.0))
            } else {
                None
            };
        }

        let current = self.active_speaker().map(|p| p.id.clone());
        if current != previous {
            self.outbox.app_event(AppEvent::SpeakerChanged {
                participant_id: current,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == participant_id)
    }

    pub fn local_participant(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_local())
    }

    pub fn active_speaker(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_audibly_speaking())
    }

    pub fn spotlighted(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.spotlighted)
    }

    pub fn is_audio_muted(&self) -> bool {
        self.audio_muted
    }

    pub fn is_video_off(&self) -> bool {
        self.video_off
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration_secs)
    }

    /// When the local participant joined
    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Camera and microphone stream, if acquired
    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.camera.as_ref()
    }

    pub fn screen_stream(&self) -> Option<&MediaStream> {
        self.screen.as_ref()
    }

    pub fn grid_layout(&self) -> GridLayout {
        GridLayout::for_participants(self.participants.len())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            active: self.active,
            participants: self.participants.clone(),
            audio_muted: self.audio_muted,
            video_off: self.video_off,
            screen_sharing: self.screen.is_some(),
            duration_secs: self.duration_secs,
            error: self.error.clone(),
        }
    }

    /// Effects and app events queued since the last drain
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn drain_outbox(&mut self) -> (Vec<Effect>, Vec<AppEvent>) {
        self.outbox.drain()
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn local_mut(&mut self) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.is_local())
    }

    fn remote_mut(&mut self, participant_id: &ParticipantId) -> Option<&mut Participant> {
        if participant_id.is_local() {
            debug!("Ignoring remote update addressed to the local participant");
            return None;
        }
        self.participants
            .iter_mut()
            .find(|p| &p.id == participant_id)
    }

    fn record_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.outbox.app_event(AppEvent::SessionError {
            message: message.to_string(),
        });
    }

    fn release_media(&mut self) -> usize {
        let screen = self.screen.take().map(|s| s.stop_all()).unwrap_or(0);
        let camera = self.camera.take().map(|s| s.stop_all()).unwrap_or(0);
        screen + camera
    }

    fn emit_roster_changed(&mut self) {
        self.outbox.app_event(AppEvent::RosterChanged {
            participant_count: self.participants.len(),
        });
    }

    fn emit_local_media_changed(&mut self) {
        self.outbox.app_event(AppEvent::LocalMediaChanged {
            audio_muted: self.audio_muted,
            video_off: self.video_off,
            screen_sharing: self.screen.is_some(),
        });
    }
}

impl<M: MediaDevices, T: TimeSource> Drop for SessionManager<M, T> {
    fn drop(&mut self) {
        let released = self.release_media();
        if released > 0 {
            debug!("Released {} tracks on drop", released);
        }
    }
}
