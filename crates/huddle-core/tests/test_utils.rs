//! Test utilities for deterministic testing of the Huddle managers
//!
//! Provides a controllable clock, scripted media devices and a playback
//! backend that records every call, plus constructors for managers wired
//! to them.

#![allow(dead_code)]

use async_trait::async_trait;
use huddle_core::conversation::User;
use huddle_core::errors::{PictureInPictureError, PlaybackError};
use huddle_core::media::{MediaStream, SyntheticMediaDevices};
use huddle_core::playback::PlaybackBackend;
use huddle_core::types::{SequentialIdGenerator, SurfaceId, TimeSource, Timestamp};
use huddle_core::{ConversationConfig, ConversationManager, SessionConfig, SessionManager};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ----------------------------------------------------------------------------
// Mock Time Source
// ----------------------------------------------------------------------------

/// Mock time source for deterministic testing
///
/// Clones share the same clock, so a test can keep one handle and advance
/// time under a manager that owns another.
#[derive(Debug, Clone)]
pub struct MockTimeSource {
    current_time: Arc<AtomicU64>,
}

impl MockTimeSource {
    /// Create a new mock time source starting at time 0
    pub fn new() -> Self {
        Self::new_at(0)
    }

    /// Create a new mock time source starting at a specific time
    pub fn new_at(start_time: u64) -> Self {
        Self {
            current_time: Arc::new(AtomicU64::new(start_time)),
        }
    }

    /// Advance time by the specified number of milliseconds
    pub fn advance(&self, millis: u64) {
        self.current_time.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the time to a specific value
    pub fn set_time(&self, millis: u64) {
        self.current_time.store(millis, Ordering::SeqCst);
    }

    pub fn current_time(&self) -> u64 {
        self.current_time.load(Ordering::SeqCst)
    }
}

impl Default for MockTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current_time.load(Ordering::SeqCst))
    }
}

// ----------------------------------------------------------------------------
// Recording Playback Backend
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCall {
    Attach(SurfaceId, String),
    Detach(SurfaceId),
    EnterPip(SurfaceId),
    ExitPip(SurfaceId),
}

/// Playback backend that records calls and fails on demand
#[derive(Debug, Default)]
pub struct RecordingPlayback {
    calls: Mutex<Vec<PlaybackCall>>,
    fail_attach: AtomicBool,
    reject_pip: AtomicBool,
    pip_unsupported: AtomicBool,
}

impl RecordingPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    pub fn set_reject_pip(&self, reject: bool) {
        self.reject_pip.store(reject, Ordering::SeqCst);
    }

    pub fn set_pip_unsupported(&self, unsupported: bool) {
        self.pip_unsupported.store(unsupported, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<PlaybackCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlaybackCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackBackend for RecordingPlayback {
    async fn attach(&self, surface: &SurfaceId, stream: &MediaStream) -> Result<(), PlaybackError> {
        self.record(PlaybackCall::Attach(surface.clone(), stream.id().to_string()));
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(PlaybackError::PlayFailed {
                stream_id: stream.id().clone(),
                reason: "autoplay blocked".to_string(),
            });
        }
        Ok(())
    }

    fn detach(&self, surface: &SurfaceId) {
        self.record(PlaybackCall::Detach(surface.clone()));
    }

    fn picture_in_picture_supported(&self) -> bool {
        !self.pip_unsupported.load(Ordering::SeqCst)
    }

    async fn enter_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        self.record(PlaybackCall::EnterPip(surface.clone()));
        if self.reject_pip.load(Ordering::SeqCst) {
            return Err(PictureInPictureError::Rejected {
                surface: surface.to_string(),
                reason: "no user gesture".to_string(),
            });
        }
        Ok(())
    }

    async fn exit_picture_in_picture(
        &self,
        surface: &SurfaceId,
    ) -> Result<(), PictureInPictureError> {
        self.record(PlaybackCall::ExitPip(surface.clone()));
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Manager Constructors
// ----------------------------------------------------------------------------

pub type TestSession = SessionManager<Arc<SyntheticMediaDevices>, MockTimeSource>;
pub type TestConversation = ConversationManager<MockTimeSource, SequentialIdGenerator>;

/// A session over synthetic devices; the devices handle observes every
/// stream the session acquires
pub fn create_test_session() -> (TestSession, Arc<SyntheticMediaDevices>, MockTimeSource) {
    let devices = Arc::new(SyntheticMediaDevices::new());
    let time = MockTimeSource::new_at(1_000_000);
    let session = SessionManager::new(
        SessionConfig::default().with_display_name("Tester"),
        devices.clone(),
        time.clone(),
    );
    (session, devices, time)
}

pub fn current_user() -> User {
    User::new("current-user", "You")
}

pub fn create_test_conversation() -> (TestConversation, MockTimeSource) {
    let time = MockTimeSource::new_at(1_000_000);
    let conversation = ConversationManager::new(
        ConversationConfig::default(),
        current_user(),
        time.clone(),
        SequentialIdGenerator::new(),
    );
    (conversation, time)
}
