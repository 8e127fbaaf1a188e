//! Channel Communication Protocol Types
//!
//! All traffic between the UI, the event sources and the manager tasks flows
//! through these message types:
//!
//! - `Command`: UI → manager task
//! - `Event`: event source (timers, simulation, a real signaling layer) → manager task
//! - `Effect`: manager → runtime scheduler
//! - `AppEvent`: manager task → UI and event sources

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::conversation::{Attachment, AttachmentUpload, User};
use crate::session::NetworkQuality;
use crate::types::{MessageId, ParticipantId, StreamId, UserId};

// ----------------------------------------------------------------------------
// Command: UI → Manager Task
// ----------------------------------------------------------------------------

/// Commands sent from the UI to a manager task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Session(SessionCommand),
    Conversation(ConversationCommand),
    /// Tear both managers down and stop their tasks
    Shutdown,
}

/// Operations on the conferencing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    Initialize,
    ToggleAudio,
    ToggleVideo,
    ToggleScreenShare,
    ToggleSpotlight { participant_id: ParticipantId },
    EndMeeting,
}

/// Operations on the chat room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationCommand {
    SendMessage {
        content: String,
        attachments: Vec<AttachmentUpload>,
    },
    MarkMessagesAsRead,
    SetUserTyping {
        is_typing: bool,
    },
}

impl From<SessionCommand> for Command {
    fn from(command: SessionCommand) -> Self {
        Command::Session(command)
    }
}

impl From<ConversationCommand> for Command {
    fn from(command: ConversationCommand) -> Self {
        Command::Conversation(command)
    }
}

// ----------------------------------------------------------------------------
// Event: Event Source → Manager Task
// ----------------------------------------------------------------------------

/// Inbound events, whether produced by timers, the demo simulation or a
/// real signaling layer. Managers react to them identically regardless of
/// the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Session(SessionEvent),
    Conversation(ConversationEvent),
}

/// Remote participant as announced by an event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub muted: bool,
    pub video_off: bool,
    pub network_quality: Option<NetworkQuality>,
}

impl ParticipantInfo {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            muted: false,
            video_off: false,
            network_quality: None,
        }
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn video_off(mut self) -> Self {
        self.video_off = true;
        self
    }

    pub fn with_network_quality(mut self, quality: NetworkQuality) -> Self {
        self.network_quality = Some(quality);
        self
    }
}

/// Events consumed by the session manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// One period of the meeting clock elapsed
    ClockTick,
    /// Speaking simulation sample: `sample` selects a roster slot, `level`
    /// is the audio level (0-1) given to the speaker
    SpeakingTick { sample: u64, level: f32 },
    /// Voice-activity report naming the current speaker, if any
    ActiveSpeaker {
        participant_id: Option<ParticipantId>,
        level: Option<f32>,
    },
    ParticipantJoined { participant: ParticipantInfo },
    ParticipantLeft { participant_id: ParticipantId },
    ParticipantMediaChanged {
        participant_id: ParticipantId,
        muted: Option<bool>,
        video_off: Option<bool>,
    },
    NetworkQualityChanged {
        participant_id: ParticipantId,
        quality: Option<NetworkQuality>,
    },
    /// A display capture was stopped outside the session (browser chrome, OS)
    ScreenCaptureEnded { stream_id: StreamId },
}

/// Events consumed by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationEvent {
    /// One period of the stale-presence sweep elapsed
    SweepTick,
    MessageReceived {
        sender: User,
        content: String,
        attachments: Vec<Attachment>,
    },
    TypingStarted {
        user_id: UserId,
        user_name: String,
    },
    TypingStopped {
        user_id: UserId,
    },
}

impl From<SessionEvent> for Event {
    fn from(event: SessionEvent) -> Self {
        Event::Session(event)
    }
}

impl From<ConversationEvent> for Event {
    fn from(event: ConversationEvent) -> Self {
        Event::Conversation(event)
    }
}

// ----------------------------------------------------------------------------
// Effect: Manager → Runtime Scheduler
// ----------------------------------------------------------------------------

/// Recurring timers a manager may own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// 1 Hz elapsed-time counter of the session
    MeetingClock,
    /// Periodic speaking simulation of the session
    SpeakingSimulation,
    /// Periodic purge of stale typing presence
    TypingSweep,
}

/// Side effects requested by a manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Start (or restart) a recurring timer
    StartTimer { timer: TimerKind, period: Duration },
    /// Cancel a recurring timer; a no-op if it is not running
    CancelTimer { timer: TimerKind },
}

// ----------------------------------------------------------------------------
// AppEvent: Manager Task → UI
// ----------------------------------------------------------------------------

/// State changes that UI components and event sources subscribe to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Local media acquired and the local participant joined
    SessionStarted { local_participant_id: ParticipantId },
    /// The session recorded a user-visible error
    SessionError { message: String },
    /// The meeting was ended and all media released
    SessionEnded,
    RosterChanged { participant_count: usize },
    /// A remote participant's media flags or network quality changed
    ParticipantUpdated { participant_id: ParticipantId },
    LocalMediaChanged {
        audio_muted: bool,
        video_off: bool,
        screen_sharing: bool,
    },
    SpeakerChanged { participant_id: Option<ParticipantId> },
    SpotlightChanged { participant_id: Option<ParticipantId> },
    MeetingClock { elapsed_secs: u64 },
    MessageSent { message_id: MessageId },
    MessageReceived { message_id: MessageId, from: UserId },
    UnreadCountChanged { unread: usize },
    /// The local user started typing
    LocalTypingStarted,
    TypingChanged { summary: Option<String> },
}
