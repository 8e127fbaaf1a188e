//! Huddle Core
//!
//! State management for a small conferencing and chat client: a
//! `SessionManager` that owns local media, the participant roster and the
//! meeting clock, and a `ConversationManager` that owns one chat room's
//! history, typing presence and unread count.
//!
//! Both managers are synchronous state machines driven through `&mut self`.
//! Whatever runs them (see `huddle-runtime`) feeds them commands and inbound
//! events and executes the effects they queue in their `Outbox`. Time, ids,
//! media acquisition and playback are injected capabilities.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod channel;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod media;
pub mod playback;
pub mod session;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use channel::{
    AppEvent, Command, ConversationCommand, ConversationEvent, Effect, Event, Outbox,
    ParticipantInfo, SessionCommand, SessionEvent, TimerKind,
};
pub use config::{ChannelConfig, ConversationConfig, HuddleConfig, SessionConfig};
pub use conversation::{
    Attachment, AttachmentKind, AttachmentUpload, ConversationManager, ConversationSnapshot, Message,
    User,
};
pub use errors::{HuddleError, HuddleResult, MediaError, PictureInPictureError, PlaybackError};
pub use media::{MediaDevices, MediaKind, MediaStream, MediaTrack, SyntheticMediaDevices};
pub use playback::{HeadlessPlayback, PictureInPicture, PlaybackBackend, VideoTile};
pub use session::{DisplayState, NetworkQuality, Participant, SessionManager, SessionSnapshot};
pub use types::{
    IdGenerator, MessageId, ParticipantId, SequentialIdGenerator, StreamId, SurfaceId,
    SystemTimeSource, TimeSource, Timestamp, UserId, UuidIdGenerator,
};
