//! Core types for Huddle
//!
//! Identifier newtypes, the millisecond `Timestamp`, and the two injected
//! capabilities every manager is built with: a `TimeSource` and an
//! `IdGenerator`. Nothing in this crate reads the wall clock or mints an id
//! on its own.

use core::fmt;
use core::ops::{Add, Sub};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

/// Identifier of the local participant in every session roster
pub const LOCAL_PARTICIPANT_ID: &str = "local-user";

string_id!(
    /// Identifier of a session participant, unique within one session
    ParticipantId
);

string_id!(
    /// Identifier of a chat user
    UserId
);

string_id!(
    /// Identifier of a chat message
    MessageId
);

string_id!(
    /// Identifier of a message attachment
    AttachmentId
);

string_id!(
    /// Identifier of a media stream handed out by a `MediaDevices` capability
    StreamId
);

string_id!(
    /// Identifier of a single media track
    TrackId
);

string_id!(
    /// Identifier of a playback surface a stream can be rendered to
    SurfaceId
);

impl ParticipantId {
    /// The reserved id of the local participant
    pub fn local() -> Self {
        Self(LOCAL_PARTICIPANT_ID.to_string())
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_PARTICIPANT_ID
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Millisecond timestamp since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, other: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(other))
    }
}

impl Sub for Timestamp {
    type Output = u64;

    fn sub(self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl Timestamp {
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Get duration since another timestamp (zero if `other` is later)
    pub fn duration_since(&self, other: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(other.0))
    }

    /// Shift back by `duration`, saturating at the epoch
    pub fn saturating_sub_duration(&self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_millis() as u64))
    }
}

// ----------------------------------------------------------------------------
// Time Source Trait
// ----------------------------------------------------------------------------

/// Source of "now" for the managers
///
/// Injected so that tests can drive staleness windows and timestamps
/// without sleeping.
pub trait TimeSource {
    /// Get the current timestamp
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall-clock time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

// ----------------------------------------------------------------------------
// Identifier Generation
// ----------------------------------------------------------------------------

/// Source of fresh identifiers for messages and attachments
pub trait IdGenerator {
    /// Produce an identifier that has never been returned before,
    /// prefixed with `prefix` (e.g. `msg`, `att`)
    fn next_id(&self, prefix: &str) -> String;
}

impl<G: IdGenerator + ?Sized> IdGenerator for std::sync::Arc<G> {
    fn next_id(&self, prefix: &str) -> String {
        (**self).next_id(prefix)
    }
}

/// Random v4 UUID identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, uuid::Uuid::new_v4())
    }
}

/// Monotonic counter identifiers (`msg-1`, `msg-2`, ...)
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Start counting from `first`
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", prefix, n)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
