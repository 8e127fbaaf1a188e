//! Centralized Configuration Management
//!
//! All tunables for the two managers and the channels between tasks live
//! here so the runtime and CLI share one serializable configuration tree.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{HuddleError, HuddleResult};

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Configuration for channel buffer sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Buffer size for Command channels (UI → manager task)
    pub command_buffer_size: usize,
    /// Buffer size for Event channels (event source → manager task)
    pub event_buffer_size: usize,
    /// Buffer size for the AppEvent broadcast (manager task → UI)
    pub app_event_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,   // UI commands are infrequent
            event_buffer_size: 128,    // timer ticks and simulated events can be bursty
            app_event_buffer_size: 64, // UI updates need responsiveness
        }
    }
}

impl ChannelConfig {
    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            command_buffer_size: 100,
            event_buffer_size: 100,
            app_event_buffer_size: 256,
        }
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for the conferencing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Display name of the local participant
    pub local_display_name: String,
    /// Period of the elapsed-time counter
    pub duration_tick: Duration,
    /// Period of the speaking simulation
    pub speaking_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_display_name: "You".to_string(),
            duration_tick: Duration::from_secs(1),
            speaking_tick: Duration::from_secs(3),
        }
    }
}

impl SessionConfig {
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.local_display_name = name.into();
        self
    }
}

// ----------------------------------------------------------------------------
// Conversation Configuration
// ----------------------------------------------------------------------------

/// Configuration for the chat room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Age after which a typing-presence entry is stale
    pub typing_staleness: Duration,
    /// Period of the stale-presence sweep
    pub sweep_interval: Duration,
    /// Distance from the bottom of the message list (in pixels) that still
    /// counts as "at the bottom"
    pub near_bottom_threshold_px: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            typing_staleness: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
            near_bottom_threshold_px: 100,
        }
    }
}

// ----------------------------------------------------------------------------
// Aggregate Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for both managers and their channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HuddleConfig {
    pub channels: ChannelConfig,
    pub session: SessionConfig,
    pub conversation: ConversationConfig,
}

impl HuddleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            channels: ChannelConfig::testing(),
            session: SessionConfig::default().with_display_name("Tester"),
            conversation: ConversationConfig::default(),
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> HuddleResult<()> {
        if self.channels.command_buffer_size == 0 {
            return Err(HuddleError::invalid_config(
                "Command buffer size cannot be zero",
            ));
        }
        if self.channels.event_buffer_size == 0 {
            return Err(HuddleError::invalid_config("Event buffer size cannot be zero"));
        }
        if self.channels.app_event_buffer_size == 0 {
            return Err(HuddleError::invalid_config(
                "App event buffer size cannot be zero",
            ));
        }

        if self.session.local_display_name.trim().is_empty() {
            return Err(HuddleError::invalid_config(
                "Local display name cannot be empty",
            ));
        }
        if self.session.duration_tick.is_zero() || self.session.speaking_tick.is_zero() {
            return Err(HuddleError::invalid_config(
                "Session timer periods must be greater than zero",
            ));
        }

        if self.conversation.sweep_interval.is_zero() {
            return Err(HuddleError::invalid_config(
                "Typing sweep interval must be greater than zero",
            ));
        }
        if self.conversation.sweep_interval > self.conversation.typing_staleness {
            return Err(HuddleError::invalid_config(
                "Typing sweep interval cannot exceed the staleness window",
            ));
        }

        Ok(())
    }
}
