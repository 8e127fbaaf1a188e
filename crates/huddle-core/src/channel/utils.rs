//! Channel Utilities
//!
//! Commands and inbound events travel over bounded `mpsc` channels, one per
//! manager task. App events are broadcast so that the UI and any number of
//! event sources can observe the same stream.

use core::fmt;

use crate::channel::communication::{AppEvent, Command, Event};
use crate::config::ChannelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    ChannelFull,
    ChannelClosed,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::ChannelFull => write!(f, "Channel buffer is full"),
            ChannelError::ChannelClosed => write!(f, "Channel is closed"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for ChannelError {
    fn from(err: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match err {
            tokio::sync::mpsc::error::TrySendError::Full(_) => ChannelError::ChannelFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => ChannelError::ChannelClosed,
        }
    }
}

impl From<ChannelError> for crate::HuddleError {
    fn from(err: ChannelError) -> Self {
        crate::HuddleError::channel(err.to_string())
    }
}

pub type CommandSender = tokio::sync::mpsc::Sender<Command>;
pub type CommandReceiver = tokio::sync::mpsc::Receiver<Command>;
pub type EventSender = tokio::sync::mpsc::Sender<Event>;
pub type EventReceiver = tokio::sync::mpsc::Receiver<Event>;
pub type AppEventSender = tokio::sync::broadcast::Sender<AppEvent>;
pub type AppEventReceiver = tokio::sync::broadcast::Receiver<AppEvent>;

// ----------------------------------------------------------------------------
// Channel Creation Utilities
// ----------------------------------------------------------------------------

/// Create bounded command channel (UI → manager task)
pub fn create_command_channel(config: &ChannelConfig) -> (CommandSender, CommandReceiver) {
    tokio::sync::mpsc::channel(config.command_buffer_size)
}

/// Create bounded event channel (event source → manager task)
pub fn create_event_channel(config: &ChannelConfig) -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::channel(config.event_buffer_size)
}

/// Create app event broadcast (manager tasks → UI and event sources).
/// Further receivers come from `sender.subscribe()`.
pub fn create_app_event_channel(config: &ChannelConfig) -> (AppEventSender, AppEventReceiver) {
    tokio::sync::broadcast::channel(config.app_event_buffer_size)
}
