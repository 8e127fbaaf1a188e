//! Channel Module
//!
//! - `communication`: commands, events, effects and app events
//! - `utils`: channel aliases and constructors
//!
//! `Outbox` is how a manager hands effects and app events to whoever drives
//! it; the managers never touch a channel directly.

pub mod communication;
pub mod utils;

pub use communication::{
    AppEvent, Command, ConversationCommand, ConversationEvent, Effect, Event, ParticipantInfo,
    SessionCommand, SessionEvent, TimerKind,
};
pub use utils::{
    create_app_event_channel, create_command_channel, create_event_channel, AppEventReceiver,
    AppEventSender, ChannelError, CommandReceiver, CommandSender, EventReceiver, EventSender,
};

pub use crate::config::ChannelConfig;

/// Effects and app events produced by a manager, in emission order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outbox {
    effects: Vec<Effect>,
    app_events: Vec<AppEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn app_event(&mut self, event: AppEvent) {
        self.app_events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.app_events.is_empty()
    }

    /// Take everything queued so far, leaving the outbox empty
    pub fn drain(&mut self) -> (Vec<Effect>, Vec<AppEvent>) {
        (
            core::mem::take(&mut self.effects),
            core::mem::take(&mut self.app_events),
        )
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn app_events(&self) -> &[AppEvent] {
        &self.app_events
    }
}
