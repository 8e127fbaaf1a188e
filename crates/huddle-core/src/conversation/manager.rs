//! Conversation state manager
//!
//! Holds the message history, typing presence and unread counter of one
//! chat room. Replies and remote typing arrive as `ConversationEvent`s, and
//! the stale-presence sweep is driven by `SweepTick` events from a timer the
//! manager requests on `start`.

use tracing::{debug, info};

use crate::channel::{AppEvent, ConversationEvent, Effect, Outbox, TimerKind};
use crate::config::ConversationConfig;
use crate::conversation::message::{Attachment, AttachmentUpload, Message, User};
use crate::conversation::presence::{TypingEntry, TypingPresence};
use crate::conversation::viewport::{ScrollMetrics, Viewport, ViewportUpdate};
use crate::types::{AttachmentId, IdGenerator, MessageId, TimeSource, UserId};

/// Point-in-time copy of the room state for presentation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub unread: usize,
    pub typing_summary: Option<String>,
    pub has_new_messages: bool,
    /// The list should follow the newest message
    pub scroll_to_bottom: bool,
}

/// State machine for one chat room
pub struct ConversationManager<T: TimeSource, G: IdGenerator> {
    config: ConversationConfig,
    current_user: User,
    time_source: T,
    ids: G,
    outbox: Outbox,
    messages: Vec<Message>,
    typing: TypingPresence,
    unread: usize,
    viewport: Viewport,
    /// Latest scroll decision of the viewport
    scroll_to_bottom: bool,
    sweeping: bool,
}

impl<T: TimeSource, G: IdGenerator> ConversationManager<T, G> {
    pub fn new(config: ConversationConfig, current_user: User, time_source: T, ids: G) -> Self {
        let viewport = Viewport::new(config.near_bottom_threshold_px);
        Self {
            config,
            current_user,
            time_source,
            ids,
            outbox: Outbox::new(),
            messages: Vec::new(),
            typing: TypingPresence::new(),
            unread: 0,
            viewport,
            scroll_to_bottom: false,
            sweeping: false,
        }
    }

    /// Seed the room with earlier messages, all of them already read
    pub fn with_history(mut self, history: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(history.into_iter().map(|mut message| {
            message.read = true;
            message
        }));
        self
    }

    /// Request the recurring stale-presence sweep
    pub fn start(&mut self) {
        if self.sweeping {
            return;
        }
        self.sweeping = true;
        self.outbox.effect(Effect::StartTimer {
            timer: TimerKind::TypingSweep,
            period: self.config.sweep_interval,
        });
    }

    /// Cancel the sweep and drop all typing presence
    pub fn teardown(&mut self) {
        if self.sweeping {
            self.sweeping = false;
            self.outbox.effect(Effect::CancelTimer {
                timer: TimerKind::TypingSweep,
            });
        }
        if !self.typing.is_empty() {
            self.typing = TypingPresence::new();
            self.emit_typing_changed();
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Append a message from the current user. Returns `None` without
    /// changing anything when there is neither text nor an attachment.
    pub fn send_message(
        &mut self,
        content: &str,
        uploads: Vec<AttachmentUpload>,
    ) -> Option<Message> {
        if content.trim().is_empty() && uploads.is_empty() {
            debug!("Ignoring empty message");
            return None;
        }

        let attachments = uploads
            .into_iter()
            .map(|upload| Attachment::from_upload(AttachmentId::new(self.ids.next_id("att")), upload))
            .collect();
        let message = Message {
            id: MessageId::new(self.ids.next_id("msg")),
            content: content.to_string(),
            sender: self.current_user.clone(),
            timestamp: self.time_source.now(),
            read: false,
            attachments,
        };

        debug!("Sending message {} ({} attachments)", message.id, message.attachments.len());
        self.messages.push(message.clone());
        self.scroll_to_bottom = self.viewport.messages_appended().scroll_to_bottom;
        self.outbox.app_event(AppEvent::MessageSent {
            message_id: message.id.clone(),
        });
        Some(message)
    }

    /// Mark every message read and reset the unread counter
    pub fn mark_messages_as_read(&mut self) {
        let newly_read = self.messages.iter().filter(|m| !m.read).count();
        self.messages.iter_mut().for_each(|m| m.read = true);
        self.viewport.clear_badge();

        if self.unread > 0 || newly_read > 0 {
            debug!("Marked {} messages read", newly_read);
            self.unread = 0;
            self.outbox
                .app_event(AppEvent::UnreadCountChanged { unread: 0 });
        }
    }

    pub fn set_user_typing(&mut self, is_typing: bool) {
        if is_typing {
            let now = self.time_source.now();
            self.typing.upsert(
                self.current_user.id.clone(),
                self.current_user.name.clone(),
                now,
            );
            self.outbox.app_event(AppEvent::LocalTypingStarted);
            self.emit_typing_changed();
        } else if self.typing.remove(&self.current_user.id) {
            self.emit_typing_changed();
        }
    }

    /// The message list was scrolled
    pub fn viewport_scrolled(&mut self, metrics: ScrollMetrics) -> ViewportUpdate {
        let update = self.viewport.scrolled(metrics);
        self.scroll_to_bottom = update.scroll_to_bottom;
        if update.mark_read {
            self.mark_messages_as_read();
        }
        update
    }

    /// The user asked to jump to the newest message
    pub fn jump_to_latest(&mut self) -> ViewportUpdate {
        let update = self.viewport.jump_to_bottom();
        self.scroll_to_bottom = update.scroll_to_bottom;
        if update.mark_read {
            self.mark_messages_as_read();
        }
        update
    }

    // ------------------------------------------------------------------------
    // Inbound Events
    // ------------------------------------------------------------------------

    pub fn handle_event(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::SweepTick => {
                let now = self.time_source.now();
                let purged = self.typing.sweep(now, self.config.typing_staleness);
                if purged > 0 {
                    debug!("Purged {} stale typing entries", purged);
                    self.emit_typing_changed();
                }
            }
            ConversationEvent::MessageReceived {
                sender,
                content,
                attachments,
            } => self.receive_message(sender, content, attachments),
            ConversationEvent::TypingStarted { user_id, user_name } => {
                let now = self.time_source.now();
                self.typing.upsert(user_id, user_name, now);
                self.emit_typing_changed();
            }
            ConversationEvent::TypingStopped { user_id } => {
                if self.typing.remove(&user_id) {
                    self.emit_typing_changed();
                }
            }
        }
    }

    fn receive_message(&mut self, sender: User, content: String, attachments: Vec<Attachment>) {
        let message = Message {
            id: MessageId::new(self.ids.next_id("msg")),
            content,
            sender,
            timestamp: self.time_source.now(),
            read: false,
            attachments,
        };
        info!("Message {} received from {}", message.id, message.sender.name);

        let from = message.sender.id.clone();
        let message_id = message.id.clone();
        let counts_as_unread = from != self.current_user.id;
        self.messages.push(message);
        self.scroll_to_bottom = self.viewport.messages_appended().scroll_to_bottom;

        self.outbox.app_event(AppEvent::MessageReceived { message_id, from });
        if counts_as_unread {
            self.unread += 1;
            self.outbox.app_event(AppEvent::UnreadCountChanged {
                unread: self.unread,
            });
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, message_id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == message_id)
    }

    pub fn unread_count(&self) -> usize {
        self.unread
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub fn typing_users(&self) -> &[TypingEntry] {
        self.typing.entries()
    }

    pub fn is_typing(&self, user_id: &UserId) -> bool {
        self.typing.contains(user_id)
    }

    /// Indicator text for everyone but the current user
    pub fn typing_summary(&self) -> Option<String> {
        self.typing.summary(Some(&self.current_user.id))
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            unread: self.unread,
            typing_summary: self.typing_summary(),
            has_new_messages: self.viewport.has_new_messages(),
            scroll_to_bottom: self.scroll_to_bottom,
        }
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn drain_outbox(&mut self) -> (Vec<Effect>, Vec<AppEvent>) {
        self.outbox.drain()
    }

    fn emit_typing_changed(&mut self) {
        self.outbox.app_event(AppEvent::TypingChanged {
            summary: self.typing_summary(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SequentialIdGenerator, SystemTimeSource};

    fn manager() -> ConversationManager<SystemTimeSource, SequentialIdGenerator> {
        ConversationManager::new(
            ConversationConfig::default(),
            User::new("me", "You"),
            SystemTimeSource::new(),
            SequentialIdGenerator::new(),
        )
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut conversation = manager();
        conversation.start();
        conversation.start();
        let (effects, _) = conversation.drain_outbox();
        assert_eq!(effects.len(), 1);

        conversation.teardown();
        conversation.teardown();
        let (effects, _) = conversation.drain_outbox();
        assert_eq!(
            effects,
            vec![Effect::CancelTimer {
                timer: TimerKind::TypingSweep
            }]
        );
    }

    #[test]
    fn test_attachment_only_message_is_sent() {
        let mut conversation = manager();
        let sent = conversation
            .send_message("  ", vec![AttachmentUpload::new("a.png", "image/png", 2048)])
            .unwrap();

        assert_eq!(sent.id, MessageId::from("msg-2"));
        assert_eq!(sent.attachments[0].id, AttachmentId::from("att-1"));
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn test_own_echo_is_not_unread() {
        let mut conversation = manager();
        conversation.handle_event(ConversationEvent::MessageReceived {
            sender: User::new("me", "You"),
            content: "from another device".to_string(),
            attachments: Vec::new(),
        });
        assert_eq!(conversation.unread_count(), 0);
    }

    #[test]
    fn test_history_is_read() {
        let history = vec![Message {
            id: MessageId::from("1"),
            content: "Hello everyone! Welcome to the meeting.".to_string(),
            sender: User::new("user1", "Jane Smith"),
            timestamp: crate::types::Timestamp::new(0),
            read: false,
            attachments: Vec::new(),
        }];
        let conversation = manager().with_history(history);
        assert!(conversation.messages().iter().all(|m| m.read));
        assert_eq!(conversation.unread_count(), 0);
    }

    #[test]
    fn test_mark_read_twice_emits_once() {
        let mut conversation = manager();
        conversation.handle_event(ConversationEvent::MessageReceived {
            sender: User::new("user1", "Jane Smith"),
            content: "hi".to_string(),
            attachments: Vec::new(),
        });
        conversation.drain_outbox();

        conversation.mark_messages_as_read();
        conversation.mark_messages_as_read();
        let (_, events) = conversation.drain_outbox();
        assert_eq!(events, vec![AppEvent::UnreadCountChanged { unread: 0 }]);
    }
}
