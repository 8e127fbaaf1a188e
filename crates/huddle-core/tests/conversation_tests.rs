//! Conversation manager behavior: sending, replies, read tracking and
//! typing presence

use huddle_core::channel::{AppEvent, ConversationEvent};
use huddle_core::conversation::{AttachmentKind, AttachmentUpload, ScrollMetrics, User};
use huddle_core::types::{MessageId, UserId};

mod test_utils;
use test_utils::{create_test_conversation, current_user};

fn jane() -> User {
    User::new("user1", "Jane Smith")
}

fn reply(content: &str) -> ConversationEvent {
    ConversationEvent::MessageReceived {
        sender: jane(),
        content: content.to_string(),
        attachments: Vec::new(),
    }
}

#[test]
fn test_empty_message_is_rejected() {
    let (mut conversation, _time) = create_test_conversation();

    assert!(conversation.send_message("", Vec::new()).is_none());
    assert!(conversation.send_message("   \n\t", Vec::new()).is_none());
    assert!(conversation.messages().is_empty());
    assert!(conversation.outbox().is_empty());
}

#[test]
fn test_send_appends_one_message_from_current_user() {
    let (mut conversation, time) = create_test_conversation();
    time.set_time(42_000);

    let sent = conversation.send_message("x", Vec::new()).unwrap();
    assert_eq!(conversation.messages().len(), 1);

    let stored = &conversation.messages()[0];
    assert_eq!(stored, &sent);
    assert_eq!(stored.sender, current_user());
    assert_eq!(stored.content, "x");
    assert_eq!(stored.timestamp.as_millis(), 42_000);
    assert!(!stored.read);

    let (_, events) = conversation.drain_outbox();
    assert_eq!(
        events,
        vec![AppEvent::MessageSent {
            message_id: sent.id
        }]
    );
}

#[test]
fn test_uploads_become_attachments() {
    let (mut conversation, _time) = create_test_conversation();
    let sent = conversation
        .send_message(
            "see attached",
            vec![
                AttachmentUpload::new("diagram.png", "image/png", 4_096),
                AttachmentUpload::new("plan.pdf", "application/pdf", 120_000),
            ],
        )
        .unwrap();

    let kinds: Vec<_> = sent.attachments.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![AttachmentKind::Image, AttachmentKind::Document]);
    assert_eq!(sent.attachments[0].size_label().as_deref(), Some("(4KB)"));
    assert_ne!(sent.attachments[0].id, sent.attachments[1].id);
    assert!(sent.attachments[1].location.ends_with("/plan.pdf"));
}

#[test]
fn test_reply_increments_unread() {
    let (mut conversation, _time) = create_test_conversation();
    conversation.send_message("hello", Vec::new()).unwrap();
    conversation.handle_event(reply("Thanks for your message! I'll look into it."));

    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(conversation.unread_count(), 1);
    assert_eq!(conversation.messages()[1].sender.id, UserId::from("user1"));

    let (_, events) = conversation.drain_outbox();
    assert!(events.contains(&AppEvent::UnreadCountChanged { unread: 1 }));
}

#[test]
fn test_mark_read_is_idempotent() {
    let (mut conversation, _time) = create_test_conversation();
    conversation.send_message("one", Vec::new()).unwrap();
    conversation.handle_event(reply("two"));
    conversation.handle_event(reply("three"));

    conversation.mark_messages_as_read();
    let once: Vec<_> = conversation.messages().to_vec();
    conversation.mark_messages_as_read();

    assert_eq!(conversation.messages(), once.as_slice());
    assert!(conversation.messages().iter().all(|m| m.read));
    assert_eq!(conversation.unread_count(), 0);
}

#[test]
fn test_messages_keep_arrival_order() {
    let (mut conversation, time) = create_test_conversation();
    conversation.send_message("first", Vec::new()).unwrap();
    time.advance(10);
    conversation.handle_event(reply("second"));
    time.advance(10);
    conversation.send_message("third", Vec::new()).unwrap();

    let contents: Vec<_> = conversation
        .messages()
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
    assert_eq!(conversation.messages()[2].id, MessageId::from("msg-3"));
}

// ----------------------------------------------------------------------------
// Typing Presence
// ----------------------------------------------------------------------------

#[test]
fn test_typing_expires_after_staleness_window() {
    let (mut conversation, time) = create_test_conversation();
    let me = current_user().id;

    conversation.set_user_typing(true);
    assert!(conversation.is_typing(&me));

    time.advance(4_999);
    conversation.handle_event(ConversationEvent::SweepTick);
    assert!(conversation.is_typing(&me));

    time.advance(1);
    conversation.handle_event(ConversationEvent::SweepTick);
    assert!(!conversation.is_typing(&me));
}

#[test]
fn test_typing_refresh_keeps_one_entry() {
    let (mut conversation, time) = create_test_conversation();
    conversation.set_user_typing(true);
    time.advance(3_000);
    conversation.set_user_typing(true);
    time.advance(3_000);
    conversation.handle_event(ConversationEvent::SweepTick);

    assert_eq!(conversation.typing_users().len(), 1);

    conversation.set_user_typing(false);
    assert!(conversation.typing_users().is_empty());
}

#[test]
fn test_local_typing_announces_itself() {
    let (mut conversation, _time) = create_test_conversation();
    conversation.set_user_typing(true);

    let (_, events) = conversation.drain_outbox();
    assert_eq!(
        events,
        vec![
            AppEvent::LocalTypingStarted,
            AppEvent::TypingChanged { summary: None },
        ]
    );

    conversation.set_user_typing(false);
    conversation.set_user_typing(false);
    let (_, events) = conversation.drain_outbox();
    assert_eq!(events.len(), 1);
}

#[test]
fn test_remote_typing_summary() {
    let (mut conversation, time) = create_test_conversation();
    conversation.set_user_typing(true);
    conversation.handle_event(ConversationEvent::TypingStarted {
        user_id: UserId::from("user1"),
        user_name: "Jane Smith".to_string(),
    });
    assert_eq!(
        conversation.typing_summary().as_deref(),
        Some("Jane Smith is typing...")
    );

    conversation.handle_event(ConversationEvent::TypingStarted {
        user_id: UserId::from("user2"),
        user_name: "John Doe".to_string(),
    });
    assert_eq!(
        conversation.typing_summary().as_deref(),
        Some("Jane Smith and John Doe are typing...")
    );

    conversation.handle_event(ConversationEvent::TypingStopped {
        user_id: UserId::from("user1"),
    });
    time.advance(5_000);
    conversation.handle_event(ConversationEvent::SweepTick);
    assert!(conversation.typing_summary().is_none());
    assert!(conversation.typing_users().is_empty());
}

// ----------------------------------------------------------------------------
// Viewport
// ----------------------------------------------------------------------------

#[test]
fn test_returning_to_bottom_reads_new_messages() {
    let (mut conversation, _time) = create_test_conversation();
    conversation.viewport_scrolled(ScrollMetrics {
        scroll_height: 2_000,
        scroll_top: 0,
        client_height: 500,
    });

    conversation.handle_event(reply("while you were away"));
    assert!(conversation.viewport().has_new_messages());
    assert_eq!(conversation.unread_count(), 1);

    let update = conversation.viewport_scrolled(ScrollMetrics {
        scroll_height: 2_000,
        scroll_top: 1_450,
        client_height: 500,
    });
    assert!(update.mark_read);
    assert_eq!(conversation.unread_count(), 0);
    assert!(!conversation.viewport().has_new_messages());
}

#[test]
fn test_jump_to_latest_reads_pending() {
    let (mut conversation, _time) = create_test_conversation();
    conversation.viewport_scrolled(ScrollMetrics {
        scroll_height: 2_000,
        scroll_top: 0,
        client_height: 500,
    });
    conversation.handle_event(reply("ping"));

    let update = conversation.jump_to_latest();
    assert!(update.scroll_to_bottom);
    assert!(update.mark_read);
    assert!(conversation.messages().iter().all(|m| m.read));
}

#[test]
fn test_snapshot_follows_new_messages_only_at_bottom() {
    let (mut conversation, _time) = create_test_conversation();
    assert!(!conversation.snapshot().scroll_to_bottom);

    conversation.send_message("at the bottom", Vec::new());
    assert!(conversation.snapshot().scroll_to_bottom);

    conversation.viewport_scrolled(ScrollMetrics {
        scroll_height: 2_000,
        scroll_top: 0,
        client_height: 500,
    });
    conversation.handle_event(reply("arrived while reading history"));
    let snapshot = conversation.snapshot();
    assert!(!snapshot.scroll_to_bottom);
    assert!(snapshot.has_new_messages);

    conversation.jump_to_latest();
    let snapshot = conversation.snapshot();
    assert!(snapshot.scroll_to_bottom);
    assert!(!snapshot.has_new_messages);
}
