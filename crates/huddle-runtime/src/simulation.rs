//! Event sources standing in for a signaling layer
//!
//! An `EventSource` watches the app events the managers publish and answers
//! with inbound events to deliver later. The managers cannot tell these
//! apart from events injected by a real transport through
//! `RuntimeHandle::inject_event`.
//!
//! `DemoScript` reproduces the demo behavior: three participants join
//! shortly after the session starts, every sent message gets a canned reply,
//! and local typing is answered by a remote user typing for a while.

use core::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use huddle_core::channel::{
    AppEvent, AppEventReceiver, ConversationEvent, Event, EventSender, ParticipantInfo,
    SessionEvent,
};
use huddle_core::conversation::{Message, User};
use huddle_core::types::{MessageId, Timestamp, UserId};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Tunables of the demo simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Run the demo script; when off only real injected events arrive
    pub enabled: bool,
    /// Seed for the speaking simulation; entropy when absent
    pub seed: Option<u64>,
    /// Delay before the demo participants join
    pub join_delay: Duration,
    /// Delay before a sent message is answered
    pub reply_delay: Duration,
    /// Delay before the remote user starts typing back
    pub typing_delay: Duration,
    /// How long the remote user keeps typing
    pub typing_duration: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: None,
            join_delay: Duration::from_secs(1),
            reply_delay: Duration::from_secs(5),
            typing_delay: Duration::from_secs(1),
            typing_duration: Duration::from_secs(3),
        }
    }
}

impl SimulationConfig {
    /// No scripted events at all
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// RNG for the speaking simulation
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// One speaking-simulation sample drawn from `rng`
pub fn speaking_sample(rng: &mut StdRng) -> SessionEvent {
    SessionEvent::SpeakingTick {
        sample: rng.gen(),
        level: rng.gen_range(0.2..1.0),
    }
}

// ----------------------------------------------------------------------------
// Event Sources
// ----------------------------------------------------------------------------

/// An inbound event and how long to wait before delivering it
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub delay: Duration,
    pub event: Event,
}

impl ScheduledEvent {
    pub fn after(delay: Duration, event: impl Into<Event>) -> Self {
        Self {
            delay,
            event: event.into(),
        }
    }
}

/// Reacts to app events with inbound events
pub trait EventSource: Send + 'static {
    fn on_app_event(&mut self, event: &AppEvent) -> Vec<ScheduledEvent>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn on_app_event(&mut self, event: &AppEvent) -> Vec<ScheduledEvent> {
        (**self).on_app_event(event)
    }
}

/// Produces nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct Quiet;

impl EventSource for Quiet {
    fn on_app_event(&mut self, _event: &AppEvent) -> Vec<ScheduledEvent> {
        Vec::new()
    }
}

/// The scripted demo counterpart
#[derive(Debug, Clone)]
pub struct DemoScript {
    config: SimulationConfig,
}

impl DemoScript {
    pub const REPLY: &'static str = "Thanks for your message! I'll look into it.";

    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// The user who replies and types back
    pub fn responder() -> User {
        User::new("user1", "Jane Smith")
    }

    /// Participants who join after the session starts
    pub fn participants() -> Vec<ParticipantInfo> {
        vec![
            ParticipantInfo::new("mock-user1", "Jane Smith"),
            ParticipantInfo::new("mock-user2", "John Doe").muted(),
            ParticipantInfo::new("mock-user3", "Alex Johnson").video_off(),
        ]
    }

    /// Earlier messages of the demo room, 15, 10 and 5 minutes before `now`
    pub fn history(now: Timestamp) -> Vec<Message> {
        let jane = Self::responder();
        let john = User::new("user2", "John Doe");
        let minutes_ago = |m: u64| now.saturating_sub_duration(Duration::from_secs(m * 60));

        [
            ("1", "Hello everyone! Welcome to the meeting.", &jane, 15),
            ("2", "Thanks for joining. Let's discuss the project timeline.", &john, 10),
            ("3", "I've prepared some slides to share with you all.", &jane, 5),
        ]
        .into_iter()
        .map(|(id, content, sender, ago)| Message {
            id: MessageId::from(id),
            content: content.to_string(),
            sender: sender.clone(),
            timestamp: minutes_ago(ago),
            read: true,
            attachments: Vec::new(),
        })
        .collect()
    }
}

impl EventSource for DemoScript {
    fn on_app_event(&mut self, event: &AppEvent) -> Vec<ScheduledEvent> {
        match event {
            AppEvent::SessionStarted { .. } => Self::participants()
                .into_iter()
                .map(|participant| {
                    ScheduledEvent::after(
                        self.config.join_delay,
                        SessionEvent::ParticipantJoined { participant },
                    )
                })
                .collect(),
            AppEvent::MessageSent { .. } => vec![ScheduledEvent::after(
                self.config.reply_delay,
                ConversationEvent::MessageReceived {
                    sender: Self::responder(),
                    content: Self::REPLY.to_string(),
                    attachments: Vec::new(),
                },
            )],
            AppEvent::LocalTypingStarted => {
                let responder = Self::responder();
                vec![
                    ScheduledEvent::after(
                        self.config.typing_delay,
                        ConversationEvent::TypingStarted {
                            user_id: responder.id.clone(),
                            user_name: responder.name,
                        },
                    ),
                    ScheduledEvent::after(
                        self.config.typing_delay + self.config.typing_duration,
                        ConversationEvent::TypingStopped {
                            user_id: UserId::from("user1"),
                        },
                    ),
                ]
            }
            _ => Vec::new(),
        }
    }
}

// ----------------------------------------------------------------------------
// Simulation Task
// ----------------------------------------------------------------------------

/// Feeds an `EventSource` with app events and delivers what it schedules.
///
/// Deliveries are grouped by the manager they target. The end of a meeting
/// drops only the pending session events; the chat keeps its pending replies
/// and typing. Everything still pending is aborted when the task stops.
pub struct SimulationTask<S: EventSource> {
    source: S,
    app_events: AppEventReceiver,
    event_sender: EventSender,
    pending_session: JoinSet<()>,
    pending_conversation: JoinSet<()>,
}

impl<S: EventSource> SimulationTask<S> {
    pub fn new(source: S, app_events: AppEventReceiver, event_sender: EventSender) -> Self {
        Self {
            source,
            app_events,
            event_sender,
            pending_session: JoinSet::new(),
            pending_conversation: JoinSet::new(),
        }
    }

    /// Session events waiting to be delivered
    pub fn pending_session_events(&self) -> usize {
        self.pending_session.len()
    }

    /// Conversation events waiting to be delivered
    pub fn pending_conversation_events(&self) -> usize {
        self.pending_conversation.len()
    }

    pub async fn run(&mut self) {
        info!("Simulation task starting");

        loop {
            tokio::select! {
                received = self.app_events.recv() => match received {
                    Ok(event) => self.on_app_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Simulation missed {} app events", missed);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                Some(_) = self.pending_session.join_next(), if !self.pending_session.is_empty() => {}
                Some(_) = self.pending_conversation.join_next(), if !self.pending_conversation.is_empty() => {}
            }
        }

        self.pending_session.abort_all();
        self.pending_conversation.abort_all();
        info!("Simulation task stopped");
    }

    /// Schedule what the source answers to `event`
    pub fn on_app_event(&mut self, event: &AppEvent) {
        if matches!(event, AppEvent::SessionEnded) {
            debug!(
                "Session ended, dropping {} pending session events",
                self.pending_session.len()
            );
            // dropping the set aborts its tasks
            self.pending_session = JoinSet::new();
        }

        for scheduled in self.source.on_app_event(event) {
            let pending = match scheduled.event {
                Event::Session(_) => &mut self.pending_session,
                Event::Conversation(_) => &mut self.pending_conversation,
            };
            let sender = self.event_sender.clone();
            pending.spawn(async move {
                tokio::time::sleep(scheduled.delay).await;
                if sender.send(scheduled.event).await.is_err() {
                    debug!("Runtime gone, dropping simulated event");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::channel::{create_app_event_channel, create_event_channel};
    use huddle_core::types::ParticipantId;
    use huddle_core::HuddleConfig;

    #[test]
    fn test_demo_participants_join_after_start() {
        let mut script = DemoScript::new(SimulationConfig::default());
        let scheduled = script.on_app_event(&AppEvent::SessionStarted {
            local_participant_id: ParticipantId::local(),
        });

        assert_eq!(scheduled.len(), 3);
        assert!(scheduled.iter().all(|s| s.delay == Duration::from_secs(1)));
        assert!(matches!(
            &scheduled[1].event,
            Event::Session(SessionEvent::ParticipantJoined { participant }) if participant.muted
        ));
    }

    #[test]
    fn test_demo_reply_and_typing() {
        let mut script = DemoScript::new(SimulationConfig::default());

        let reply = script.on_app_event(&AppEvent::MessageSent {
            message_id: MessageId::from("msg-1"),
        });
        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].delay, Duration::from_secs(5));

        let typing = script.on_app_event(&AppEvent::LocalTypingStarted);
        assert_eq!(
            typing.iter().map(|s| s.delay).collect::<Vec<_>>(),
            vec![Duration::from_secs(1), Duration::from_secs(4)]
        );

        assert!(script.on_app_event(&AppEvent::SessionEnded).is_empty());
    }

    #[test]
    fn test_seeded_samples_repeat() {
        let config = SimulationConfig {
            seed: Some(7),
            ..SimulationConfig::default()
        };
        let (mut a, mut b) = (config.rng(), config.rng());
        for _ in 0..5 {
            assert_eq!(speaking_sample(&mut a), speaking_sample(&mut b));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_meeting_end_keeps_pending_chat_events() {
        let config = HuddleConfig::testing();
        let (_app_tx, app_rx) = create_app_event_channel(&config.channels);
        let (event_tx, mut event_rx) = create_event_channel(&config.channels);
        let mut task = SimulationTask::new(
            DemoScript::new(SimulationConfig::default()),
            app_rx,
            event_tx,
        );

        task.on_app_event(&AppEvent::SessionStarted {
            local_participant_id: ParticipantId::local(),
        });
        task.on_app_event(&AppEvent::MessageSent {
            message_id: MessageId::from("msg-1"),
        });
        assert_eq!(task.pending_session_events(), 3);
        assert_eq!(task.pending_conversation_events(), 1);

        task.on_app_event(&AppEvent::SessionEnded);
        assert_eq!(task.pending_session_events(), 0);
        assert_eq!(task.pending_conversation_events(), 1);

        let delivered = tokio::time::timeout(Duration::from_secs(10), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            delivered,
            Event::Conversation(ConversationEvent::MessageReceived { .. })
        ));
    }

    #[test]
    fn test_history_is_ordered_and_read() {
        let history = DemoScript::history(Timestamp::new(3_600_000));
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(history.iter().all(|m| m.read));
    }
}
