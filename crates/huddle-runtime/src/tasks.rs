//! Async tasks driving the two managers
//!
//! - `IngressTask`: routes UI commands and inbound events to the owning task
//! - `SessionTask`: owns the `SessionManager` and the session timers
//! - `ConversationTask`: owns the `ConversationManager` and the sweep timer
//!
//! Each manager task processes its queue one input at a time, then executes
//! the effects the manager queued, broadcasts its app events and publishes
//! a fresh snapshot. Timer firings are pushed back into the same queue, so
//! a manager never sees two inputs at once.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use huddle_core::channel::{
    AppEventSender, CommandReceiver, ConversationCommand, ConversationEvent, EventReceiver,
    SessionCommand, SessionEvent,
};
use huddle_core::{
    AppEvent, Command, ConversationManager, ConversationSnapshot, Effect, Event, IdGenerator,
    MediaDevices, SessionManager, SessionSnapshot, TimeSource, TimerKind,
};

use crate::scheduler::TimerScheduler;
use crate::simulation::speaking_sample;

// ----------------------------------------------------------------------------
// Shared Capabilities
// ----------------------------------------------------------------------------

pub type SharedDevices = Arc<dyn MediaDevices>;
pub type SharedTimeSource = Arc<dyn TimeSource + Send + Sync>;
pub type SharedIds = Arc<dyn IdGenerator + Send + Sync>;

pub type RuntimeSession = SessionManager<SharedDevices, SharedTimeSource>;
pub type RuntimeConversation = ConversationManager<SharedTimeSource, SharedIds>;

// ----------------------------------------------------------------------------
// Inter-Task Communication
// ----------------------------------------------------------------------------

/// Work item of the session task
#[derive(Debug, Clone)]
pub enum SessionInput {
    Command(SessionCommand),
    Event(SessionEvent),
    Shutdown,
}

/// Work item of the conversation task
#[derive(Debug, Clone)]
pub enum ConversationInput {
    Command(ConversationCommand),
    Event(ConversationEvent),
    Shutdown,
}

fn broadcast(sender: &AppEventSender, events: Vec<AppEvent>) {
    for event in events {
        if sender.send(event).is_err() {
            debug!("No app event subscribers");
        }
    }
}

// ----------------------------------------------------------------------------
// Ingress Task
// ----------------------------------------------------------------------------

/// Splits the public command and event channels per manager
pub struct IngressTask {
    command_receiver: CommandReceiver,
    event_receiver: EventReceiver,
    session_sender: mpsc::UnboundedSender<SessionInput>,
    conversation_sender: mpsc::UnboundedSender<ConversationInput>,
}

impl IngressTask {
    pub fn new(
        command_receiver: CommandReceiver,
        event_receiver: EventReceiver,
        session_sender: mpsc::UnboundedSender<SessionInput>,
        conversation_sender: mpsc::UnboundedSender<ConversationInput>,
    ) -> Self {
        Self {
            command_receiver,
            event_receiver,
            session_sender,
            conversation_sender,
        }
    }

    pub async fn run(&mut self) {
        info!("Ingress task starting");

        loop {
            tokio::select! {
                Some(command) = self.command_receiver.recv() => {
                    if !self.route_command(command) {
                        break;
                    }
                }
                Some(event) = self.event_receiver.recv() => self.route_event(event),
                else => {
                    debug!("All channels closed, stopping ingress task");
                    break;
                }
            }
        }

        self.stop_managers();
        info!("Ingress task stopped");
    }

    /// Returns false once shutdown was requested
    fn route_command(&mut self, command: Command) -> bool {
        match command {
            Command::Session(command) => {
                self.forward_session(SessionInput::Command(command));
                true
            }
            Command::Conversation(command) => {
                self.forward_conversation(ConversationInput::Command(command));
                true
            }
            Command::Shutdown => {
                info!("Shutdown requested");
                false
            }
        }
    }

    fn route_event(&mut self, event: Event) {
        match event {
            Event::Session(event) => self.forward_session(SessionInput::Event(event)),
            Event::Conversation(event) => {
                self.forward_conversation(ConversationInput::Event(event))
            }
        }
    }

    fn forward_session(&self, input: SessionInput) {
        if self.session_sender.send(input).is_err() {
            warn!("Session task is gone, dropping input");
        }
    }

    fn forward_conversation(&self, input: ConversationInput) {
        if self.conversation_sender.send(input).is_err() {
            warn!("Conversation task is gone, dropping input");
        }
    }

    fn stop_managers(&self) {
        self.forward_session(SessionInput::Shutdown);
        self.forward_conversation(ConversationInput::Shutdown);
    }
}

// ----------------------------------------------------------------------------
// Session Task
// ----------------------------------------------------------------------------

/// Runs the session manager and the meeting clock and speaking timers
pub struct SessionTask {
    manager: RuntimeSession,
    inputs: mpsc::UnboundedReceiver<SessionInput>,
    /// Handed to timers so their firings join `inputs`
    loopback: mpsc::UnboundedSender<SessionInput>,
    timers: TimerScheduler,
    rng: StdRng,
    app_event_sender: AppEventSender,
    state: watch::Sender<SessionSnapshot>,
}

impl SessionTask {
    pub fn new(
        manager: RuntimeSession,
        inputs: mpsc::UnboundedReceiver<SessionInput>,
        loopback: mpsc::UnboundedSender<SessionInput>,
        rng: StdRng,
        app_event_sender: AppEventSender,
        state: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            manager,
            inputs,
            loopback,
            timers: TimerScheduler::new(),
            rng,
            app_event_sender,
            state,
        }
    }

    pub async fn run(&mut self) {
        info!("Session task starting");

        while let Some(input) = self.inputs.recv().await {
            let keep_running = self.handle_input(input).await;
            self.flush();
            if !keep_running {
                break;
            }
        }

        self.timers.cancel_all();
        info!("Session task stopped");
    }

    async fn handle_input(&mut self, input: SessionInput) -> bool {
        match input {
            SessionInput::Command(command) => self.handle_command(command).await,
            SessionInput::Event(event) => self.manager.handle_event(event),
            SessionInput::Shutdown => {
                self.manager.end_meeting();
                return false;
            }
        }
        true
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        debug!("Session command: {:?}", command);
        match command {
            SessionCommand::Initialize => {
                if let Err(e) = self.manager.initialize().await {
                    error!("Session initialization failed: {}", e);
                }
            }
            SessionCommand::ToggleAudio => self.manager.toggle_audio(),
            SessionCommand::ToggleVideo => self.manager.toggle_video(),
            SessionCommand::ToggleScreenShare => {
                if let Err(e) = self.manager.toggle_screen_share().await {
                    warn!("Screen share toggle failed: {}", e);
                }
            }
            SessionCommand::ToggleSpotlight { participant_id } => {
                self.manager.toggle_spotlight(&participant_id)
            }
            SessionCommand::EndMeeting => self.manager.end_meeting(),
        }
    }

    fn flush(&mut self) {
        let (effects, events) = self.manager.drain_outbox();
        for effect in effects {
            self.apply_effect(effect);
        }
        // Subscribers read the snapshot when an event arrives
        self.state.send_replace(self.manager.snapshot());
        broadcast(&self.app_event_sender, events);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::StartTimer {
                timer: TimerKind::MeetingClock,
                period,
            } => self.timers.start(
                TimerKind::MeetingClock,
                period,
                self.loopback.clone(),
                || SessionInput::Event(SessionEvent::ClockTick),
            ),
            Effect::StartTimer {
                timer: TimerKind::SpeakingSimulation,
                period,
            } => {
                let mut rng = StdRng::seed_from_u64(self.rng.gen());
                self.timers.start(
                    TimerKind::SpeakingSimulation,
                    period,
                    self.loopback.clone(),
                    move || SessionInput::Event(speaking_sample(&mut rng)),
                );
            }
            Effect::StartTimer { timer, .. } => {
                warn!("Session cannot run timer {:?}", timer);
            }
            Effect::CancelTimer { timer } => {
                self.timers.cancel(timer);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Conversation Task
// ----------------------------------------------------------------------------

/// Runs the conversation manager and its presence sweep
pub struct ConversationTask {
    manager: RuntimeConversation,
    inputs: mpsc::UnboundedReceiver<ConversationInput>,
    loopback: mpsc::UnboundedSender<ConversationInput>,
    timers: TimerScheduler,
    app_event_sender: AppEventSender,
    state: watch::Sender<ConversationSnapshot>,
}

impl ConversationTask {
    pub fn new(
        manager: RuntimeConversation,
        inputs: mpsc::UnboundedReceiver<ConversationInput>,
        loopback: mpsc::UnboundedSender<ConversationInput>,
        app_event_sender: AppEventSender,
        state: watch::Sender<ConversationSnapshot>,
    ) -> Self {
        Self {
            manager,
            inputs,
            loopback,
            timers: TimerScheduler::new(),
            app_event_sender,
            state,
        }
    }

    pub async fn run(&mut self) {
        info!("Conversation task starting");
        self.manager.start();
        self.flush();

        while let Some(input) = self.inputs.recv().await {
            let keep_running = self.handle_input(input);
            self.flush();
            if !keep_running {
                break;
            }
        }

        self.timers.cancel_all();
        info!("Conversation task stopped");
    }

    fn handle_input(&mut self, input: ConversationInput) -> bool {
        match input {
            ConversationInput::Command(command) => self.handle_command(command),
            ConversationInput::Event(event) => self.manager.handle_event(event),
            ConversationInput::Shutdown => {
                self.manager.teardown();
                return false;
            }
        }
        true
    }

    fn handle_command(&mut self, command: ConversationCommand) {
        match command {
            ConversationCommand::SendMessage {
                content,
                attachments,
            } => {
                if self.manager.send_message(&content, attachments).is_none() {
                    debug!("Nothing to send");
                }
            }
            ConversationCommand::MarkMessagesAsRead => self.manager.mark_messages_as_read(),
            ConversationCommand::SetUserTyping { is_typing } => {
                self.manager.set_user_typing(is_typing)
            }
        }
    }

    fn flush(&mut self) {
        let (effects, events) = self.manager.drain_outbox();
        for effect in effects {
            match effect {
                Effect::StartTimer {
                    timer: TimerKind::TypingSweep,
                    period,
                } => self.timers.start(
                    TimerKind::TypingSweep,
                    period,
                    self.loopback.clone(),
                    || ConversationInput::Event(ConversationEvent::SweepTick),
                ),
                Effect::StartTimer { timer, .. } => {
                    warn!("Conversation cannot run timer {:?}", timer);
                }
                Effect::CancelTimer { timer } => {
                    self.timers.cancel(timer);
                }
            }
        }
        // Subscribers read the snapshot when an event arrives
        self.state.send_replace(self.manager.snapshot());
        broadcast(&self.app_event_sender, events);
    }
}
