//! Runtime Builder API
//!
//! Wires the managers to their capabilities, spawns the tasks and hands
//! back a `RuntimeHandle` for sending commands, injecting inbound events
//! and observing app events and state snapshots.

use std::sync::Arc;

use core::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use huddle_core::channel::{
    create_app_event_channel, create_command_channel, create_event_channel, AppEventReceiver,
    AppEventSender, CommandSender, EventSender,
};
use huddle_core::{
    Command, ConversationManager, ConversationSnapshot, Event, HuddleConfig, HuddleError,
    HuddleResult, Message, SessionManager, SessionSnapshot, SyntheticMediaDevices, User,
    UuidIdGenerator,
};

use crate::clock::TokioTimeSource;
use crate::simulation::{DemoScript, EventSource, SimulationConfig, SimulationTask};
use crate::tasks::{
    ConversationTask, IngressTask, SessionTask, SharedDevices, SharedIds, SharedTimeSource,
};

/// How long `shutdown` waits for a task before aborting it
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Id of the chat user the local participant speaks as
pub const CURRENT_USER_ID: &str = "current-user";

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder for a runtime hosting one session and one chat room
pub struct RuntimeBuilder {
    config: HuddleConfig,
    devices: Option<SharedDevices>,
    time_source: Option<SharedTimeSource>,
    ids: Option<SharedIds>,
    current_user: Option<User>,
    history: Vec<Message>,
    simulation: SimulationConfig,
    event_source: Option<Box<dyn EventSource>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: HuddleConfig::default(),
            devices: None,
            time_source: None,
            ids: None,
            current_user: None,
            history: Vec::new(),
            simulation: SimulationConfig::default(),
            event_source: None,
        }
    }

    pub fn with_config(mut self, config: HuddleConfig) -> Self {
        self.config = config;
        self
    }

    /// Media acquisition; synthetic devices by default
    pub fn with_devices(mut self, devices: SharedDevices) -> Self {
        self.devices = Some(devices);
        self
    }

    /// Clock for timestamps and staleness; follows the tokio clock by default
    pub fn with_time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Message and attachment ids; random UUIDs by default
    pub fn with_id_generator(mut self, ids: SharedIds) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Chat identity of the local user; named after the local participant
    /// by default
    pub fn with_current_user(mut self, user: User) -> Self {
        self.current_user = Some(user);
        self
    }

    /// Earlier messages of the room, loaded as read
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Replace the demo script with another event source
    pub fn with_event_source(mut self, source: impl EventSource) -> Self {
        self.event_source = Some(Box::new(source));
        self
    }

    /// Build and start the runtime
    pub async fn build_and_start(self) -> HuddleResult<RuntimeHandle> {
        self.config.validate()?;
        info!("Building Huddle runtime");

        let devices = self
            .devices
            .unwrap_or_else(|| Arc::new(SyntheticMediaDevices::new()));
        let time_source = self
            .time_source
            .unwrap_or_else(|| Arc::new(TokioTimeSource::new()));
        let ids = self.ids.unwrap_or_else(|| Arc::new(UuidIdGenerator));
        let current_user = self.current_user.unwrap_or_else(|| {
            User::new(CURRENT_USER_ID, self.config.session.local_display_name.clone())
        });

        // Public channels
        let channels = &self.config.channels;
        let (command_sender, command_receiver) = create_command_channel(channels);
        let (event_sender, event_receiver) = create_event_channel(channels);
        let (app_event_sender, app_event_receiver) = create_app_event_channel(channels);

        // Per-manager queues
        let (session_sender, session_inputs) = mpsc::unbounded_channel();
        let (conversation_sender, conversation_inputs) = mpsc::unbounded_channel();

        let session = SessionManager::new(
            self.config.session.clone(),
            devices,
            time_source.clone(),
        );
        let conversation = ConversationManager::new(
            self.config.conversation.clone(),
            current_user,
            time_source,
            ids,
        )
        .with_history(self.history);

        let (session_state, session_state_receiver) = watch::channel(session.snapshot());
        let (conversation_state, conversation_state_receiver) =
            watch::channel(conversation.snapshot());

        // Subscribe before any manager runs so no app event is missed
        let event_source = match self.event_source {
            Some(source) => Some(source),
            None if self.simulation.enabled => {
                Some(Box::new(DemoScript::new(self.simulation.clone())) as Box<dyn EventSource>)
            }
            None => None,
        };
        let simulation_handle = event_source.map(|source| {
            let mut task = SimulationTask::new(
                source,
                app_event_sender.subscribe(),
                event_sender.clone(),
            );
            tokio::spawn(async move { task.run().await })
        });

        let mut session_task = SessionTask::new(
            session,
            session_inputs,
            session_sender.clone(),
            self.simulation.rng(),
            app_event_sender.clone(),
            session_state,
        );
        let mut conversation_task = ConversationTask::new(
            conversation,
            conversation_inputs,
            conversation_sender.clone(),
            app_event_sender.clone(),
            conversation_state,
        );
        let mut ingress_task = IngressTask::new(
            command_receiver,
            event_receiver,
            session_sender,
            conversation_sender,
        );

        let task_handles = vec![
            tokio::spawn(async move { ingress_task.run().await }),
            tokio::spawn(async move { session_task.run().await }),
            tokio::spawn(async move { conversation_task.run().await }),
        ];

        info!("Huddle runtime started");

        Ok(RuntimeHandle {
            command_sender,
            event_sender,
            app_event_sender,
            app_event_receiver: Some(app_event_receiver),
            session_state: session_state_receiver,
            conversation_state: conversation_state_receiver,
            task_handles,
            simulation_handle,
            running: true,
        })
    }
}

// ----------------------------------------------------------------------------
// Runtime Handle
// ----------------------------------------------------------------------------

/// Handle to a running runtime
pub struct RuntimeHandle {
    command_sender: CommandSender,
    event_sender: EventSender,
    app_event_sender: AppEventSender,
    app_event_receiver: Option<AppEventReceiver>,
    session_state: watch::Receiver<SessionSnapshot>,
    conversation_state: watch::Receiver<ConversationSnapshot>,
    task_handles: Vec<JoinHandle<()>>,
    simulation_handle: Option<JoinHandle<()>>,
    running: bool,
}

impl RuntimeHandle {
    pub fn command_sender(&self) -> CommandSender {
        self.command_sender.clone()
    }

    /// Sender for inbound events from a signaling layer
    pub fn event_sender(&self) -> EventSender {
        self.event_sender.clone()
    }

    /// Take the app event receiver created with the runtime (only once).
    /// It holds every app event since startup.
    pub fn take_app_event_receiver(&mut self) -> Option<AppEventReceiver> {
        self.app_event_receiver.take()
    }

    /// A new receiver for app events published from now on
    pub fn subscribe(&self) -> AppEventReceiver {
        self.app_event_sender.subscribe()
    }

    pub fn session_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.session_state.clone()
    }

    pub fn conversation_state(&self) -> watch::Receiver<ConversationSnapshot> {
        self.conversation_state.clone()
    }

    pub async fn send_command(&self, command: impl Into<Command>) -> HuddleResult<()> {
        self.command_sender
            .send(command.into())
            .await
            .map_err(|_| HuddleError::channel("Failed to send command to runtime"))
    }

    pub async fn inject_event(&self, event: impl Into<Event>) -> HuddleResult<()> {
        self.event_sender
            .send(event.into())
            .await
            .map_err(|_| HuddleError::channel("Failed to send event to runtime"))
    }

    pub fn is_running(&self) -> bool {
        self.running && self.task_handles.iter().all(|h| !h.is_finished())
    }

    /// Wait until the manager tasks stop
    pub async fn wait(&mut self) -> HuddleResult<()> {
        for handle in self.task_handles.drain(..) {
            handle
                .await
                .map_err(|e| HuddleError::channel(format!("Runtime task panicked: {}", e)))?;
        }
        Ok(())
    }

    /// End the meeting, tear the room down and stop every task
    pub async fn shutdown(&mut self) -> HuddleResult<()> {
        info!("Shutting down Huddle runtime");

        let _ = self.command_sender.send(Command::Shutdown).await;

        for mut handle in self.task_handles.drain(..) {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                warn!("Runtime task did not stop in time, aborting");
                handle.abort();
            }
        }
        if let Some(handle) = self.simulation_handle.take() {
            handle.abort();
        }

        self.running = false;
        info!("Huddle runtime shut down");
        Ok(())
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        for handle in &self.task_handles {
            handle.abort();
        }
        if let Some(handle) = &self.simulation_handle {
            handle.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Convenience Functions
// ----------------------------------------------------------------------------

/// Runtime without scripted events, for tests and embedding
pub async fn create_quiet_runtime(config: HuddleConfig) -> HuddleResult<RuntimeHandle> {
    RuntimeBuilder::new()
        .with_config(config)
        .with_simulation(SimulationConfig::disabled())
        .build_and_start()
        .await
}

/// Runtime running the demo script with the demo room history
pub async fn create_demo_runtime(
    config: HuddleConfig,
    simulation: SimulationConfig,
) -> HuddleResult<RuntimeHandle> {
    let history = DemoScript::history(huddle_core::Timestamp::now());
    RuntimeBuilder::new()
        .with_config(config)
        .with_history(history)
        .with_simulation(simulation)
        .build_and_start()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runtime_builder() {
        let mut runtime = create_quiet_runtime(HuddleConfig::testing())
            .await
            .expect("Failed to build runtime");
        assert!(runtime.is_running());

        runtime
            .send_command(huddle_core::SessionCommand::ToggleAudio)
            .await
            .expect("Failed to send command");

        runtime.shutdown().await.expect("Failed to shutdown");
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_app_event_receiver_taken_once() {
        let mut runtime = create_quiet_runtime(HuddleConfig::testing())
            .await
            .expect("Failed to build runtime");

        assert!(runtime.take_app_event_receiver().is_some());
        assert!(runtime.take_app_event_receiver().is_none());

        runtime.shutdown().await.expect("Failed to shutdown");
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = HuddleConfig::testing();
        config.channels.command_buffer_size = 0;
        assert!(RuntimeBuilder::new()
            .with_config(config)
            .build_and_start()
            .await
            .is_err());
    }
}
