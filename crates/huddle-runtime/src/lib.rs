//! Huddle Runtime
//!
//! Hosts the `huddle-core` managers on tokio:
//! - `IngressTask` routes commands and inbound events to the manager tasks
//! - `SessionTask` and `ConversationTask` own one manager each and execute
//!   its timer effects
//! - `SimulationTask` stands in for a signaling layer with scripted events
//!
//! `RuntimeBuilder` assembles everything and returns a `RuntimeHandle`.

pub mod builder;
pub mod clock;
pub mod scheduler;
pub mod simulation;
pub mod tasks;

pub use builder::{
    create_demo_runtime, create_quiet_runtime, RuntimeBuilder, RuntimeHandle, CURRENT_USER_ID,
};
pub use clock::TokioTimeSource;
pub use scheduler::TimerScheduler;
pub use simulation::{
    speaking_sample, DemoScript, EventSource, Quiet, ScheduledEvent, SimulationConfig,
    SimulationTask,
};
pub use tasks::{
    ConversationInput, ConversationTask, IngressTask, RuntimeConversation, RuntimeSession,
    SessionInput, SessionTask, SharedDevices, SharedIds, SharedTimeSource,
};

// Re-export core types for convenience
pub use huddle_core::{
    channel::{AppEventReceiver, AppEventSender, CommandSender, EventSender},
    AppEvent, Command, ConversationCommand, ConversationEvent, ConversationSnapshot, Event,
    HuddleConfig, HuddleError, HuddleResult, SessionCommand, SessionEvent, SessionSnapshot,
};
