//! Chat Conversation
//!
//! - `message`: messages, senders and attachments
//! - `presence`: who is typing
//! - `viewport`: scroll tracking of the message list
//! - `manager`: the `ConversationManager` state machine

pub mod manager;
pub mod message;
pub mod presence;
pub mod viewport;

pub use manager::{ConversationManager, ConversationSnapshot};
pub use message::{Attachment, AttachmentKind, AttachmentUpload, Message, User};
pub use presence::{TypingEntry, TypingPresence};
pub use viewport::{ScrollMetrics, Viewport, ViewportUpdate};
