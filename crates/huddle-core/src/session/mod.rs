//! Conferencing Session
//!
//! - `participant`: roster entries and their display state
//! - `layout`: grid and clock presentation helpers
//! - `manager`: the `SessionManager` state machine

pub mod layout;
pub mod manager;
pub mod participant;

pub use layout::{format_duration, GridLayout};
pub use manager::{SessionManager, SessionSnapshot, MEDIA_ACCESS_ERROR, SCREEN_SHARE_ERROR};
pub use participant::{DisplayState, NetworkQuality, Participant};
