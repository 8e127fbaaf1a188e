//! Huddle CLI library
//!
//! Terminal front end for the Huddle meeting and chat room: argument
//! parsing, layered configuration, text rendering and the application loop
//! on top of `huddle-runtime`.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod stage;
pub mod terminal;

pub use app::{parse_attachment, HuddleApp, InputLine};
pub use cli::{Cli, Commands};
pub use config::{CliAppConfig, CliOverrides, ConfigError};
pub use error::{CliError, Result};
