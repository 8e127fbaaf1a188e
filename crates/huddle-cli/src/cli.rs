//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print app events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,

    /// Seed for the simulated speaking activity
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable the scripted participants, replies and typing
    #[arg(long)]
    pub no_simulation: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Join a simulated meeting
    Meeting {
        /// Your display name
        #[arg(short, long)]
        name: Option<String>,
        /// Leave after this many seconds (runs until Ctrl-C otherwise)
        #[arg(short, long)]
        duration: Option<u64>,
        /// Start sharing the screen right after joining
        #[arg(long)]
        share_screen: bool,
        /// Simulate a refused camera and microphone permission
        #[arg(long)]
        deny_media: bool,
    },
    /// Send messages to the simulated chat room and show what follows
    Chat {
        /// Your display name
        #[arg(short, long)]
        name: Option<String>,
        /// Attach a file given as NAME:MIME:BYTES
        #[arg(short, long)]
        attach: Vec<String>,
        /// Seconds to keep listening after the last message
        #[arg(short, long, default_value_t = 7)]
        wait: u64,
        /// Messages to send, in order
        messages: Vec<String>,
    },
    /// Join the meeting and chat, reading commands from stdin
    Interactive {
        /// Your display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Print an example configuration file
    Config {
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}
