//! Huddle CLI Configuration Management
//!
//! Configuration is layered with figment, later sources winning:
//! 1. Default values
//! 2. `huddle.toml` in the working directory
//! 3. `<config dir>/huddle/config.toml`
//! 4. The file passed with `--config`
//! 5. Environment variables (`HUDDLE_SESSION__DISPLAY_NAME=...`)
//!
//! Timer periods and delays are plain millisecond integers in the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use huddle_core::{ChannelConfig, ConversationConfig, HuddleConfig, SessionConfig};
use huddle_runtime::SimulationConfig;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the Huddle CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliAppConfig {
    pub session: SessionSection,
    pub conversation: ConversationSection,
    pub channels: ChannelConfig,
    pub simulation: SimulationSection,
    pub cli: CliConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    /// Name shown on the local tile and on sent messages
    pub display_name: String,
    pub duration_tick_ms: u64,
    pub speaking_tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSection {
    pub typing_staleness_ms: u64,
    pub sweep_interval_ms: u64,
    pub near_bottom_threshold_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSection {
    pub enabled: bool,
    pub seed: Option<u64>,
    pub join_delay_ms: u64,
    pub reply_delay_ms: u64,
    pub typing_delay_ms: u64,
    pub typing_duration_ms: u64,
}

/// Presentation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    pub verbose: bool,
    /// Print app events as JSON lines
    pub json_events: bool,
    /// Load the demo room's earlier messages
    pub load_history: bool,
    /// Whether the terminal "player" pretends to support picture-in-picture
    pub picture_in_picture: bool,
}

/// Values given on the command line; they win over every other layer
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub display_name: Option<String>,
    pub seed: Option<u64>,
    pub no_simulation: bool,
    pub verbose: bool,
    pub json: bool,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl Default for SessionSection {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            display_name: session.local_display_name,
            duration_tick_ms: millis(session.duration_tick),
            speaking_tick_ms: millis(session.speaking_tick),
        }
    }
}

impl Default for ConversationSection {
    fn default() -> Self {
        let conversation = ConversationConfig::default();
        Self {
            typing_staleness_ms: millis(conversation.typing_staleness),
            sweep_interval_ms: millis(conversation.sweep_interval),
            near_bottom_threshold_px: conversation.near_bottom_threshold_px,
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        let simulation = SimulationConfig::default();
        Self {
            enabled: simulation.enabled,
            seed: simulation.seed,
            join_delay_ms: millis(simulation.join_delay),
            reply_delay_ms: millis(simulation.reply_delay),
            typing_delay_ms: millis(simulation.typing_delay),
            typing_duration_ms: millis(simulation.typing_duration),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            json_events: false,
            load_history: true,
            picture_in_picture: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    /// Load configuration from every layer, with `path` as the explicit file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::extract(Self::layered(path)?)
    }

    /// Load configuration and apply command line overrides on top
    pub fn load_with_overrides(
        path: Option<&Path>,
        overrides: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Self::layered(path)?;

        if let Some(name) = &overrides.display_name {
            figment = figment.merge(("session.display_name", name));
        }
        if let Some(seed) = overrides.seed {
            figment = figment.merge(("simulation.seed", seed));
        }
        if overrides.no_simulation {
            figment = figment.merge(("simulation.enabled", false));
        }
        if overrides.verbose {
            figment = figment.merge(("cli.verbose", true));
        }
        if overrides.json {
            figment = figment.merge(("cli.json_events", true));
        }

        Self::extract(figment)
    }

    fn layered(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("huddle.toml"));

        if let Some(default_path) = Self::default_config_path() {
            figment = figment.merge(Toml::file(default_path));
        }
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::FileSystem(format!(
                    "Configuration file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.merge(Env::prefixed("HUDDLE_").split("__")))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: CliAppConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/huddle/config.toml`, if the platform has a config dir
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("huddle").join("config.toml"))
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::FileSystem(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), toml_string)
            .map_err(|e| ConfigError::FileSystem(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.huddle_config()
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Manager and channel configuration
    pub fn huddle_config(&self) -> HuddleConfig {
        HuddleConfig {
            channels: self.channels.clone(),
            session: SessionConfig {
                local_display_name: self.session.display_name.clone(),
                duration_tick: Duration::from_millis(self.session.duration_tick_ms),
                speaking_tick: Duration::from_millis(self.session.speaking_tick_ms),
            },
            conversation: ConversationConfig {
                typing_staleness: Duration::from_millis(self.conversation.typing_staleness_ms),
                sweep_interval: Duration::from_millis(self.conversation.sweep_interval_ms),
                near_bottom_threshold_px: self.conversation.near_bottom_threshold_px,
            },
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            enabled: self.simulation.enabled,
            seed: self.simulation.seed,
            join_delay: Duration::from_millis(self.simulation.join_delay_ms),
            reply_delay: Duration::from_millis(self.simulation.reply_delay_ms),
            typing_delay: Duration::from_millis(self.simulation.typing_delay_ms),
            typing_duration: Duration::from_millis(self.simulation.typing_duration_ms),
        }
    }

    /// Configuration written by `huddle config`
    pub fn example() -> Self {
        CliAppConfig {
            session: SessionSection {
                display_name: "Sam".to_string(),
                ..SessionSection::default()
            },
            simulation: SimulationSection {
                seed: Some(7),
                ..SimulationSection::default()
            },
            ..CliAppConfig::default()
        }
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::example())
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
