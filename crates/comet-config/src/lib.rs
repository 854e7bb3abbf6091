//! Configuration system for the Comet asteroids sample.
//!
//! Runtime settings persist to disk as RON files and can be overridden from
//! the command line. Player preferences (name, region, mute) go through the
//! [`SettingsStore`] key/value interface instead of ambient global storage.

mod cli;
mod config;
mod error;
mod settings;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, MAX_PLAYER_COUNT, PlayerEntry, SessionSettings, ShipSettings,
    SimulationSettings,
};
pub use error::ConfigError;
pub use settings::{FileSettingsStore, MemorySettingsStore, SettingsStore};
