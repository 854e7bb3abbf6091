//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Hard upper bound on players per room, independent of configuration.
pub const MAX_PLAYER_COUNT: u8 = 6;

const CONFIG_FILE: &str = "config.ron";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Matchmaking/session service settings.
    pub session: SessionSettings,
    /// Deterministic simulation settings.
    pub simulation: SimulationSettings,
    /// Ship handling constants.
    pub ship: ShipSettings,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Settings used to reach the matchmaking service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionSettings {
    /// Application identifier issued by the service. Empty means unset,
    /// which makes online starts fail with a configuration error.
    pub app_id: String,
    /// Application version; clients only match with the same version.
    pub app_version: String,
    /// Region every client is pinned to, if any.
    pub fixed_region: Option<String>,
    /// Room server host.
    pub server_address: String,
    /// Room server port.
    pub server_port: u16,
    /// Requested room capacity, clamped to [`MAX_PLAYER_COUNT`].
    pub max_players: u8,
    /// TCP connect timeout for the bundled session service, in milliseconds.
    pub connect_timeout_ms: u64,
}

impl SessionSettings {
    /// Configured capacity clamped to `1..=MAX_PLAYER_COUNT`.
    pub fn player_capacity(&self) -> u8 {
        self.max_players.clamp(1, MAX_PLAYER_COUNT)
    }

    /// Whether an application identifier has been configured.
    pub fn has_app_id(&self) -> bool {
        !self.app_id.trim().is_empty()
    }
}

/// A locally configured player slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerEntry {
    /// Nickname used when no display name overrides it.
    pub nickname: String,
    /// Name of the avatar template spawned for this player.
    pub avatar: String,
}

impl Default for PlayerEntry {
    fn default() -> Self {
        Self {
            nickname: "Player".to_string(),
            avatar: "ship".to_string(),
        }
    }
}

/// Deterministic simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationSettings {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Map to load; the host default is used when unset.
    pub map: Option<String>,
    /// Players registered on this client after the runner starts.
    pub players: Vec<PlayerEntry>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            map: None,
            players: vec![PlayerEntry::default()],
        }
    }
}

/// Ship handling constants applied by the movement system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShipSettings {
    /// Forward force while accelerating.
    pub acceleration: f32,
    /// Torque applied per held turn input.
    pub turn_torque: f32,
    /// Angular speed limit in radians per second.
    pub max_angular_speed: f32,
    /// Body mass.
    pub mass: f32,
    /// Rotational inertia.
    pub inertia: f32,
}

impl Default for ShipSettings {
    fn default() -> Self {
        Self {
            acceleration: 8.0,
            turn_torque: 6.0,
            max_angular_speed: 3.0,
            mass: 1.0,
            inertia: 1.0,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            fixed_region: None,
            server_address: "127.0.0.1".to_string(),
            server_port: 5055,
            max_players: MAX_PLAYER_COUNT,
            connect_timeout_ms: 10_000,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for Comet (`<config_dir>/comet`).
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("comet"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path,
            source,
        })
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(ConfigError::Parse)
    }
}
