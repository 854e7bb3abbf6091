//! Value objects passed into and out of the session lifecycle.

use std::fmt;
use std::sync::Arc;

use comet_config::{PlayerEntry, SessionSettings, ShipSettings, SimulationSettings};

use crate::error::SessionError;
use crate::service::Connection;

/// Map loaded when the runtime config does not name one.
pub const DEFAULT_MAP: &str = "asteroid-field";

/// Callback receiving asynchronous session errors (server disconnects).
pub type ErrorCallback = Arc<dyn Fn(SessionError) + Send + Sync>;

/// A connection request. Immutable once handed to
/// [`SessionController::connect`](crate::SessionController::connect).
#[derive(Clone)]
pub struct StartParameter {
    /// Join an online room (`true`) or run a local session.
    pub online: bool,
    /// Whether the room is listed for matchmaking.
    pub visible: bool,
    /// Display name for the first local player.
    pub player_name: String,
    /// Room to join or create; matchmaking picks one when `None`.
    pub room_name: Option<String>,
    /// Preferred region; the configured fixed region applies when `None`.
    pub region: Option<String>,
    /// Avatar template override for the first local player.
    pub character: Option<String>,
    /// Receives errors that arrive after `connect` returned.
    pub on_error: Option<ErrorCallback>,
}

impl StartParameter {
    /// Local session for `player_name`.
    pub fn local(player_name: impl Into<String>) -> Self {
        Self {
            online: false,
            visible: false,
            player_name: player_name.into(),
            room_name: None,
            region: None,
            character: None,
            on_error: None,
        }
    }

    /// Visible online session for `player_name`.
    pub fn online(player_name: impl Into<String>) -> Self {
        Self {
            online: true,
            visible: true,
            ..Self::local(player_name)
        }
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room_name = Some(room.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_character(mut self, character: impl Into<String>) -> Self {
        self.character = Some(character.into());
        self
    }

    pub fn with_error_callback(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }
}

impl fmt::Debug for StartParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartParameter")
            .field("online", &self.online)
            .field("visible", &self.visible)
            .field("player_name", &self.player_name)
            .field("room_name", &self.room_name)
            .field("region", &self.region)
            .field("character", &self.character)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Arguments for [`SessionService::connect`](crate::SessionService::connect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectArgs {
    pub app_id: String,
    pub app_version: String,
    pub server_address: String,
    pub server_port: u16,
    /// `None` asks the service to pick or create a room.
    pub room_name: Option<String>,
    pub region: Option<String>,
    pub max_players: u8,
    pub visible: bool,
    /// Authentication user id; the player's display name.
    pub user_id: String,
}

impl ConnectArgs {
    /// Combine configured server settings with a start request.
    pub fn new(settings: &SessionSettings, param: &StartParameter) -> Self {
        Self {
            app_id: settings.app_id.trim().to_string(),
            app_version: settings.app_version.clone(),
            server_address: settings.server_address.clone(),
            server_port: settings.server_port,
            room_name: param.room_name.clone().filter(|r| !r.trim().is_empty()),
            region: param
                .region
                .clone()
                .filter(|r| !r.trim().is_empty())
                .or_else(|| settings.fixed_region.clone()),
            max_players: settings.player_capacity(),
            visible: param.visible,
            user_id: param.player_name.clone(),
        }
    }
}

/// Whether the runner synchronizes with remote peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Multiplayer,
    Local,
}

/// Gameplay constants handed to the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub tick_rate: u32,
    pub ship: ShipSettings,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: SimulationSettings::default().tick_rate,
            ship: ShipSettings::default(),
        }
    }
}

/// Per-start runtime configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConfig {
    pub map: Option<String>,
    pub simulation: Option<SimulationConfig>,
}

impl RuntimeConfig {
    /// Build the template from loaded settings.
    pub fn from_settings(simulation: &SimulationSettings, ship: &ShipSettings) -> Self {
        Self {
            map: simulation.map.clone(),
            simulation: Some(SimulationConfig {
                tick_rate: simulation.tick_rate,
                ship: ship.clone(),
            }),
        }
    }

    /// Independent copy with every optional field filled in.
    pub fn resolved(&self) -> Self {
        Self {
            map: Some(self.map.clone().unwrap_or_else(|| DEFAULT_MAP.to_string())),
            simulation: Some(self.simulation.clone().unwrap_or_default()),
        }
    }
}

/// Session-level settings of the runner. Fixed for every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimSessionConfig {
    /// Frames of local input delay.
    pub input_delay_frames: u32,
    /// Frames the runner may roll back.
    pub rollback_window: u32,
}

impl Default for SimSessionConfig {
    fn default() -> Self {
        Self {
            input_delay_frames: 2,
            rollback_window: 8,
        }
    }
}

/// Player record registered with a started runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePlayer {
    pub nickname: String,
    /// Avatar template spawned when the player joins.
    pub avatar: String,
}

impl From<&PlayerEntry> for RuntimePlayer {
    fn from(entry: &PlayerEntry) -> Self {
        Self {
            nickname: entry.nickname.clone(),
            avatar: entry.avatar.clone(),
        }
    }
}

/// Everything [`SimulationHost::start`](crate::SimulationHost::start) needs.
#[derive(Clone)]
pub struct StartRequest {
    pub runtime: RuntimeConfig,
    pub session: SimSessionConfig,
    pub player_count: u8,
    pub mode: GameMode,
    /// Connection bridged into the runner's transport when online.
    pub communicator: Option<Arc<dyn Connection>>,
}

impl fmt::Debug for StartRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartRequest")
            .field("runtime", &self.runtime)
            .field("session", &self.session)
            .field("player_count", &self.player_count)
            .field("mode", &self.mode)
            .field("communicator", &self.communicator.is_some())
            .finish()
    }
}
