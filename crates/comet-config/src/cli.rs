//! Command-line argument parsing for the Comet client.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Comet command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "comet", about = "Asteroids-style deterministic session demo")]
pub struct CliArgs {
    /// Join an online room instead of running a local session.
    #[arg(long)]
    pub online: bool,

    /// Player display name (saved as a preference).
    #[arg(long)]
    pub name: Option<String>,

    /// Room to join or create. Matchmaking picks one when omitted.
    #[arg(long)]
    pub room: Option<String>,

    /// Preferred region.
    #[arg(long)]
    pub region: Option<String>,

    /// Avatar template for the first local player.
    #[arg(long)]
    pub character: Option<String>,

    /// Application identifier for the session service.
    #[arg(long)]
    pub app_id: Option<String>,

    /// Room server address.
    #[arg(long)]
    pub server: Option<String>,

    /// Room server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of simulation ticks to run before disconnecting (0 = until Ctrl-C).
    #[arg(long, default_value_t = 600)]
    pub ticks: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    ///
    /// Only settings that live in `config.ron` are touched here; per-start
    /// values (name, room, region, character) are read by the menu.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref app_id) = args.app_id {
            self.session.app_id = app_id.clone();
        }
        if let Some(ref addr) = args.server {
            self.session.server_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.session.server_port = port;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            app_id: Some("abc-123".to_string()),
            server: Some("10.0.0.7".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.session.app_id, "abc-123");
        assert_eq!(config.session.server_address, "10.0.0.7");
        assert_eq!(config.session.server_port, 5055);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_start_options() {
        let args = CliArgs::parse_from([
            "comet", "--online", "--name", "Vera", "--room", "belt-7", "--ticks", "0",
        ]);
        assert!(args.online);
        assert_eq!(args.name.as_deref(), Some("Vera"));
        assert_eq!(args.room.as_deref(), Some("belt-7"));
        assert_eq!(args.ticks, 0);
        assert!(args.region.is_none());
    }
}
