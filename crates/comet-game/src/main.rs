//! Comet: a headless asteroids session client.
//!
//! Loads `config.ron`, wires the room-server client and the local
//! simulation host into the session controller, then drives the start menu
//! the way a player would: start, fly for a while, disconnect.
//!
//! Run with: `cargo run -p comet-game -- --ticks 600`

mod autopilot;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use comet_config::{
    CliArgs, Config, ConfigError, FileSettingsStore, MemorySettingsStore, SettingsStore,
};
use comet_menu::{Preferences, StartMenu, UiEvent, Widget};
use comet_net::{NetConfig, TcpSessionService};
use comet_session::{LifecycleState, Popup, SessionController};
use comet_sim::{LocalHost, Telemetry};
use tracing::{error, info, warn};

use crate::autopilot::Autopilot;

const PREFERENCES_FILE: &str = "preferences.ron";

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .map(Ok)
        .unwrap_or_else(Config::default_dir);
    let (mut config, config_error) = match &config_dir {
        Ok(dir) => match Config::load_or_create(dir) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        Err(_) => (Config::default(), None),
    };
    config.apply_cli_overrides(&args);

    let config_dir = config_dir.ok();
    comet_log::init_logging(config_dir.as_deref(), cfg!(debug_assertions), Some(&config));
    if let Some(e) = config_error {
        warn!(error = %e, "config unreadable, using defaults");
    }

    info!("Comet {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Server: {}:{} | Tick rate: {} | Players: {}",
        config.session.server_address,
        config.session.server_port,
        config.simulation.tick_rate,
        config.simulation.players.len(),
    );

    let host = Arc::new(LocalHost::new(Arc::new(Autopilot::default())));
    let (menu, mut telemetry) = build_menu(&config, config_dir, host);
    apply_start_options(&menu, &args).await;

    let start = if args.online {
        Widget::StartOnlineButton
    } else {
        Widget::StartLocalButton
    };
    if let Err(e) = menu.handle(UiEvent::Clicked(start)).await {
        error!(error = %e, "could not start session");
        return ExitCode::FAILURE;
    }
    info!(status = %menu.view().status, "session running");

    run_until_done(&menu, &mut telemetry, args.ticks).await;

    if let Err(e) = menu.handle(UiEvent::Clicked(Widget::DisconnectButton)).await {
        warn!(error = %e, "disconnect reported an error");
    }
    info!("Goodbye");
    ExitCode::SUCCESS
}

fn build_menu(
    config: &Config,
    config_dir: Option<PathBuf>,
    host: Arc<LocalHost>,
) -> (StartMenu, tokio::sync::watch::Receiver<Telemetry>) {
    let telemetry = host.telemetry();
    let service = Arc::new(TcpSessionService::new(NetConfig::from_settings(
        &config.session,
    )));
    let controller = Arc::new(SessionController::from_config(config, service, host));
    let preferences = Preferences::new(open_store(config_dir));
    (
        StartMenu::new(controller, Arc::new(Popup::new()), preferences),
        telemetry,
    )
}

fn open_store(config_dir: Option<PathBuf>) -> Box<dyn SettingsStore> {
    let opened: Result<FileSettingsStore, ConfigError> = config_dir
        .ok_or(ConfigError::NoConfigDir)
        .and_then(|dir| FileSettingsStore::open(dir.join(PREFERENCES_FILE)));
    match opened {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "preferences will not be saved");
            Box::new(MemorySettingsStore::new())
        }
    }
}

/// Feed CLI start options through the menu as if typed into its fields.
async fn apply_start_options(menu: &StartMenu, args: &CliArgs) {
    let fields = [
        (Widget::PlayerNameField, &args.name),
        (Widget::RoomField, &args.room),
        (Widget::RegionField, &args.region),
        (Widget::CharacterField, &args.character),
    ];
    for (widget, value) in fields {
        if let Some(value) = value {
            let _ = menu
                .handle(UiEvent::TextChanged(widget, value.clone()))
                .await;
        }
    }
}

/// Tick until `ticks` frames ran (0 = forever), Ctrl-C, or the session
/// ends on its own. Session errors surfaced in the popup are logged and
/// acknowledged so the menu can finish tearing down.
async fn run_until_done(
    menu: &StartMenu,
    telemetry: &mut tokio::sync::watch::Receiver<Telemetry>,
    ticks: u64,
) {
    let mut state = menu.controller().subscribe();
    let mut report = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            changed = state.changed() => {
                let current = *state.borrow_and_update();
                if changed.is_err() || current == LifecycleState::Idle {
                    info!("session ended");
                    break;
                }
            }
            changed = telemetry.changed() => {
                let frame = telemetry.borrow_and_update().frame;
                if changed.is_err() || (ticks > 0 && frame >= ticks) {
                    info!(frame, "tick budget reached");
                    break;
                }
            }
            _ = report.tick() => {
                let snapshot = telemetry.borrow().clone();
                log_telemetry(menu, &snapshot);
                if let Some(message) = menu.popup().current() {
                    warn!(%message, "session error");
                    let _ = menu.handle(UiEvent::Clicked(Widget::PopupOkButton)).await;
                }
            }
        }
    }
}

fn log_telemetry(menu: &StartMenu, telemetry: &Telemetry) {
    info!(frame = telemetry.frame, status = %menu.view().status, "tick");
    for ship in &telemetry.ships {
        info!(
            player = ship.player.0,
            "pos=({:.2}, {:.2}) rot={:.2} speed={:.2} spin={:.2}",
            ship.position.x,
            ship.position.y,
            ship.rotation,
            ship.velocity.length(),
            ship.angular_velocity,
        );
    }
}
