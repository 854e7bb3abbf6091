//! Session lifecycle controller.
//!
//! Owns the `Idle → Starting → Running → ShuttingDown → Idle` state machine
//! and the live connection/runner handles. Every operation is a sequential
//! async task; the only suspension points are the external connect, start,
//! player registration and teardown calls. Handle bookkeeping happens under a
//! short mutex that is never held across an `.await`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use comet_config::{Config, SessionSettings};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BoxError, SessionError};
use crate::params::{
    ConnectArgs, ErrorCallback, GameMode, RuntimeConfig, RuntimePlayer, SimSessionConfig,
    StartParameter, StartRequest,
};
use crate::service::{Connection, Runner, SessionService, SimulationHost};
use crate::state::{LifecycleState, LifecycleWatch};

/// Cancellation scope of one connect attempt.
struct Scope {
    attempt: u64,
    token: CancellationToken,
}

/// Handles owned by the controller between start and teardown.
#[derive(Default)]
struct LiveSession {
    scope: Option<Scope>,
    connection: Option<Arc<dyn Connection>>,
    runner: Option<Arc<dyn Runner>>,
    disconnect_watch: Option<JoinHandle<()>>,
}

/// Coordinates connect, runner start, player registration and teardown.
///
/// At most one connection and one runner are live per controller.
pub struct SessionController {
    settings: SessionSettings,
    runtime: RuntimeConfig,
    players: Vec<RuntimePlayer>,
    service: Arc<dyn SessionService>,
    host: Arc<dyn SimulationHost>,
    state: LifecycleWatch,
    live: Mutex<LiveSession>,
    next_attempt: AtomicU64,
}

impl SessionController {
    /// Create an idle controller.
    ///
    /// `runtime` is a template; every start works on its own resolved copy.
    pub fn new(
        settings: SessionSettings,
        runtime: RuntimeConfig,
        players: Vec<RuntimePlayer>,
        service: Arc<dyn SessionService>,
        host: Arc<dyn SimulationHost>,
    ) -> Self {
        Self {
            settings,
            runtime,
            players,
            service,
            host,
            state: LifecycleWatch::new(),
            live: Mutex::new(LiveSession::default()),
            next_attempt: AtomicU64::new(1),
        }
    }

    /// Create a controller from the loaded application config.
    pub fn from_config(
        config: &Config,
        service: Arc<dyn SessionService>,
        host: Arc<dyn SimulationHost>,
    ) -> Self {
        Self::new(
            config.session.clone(),
            RuntimeConfig::from_settings(&config.simulation, &config.ship),
            config.simulation.players.iter().map(RuntimePlayer::from).collect(),
            service,
            host,
        )
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Joined room name, empty when not connected.
    pub fn room_name(&self) -> String {
        self.connection().map(|c| c.room_name()).unwrap_or_default()
    }

    /// Region of the joined room, empty when not connected.
    pub fn region(&self) -> String {
        self.connection().map(|c| c.region()).unwrap_or_default()
    }

    /// Round-trip time to the service, zero when not connected.
    pub fn ping(&self) -> Duration {
        self.connection()
            .map(|c| c.round_trip_time())
            .unwrap_or_default()
    }

    /// Id of the most recent start attempt, `0` before the first one.
    ///
    /// Every start that passes validation gets a fresh id, so a caller can
    /// tell whether the session it observed has since been replaced.
    pub fn session_id(&self) -> u64 {
        self.next_attempt.load(Ordering::Relaxed).saturating_sub(1)
    }

    /// Whether a runner is currently live.
    pub fn has_runner(&self) -> bool {
        self.live().runner.is_some()
    }

    /// Start a session.
    ///
    /// Ignored unless the controller is idle. Connects to the service when
    /// `param.online`, starts the runner and registers the configured
    /// players. A single attempt is made; on failure everything created so
    /// far is torn down before the error is returned. A concurrent
    /// [`disconnect`](Self::disconnect) cancels the attempt and this call
    /// returns `Ok(())`.
    pub async fn connect(&self, param: StartParameter) -> Result<(), SessionError> {
        if !self
            .state
            .transition(LifecycleState::Idle, LifecycleState::Starting)
        {
            debug!(state = ?self.state(), "start request ignored");
            return Ok(());
        }

        if param.online && !self.settings.has_app_id() {
            self.state
                .transition(LifecycleState::Starting, LifecycleState::Idle);
            return Err(SessionError::Configuration(
                "online mode requires an application id (session.app_id)".to_string(),
            ));
        }

        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.live().scope = Some(Scope {
            attempt,
            token: token.clone(),
        });

        info!(
            attempt,
            online = param.online,
            player = %param.player_name,
            "starting session"
        );

        match self.start_session(&param, &token).await {
            Ok(()) => {
                if self.release_scope(attempt)
                    && self
                        .state
                        .transition(LifecycleState::Starting, LifecycleState::Running)
                {
                    info!(attempt, room = %self.room_name(), "session running");
                }
                Ok(())
            }
            Err(_) if token.is_cancelled() => {
                info!(attempt, "start cancelled by shutdown");
                Ok(())
            }
            Err(err) => {
                warn!(attempt, error = %err, "start failed, rolling back");
                self.release_scope(attempt);
                self.shutdown_from(&[LifecycleState::Starting]).await;
                Err(err)
            }
        }
    }

    /// Shut the session down.
    ///
    /// Cancels an in-flight start, stops the runner, then closes the
    /// connection. Teardown failures are logged, never returned; both
    /// handles are released regardless. Ignored while idle or already
    /// shutting down.
    pub async fn disconnect(&self) {
        let from = [LifecycleState::Starting, LifecycleState::Running];
        if !self.shutdown_from(&from).await {
            debug!(state = ?self.state(), "shutdown request ignored");
        }
    }

    async fn start_session(
        &self,
        param: &StartParameter,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let communicator = if param.online {
            let args = ConnectArgs::new(&self.settings, param);
            info!(
                room = ?args.room_name,
                region = ?args.region,
                max_players = args.max_players,
                "connecting to session service"
            );
            let connection = cancellable(token, self.service.connect(args, token.clone()))
                .await?
                .map_err(SessionError::Connection)?;
            self.adopt_connection(Arc::clone(&connection), token).await?;
            self.watch_disconnects(Arc::clone(&connection), param.on_error.clone());
            Some(connection)
        } else {
            None
        };

        let mut players = self.players_for(param);
        let (mode, player_count) = if param.online {
            (GameMode::Multiplayer, self.settings.player_capacity())
        } else {
            (GameMode::Local, u8::try_from(players.len().max(1)).unwrap_or(u8::MAX))
        };
        if players.len() > usize::from(player_count) {
            warn!(
                configured = players.len(),
                player_count,
                "more players configured than the session holds, dropping the extra slots"
            );
            players.truncate(usize::from(player_count));
        }
        let request = StartRequest {
            runtime: self.runtime.resolved(),
            session: SimSessionConfig::default(),
            player_count,
            mode,
            communicator,
        };

        debug!(?request, "starting simulation runner");
        let runner = cancellable(token, self.host.start(request, token.clone()))
            .await?
            .map_err(SessionError::Start)?;
        self.adopt_runner(Arc::clone(&runner), token).await?;

        for (slot, player) in players.into_iter().enumerate() {
            debug!(slot, nickname = %player.nickname, "registering player");
            cancellable(token, runner.add_player(slot, player))
                .await?
                .map_err(SessionError::Start)?;
        }
        Ok(())
    }

    /// Configured players, the first one carrying the caller's name and
    /// character choice.
    fn players_for(&self, param: &StartParameter) -> Vec<RuntimePlayer> {
        let mut players = self.players.clone();
        if let Some(first) = players.first_mut() {
            if !param.player_name.trim().is_empty() {
                first.nickname = param.player_name.clone();
            }
            if let Some(character) = &param.character {
                first.avatar = character.clone();
            }
        }
        players
    }

    /// Store a fresh connection, or close it if the attempt was cancelled
    /// while it was being created.
    async fn adopt_connection(
        &self,
        connection: Arc<dyn Connection>,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let orphan = {
            let mut live = self.live();
            if token.is_cancelled() {
                Some(connection)
            } else {
                live.connection = Some(connection);
                None
            }
        };
        match orphan {
            Some(connection) => {
                log_teardown("connection", connection.disconnect().await);
                Err(SessionError::Cancelled)
            }
            None => Ok(()),
        }
    }

    /// Store a fresh runner, or stop it if the attempt was cancelled while
    /// it was being started.
    async fn adopt_runner(
        &self,
        runner: Arc<dyn Runner>,
        token: &CancellationToken,
    ) -> Result<(), SessionError> {
        let orphan = {
            let mut live = self.live();
            if token.is_cancelled() {
                Some(runner)
            } else {
                live.runner = Some(runner);
                None
            }
        };
        match orphan {
            Some(runner) => {
                log_teardown("runner", runner.shutdown().await);
                Err(SessionError::Cancelled)
            }
            None => Ok(()),
        }
    }

    /// Forward a server-initiated disconnect to the caller's error callback.
    fn watch_disconnects(&self, connection: Arc<dyn Connection>, on_error: Option<ErrorCallback>) {
        let handle = tokio::spawn(async move {
            let reason = connection.closed().await;
            warn!(%reason, "session service closed the connection");
            if let Some(on_error) = on_error {
                on_error(SessionError::ServerDisconnect(reason));
            }
        });
        let previous = self.live().disconnect_watch.replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drop the attempt's cancellation scope if it still belongs to
    /// `attempt`. Returns `false` when a shutdown already took it.
    fn release_scope(&self, attempt: u64) -> bool {
        let mut live = self.live();
        match &live.scope {
            Some(scope) if scope.attempt == attempt => {
                live.scope = None;
                true
            }
            _ => false,
        }
    }

    /// Run a full teardown if the state is one of `from`. Returns whether
    /// this call performed it.
    async fn shutdown_from(&self, from: &[LifecycleState]) -> bool {
        let Some(left) = self.state.transition_any(from, LifecycleState::ShuttingDown) else {
            return false;
        };
        info!(from = ?left, "shutting down session");

        let (connection, runner, watch) = {
            let mut live = self.live();
            if let Some(scope) = live.scope.take() {
                scope.token.cancel();
            }
            (
                live.connection.take(),
                live.runner.take(),
                live.disconnect_watch.take(),
            )
        };

        if let Some(watch) = watch {
            watch.abort();
        }
        if let Some(runner) = runner {
            log_teardown("runner", runner.shutdown().await);
        }
        if let Some(connection) = connection {
            log_teardown("connection", connection.disconnect().await);
        }

        self.state
            .transition(LifecycleState::ShuttingDown, LifecycleState::Idle);
        info!("session shut down");
        true
    }

    fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.live().connection.clone()
    }

    fn live(&self) -> MutexGuard<'_, LiveSession> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Await `fut` unless `token` fires first.
async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, SessionError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SessionError::Cancelled),
        out = fut => Ok(out),
    }
}

fn log_teardown(what: &str, result: Result<(), BoxError>) {
    if let Err(err) = result {
        warn!(error = %err, "{what} teardown failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoService;

    #[async_trait]
    impl SessionService for NoService {
        async fn connect(
            &self,
            _args: ConnectArgs,
            _cancel: CancellationToken,
        ) -> Result<Arc<dyn Connection>, BoxError> {
            Err("unreachable".into())
        }
    }

    struct NoHost;

    #[async_trait]
    impl SimulationHost for NoHost {
        async fn start(
            &self,
            _request: StartRequest,
            _cancel: CancellationToken,
        ) -> Result<Arc<dyn Runner>, BoxError> {
            Err("no host".into())
        }
    }

    fn controller(players: Vec<RuntimePlayer>) -> SessionController {
        SessionController::new(
            SessionSettings::default(),
            RuntimeConfig::default(),
            players,
            Arc::new(NoService),
            Arc::new(NoHost),
        )
    }

    fn player(nickname: &str, avatar: &str) -> RuntimePlayer {
        RuntimePlayer {
            nickname: nickname.to_string(),
            avatar: avatar.to_string(),
        }
    }

    #[test]
    fn test_first_player_gets_name_and_character() {
        let ctl = controller(vec![player("P1", "ship"), player("P2", "ship")]);
        let param = StartParameter::local("Vera").with_character("interceptor");
        let players = ctl.players_for(&param);
        assert_eq!(players[0], player("Vera", "interceptor"));
        assert_eq!(players[1], player("P2", "ship"));
    }

    #[test]
    fn test_blank_name_keeps_configured_nickname() {
        let ctl = controller(vec![player("P1", "ship")]);
        let players = ctl.players_for(&StartParameter::local("  "));
        assert_eq!(players[0].nickname, "P1");
    }

    #[test]
    fn test_status_defaults_when_disconnected() {
        let ctl = controller(vec![]);
        assert_eq!(ctl.room_name(), "");
        assert_eq!(ctl.region(), "");
        assert_eq!(ctl.ping(), Duration::ZERO);
        assert!(!ctl.has_runner());
    }

    #[test]
    fn test_release_scope_only_for_owner() {
        let ctl = controller(vec![]);
        ctl.live().scope = Some(Scope {
            attempt: 7,
            token: CancellationToken::new(),
        });
        assert!(!ctl.release_scope(6));
        assert!(ctl.release_scope(7));
        assert!(!ctl.release_scope(7));
    }

    #[tokio::test]
    async fn test_start_error_returns_to_idle() {
        let ctl = controller(vec![player("P1", "ship")]);
        let result = ctl.connect(StartParameter::local("Vera")).await;
        assert!(matches!(result, Err(SessionError::Start(_))));
        assert_eq!(ctl.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_session_id_advances_per_validated_start() {
        let ctl = controller(vec![player("P1", "ship")]);
        assert_eq!(ctl.session_id(), 0);

        let _ = ctl.connect(StartParameter::online("Vera")).await;
        assert_eq!(ctl.session_id(), 0, "rejected before an attempt was made");

        let _ = ctl.connect(StartParameter::local("Vera")).await;
        assert_eq!(ctl.session_id(), 1);
        let _ = ctl.connect(StartParameter::local("Vera")).await;
        assert_eq!(ctl.session_id(), 2);
    }

    #[tokio::test]
    async fn test_disconnect_while_idle_is_noop() {
        let ctl = controller(vec![]);
        ctl.disconnect().await;
        assert_eq!(ctl.state(), LifecycleState::Idle);
    }
}
