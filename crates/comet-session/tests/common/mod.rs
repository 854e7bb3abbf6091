//! In-memory fakes of the session service and simulation host.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use comet_config::SessionSettings;
use comet_session::{
    BoxError, ConnectArgs, Connection, LifecycleState, Runner, RuntimeConfig, RuntimePlayer,
    SessionController, SessionService, SimulationHost, StartRequest,
};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;

/// How a fake external call behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    /// Suspend until the cancellation token fires.
    Hang,
}

pub struct FakeConnection {
    live: Arc<AtomicUsize>,
    closed_rx: watch::Receiver<Option<String>>,
    fail_disconnect: bool,
    pub disconnects: AtomicUsize,
}

#[async_trait]
impl Connection for FakeConnection {
    fn room_name(&self) -> String {
        "belt-7".to_string()
    }

    fn region(&self) -> String {
        "eu".to_string()
    }

    fn round_trip_time(&self) -> Duration {
        Duration::from_millis(42)
    }

    async fn closed(&self) -> String {
        let mut rx = self.closed_rx.clone();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    async fn disconnect(&self) -> Result<(), BoxError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
        if self.fail_disconnect {
            Err("socket already gone".into())
        } else {
            Ok(())
        }
    }
}

pub struct FakeService {
    pub behavior: Behavior,
    pub fail_disconnect: bool,
    pub connects: AtomicUsize,
    pub live: Arc<AtomicUsize>,
    pub last_args: Mutex<Option<ConnectArgs>>,
    close_tx: watch::Sender<Option<String>>,
}

impl FakeService {
    pub fn new(behavior: Behavior) -> Self {
        let (close_tx, _) = watch::channel(None);
        Self {
            behavior,
            fail_disconnect: false,
            connects: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            last_args: Mutex::new(None),
            close_tx,
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Simulate the server dropping every connection it handed out.
    pub fn drop_connections(&self, reason: &str) {
        self.close_tx.send_replace(Some(reason.to_string()));
    }
}

#[async_trait]
impl SessionService for FakeService {
    async fn connect(
        &self,
        args: ConnectArgs,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Connection>, BoxError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().unwrap() = Some(args);
        match self.behavior {
            Behavior::Succeed => {
                self.live.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(FakeConnection {
                    live: Arc::clone(&self.live),
                    closed_rx: self.close_tx.subscribe(),
                    fail_disconnect: self.fail_disconnect,
                    disconnects: AtomicUsize::new(0),
                }))
            }
            Behavior::Fail => Err("room server unreachable".into()),
            Behavior::Hang => {
                cancel.cancelled().await;
                Err("cancelled".into())
            }
        }
    }
}

pub struct FakeRunner {
    live: Arc<AtomicUsize>,
    players: Arc<Mutex<Vec<(usize, RuntimePlayer)>>>,
    shutdowns: Arc<AtomicUsize>,
    registrations: Arc<AtomicUsize>,
    add_player: Behavior,
    fail_shutdown: bool,
    shutdown_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl Runner for FakeRunner {
    async fn add_player(&self, slot: usize, player: RuntimePlayer) -> Result<(), BoxError> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        match self.add_player {
            Behavior::Succeed => {
                self.players.lock().unwrap().push((slot, player));
                Ok(())
            }
            Behavior::Fail => Err("slot rejected".into()),
            // The runner has no token of its own; the controller drops this
            // future when the attempt is cancelled.
            Behavior::Hang => std::future::pending().await,
        }
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.shutdown_gate {
            gate.notified().await;
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        if self.fail_shutdown {
            Err("runner crashed during shutdown".into())
        } else {
            Ok(())
        }
    }
}

pub struct FakeHost {
    pub behavior: Behavior,
    pub add_player: Behavior,
    pub fail_shutdown: bool,
    pub shutdown_gate: Option<Arc<Notify>>,
    pub starts: AtomicUsize,
    pub live: Arc<AtomicUsize>,
    pub shutdowns: Arc<AtomicUsize>,
    pub registrations: Arc<AtomicUsize>,
    pub players: Arc<Mutex<Vec<(usize, RuntimePlayer)>>>,
    pub last_request: Mutex<Option<StartRequest>>,
}

impl FakeHost {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            add_player: Behavior::Succeed,
            fail_shutdown: false,
            shutdown_gate: None,
            starts: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
            registrations: Arc::new(AtomicUsize::new(0)),
            players: Arc::new(Mutex::new(Vec::new())),
            last_request: Mutex::new(None),
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// Number of `add_player` calls, including ones still suspended.
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn players(&self) -> Vec<(usize, RuntimePlayer)> {
        self.players.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> StartRequest {
        self.last_request
            .lock()
            .unwrap()
            .clone()
            .expect("start was never called")
    }
}

#[async_trait]
impl SimulationHost for FakeHost {
    async fn start(
        &self,
        request: StartRequest,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Runner>, BoxError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        match self.behavior {
            Behavior::Succeed => {
                self.live.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(FakeRunner {
                    live: Arc::clone(&self.live),
                    players: Arc::clone(&self.players),
                    shutdowns: Arc::clone(&self.shutdowns),
                    registrations: Arc::clone(&self.registrations),
                    add_player: self.add_player,
                    fail_shutdown: self.fail_shutdown,
                    shutdown_gate: self.shutdown_gate.clone(),
                }))
            }
            Behavior::Fail => Err("map failed to load".into()),
            Behavior::Hang => {
                cancel.cancelled().await;
                Err("cancelled".into())
            }
        }
    }
}

pub fn player(nickname: &str) -> RuntimePlayer {
    RuntimePlayer {
        nickname: nickname.to_string(),
        avatar: "ship".to_string(),
    }
}

pub fn settings_with_app_id() -> SessionSettings {
    SessionSettings {
        app_id: "test-app".to_string(),
        max_players: 4,
        ..Default::default()
    }
}

pub fn controller(
    settings: SessionSettings,
    players: Vec<RuntimePlayer>,
    service: &Arc<FakeService>,
    host: &Arc<FakeHost>,
) -> Arc<SessionController> {
    Arc::new(SessionController::new(
        settings,
        RuntimeConfig::default(),
        players,
        Arc::clone(service) as Arc<dyn SessionService>,
        Arc::clone(host) as Arc<dyn SimulationHost>,
    ))
}

/// Wait (bounded) until the controller reaches `state`.
pub async fn wait_for_state(controller: &SessionController, state: LifecycleState) {
    let mut rx = controller.subscribe();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if *rx.borrow_and_update() == state {
                return;
            }
            rx.changed().await.expect("lifecycle watch closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("controller never reached {state:?}"));
}
