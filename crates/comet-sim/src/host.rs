//! A [`SimulationHost`] that runs the simulation on a local tokio task.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use comet_session::{
    BoxError, GameMode, Runner, RuntimePlayer, SimulationConfig, SimulationHost, StartRequest,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::components::PlayerRef;
use crate::input::ShipInput;
use crate::resources::AvatarRegistry;
use crate::simulation::{ShipSnapshot, Simulation};

const COMMAND_CAPACITY: usize = 16;

/// Errors reported by a [`LocalRunner`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("start cancelled")]
    Cancelled,
    #[error("slot {slot} out of range for {capacity} players")]
    SlotOutOfRange { slot: usize, capacity: u8 },
    #[error("slot {0} already has a player")]
    SlotTaken(usize),
    #[error("unknown avatar template '{0}'")]
    UnknownAvatar(String),
    #[error("runner stopped")]
    Stopped,
    #[error("runner task failed: {0}")]
    Task(String),
}

/// Supplies per-frame input for local players.
pub trait InputSource: Send + Sync {
    fn poll(&self, player: PlayerRef, frame: u64) -> ShipInput;
}

/// Input source that never presses anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn poll(&self, _player: PlayerRef, _frame: u64) -> ShipInput {
        ShipInput::default()
    }
}

/// Latest published state of a running simulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    /// Number of frames simulated so far.
    pub frame: u64,
    pub ships: Vec<ShipSnapshot>,
}

enum Command {
    AddPlayer {
        slot: usize,
        player: RuntimePlayer,
        ack: oneshot::Sender<Result<(), HostError>>,
    },
}

/// Starts [`LocalRunner`]s that tick a [`Simulation`] in-process.
pub struct LocalHost {
    input: Arc<dyn InputSource>,
    avatars: Option<AvatarRegistry>,
    telemetry: watch::Sender<Telemetry>,
}

impl LocalHost {
    pub fn new(input: Arc<dyn InputSource>) -> Self {
        let (telemetry, _) = watch::channel(Telemetry::default());
        Self {
            input,
            avatars: None,
            telemetry,
        }
    }

    /// Replace the stock avatar templates for every runner started later.
    pub fn with_avatars(mut self, avatars: AvatarRegistry) -> Self {
        self.avatars = Some(avatars);
        self
    }

    /// Telemetry published by whichever runner is currently ticking.
    pub fn telemetry(&self) -> watch::Receiver<Telemetry> {
        self.telemetry.subscribe()
    }
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new(Arc::new(IdleInput))
    }
}

#[async_trait]
impl SimulationHost for LocalHost {
    async fn start(
        &self,
        request: StartRequest,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Runner>, BoxError> {
        if cancel.is_cancelled() {
            return Err(HostError::Cancelled.into());
        }

        let runtime = request.runtime.resolved();
        let config: SimulationConfig = runtime.simulation.unwrap_or_default();
        let map = runtime.map.unwrap_or_default();
        let sim = match &self.avatars {
            Some(avatars) => Simulation::with_avatars(&config, avatars.clone()),
            None => Simulation::new(&config),
        };

        if request.mode == GameMode::Multiplayer && request.communicator.is_none() {
            warn!("multiplayer start without a communicator, running locally");
        }
        info!(
            %map,
            mode = ?request.mode,
            players = request.player_count,
            tick_rate = config.tick_rate,
            "simulation starting"
        );

        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let stop = CancellationToken::new();
        let task = tokio::spawn(run_simulation(
            sim,
            rx,
            Arc::clone(&self.input),
            self.telemetry.clone(),
            stop.clone(),
        ));

        Ok(Arc::new(LocalRunner {
            commands,
            stop,
            task: Mutex::new(Some(task)),
            player_count: request.player_count,
        }))
    }
}

/// Handle to a simulation ticking on a tokio task.
pub struct LocalRunner {
    commands: mpsc::Sender<Command>,
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    player_count: u8,
}

impl LocalRunner {
    /// Number of player slots this runner was started with.
    pub fn player_count(&self) -> u8 {
        self.player_count
    }
}

#[async_trait]
impl Runner for LocalRunner {
    async fn add_player(&self, slot: usize, player: RuntimePlayer) -> Result<(), BoxError> {
        if slot >= usize::from(self.player_count) {
            return Err(HostError::SlotOutOfRange {
                slot,
                capacity: self.player_count,
            }
            .into());
        }
        let (ack, done) = oneshot::channel();
        self.commands
            .send(Command::AddPlayer { slot, player, ack })
            .await
            .map_err(|_| HostError::Stopped)?;
        done.await.map_err(|_| HostError::Stopped)??;
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), BoxError> {
        self.stop.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.await.map_err(|e| HostError::Task(e.to_string()))?;
            info!("simulation stopped");
        }
        Ok(())
    }
}

impl Drop for LocalRunner {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn run_simulation(
    mut sim: Simulation,
    mut commands: mpsc::Receiver<Command>,
    input: Arc<dyn InputSource>,
    telemetry: watch::Sender<Telemetry>,
    stop: CancellationToken,
) {
    let period = Duration::from_secs_f32(sim.dt());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut joined: HashSet<usize> = HashSet::new();
    let mut players: Vec<PlayerRef> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            Some(command) = commands.recv() => match command {
                Command::AddPlayer { slot, player, ack } => {
                    let result = join_player(&mut sim, &mut joined, slot, &player);
                    if result.is_ok() {
                        players.push(player_ref(slot));
                    }
                    let _ = ack.send(result);
                }
            },
            _ = ticker.tick() => {
                let frame = sim.frame();
                for &player in &players {
                    sim.push_input(player, frame, input.poll(player, frame));
                }
                sim.step();
                telemetry.send_replace(Telemetry {
                    frame: sim.frame(),
                    ships: sim.ships(),
                });
            }
        }
    }
    debug!(frame = sim.frame(), "simulation loop exited");
}

fn join_player(
    sim: &mut Simulation,
    joined: &mut HashSet<usize>,
    slot: usize,
    player: &RuntimePlayer,
) -> Result<(), HostError> {
    if !sim.has_avatar(&player.avatar) {
        return Err(HostError::UnknownAvatar(player.avatar.clone()));
    }
    if !joined.insert(slot) {
        return Err(HostError::SlotTaken(slot));
    }
    sim.join(player_ref(slot), player.avatar.clone());
    info!(slot, nickname = %player.nickname, avatar = %player.avatar, "player joined");
    Ok(())
}

// Slots are bounded by a u8 player count before they reach the task.
fn player_ref(slot: usize) -> PlayerRef {
    PlayerRef(u8::try_from(slot).unwrap_or(u8::MAX))
}
