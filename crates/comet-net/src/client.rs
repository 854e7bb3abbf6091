//! [`SessionService`] that joins rooms on a TCP room server.
//!
//! After the `JoinRoom`/`RoomJoined` handshake the connection runs two
//! background tasks: a reader that answers server pings, records RTT from
//! pongs and watches for kicks, and a heartbeat that pings on an interval
//! and gives up when the server goes quiet. A server-side close publishes
//! its reason on a [`watch`] channel read by [`Connection::closed`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use comet_config::SessionSettings;
use comet_session::{BoxError, ConnectArgs, Connection, SessionService};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::framing::FrameConfig;
use crate::messages::{
    JoinRoom, Leave, Message, MessageError, Ping, Pong, read_message, write_message,
};

/// Timing and framing settings for room-server connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetConfig {
    /// Upper bound on TCP connect plus join handshake.
    pub connect_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Silence after which the server is considered gone.
    pub heartbeat_timeout: Duration,
    pub frame: FrameConfig,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(2),
            heartbeat_timeout: Duration::from_secs(10),
            frame: FrameConfig::default(),
        }
    }
}

impl NetConfig {
    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            ..Self::default()
        }
    }
}

/// Room-server client.
#[derive(Debug, Clone, Default)]
pub struct TcpSessionService {
    config: NetConfig,
}

impl TcpSessionService {
    pub fn new(config: NetConfig) -> Self {
        Self { config }
    }

    async fn join(&self, args: &ConnectArgs) -> Result<TcpConnection, NetError> {
        let address = format!("{}:{}", args.server_address, args.server_port);
        let started = Instant::now();

        let stream = TcpStream::connect(&address).await?;
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.into_split();
        debug!(%address, "connected, joining room");

        let join = Message::JoinRoom(JoinRoom {
            app_id: args.app_id.clone(),
            app_version: args.app_version.clone(),
            user_id: args.user_id.clone(),
            room_name: args.room_name.clone(),
            region: args.region.clone(),
            max_players: args.max_players,
            visible: args.visible,
        });
        write_message(&mut writer, &join, &self.config.frame).await?;

        let joined = loop {
            match read_message(&mut reader, &self.config.frame).await? {
                Message::RoomJoined(joined) => break joined,
                Message::JoinRejected(rejected) => return Err(NetError::Rejected(rejected.reason)),
                Message::Ping(ping) => {
                    let pong = Message::Pong(Pong {
                        sent_at_us: ping.sent_at_us,
                    });
                    write_message(&mut writer, &pong, &self.config.frame).await?;
                }
                other => return Err(NetError::Unexpected(other.kind())),
            }
        };

        info!(
            room = %joined.room_name,
            region = %joined.region,
            slot = joined.player_slot,
            "joined room"
        );
        Ok(TcpConnection::spawn(
            joined.room_name,
            joined.region,
            reader,
            writer,
            started.elapsed(),
            self.config,
        ))
    }
}

#[async_trait]
impl SessionService for TcpSessionService {
    async fn connect(
        &self,
        args: ConnectArgs,
        cancel: CancellationToken,
    ) -> Result<Arc<dyn Connection>, BoxError> {
        let address = format!("{}:{}", args.server_address, args.server_port);
        let timeout = self.config.connect_timeout;

        let connection = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NetError::Cancelled),
            joined = tokio::time::timeout(timeout, self.join(&args)) => {
                joined.unwrap_or(Err(NetError::Timeout { address, timeout }))
            }
        }?;
        Ok(Arc::new(connection))
    }
}

struct Shared {
    writer: Mutex<OwnedWriteHalf>,
    frame: FrameConfig,
    epoch: Instant,
    /// Microseconds since `epoch` when the server was last heard from.
    last_seen_us: AtomicU64,
    rtt_us: AtomicU64,
    closed: watch::Sender<Option<String>>,
    shutdown: CancellationToken,
}

impl Shared {
    fn now_us(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    async fn send(&self, msg: &Message) -> Result<(), MessageError> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, msg, &self.frame).await
    }

    /// Record a server-side close. Ignored once the connection is being
    /// torn down locally.
    fn close(&self, reason: String) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let published = self.closed.send_if_modified(|slot| {
            if slot.is_none() {
                *slot = Some(reason.clone());
                true
            } else {
                false
            }
        });
        if published {
            warn!(%reason, "room connection closed by server");
        }
        self.shutdown.cancel();
    }
}

/// A joined room on the TCP room server.
pub struct TcpConnection {
    room_name: String,
    region: String,
    shared: Arc<Shared>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    left: AtomicBool,
}

impl TcpConnection {
    fn spawn(
        room_name: String,
        region: String,
        reader: OwnedReadHalf,
        writer: OwnedWriteHalf,
        handshake_rtt: Duration,
        config: NetConfig,
    ) -> Self {
        let (closed, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            writer: Mutex::new(writer),
            frame: config.frame,
            epoch: Instant::now(),
            last_seen_us: AtomicU64::new(0),
            rtt_us: AtomicU64::new(u64::try_from(handshake_rtt.as_micros()).unwrap_or(u64::MAX)),
            closed,
            shutdown: CancellationToken::new(),
        });

        let tasks = vec![
            tokio::spawn(read_loop(reader, Arc::clone(&shared))),
            tokio::spawn(heartbeat_loop(Arc::clone(&shared), config)),
        ];

        Self {
            room_name,
            region,
            shared,
            tasks: std::sync::Mutex::new(tasks),
            left: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Connection for TcpConnection {
    fn room_name(&self) -> String {
        self.room_name.clone()
    }

    fn region(&self) -> String {
        self.region.clone()
    }

    fn round_trip_time(&self) -> Duration {
        Duration::from_micros(self.shared.rtt_us.load(Ordering::Relaxed))
    }

    async fn closed(&self) -> String {
        let mut rx = self.shared.closed.subscribe();
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
        if self.left.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let server_closed = self.shared.shutdown.is_cancelled();
        self.shared.shutdown.cancel();

        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "connection task ended abnormally");
            }
        }

        let result = if server_closed {
            Ok(())
        } else {
            let leave = Message::Leave(Leave {
                reason: "client left".to_string(),
            });
            self.shared.send(&leave).await
        };
        let mut writer = self.shared.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "socket shutdown failed");
        }
        drop(writer);

        info!(room = %self.room_name, "left room");
        result.map_err(Into::into)
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

async fn read_loop(mut reader: OwnedReadHalf, shared: Arc<Shared>) {
    loop {
        let msg = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            msg = read_message(&mut reader, &shared.frame) => msg,
        };
        let msg = match msg {
            Ok(msg) => msg,
            Err(MessageError::Frame(e)) => {
                shared.close(format!("connection lost: {e}"));
                break;
            }
            Err(e) => {
                shared.close(format!("protocol error: {e}"));
                break;
            }
        };
        shared.last_seen_us.store(shared.now_us(), Ordering::Relaxed);

        match msg {
            Message::Ping(ping) => {
                let pong = Message::Pong(Pong {
                    sent_at_us: ping.sent_at_us,
                });
                if let Err(e) = shared.send(&pong).await {
                    shared.close(format!("connection lost: {e}"));
                    break;
                }
            }
            Message::Pong(pong) => {
                let rtt = shared.now_us().saturating_sub(pong.sent_at_us);
                shared.rtt_us.store(rtt, Ordering::Relaxed);
            }
            Message::Kicked(kicked) => {
                shared.close(kicked.reason);
                break;
            }
            Message::Leave(leave) => {
                shared.close(leave.reason);
                break;
            }
            other => debug!(kind = other.kind(), "ignoring message"),
        }
    }
}

async fn heartbeat_loop(shared: Arc<Shared>, config: NetConfig) {
    let mut interval = tokio::time::interval(config.heartbeat_interval);
    let timeout_us = u64::try_from(config.heartbeat_timeout.as_micros()).unwrap_or(u64::MAX);
    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        let now = shared.now_us();
        let silent_for = now.saturating_sub(shared.last_seen_us.load(Ordering::Relaxed));
        if silent_for > timeout_us {
            shared.close(format!(
                "heartbeat timeout after {:?}",
                config.heartbeat_timeout
            ));
            break;
        }

        let ping = Message::Ping(Ping { sent_at_us: now });
        if let Err(e) = shared.send(&ping).await {
            shared.close(format!("connection lost: {e}"));
            break;
        }
    }
}
