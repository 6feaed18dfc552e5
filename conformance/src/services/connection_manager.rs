//! Connection lifecycle manager
//!
//! Tracks whether the simulator has an open upstream channel and which mode it
//! runs in. Every operation absorbs transport failures into state and returns
//! a boolean; nothing here returns an error to the caller.
//!
//! Connect and mode switch are not safe to race. Callers drive them
//! sequentially.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::traits::SimulatorTransport;
use crate::types::{ConnectionState, ConnectionStatus, RawReply, RemoteStatus, SessionInfo};

pub const INITIAL_MODE: &str = "REAL";

pub struct ConnectionManager {
    transport: Arc<dyn SimulatorTransport>,
    connected: AtomicBool,
    no_response: AtomicBool,
    mode: RwLock<String>,
    session: RwLock<Option<SessionInfo>>,
    last_error: RwLock<Option<String>>,
    connect_settle: Duration,
    mode_settle: Duration,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn SimulatorTransport>, connect_settle: Duration, mode_settle: Duration) -> Self {
        Self {
            transport,
            connected: AtomicBool::new(false),
            no_response: AtomicBool::new(false),
            mode: RwLock::new(INITIAL_MODE.to_string()),
            session: RwLock::new(None),
            last_error: RwLock::new(None),
            connect_settle,
            mode_settle,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub async fn mode(&self) -> String {
        self.mode.read().await.clone()
    }

    pub async fn session(&self) -> Option<SessionInfo> {
        self.session.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub fn no_response(&self) -> bool {
        self.no_response.load(Ordering::SeqCst)
    }

    pub fn base_url(&self) -> String {
        self.transport.base_url()
    }

    async fn record_error(&self, message: String) {
        warn!("⚠️ {}", message);
        *self.last_error.write().await = Some(message);
    }

    fn mark_disconnected(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("🔌 Local connection state -> {}", ConnectionState::Disconnected);
        }
    }

    /// Open the simulator's channel unless already connected
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            debug!("🔗 Already connected, skipping connect");
            return true;
        }

        info!("🔗 Connecting to simulator at {}", self.transport.base_url());
        match self.transport.connect().await {
            Ok(reply) if reply.status == 200 => {
                let session: SessionInfo = reply
                    .json()
                    .and_then(|body| serde_json::from_value(body).ok())
                    .unwrap_or_default();

                if let Some(mode) = session.mode.as_deref() {
                    *self.mode.write().await = mode.to_ascii_uppercase();
                }
                info!(
                    "✅ Connected (mode: {}, simulator: {}, tcp required: {})",
                    session.mode.as_deref().unwrap_or("unknown"),
                    session.simulator_type.as_deref().unwrap_or("unknown"),
                    session.tcp_connection_required
                );
                *self.session.write().await = Some(session);
                *self.last_error.write().await = None;
                self.connected.store(true, Ordering::SeqCst);

                if !self.connect_settle.is_zero() {
                    tokio::time::sleep(self.connect_settle).await;
                }
                true
            }
            Ok(reply) => {
                self.record_error(format!("Connect rejected with HTTP {}: {}", reply.status, reply.body))
                    .await;
                false
            }
            Err(e) => {
                error!("❌ Connect failed: {}", e);
                self.record_error(e.to_string()).await;
                false
            }
        }
    }

    /// Close the channel; local state is disconnected whatever the reply
    pub async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        match self.transport.disconnect().await {
            Ok(reply) if reply.is_success() => info!("🔌 Disconnected from simulator"),
            Ok(reply) => warn!("⚠️ Disconnect answered HTTP {}", reply.status),
            Err(e) => warn!("⚠️ Disconnect failed: {}", e),
        }
        self.mark_disconnected();
    }

    pub async fn ensure_connection(&self) -> bool {
        if self.is_connected() {
            return true;
        }
        self.connect().await
    }

    /// Confirm the remote still considers us connected, reconnecting if not
    pub async fn verify_and_reconnect(&self) -> bool {
        if !self.is_connected() {
            return self.connect().await;
        }

        let remote_connected = match self.transport.connection_status().await {
            Ok(reply) if reply.status == 200 => parse_remote_status(&reply).connected,
            Ok(reply) => {
                warn!("⚠️ Status check answered HTTP {}", reply.status);
                false
            }
            Err(e) => {
                warn!("⚠️ Status check failed: {}", e);
                false
            }
        };

        if remote_connected {
            return true;
        }

        warn!("🔄 Simulator reports disconnected, reconnecting");
        self.mark_disconnected();
        self.connect().await
    }

    /// Switch simulator mode; repeated requests for the cached mode are no-ops
    ///
    /// Only the locally cached mode is compared. A mode changed on the
    /// simulator side is not noticed here.
    pub async fn set_mode(&self, target: &str) -> bool {
        let target = target.trim();
        if self.mode.read().await.eq_ignore_ascii_case(target) {
            debug!("🎛️ Simulator already in {} mode", target);
            return true;
        }

        // The switch is still posted; the simulator has the final say
        if !self.ensure_connection().await {
            warn!("⚠️ Not connected, switching to {} mode anyway", target);
        }

        info!("🎛️ Switching simulator mode to {}", target);
        match self.transport.set_mode(&target.to_ascii_lowercase()).await {
            Ok(reply) if reply.status == 200 => {
                *self.mode.write().await = target.to_ascii_uppercase();
                if !self.mode_settle.is_zero() {
                    tokio::time::sleep(self.mode_settle).await;
                }
                true
            }
            Ok(reply) => {
                self.record_error(format!("Mode switch to {} rejected with HTTP {}", target, reply.status))
                    .await;
                false
            }
            Err(e) => {
                self.record_error(format!("Mode switch to {target} failed: {e}")).await;
                false
            }
        }
    }

    /// Query remote status, downgrading local state when the remote disagrees
    pub async fn status(&self) -> ConnectionStatus {
        let remote = match self.transport.connection_status().await {
            Ok(reply) if reply.status == 200 => parse_remote_status(&reply),
            Ok(reply) => {
                debug!("Status endpoint answered HTTP {}", reply.status);
                RemoteStatus::default()
            }
            Err(e) => {
                debug!("Status endpoint unreachable: {}", e);
                RemoteStatus::default()
            }
        };

        if !remote.connected || !remote.channel_connected {
            self.mark_disconnected();
        }

        ConnectionStatus {
            local_connected: self.is_connected(),
            remote_connected: remote.connected,
            channel_connected: remote.channel_connected,
            mode: match remote.mode {
                Some(mode) => mode,
                None => self.mode().await,
            },
            socket_info: remote.socket_info,
            base_url: self.transport.base_url(),
        }
    }

    /// Status endpoint answers at all (200 or 400)
    pub async fn is_simulator_available(&self) -> bool {
        match self.transport.connection_status().await {
            Ok(reply) => matches!(reply.status, 200 | 400),
            Err(_) => false,
        }
    }

    /// Network management echo through the channel
    pub async fn test_connection(&self) -> bool {
        self.expect_ok("Connection test", self.transport.test_connection().await)
            .await
    }

    pub async fn clear_buffer(&self) -> bool {
        self.expect_ok("Clear buffer", self.transport.clear_buffer().await).await
    }

    pub async fn enable_keep_alive(&self, interval_minutes: u32) -> bool {
        self.expect_ok("Enable keep-alive", self.transport.enable_keep_alive(interval_minutes).await)
            .await
    }

    pub async fn disable_keep_alive(&self) -> bool {
        self.expect_ok("Disable keep-alive", self.transport.disable_keep_alive().await)
            .await
    }

    /// Ask the simulator to stop answering; the flag is cached locally
    pub async fn set_no_response(&self, enabled: bool) -> bool {
        self.no_response.store(enabled, Ordering::SeqCst);
        info!("⏰ No-response mode {}", if enabled { "enabled" } else { "disabled" });
        self.expect_ok("No-response toggle", self.transport.set_no_response(enabled).await)
            .await
    }

    async fn expect_ok(&self, action: &str, result: Result<RawReply, crate::error::TransportError>) -> bool {
        match result {
            Ok(reply) if reply.status == 200 => {
                debug!("✅ {} succeeded", action);
                true
            }
            Ok(reply) => {
                self.record_error(format!("{} answered HTTP {}", action, reply.status)).await;
                false
            }
            Err(e) => {
                self.record_error(format!("{action} failed: {e}")).await;
                false
            }
        }
    }
}

fn parse_remote_status(reply: &RawReply) -> RemoteStatus {
    reply
        .json()
        .and_then(|body| serde_json::from_value(body).ok())
        .unwrap_or_default()
}
