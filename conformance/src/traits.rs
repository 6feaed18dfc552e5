//! Trait definitions for dependency injection

use async_trait::async_trait;

use crate::error::TransportError;
use crate::types::RawReply;

/// HTTP surface of the remote simulator
///
/// Every call returns the raw reply whatever its status; only failures to
/// exchange a request at all are errors.
#[mockall::automock]
#[async_trait]
pub trait SimulatorTransport: Send + Sync {
    /// Ask the simulator to open its upstream channel
    async fn connect(&self) -> Result<RawReply, TransportError>;

    /// Ask the simulator to close its upstream channel
    async fn disconnect(&self) -> Result<RawReply, TransportError>;

    /// Query connection status
    async fn connection_status(&self) -> Result<RawReply, TransportError>;

    /// Send a network management echo through the channel
    async fn test_connection(&self) -> Result<RawReply, TransportError>;

    /// Discard unread bytes on the channel
    async fn clear_buffer(&self) -> Result<RawReply, TransportError>;

    async fn enable_keep_alive(&self, interval_minutes: u32) -> Result<RawReply, TransportError>;

    async fn disable_keep_alive(&self) -> Result<RawReply, TransportError>;

    /// Switch simulator mode; `mode` is sent as given
    async fn set_mode(&self, mode: &str) -> Result<RawReply, TransportError>;

    /// Toggle the simulator's deliberate no-response behaviour
    async fn set_no_response(&self, enabled: bool) -> Result<RawReply, TransportError>;

    /// POST a transaction body to a path relative to the transaction API
    async fn send_transaction(&self, endpoint: &str, body: &serde_json::Value) -> Result<RawReply, TransportError>;

    fn base_url(&self) -> String;
}
