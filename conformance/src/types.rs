//! Types used by the conformance engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw simulator reply: HTTP status plus body text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Look up a dotted path such as `fields.39` or `$.responseCode`
    ///
    /// String values are returned as-is; other values are rendered as JSON.
    pub fn field(&self, path: &str) -> Option<String> {
        let root = self.json()?;
        let trimmed = path.trim().trim_start_matches('$').trim_start_matches('.');

        let mut current = &root;
        if !trimmed.is_empty() {
            for segment in trimmed.split('.') {
                current = match current {
                    serde_json::Value::Object(map) => map.get(segment)?,
                    serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                    _ => return None,
                };
            }
        }

        match current {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => write!(f, "CONNECTED"),
            ConnectionState::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// Session details reported by the simulator when a connection opens
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionInfo {
    pub mode: Option<String>,
    pub simulator_type: Option<String>,
    pub tcp_connection_required: bool,
}

/// Status payload returned by the simulator's connection status endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RemoteStatus {
    pub connected: bool,
    pub channel_connected: bool,
    pub mode: Option<String>,
    pub socket_info: Option<serde_json::Value>,
}

/// Point-in-time view of the connection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub local_connected: bool,
    pub remote_connected: bool,
    pub channel_connected: bool,
    pub mode: String,
    pub socket_info: Option<serde_json::Value>,
    pub base_url: String,
}

impl ConnectionStatus {
    pub fn is_fully_connected(&self) -> bool {
        self.local_connected && self.remote_connected && self.channel_connected
    }
}
