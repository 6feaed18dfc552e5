//! reqwest implementation of the simulator transport

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult, TransportError};
use crate::traits::SimulatorTransport;
use crate::types::RawReply;

const CONNECTION_API: &str = "/api/v1/connection";
const TRANSACTION_API: &str = "/api/v1/transactions";

/// Simulator transport over HTTP/JSON
#[derive(Clone)]
pub struct HttpSimulatorTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSimulatorTransport {
    pub fn new(base_url: &str, timeout: Duration) -> HarnessResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HarnessError::InvalidConfig {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(response: reqwest::Response) -> Result<RawReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("📥 HTTP {} ({} bytes)", status, body.len());
        Ok(RawReply::new(status, body))
    }

    async fn post(&self, path: &str) -> Result<RawReply, TransportError> {
        let url = self.url(path);
        debug!("📤 POST {}", url);
        let response = self.client.post(&url).send().await?;
        Self::read(response).await
    }
}

#[async_trait]
impl SimulatorTransport for HttpSimulatorTransport {
    async fn connect(&self) -> Result<RawReply, TransportError> {
        self.post(&format!("{CONNECTION_API}/connect")).await
    }

    async fn disconnect(&self) -> Result<RawReply, TransportError> {
        self.post(&format!("{CONNECTION_API}/disconnect")).await
    }

    async fn connection_status(&self) -> Result<RawReply, TransportError> {
        let url = self.url(&format!("{CONNECTION_API}/status"));
        debug!("📤 GET {}", url);
        let response = self.client.get(&url).send().await?;
        Self::read(response).await
    }

    async fn test_connection(&self) -> Result<RawReply, TransportError> {
        self.post(&format!("{CONNECTION_API}/test")).await
    }

    async fn clear_buffer(&self) -> Result<RawReply, TransportError> {
        self.post(&format!("{CONNECTION_API}/clear-buffer")).await
    }

    async fn enable_keep_alive(&self, interval_minutes: u32) -> Result<RawReply, TransportError> {
        let url = self.url(&format!("{CONNECTION_API}/keep-alive/enable"));
        let response = self
            .client
            .post(&url)
            .query(&[("intervalMinutes", interval_minutes)])
            .send()
            .await?;
        Self::read(response).await
    }

    async fn disable_keep_alive(&self) -> Result<RawReply, TransportError> {
        self.post(&format!("{CONNECTION_API}/keep-alive/disable")).await
    }

    async fn set_mode(&self, mode: &str) -> Result<RawReply, TransportError> {
        self.post(&format!("/api/v1/simulator/mode/{mode}")).await
    }

    async fn set_no_response(&self, enabled: bool) -> Result<RawReply, TransportError> {
        let url = self.url("/api/v1/config/no-response");
        let response = self.client.post(&url).query(&[("noResponse", enabled)]).send().await?;
        Self::read(response).await
    }

    async fn send_transaction(&self, endpoint: &str, body: &serde_json::Value) -> Result<RawReply, TransportError> {
        let url = self.url(&format!("{TRANSACTION_API}/{endpoint}"));
        debug!("📤 POST {}", url);
        let response = self.client.post(&url).json(body).send().await?;
        Self::read(response).await
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let transport = HttpSimulatorTransport::new("http://localhost:8081/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8081");
        assert_eq!(transport.url("/api/v1/connection/status"), "http://localhost:8081/api/v1/connection/status");
    }
}
