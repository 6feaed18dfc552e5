//! Harness configuration

use std::time::Duration;

use shared::TestDataDefaults;
use tracing::warn;

use crate::error::{HarnessError, HarnessResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_CONNECT_SETTLE: Duration = Duration::from_millis(500);
pub const DEFAULT_MODE_SETTLE: Duration = Duration::from_millis(1_000);

#[derive(Clone, Debug, PartialEq)]
pub struct HarnessConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Wait after a successful connect
    pub connect_settle: Duration,
    /// Wait after a successful mode switch
    pub mode_settle: Duration,
    pub test_data: TestDataDefaults,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_settle: DEFAULT_CONNECT_SETTLE,
            mode_settle: DEFAULT_MODE_SETTLE,
            test_data: TestDataDefaults::default(),
        }
    }
}

impl HarnessConfig {
    pub fn builder() -> super::HarnessConfigBuilder {
        super::HarnessConfigBuilder::new()
    }

    /// Load configuration from the process environment and an optional `.env`
    pub fn from_env() -> HarnessResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup
    ///
    /// Recognised keys: `SIMULATOR_BASE_URL`, `SIMULATOR_TIMEOUT_MS`,
    /// `SIMULATOR_CONNECT_SETTLE_MS`, `SIMULATOR_MODE_SETTLE_MS` and
    /// `TEST_DATA_{PAN,TRACK2,TERMINAL_ID,CARD_ACCEPTOR_ID,ACCOUNT,AMOUNT,CURRENCY}`.
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = HarnessConfig::builder();

        if let Some(url) = lookup("SIMULATOR_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Some(ms) = millis(&lookup, "SIMULATOR_TIMEOUT_MS") {
            builder = builder.timeout(ms);
        }
        if let Some(ms) = millis(&lookup, "SIMULATOR_CONNECT_SETTLE_MS") {
            builder = builder.connect_settle(ms);
        }
        if let Some(ms) = millis(&lookup, "SIMULATOR_MODE_SETTLE_MS") {
            builder = builder.mode_settle(ms);
        }

        let mut test_data = TestDataDefaults::default();
        let overrides: [(&str, &mut String); 7] = [
            ("TEST_DATA_PAN", &mut test_data.pan),
            ("TEST_DATA_TRACK2", &mut test_data.track2),
            ("TEST_DATA_TERMINAL_ID", &mut test_data.terminal_id),
            ("TEST_DATA_CARD_ACCEPTOR_ID", &mut test_data.card_acceptor_id),
            ("TEST_DATA_ACCOUNT", &mut test_data.account),
            ("TEST_DATA_AMOUNT", &mut test_data.amount),
            ("TEST_DATA_CURRENCY", &mut test_data.currency_code),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }

        builder.test_data(test_data).build()
    }

    pub fn validate(&self) -> HarnessResult<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| HarnessError::InvalidConfig {
            message: format!("base URL '{}' is not a valid URL: {}", self.base_url, e),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HarnessError::InvalidConfig {
                message: format!("base URL '{}' must use http or https", self.base_url),
            });
        }

        if self.timeout.is_zero() {
            return Err(HarnessError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            warn!("⚠️ Ignoring {}={}: not a number of milliseconds", key, raw);
            None
        }
    }
}
