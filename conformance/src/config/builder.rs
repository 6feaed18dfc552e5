//! Harness Configuration Builder

use std::time::Duration;

use shared::TestDataDefaults;

use super::HarnessConfig;
use crate::error::HarnessResult;

pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HarnessConfig::default(),
        }
    }

    /// Set simulator base URL
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set HTTP client timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_settle(mut self, settle: Duration) -> Self {
        self.config.connect_settle = settle;
        self
    }

    pub fn mode_settle(mut self, settle: Duration) -> Self {
        self.config.mode_settle = settle;
        self
    }

    /// Skip both settle intervals; for tests against stubs
    pub fn no_settle(self) -> Self {
        self.connect_settle(Duration::ZERO).mode_settle(Duration::ZERO)
    }

    pub fn test_data(mut self, test_data: TestDataDefaults) -> Self {
        self.config.test_data = test_data;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> HarnessResult<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
