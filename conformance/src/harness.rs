//! Composition root
//!
//! Builds the run-wide services once and hands each scenario a fresh context
//! wired to them.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::context::ScenarioContext;
use crate::error::HarnessResult;
use crate::services::connection_manager::ConnectionManager;
use crate::services::coverage::CoverageAggregator;
use crate::services::http_transport::HttpSimulatorTransport;
use crate::services::pipeline::TransactionPipeline;
use crate::traits::SimulatorTransport;

pub struct Harness {
    config: HarnessConfig,
    connection: Arc<ConnectionManager>,
    pipeline: Arc<TransactionPipeline>,
    coverage: Arc<CoverageAggregator>,
}

impl Harness {
    /// Wire the harness to a live simulator over HTTP
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let transport = HttpSimulatorTransport::new(&config.base_url, config.timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Wire the harness to any transport
    pub fn with_transport(config: HarnessConfig, transport: Arc<dyn SimulatorTransport>) -> Self {
        let connection = Arc::new(ConnectionManager::new(
            Arc::clone(&transport),
            config.connect_settle,
            config.mode_settle,
        ));
        let pipeline = Arc::new(TransactionPipeline::new(transport, Arc::clone(&connection)));

        Self {
            config,
            connection,
            pipeline,
            coverage: Arc::new(CoverageAggregator::new()),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn pipeline(&self) -> &Arc<TransactionPipeline> {
        &self.pipeline
    }

    pub fn coverage(&self) -> &Arc<CoverageAggregator> {
        &self.coverage
    }

    /// Start a run with empty coverage
    pub fn begin_run(&self) {
        info!("🚀 Conformance run against {}", self.config.base_url);
        self.coverage.reset();
    }

    pub fn begin_scenario(&self, name: &str) -> ScenarioContext {
        info!("🎬 Scenario: {}", name);
        ScenarioContext::new(
            name,
            Arc::clone(&self.connection),
            Arc::clone(&self.pipeline),
            self.config.test_data.clone(),
        )
    }

    /// Record the scenario's outcome; on failure dump diagnostics and check the connection
    pub async fn finish_scenario(&self, ctx: &ScenarioContext, feature: &str, failed: bool) {
        if failed {
            error!("❌ Scenario failed: {}", ctx.scenario_name());
            match serde_json::to_string_pretty(&ctx.diagnostics()) {
                Ok(json) => error!("🩺 Diagnostics:\n{}", json),
                Err(e) => warn!("⚠️ Diagnostics unavailable: {}", e),
            }
            if !self.connection.verify_and_reconnect().await {
                warn!("⚠️ Simulator still unreachable after failed scenario");
            }
        } else {
            info!("✅ Scenario passed: {}", ctx.scenario_name());
        }

        if let Ok(outcome) = ctx.current_outcome() {
            let kind = ctx.current_request().and_then(|r| r.kind()).or(ctx.active_kind());
            self.coverage.record(outcome, feature, kind);
        }
    }
}
