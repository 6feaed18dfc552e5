//! Per-scenario state shared by the steps of one scenario
//!
//! A context is owned by exactly one scenario. It holds handles to the
//! run-wide connection manager and pipeline, the request being assembled, and
//! whatever the last exchange produced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{BatchSummary, TestDataDefaults, TransactionKind, TransactionOutcome, TransactionRequest, TransactionRequestBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};
use crate::services::connection_manager::ConnectionManager;
use crate::services::pipeline::TransactionPipeline;
use crate::types::{ConnectionState, RawReply};

/// Everything worth printing when a scenario fails
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDiagnostics {
    pub scenario_id: Uuid,
    pub scenario_name: String,
    pub connection_state: String,
    pub active_kind: Option<TransactionKind>,
    pub last_outcome: Option<TransactionOutcome>,
    pub http_status: Option<u16>,
    pub raw_body: Option<String>,
    pub elapsed_ms: Option<i64>,
}

pub struct ScenarioContext {
    connection: Arc<ConnectionManager>,
    pipeline: Arc<TransactionPipeline>,
    test_data: TestDataDefaults,
    scenario_id: Uuid,
    scenario_name: String,
    builder: Option<TransactionRequestBuilder>,
    current_request: Option<TransactionRequest>,
    current_outcome: Option<TransactionOutcome>,
    outcomes: Vec<TransactionOutcome>,
    active_kind: Option<TransactionKind>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    connection_initialized: bool,
    last_reply: Option<RawReply>,
}

impl ScenarioContext {
    pub fn new(
        name: impl Into<String>,
        connection: Arc<ConnectionManager>,
        pipeline: Arc<TransactionPipeline>,
        test_data: TestDataDefaults,
    ) -> Self {
        Self {
            connection,
            pipeline,
            test_data,
            scenario_id: Uuid::new_v4(),
            scenario_name: name.into(),
            builder: None,
            current_request: None,
            current_outcome: None,
            outcomes: Vec::new(),
            active_kind: None,
            started_at: None,
            ended_at: None,
            connection_initialized: false,
            last_reply: None,
        }
    }

    pub fn scenario_id(&self) -> Uuid {
        self.scenario_id
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn pipeline(&self) -> &Arc<TransactionPipeline> {
        &self.pipeline
    }

    pub fn test_data(&self) -> &TestDataDefaults {
        &self.test_data
    }

    pub fn active_kind(&self) -> Option<TransactionKind> {
        self.active_kind
    }

    pub fn is_connection_initialized(&self) -> bool {
        self.connection_initialized
    }

    /// Clear request and reply state; the connection is left alone
    pub fn reset(&mut self) {
        debug!("🔄 Resetting scenario context {}", self.scenario_id);
        self.builder = None;
        self.current_request = None;
        self.current_outcome = None;
        self.outcomes.clear();
        self.active_kind = None;
        self.started_at = None;
        self.ended_at = None;
        self.last_reply = None;
    }

    // Builders

    /// Fresh empty builder; drops the current request and outcome
    pub fn start_new_request(&mut self) -> &mut TransactionRequestBuilder {
        self.current_request = None;
        self.current_outcome = None;
        self.builder.insert(TransactionRequestBuilder::new())
    }

    /// Builder preloaded for a kind: processing code, configured card data, merchant defaults
    pub fn new_builder(&mut self, kind: TransactionKind) -> &mut TransactionRequestBuilder {
        debug!("🗂️ New builder for {}", kind);
        self.active_kind = Some(kind);

        let mut builder = TransactionRequestBuilder::new();
        builder
            .kind(kind)
            .apply_kind_defaults()
            .seed_from(&self.test_data)
            .apply_defaults();
        self.builder.insert(builder)
    }

    /// Reuse the builder if it targets the same kind, otherwise start over
    pub fn get_or_create_builder(&mut self, kind: TransactionKind) -> &mut TransactionRequestBuilder {
        let reusable = self.builder.is_some() && self.active_kind == Some(kind);
        if !reusable {
            return self.new_builder(kind);
        }
        self.builder.get_or_insert_with(TransactionRequestBuilder::new)
    }

    /// Current builder, creating an empty one if none is active
    pub fn builder_mut(&mut self) -> &mut TransactionRequestBuilder {
        self.builder.get_or_insert_with(TransactionRequestBuilder::new)
    }

    pub fn has_builder(&self) -> bool {
        self.builder.is_some()
    }

    pub fn build_current(&self) -> HarnessResult<TransactionRequest> {
        let builder = self.builder.as_ref().ok_or_else(|| HarnessError::NoActiveBuilder {
            message: "start a request before building it".to_string(),
        })?;
        Ok(builder.build())
    }

    pub fn build_and_set(&mut self) -> HarnessResult<TransactionRequest> {
        let request = self.build_current()?;
        info!("📦 Request built: {}", request.description());
        self.current_request = Some(request.clone());
        Ok(request)
    }

    pub fn current_request(&self) -> Option<&TransactionRequest> {
        self.current_request.as_ref()
    }

    // Outcomes

    /// Store an outcome and its raw reply together and stop the timer
    pub fn set_outcomes(&mut self, outcome: TransactionOutcome, raw: Option<RawReply>) {
        self.stop_timer();
        info!(
            "📥 Outcome stored - success: {}, code: {}, HTTP: {}, STAN: {}",
            outcome.success,
            outcome.response_code(),
            raw.as_ref()
                .map(|r| r.status.to_string())
                .unwrap_or_else(|| "-".to_string()),
            outcome.stan.as_deref().unwrap_or("-")
        );
        self.current_outcome = Some(outcome);
        self.last_reply = raw;
    }

    pub fn current_outcome(&self) -> HarnessResult<&TransactionOutcome> {
        self.current_outcome.as_ref().ok_or_else(|| HarnessError::NoCurrentOutcome {
            message: "no transaction has completed in this scenario".to_string(),
        })
    }

    pub fn add_outcome(&mut self, outcome: TransactionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[TransactionOutcome] {
        &self.outcomes
    }

    pub fn clear_outcomes(&mut self) {
        self.outcomes.clear();
    }

    /// Metrics over the accumulated outcomes of the last batch
    pub fn batch_summary(&self) -> BatchSummary {
        BatchSummary::from_outcomes(&self.outcomes)
    }

    /// Batch summary, failing when a STAN is missing or repeated
    pub fn verify_batch_stans(&self) -> HarnessResult<BatchSummary> {
        let summary = self.batch_summary();
        summary.require_unique_stans()?;
        Ok(summary)
    }

    pub fn last_reply(&self) -> Option<&RawReply> {
        self.last_reply.as_ref()
    }

    /// Value at a dotted path in the last raw reply
    pub fn response_field(&self, path: &str) -> HarnessResult<Option<String>> {
        let reply = self.last_reply.as_ref().ok_or_else(|| HarnessError::NoLastReply {
            message: format!("cannot read '{path}' without a reply"),
        })?;
        Ok(reply.field(path))
    }

    pub fn response_field_as_int(&self, path: &str) -> HarnessResult<Option<i64>> {
        Ok(self.response_field(path)?.and_then(|v| v.trim().parse().ok()))
    }

    // Timing

    pub fn start_timer(&mut self) {
        self.started_at = Some(Utc::now());
        self.ended_at = None;
    }

    pub fn stop_timer(&mut self) {
        self.ended_at = Some(Utc::now());
        debug!("⏱️ Timer stopped: {:?}ms", self.elapsed());
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Milliseconds since the timer started, up to the stop time if stopped
    pub fn elapsed(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds())
    }

    // Connection

    /// First call ensures a connection; later calls verify it and retry once
    pub async fn ensure_connection(&mut self) -> bool {
        if !self.connection_initialized {
            info!("🔌 Initialising simulator connection");
            let connected = self.connection.ensure_connection().await;
            self.connection_initialized = true;
            return connected;
        }

        if self.connection.verify_and_reconnect().await {
            return true;
        }
        warn!("⚠️ Connection lost, retrying");
        self.connection.connect().await
    }

    pub async fn require_connection(&mut self) -> HarnessResult<()> {
        if self.ensure_connection().await {
            return Ok(());
        }
        Err(HarnessError::ConnectionUnavailable {
            message: self
                .connection
                .last_error()
                .await
                .unwrap_or_else(|| format!("simulator at {} did not accept a connection", self.connection.base_url())),
        })
    }

    pub async fn connect_if_needed(&mut self) -> bool {
        if self.connection.is_connected() {
            return true;
        }
        let connected = self.connection.connect().await;
        self.connection_initialized = true;
        connected
    }

    pub async fn disconnect(&mut self) {
        if self.connection.is_connected() {
            self.connection.disconnect().await;
            self.connection_initialized = false;
        }
    }

    /// Reset, then close the connection this context opened
    pub async fn cleanup(&mut self) {
        self.reset();
        if self.connection_initialized && self.connection.is_connected() {
            self.disconnect().await;
        }
    }

    // Sending

    /// Build the current request, time it and execute it bound to this context
    pub async fn send_current(&mut self) -> HarnessResult<TransactionOutcome> {
        let request = self.build_and_set()?;
        self.start_timer();
        let pipeline = Arc::clone(&self.pipeline);
        Ok(pipeline.execute_bound(&request, self).await)
    }

    /// Send the current request `count` times
    ///
    /// Outcomes from any earlier batch are dropped first, so `outcomes()`
    /// holds exactly this batch afterwards.
    pub async fn send_batch(&mut self, count: usize) -> HarnessResult<Vec<TransactionOutcome>> {
        let request = self.build_and_set()?;
        self.clear_outcomes();
        let pipeline = Arc::clone(&self.pipeline);
        let mut batch = Vec::with_capacity(count);

        for _ in 0..count {
            self.start_timer();
            let outcome = pipeline.execute_bound(&request, self).await;
            self.add_outcome(outcome.clone());
            batch.push(outcome);
        }

        info!(
            "📊 Batch of {} sent, {} approved",
            batch.len(),
            batch.iter().filter(|o| o.success).count()
        );
        Ok(batch)
    }

    // Diagnostics

    pub fn diagnostics(&self) -> ScenarioDiagnostics {
        ScenarioDiagnostics {
            scenario_id: self.scenario_id,
            scenario_name: self.scenario_name.clone(),
            connection_state: self.connection.state().to_string(),
            active_kind: self.active_kind,
            last_outcome: self.current_outcome.clone(),
            http_status: self.last_reply.as_ref().map(|r| r.status),
            raw_body: self.last_reply.as_ref().map(|r| r.body.clone()),
            elapsed_ms: self.elapsed(),
        }
    }

    pub fn log_state(&self) {
        let mark = |present: bool| if present { "✅" } else { "❌" };
        info!("📊 Scenario '{}' ({})", self.scenario_name, self.scenario_id);
        info!("  - Raw reply: {}", mark(self.last_reply.is_some()));
        info!("  - Active builder: {}", mark(self.builder.is_some()));
        info!("  - Current request: {}", mark(self.current_request.is_some()));
        info!("  - Current outcome: {}", mark(self.current_outcome.is_some()));
        info!("  - Accumulated outcomes: {}", self.outcomes.len());
        info!(
            "  - Kind: {}",
            self.active_kind.map(|k| k.code()).unwrap_or("none")
        );
        info!("  - Connection initialised: {}", mark(self.connection_initialized));
        info!(
            "  - Connected: {}",
            mark(self.connection.state() == ConnectionState::Connected)
        );
        info!("  - Elapsed: {:?}ms", self.elapsed());

        if let Some(outcome) = &self.current_outcome {
            info!("  - Response code: {}", outcome.response_code());
            info!("  - Response message: {}", outcome.response_message());
        }
    }
}
