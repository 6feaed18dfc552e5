//! Transaction execution pipeline
//!
//! validate -> (bound: ensure connection) -> send -> parse -> synchronise.
//! Every path returns a well-formed outcome.

use std::sync::Arc;
use std::time::Instant;

use shared::{TransactionKind, TransactionOutcome, TransactionRequest};
use tracing::{debug, info, warn};

use crate::context::ScenarioContext;
use crate::error::TransportError;
use crate::services::connection_manager::ConnectionManager;
use crate::traits::SimulatorTransport;
use crate::types::RawReply;

/// Endpoint accepting any kind, with the kind carried in the body
pub const GENERIC_ENDPOINT: &str = "process";

/// Transaction endpoint for a kind, relative to the transaction API
pub fn endpoint_for(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::BalanceInquiry => "balance-inquiry",
        TransactionKind::CashAdvance => "cash-advance",
        TransactionKind::Purchase => "purchase",
        TransactionKind::Transfer => "transfer",
        TransactionKind::Authorization => "authorization",
        TransactionKind::Deposit => "deposit",
        TransactionKind::Cashback => "cashback",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    PerKind,
    Generic,
}

/// Result of one exchange before it is bound to a scenario
struct Exchange {
    outcome: TransactionOutcome,
    raw: Option<RawReply>,
    failure: Option<TransportError>,
}

impl Exchange {
    fn local(outcome: TransactionOutcome) -> Self {
        Self { outcome, raw: None, failure: None }
    }
}

pub struct TransactionPipeline {
    transport: Arc<dyn SimulatorTransport>,
    connection: Arc<ConnectionManager>,
}

impl TransactionPipeline {
    pub fn new(transport: Arc<dyn SimulatorTransport>, connection: Arc<ConnectionManager>) -> Self {
        Self { transport, connection }
    }

    /// Execute without a scenario: no connection check, nothing recorded
    pub async fn execute(&self, request: &TransactionRequest) -> TransactionOutcome {
        self.exchange(request, Route::PerKind).await.outcome
    }

    /// Execute through the generic processing endpoint
    pub async fn execute_generic(&self, request: &TransactionRequest) -> TransactionOutcome {
        self.exchange(request, Route::Generic).await.outcome
    }

    /// Execute inside a scenario
    ///
    /// Ensures the connection first, reconnects after a connectivity failure
    /// and records the outcome and raw reply on the context.
    pub async fn execute_bound(&self, request: &TransactionRequest, ctx: &mut ScenarioContext) -> TransactionOutcome {
        let exchange = match request.validate() {
            Err(e) => {
                warn!("🚫 Rejected before send: {}", e);
                Exchange::local(TransactionOutcome::invalid_request(e.to_string()))
            }
            Ok(_) => {
                if !ctx.ensure_connection().await {
                    warn!("⚠️ Sending without a confirmed connection");
                }
                self.exchange(request, Route::PerKind).await
            }
        };

        if let Some(failure) = &exchange.failure {
            if failure.is_connectivity() {
                warn!("🔄 Connectivity failure, verifying connection");
                self.connection.verify_and_reconnect().await;
            }
        }

        ctx.set_outcomes(exchange.outcome.clone(), exchange.raw);
        exchange.outcome
    }

    async fn exchange(&self, request: &TransactionRequest, route: Route) -> Exchange {
        let kind = match request.validate() {
            Ok(kind) => kind,
            Err(e) => return Exchange::local(TransactionOutcome::invalid_request(e.to_string())),
        };

        let (endpoint, include_kind) = match route {
            Route::PerKind => (endpoint_for(kind), false),
            Route::Generic => (GENERIC_ENDPOINT, true),
        };

        let body = match request.to_wire_body(include_kind) {
            Ok(body) => body,
            Err(e) => return Exchange::local(TransactionOutcome::system_error(e.to_string())),
        };

        info!("💳 {} -> {}", request.description(), endpoint);
        let started = Instant::now();
        let result = self.transport.send_transaction(endpoint, &body).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let exchange = match result {
            Ok(reply) => Exchange {
                outcome: outcome_from_reply(&reply, elapsed_ms),
                raw: Some(reply),
                failure: None,
            },
            Err(e) => {
                warn!("❌ {} failed after {}ms: {}", kind, elapsed_ms, e);
                Exchange {
                    outcome: TransactionOutcome::system_error(format!("System error: {}", e.message)),
                    raw: None,
                    failure: Some(e),
                }
            }
        };

        log_snapshot(request, &exchange.outcome);
        exchange
    }
}

fn outcome_from_reply(reply: &RawReply, elapsed_ms: u64) -> TransactionOutcome {
    match TransactionOutcome::from_reply_body(&reply.body) {
        Ok(mut outcome) => {
            outcome.http_status_code.get_or_insert(reply.status);
            outcome.response_time.get_or_insert(elapsed_ms);
            outcome.reconcile_success();
            outcome
        }
        Err(e) => {
            warn!("⚠️ Unreadable reply (HTTP {}): {}", reply.status, e);
            TransactionOutcome::parse_error(format!("Failed to parse simulator reply: {e}"), reply.status)
        }
    }
}

fn log_snapshot(request: &TransactionRequest, outcome: &TransactionOutcome) {
    let icon = if outcome.success { "✅" } else { "❌" };
    info!(
        "{} {} => {} {} ({}ms)",
        icon,
        request.masked_pan(),
        outcome.response_code(),
        outcome.response_message(),
        outcome.response_time.unwrap_or_default()
    );
    match serde_json::to_string(outcome) {
        Ok(json) => debug!(outcome = %json, "📦 Outcome snapshot"),
        Err(e) => debug!("Outcome snapshot unavailable: {}", e),
    }
}
