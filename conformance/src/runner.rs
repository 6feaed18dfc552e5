//! Smoke scenarios run by the `conformance` binary against a live simulator

use clap::ValueEnum;
use shared::{ErrorClass, TransactionKind, TransactionOutcome};
use tracing::{info, warn};

use crate::context::ScenarioContext;
use crate::error::HarnessResult;
use crate::harness::Harness;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScenarioSet {
    Connection,
    Transactions,
    Batch,
    ModeSwitch,
    All,
}

const BATCH_SIZE: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
}

/// Run the selected scenarios, recording each one into the harness coverage
pub async fn run_scenarios(harness: &Harness, set: ScenarioSet, mode: &str) -> HarnessResult<Vec<ScenarioResult>> {
    let mut results = Vec::new();

    if matches!(set, ScenarioSet::Connection | ScenarioSet::All) {
        let mut ctx = harness.begin_scenario("Connection lifecycle");
        let passed = connection_scenario(&mut ctx).await;
        harness.finish_scenario(&ctx, "CONNECTION", !passed).await;
        results.push(ScenarioResult { name: ctx.scenario_name().to_string(), passed });
    }

    if matches!(set, ScenarioSet::Transactions | ScenarioSet::All) {
        for kind in TransactionKind::ALL {
            let mut ctx = harness.begin_scenario(&format!("{} round trip", kind.description()));
            let passed = transaction_scenario(&mut ctx, kind).await?;
            harness.finish_scenario(&ctx, kind.code(), !passed).await;
            results.push(ScenarioResult { name: ctx.scenario_name().to_string(), passed });
        }
    }

    if matches!(set, ScenarioSet::Batch | ScenarioSet::All) {
        let mut ctx = harness.begin_scenario(&format!("Batch of {BATCH_SIZE} balance inquiries"));
        let passed = batch_scenario(&mut ctx).await?;
        harness.finish_scenario(&ctx, "BATCH", !passed).await;
        results.push(ScenarioResult { name: ctx.scenario_name().to_string(), passed });
    }

    if matches!(set, ScenarioSet::ModeSwitch | ScenarioSet::All) {
        let mut ctx = harness.begin_scenario(&format!("Switch to {mode} mode"));
        let passed = mode_switch_scenario(&mut ctx, mode).await;
        harness.finish_scenario(&ctx, "MODE_SWITCH", !passed).await;
        results.push(ScenarioResult { name: ctx.scenario_name().to_string(), passed });
    }

    harness.connection().disconnect().await;
    Ok(results)
}

async fn connection_scenario(ctx: &mut ScenarioContext) -> bool {
    if !ctx.connect_if_needed().await {
        return false;
    }

    let status = ctx.connection().status().await;
    info!(
        "🔎 Remote connected: {}, channel: {}, mode: {}",
        status.remote_connected, status.channel_connected, status.mode
    );
    if !status.is_fully_connected() {
        warn!("⚠️ Simulator is reachable but its channel is not up");
        return false;
    }

    ctx.connection().test_connection().await && ctx.connection().verify_and_reconnect().await
}

/// A kind passes when the simulator answers with a readable reply
async fn transaction_scenario(ctx: &mut ScenarioContext, kind: TransactionKind) -> HarnessResult<bool> {
    let defaults = ctx.test_data().clone();
    let builder = ctx.new_builder(kind);
    match kind {
        TransactionKind::Transfer => {
            builder.target_account(defaults.account.clone());
        }
        TransactionKind::Cashback => {
            builder.cashback_amount("2000");
        }
        _ => {}
    }

    let outcome = ctx.send_current().await?;
    let broken = matches!(
        outcome.classification(),
        Some(ErrorClass::SystemError | ErrorClass::ParseError | ErrorClass::InvalidRequest)
    );
    if broken {
        warn!("⚠️ {} failed: {}", kind, outcome.error_message());
        return Ok(false);
    }

    if outcome.is_approved() {
        let family = &kind.default_mti()[..2];
        if let Err(e) = outcome.validate_stan().and_then(|_| outcome.validate_mti(Some(family))) {
            warn!("⚠️ {} approved with a malformed reply: {}", kind, e);
            return Ok(false);
        }
    }
    Ok(true)
}

/// Repeated sends of one request must each get a well-formed, distinct STAN
async fn batch_scenario(ctx: &mut ScenarioContext) -> HarnessResult<bool> {
    ctx.new_builder(TransactionKind::BalanceInquiry);
    ctx.send_batch(BATCH_SIZE).await?;

    let checked = ctx.verify_batch_stans().and_then(|summary| {
        ctx.outcomes().iter().try_for_each(TransactionOutcome::validate_stan)?;
        Ok(summary)
    });
    match checked {
        Ok(summary) => {
            info!(
                "📊 Batch: {}/{} approved, avg {:.0}ms",
                summary.approved, summary.count, summary.average_response_time
            );
            Ok(true)
        }
        Err(e) => {
            warn!("⚠️ Batch check failed: {}", e);
            Ok(false)
        }
    }
}

async fn mode_switch_scenario(ctx: &mut ScenarioContext, mode: &str) -> bool {
    let switched = ctx.connection().set_mode(mode).await;
    let current = ctx.connection().mode().await;
    switched && current.eq_ignore_ascii_case(mode)
}
