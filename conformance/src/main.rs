//! Conformance smoke runner
//!
//! Connects to a running simulator, drives the selected scenarios and writes
//! a coverage report.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use conformance::runner::{run_scenarios, ScenarioSet};
use conformance::{Harness, HarnessConfig};

#[derive(Parser)]
#[command(name = "conformance")]
#[command(about = "Conformance smoke tests against an ISO 8583 simulator")]
struct Args {
    /// Scenarios to run
    #[arg(long, value_enum, default_value = "all")]
    scenario: ScenarioSet,

    /// Simulator base URL (overrides SIMULATOR_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Mode used by the mode-switch scenario
    #[arg(long, default_value = "mock")]
    mode: String,

    /// Directory for the coverage report
    #[arg(long, default_value = "target/test-reports")]
    report_dir: PathBuf,

    /// Enable verbose tracing output
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    shared::logging::init_tracing(Some(if args.verbose { "debug" } else { "info" }));
    shared::logging::log_startup("conformance runner");

    let mut config = HarnessConfig::from_env().context("loading configuration")?;
    if let Some(url) = args.base_url {
        config.base_url = url;
    }

    let harness = Harness::new(config).context("building harness")?;
    harness.begin_run();

    let results = run_scenarios(&harness, args.scenario, &args.mode)
        .await
        .context("running scenarios")?;

    for result in &results {
        let icon = if result.passed { "✅" } else { "❌" };
        tracing::info!("{} {}", icon, result.name);
    }

    let snapshot = harness.coverage().snapshot();
    println!("{}", snapshot.render_dashboard());
    println!("{}", snapshot.summary());

    let path = harness
        .coverage()
        .write_json(&args.report_dir)
        .context("writing coverage report")?;
    tracing::info!("📄 Report: {}", path.display());

    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} scenarios failed", results.len());
    }
    Ok(())
}
