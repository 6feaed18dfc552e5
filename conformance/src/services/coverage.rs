//! Run-wide coverage metrics
//!
//! One aggregator is shared by every scenario in a run. All tallies sit
//! behind a single mutex so each record lands as one unit.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use shared::{TransactionKind, TransactionOutcome};
use tracing::{debug, info};

use crate::error::{HarnessError, HarnessResult};

pub const UNKNOWN_KIND: &str = "UNKNOWN";
const TOP_ERROR_LIMIT: usize = 10;

#[derive(Default)]
struct CoverageState {
    outcomes: Vec<TransactionOutcome>,
    by_feature: BTreeMap<String, u64>,
    by_response_code: BTreeMap<String, u64>,
    by_kind: BTreeMap<String, u64>,
    latencies: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    pub average: f64,
    pub min: u64,
    pub max: u64,
    pub median: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    pub error: String,
    pub count: u64,
}

/// Serialisable view of everything recorded so far
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSnapshot {
    pub generated_at: DateTime<Utc>,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub by_feature: BTreeMap<String, u64>,
    pub by_response_code: BTreeMap<String, u64>,
    pub by_kind: BTreeMap<String, u64>,
    pub latency: LatencyStats,
    pub top_errors: Vec<ErrorSummary>,
}

impl CoverageSnapshot {
    /// Share of all recorded outcomes carrying `code`
    ///
    /// Divides by the overall total, not by the number of outcomes that had a
    /// response code at all.
    pub fn code_share(&self, code: &str) -> f64 {
        share(self.by_response_code.get(code).copied().unwrap_or(0), self.total)
    }

    /// Share of all recorded outcomes of `kind`, same denominator as `code_share`
    pub fn kind_share(&self, kind: &str) -> f64 {
        share(self.by_kind.get(kind).copied().unwrap_or(0), self.total)
    }

    /// One-line summary for the console
    pub fn summary(&self) -> String {
        format!(
            "Total: {} | Success: {} ({:.2}%) | Failed: {} | Avg: {:.0}ms | Max: {}ms | P95: {}ms",
            self.total,
            self.successful,
            self.success_rate,
            self.failed,
            self.latency.average,
            self.latency.max,
            self.latency.p95
        )
    }

    /// Multi-section text dashboard
    pub fn render_dashboard(&self) -> String {
        let mut out = String::new();
        let rule = "─".repeat(53);

        let _ = writeln!(out, "📊 TEST COVERAGE DASHBOARD");
        let _ = writeln!(out, "Generated: {}\n", self.generated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));

        let _ = writeln!(out, "📈 GENERAL SUMMARY\n{rule}");
        let _ = writeln!(out, "Total Transactions:     {}", self.total);
        let _ = writeln!(out, "Successful:             {} ({:.2}%)", self.successful, self.success_rate);
        let failed_rate = if self.total == 0 { 0.0 } else { 100.0 - self.success_rate };
        let _ = writeln!(out, "Failed:                 {} ({:.2}%)\n", self.failed, failed_rate);

        let _ = writeln!(out, "📋 SCENARIOS BY FEATURE\n{rule}");
        for (feature, count) in &self.by_feature {
            let _ = writeln!(out, "{feature:<30}: {count:>3} scenarios");
        }

        let _ = writeln!(out, "\n📊 RESPONSE CODE DISTRIBUTION\n{rule}");
        let mut codes: Vec<(&String, &u64)> = self.by_response_code.iter().collect();
        codes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (code, count) in codes {
            let icon = if code == shared::outcome::APPROVED_CODE { "✅" } else { "❌" };
            let _ = writeln!(out, "{icon} Code {code}: {count:>3} ({:>5.2}%)", self.code_share(code));
        }

        let _ = writeln!(out, "\n💳 TRANSACTION KIND DISTRIBUTION\n{rule}");
        for (kind, count) in &self.by_kind {
            let _ = writeln!(out, "{kind:<30}: {count:>3} ({:>5.2}%)", self.kind_share(kind));
        }

        let _ = writeln!(out, "\n⏱️ PERFORMANCE METRICS\n{rule}");
        let _ = writeln!(out, "Average Response Time:  {:>6.0} ms", self.latency.average);
        let _ = writeln!(out, "Min Response Time:      {:>6} ms", self.latency.min);
        let _ = writeln!(out, "Max Response Time:      {:>6} ms", self.latency.max);
        let _ = writeln!(out, "Median (P50):           {:>6} ms", self.latency.median);
        let _ = writeln!(out, "P90:                    {:>6} ms", self.latency.p90);
        let _ = writeln!(out, "P95:                    {:>6} ms", self.latency.p95);
        let _ = writeln!(out, "P99:                    {:>6} ms", self.latency.p99);

        if !self.top_errors.is_empty() {
            let _ = writeln!(out, "\n❌ TOP ERRORS\n{rule}");
            for (i, error) in self.top_errors.iter().enumerate() {
                let _ = writeln!(out, "{:>2}. {} (count: {})", i + 1, error.error, error.count);
            }
        }

        out
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 * 100.0 / total as f64
}

/// Value at rank ceil(p/100 * n) - 1 of an ascending slice
pub fn percentile(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, sorted.len() as i64 - 1) as usize;
    sorted[index]
}

fn latency_stats(latencies: &[u64]) -> LatencyStats {
    if latencies.is_empty() {
        return LatencyStats::default();
    }

    let mut sorted = latencies.to_vec();
    sorted.sort_unstable();
    // Remote-supplied times can be arbitrarily large
    let sum: u128 = sorted.iter().map(|&v| u128::from(v)).sum();

    LatencyStats {
        average: sum as f64 / sorted.len() as f64,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median: percentile(&sorted, 50.0),
        p90: percentile(&sorted, 90.0),
        p95: percentile(&sorted, 95.0),
        p99: percentile(&sorted, 99.0),
    }
}

fn top_errors(outcomes: &[TransactionOutcome]) -> Vec<ErrorSummary> {
    let mut grouped: BTreeMap<String, u64> = BTreeMap::new();
    for outcome in outcomes.iter().filter(|o| !o.success) {
        *grouped.entry(outcome.error_key()).or_insert(0) += 1;
    }

    let mut ranked: Vec<ErrorSummary> = grouped
        .into_iter()
        .map(|(error, count)| ErrorSummary { error, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
    ranked.truncate(TOP_ERROR_LIMIT);
    ranked
}

pub struct CoverageAggregator {
    state: Mutex<CoverageState>,
}

impl Default for CoverageAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageAggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoverageState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoverageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one finished transaction
    pub fn record(&self, outcome: &TransactionOutcome, feature: &str, kind: Option<TransactionKind>) {
        let kind_code = kind.map(|k| k.code()).unwrap_or(UNKNOWN_KIND);
        {
            let mut state = self.lock();
            state.outcomes.push(outcome.clone());
            *state.by_feature.entry(feature.to_string()).or_insert(0) += 1;
            if !outcome.response_code().is_empty() {
                *state
                    .by_response_code
                    .entry(outcome.response_code().to_string())
                    .or_insert(0) += 1;
            }
            *state.by_kind.entry(kind_code.to_string()).or_insert(0) += 1;
            if let Some(latency) = outcome.response_time {
                state.latencies.push(latency);
            }
        }
        debug!("📊 Recorded {} / {} -> {}", feature, kind_code, outcome.response_code());
    }

    pub fn reset(&self) {
        *self.lock() = CoverageState::default();
    }

    pub fn total(&self) -> usize {
        self.lock().outcomes.len()
    }

    pub fn snapshot(&self) -> CoverageSnapshot {
        let state = self.lock();
        let total = state.outcomes.len() as u64;
        let successful = state.outcomes.iter().filter(|o| o.success).count() as u64;

        CoverageSnapshot {
            generated_at: Utc::now(),
            total,
            successful,
            failed: total - successful,
            success_rate: share(successful, total),
            by_feature: state.by_feature.clone(),
            by_response_code: state.by_response_code.clone(),
            by_kind: state.by_kind.clone(),
            latency: latency_stats(&state.latencies),
            top_errors: top_errors(&state.outcomes),
        }
    }

    pub fn summary(&self) -> String {
        self.snapshot().summary()
    }

    /// Write the snapshot as `coverage-report-YYYYMMDD-HHMMSS.json` under `dir`
    pub fn write_json(&self, dir: &Path) -> HarnessResult<PathBuf> {
        let snapshot = self.snapshot();
        std::fs::create_dir_all(dir).map_err(|e| HarnessError::ReportError {
            message: format!("cannot create {}: {}", dir.display(), e),
        })?;

        let filename = format!("coverage-report-{}.json", Local::now().format("%Y%m%d-%H%M%S"));
        let path = dir.join(filename);
        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| HarnessError::ReportError {
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| HarnessError::ReportError {
            message: format!("cannot write {}: {}", path.display(), e),
        })?;

        info!("✅ Coverage report saved to {}", path.display());
        Ok(path)
    }
}
