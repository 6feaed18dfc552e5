//! Tests for CoverageAggregator

use shared::{TransactionKind, TransactionOutcome};

use crate::services::coverage::{percentile, CoverageAggregator, CoverageSnapshot, UNKNOWN_KIND};

fn outcome(code: &str, message: &str, latency: Option<u64>) -> TransactionOutcome {
    TransactionOutcome {
        success: code == "00",
        response_code: Some(code.to_string()),
        response_message: Some(message.to_string()),
        response_time: latency,
        ..Default::default()
    }
}

#[test]
fn test_latency_percentiles() {
    let coverage = CoverageAggregator::new();
    for latency in [50, 10, 40, 20, 30] {
        coverage.record(&outcome("00", "Approved", Some(latency)), "PURCHASE", Some(TransactionKind::Purchase));
    }

    let latency = coverage.snapshot().latency;
    assert_eq!(latency.median, 30);
    assert_eq!(latency.p90, 50);
    assert_eq!(latency.average, 30.0);
    assert_eq!(latency.min, 10);
    assert_eq!(latency.max, 50);
}

#[test]
fn test_percentile_rank_is_clamped() {
    assert_eq!(percentile(&[], 50.0), 0);
    assert_eq!(percentile(&[7], 99.0), 7);
    assert_eq!(percentile(&[1, 2, 3, 4], 0.0), 1);
}

#[test]
fn test_huge_latencies_do_not_overflow_average() {
    let coverage = CoverageAggregator::new();
    let huge = u64::MAX / 2 + 1;
    for _ in 0..2 {
        coverage.record(&outcome("00", "Approved", Some(huge)), "PURCHASE", Some(TransactionKind::Purchase));
    }

    let latency = coverage.snapshot().latency;
    assert!(latency.average.is_finite());
    assert_eq!(latency.average, huge as f64);
    assert_eq!(latency.max, huge);
}

#[test]
fn test_declines_tally_by_code() {
    let coverage = CoverageAggregator::new();
    let kind = Some(TransactionKind::Purchase);
    coverage.record(&outcome("05", "Do not honor", Some(12)), "PURCHASE", kind);
    coverage.record(&outcome("05", "Do not honor", Some(15)), "PURCHASE", kind);
    coverage.record(&outcome("51", "Insufficient funds", Some(9)), "PURCHASE", kind);

    let snapshot = coverage.snapshot();
    assert_eq!(snapshot.by_response_code.len(), 2);
    assert_eq!(snapshot.by_response_code["05"], 2);
    assert_eq!(snapshot.by_response_code["51"], 1);
    assert_eq!(snapshot.success_rate, 0.0);
    assert_eq!(snapshot.by_feature["PURCHASE"], 3);
    assert_eq!(snapshot.by_kind["PURCHASE"], 3);

    assert_eq!(snapshot.top_errors[0].error, "05: Do not honor");
    assert_eq!(snapshot.top_errors[0].count, 2);
    assert_eq!(snapshot.top_errors[1].error, "51: Insufficient funds");
}

#[test]
fn test_shares_use_overall_total() {
    let coverage = CoverageAggregator::new();
    coverage.record(&outcome("00", "Approved", None), "BALANCE", Some(TransactionKind::BalanceInquiry));
    coverage.record(&TransactionOutcome::default(), "BALANCE", None);

    let snapshot = coverage.snapshot();
    // The outcome without a code still counts in the denominator
    assert_eq!(snapshot.code_share("00"), 50.0);
    assert_eq!(snapshot.kind_share(UNKNOWN_KIND), 50.0);
    assert!(snapshot.latency.average == 0.0);
}

#[test]
fn test_empty_snapshot() {
    let snapshot = CoverageAggregator::new().snapshot();
    assert_eq!(snapshot.total, 0);
    assert_eq!(snapshot.success_rate, 0.0);
    assert!(snapshot.top_errors.is_empty());
    assert!(snapshot.summary().starts_with("Total: 0"));
}

#[test]
fn test_top_errors_are_capped() {
    let coverage = CoverageAggregator::new();
    for i in 0..12 {
        coverage.record(&outcome(&format!("{:02}", 10 + i), "Declined", None), "LIMITS", None);
    }

    assert_eq!(coverage.snapshot().top_errors.len(), 10);
}

#[test]
fn test_reset_clears_everything() {
    let coverage = CoverageAggregator::new();
    coverage.record(&outcome("00", "Approved", Some(5)), "PURCHASE", Some(TransactionKind::Purchase));
    coverage.reset();

    let snapshot = coverage.snapshot();
    assert_eq!(snapshot.total, 0);
    assert!(snapshot.by_feature.is_empty());
    assert_eq!(coverage.total(), 0);
}

#[test]
fn test_concurrent_records_are_not_lost() {
    let coverage = std::sync::Arc::new(CoverageAggregator::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coverage = std::sync::Arc::clone(&coverage);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    coverage.record(&outcome("00", "Approved", Some(1)), "LOAD", Some(TransactionKind::Purchase));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = coverage.snapshot();
    assert_eq!(snapshot.total, 200);
    assert_eq!(snapshot.by_feature["LOAD"], 200);
    assert_eq!(snapshot.by_response_code["00"], 200);
}

#[test]
fn test_write_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let coverage = CoverageAggregator::new();
    coverage.record(&outcome("00", "Approved", Some(20)), "PURCHASE", Some(TransactionKind::Purchase));

    let path = coverage.write_json(dir.path()).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("coverage-report-"));
    assert!(name.ends_with(".json"));

    let written: CoverageSnapshot = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.total, 1);
    assert_eq!(written.by_kind["PURCHASE"], 1);
}

#[test]
fn test_dashboard_lists_codes() {
    let coverage = CoverageAggregator::new();
    coverage.record(&outcome("00", "Approved", Some(20)), "PURCHASE", Some(TransactionKind::Purchase));
    coverage.record(&outcome("05", "Do not honor", Some(30)), "PURCHASE", Some(TransactionKind::Purchase));

    let dashboard = coverage.snapshot().render_dashboard();
    assert!(dashboard.contains("Code 00"));
    assert!(dashboard.contains("Code 05"));
    assert!(dashboard.contains("TOP ERRORS"));
}
