//! HTTP-level integration tests against a stubbed simulator
//!
//! Uses wiremock to stand in for the simulator so the real reqwest transport,
//! connection manager and pipeline are exercised end to end.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use conformance::{Harness, HarnessConfig};
use shared::{ErrorClass, TransactionKind};

async fn harness_for(server: &MockServer, timeout: Duration) -> Harness {
    let config = HarnessConfig::builder()
        .base_url(server.uri())
        .timeout(timeout)
        .no_settle()
        .build()
        .expect("valid test config");
    Harness::new(config).expect("harness should build")
}

async fn mount_connect(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/connection/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "mode": "real",
            "simulatorType": "ISO8583",
            "tcpConnectionRequired": true
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_purchase_round_trip() {
    let server = MockServer::start().await;
    mount_connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions/purchase"))
        .and(body_partial_json(json!({
            "pan": "4218281008687192",
            "terminalId": "ATM001LP",
            "processingCode": "000000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "successful": true,
            "responseCode": "00",
            "responseMessage": "Approved",
            "stan": "000042",
            "mti": "0210",
            "fields": {"39": "00", "37": "123456789012"},
            "retrievalReferenceNumber": "123456789012"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_secs(5)).await;
    harness.begin_run();

    let mut ctx = harness.begin_scenario("Approved purchase");
    ctx.new_builder(TransactionKind::Purchase);
    let outcome = ctx.send_current().await.unwrap();

    assert!(outcome.success);
    assert!(outcome.has_mti("0210"));
    assert_eq!(outcome.rrn(), Some("123456789012"));
    assert_eq!(outcome.fields.get_iso(37), Some("123456789012"));
    assert_eq!(outcome.http_status_code, Some(200));

    harness.finish_scenario(&ctx, "PURCHASE", false).await;
    let snapshot = harness.coverage().snapshot();
    assert_eq!(snapshot.total, 1);
    assert_eq!(snapshot.by_kind["PURCHASE"], 1);
    assert_eq!(snapshot.success_rate, 100.0);
}

#[tokio::test]
async fn test_decline_reply_keeps_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions/cash-advance"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "successful": false,
            "responseCode": "51",
            "responseMessage": "Insufficient funds",
            "errorType": "DECLINED"
        })))
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_secs(5)).await;
    let mut ctx = harness.begin_scenario("Declined cash advance");
    ctx.new_builder(TransactionKind::CashAdvance);
    let request = ctx.build_and_set().unwrap();

    let outcome = harness.pipeline().execute(&request).await;

    assert!(!outcome.success);
    assert_eq!(outcome.http_status_code, Some(422));
    assert!(!outcome.is_http_success());
    assert_eq!(outcome.error_message(), "DECLINED: Insufficient funds");
}

#[tokio::test]
async fn test_authorization_timeout_is_system_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions/authorization"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"successful": true, "responseCode": "00"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_millis(200)).await;
    let mut ctx = harness.begin_scenario("Authorization timeout");
    ctx.new_builder(TransactionKind::Authorization);
    let request = ctx.build_current().unwrap();

    let outcome = harness.pipeline().execute(&request).await;

    assert_eq!(outcome.classification(), Some(ErrorClass::SystemError));
    assert_eq!(outcome.response_code(), "96");
    assert_eq!(outcome.http_status_code, Some(500));
    assert!(!outcome.success);
}

#[tokio::test]
async fn test_non_json_reply_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/transactions/balance-inquiry"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_secs(5)).await;
    let mut ctx = harness.begin_scenario("Unavailable simulator");
    ctx.new_builder(TransactionKind::BalanceInquiry);
    let request = ctx.build_current().unwrap();

    let outcome = harness.pipeline().execute(&request).await;

    assert_eq!(outcome.classification(), Some(ErrorClass::ParseError));
    assert_eq!(outcome.http_status_code, Some(503));
}

#[tokio::test]
async fn test_mode_switch_posts_lowercase_once() {
    let server = MockServer::start().await;
    mount_connect(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/simulator/mode/mock"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"mode": "MOCK"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_secs(5)).await;
    let connection = harness.connection();

    assert!(connection.set_mode("MOCK").await);
    assert!(connection.set_mode("Mock").await);
    assert_eq!(connection.mode().await, "MOCK");
}

#[tokio::test]
async fn test_status_and_no_response_endpoints() {
    let server = MockServer::start().await;
    mount_connect(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/connection/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connected": true,
            "channelConnected": true,
            "mode": "REAL",
            "socketInfo": {"remote": "10.0.0.5:8583"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/config/no-response"))
        .and(query_param("noResponse", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness_for(&server, Duration::from_secs(5)).await;
    let connection = harness.connection();

    assert!(connection.connect().await);
    let status = connection.status().await;
    assert!(status.is_fully_connected());
    assert_eq!(status.socket_info, Some(json!({"remote": "10.0.0.5:8583"})));

    assert!(connection.set_no_response(true).await);
    assert!(connection.is_simulator_available().await);
}

#[tokio::test]
async fn test_unreachable_simulator_fails_soft() {
    // Nothing listens on the discard port
    let config = HarnessConfig::builder()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .no_settle()
        .build()
        .unwrap();
    let harness = Harness::new(config).unwrap();

    let mut ctx = harness.begin_scenario("No simulator");
    assert!(!ctx.connect_if_needed().await);
    assert!(!harness.connection().status().await.is_fully_connected());

    ctx.new_builder(TransactionKind::Deposit);
    let outcome = ctx.send_current().await.unwrap();
    assert_eq!(outcome.classification(), Some(ErrorClass::SystemError));

    harness.finish_scenario(&ctx, "DEPOSIT", true).await;
    assert_eq!(harness.coverage().snapshot().by_response_code["96"], 1);
}
