//! Service tests against a mocked simulator transport

pub mod coverage;

use std::sync::Arc;
use std::time::Duration;

use shared::{TestDataDefaults, TransactionKind, TransactionRequest};

use crate::context::ScenarioContext;
use crate::services::connection_manager::ConnectionManager;
use crate::services::pipeline::TransactionPipeline;
use crate::traits::MockSimulatorTransport;
use crate::types::RawReply;

pub(crate) const BASE_URL: &str = "http://simulator.test";

pub(crate) fn reply(status: u16, body: serde_json::Value) -> RawReply {
    RawReply::new(status, body.to_string())
}

pub(crate) fn connected_reply() -> RawReply {
    reply(200, serde_json::json!({"mode": "real", "simulatorType": "ISO8583", "tcpConnectionRequired": true}))
}

pub(crate) fn approved_reply() -> RawReply {
    reply(
        200,
        serde_json::json!({
            "successful": true,
            "responseCode": "00",
            "responseMessage": "Approved",
            "stan": "000101",
            "mti": "0210",
            "fields": {"39": "00", "38": "A1B2C3"}
        }),
    )
}

/// Mock with a base URL; expectations are added by each test
pub(crate) fn mock_transport() -> MockSimulatorTransport {
    let mut mock = MockSimulatorTransport::new();
    mock.expect_base_url().return_const(BASE_URL.to_string());
    mock
}

pub(crate) fn manager(mock: MockSimulatorTransport) -> Arc<ConnectionManager> {
    Arc::new(ConnectionManager::new(Arc::new(mock), Duration::ZERO, Duration::ZERO))
}

/// Pipeline and manager sharing one mocked transport
pub(crate) fn wired(mock: MockSimulatorTransport) -> (Arc<ConnectionManager>, Arc<TransactionPipeline>) {
    let transport: Arc<dyn crate::traits::SimulatorTransport> = Arc::new(mock);
    let connection = Arc::new(ConnectionManager::new(Arc::clone(&transport), Duration::ZERO, Duration::ZERO));
    let pipeline = Arc::new(TransactionPipeline::new(transport, Arc::clone(&connection)));
    (connection, pipeline)
}

pub(crate) fn context(mock: MockSimulatorTransport) -> ScenarioContext {
    let (connection, pipeline) = wired(mock);
    ScenarioContext::new("test scenario", connection, pipeline, TestDataDefaults::default())
}

pub(crate) fn valid_request(kind: TransactionKind) -> TransactionRequest {
    TransactionRequest::builder()
        .kind(kind)
        .apply_kind_defaults()
        .seed_from(&TestDataDefaults::default())
        .build()
}
