//! Conformance engine for an ISO 8583 simulator
//!
//! Connection lifecycle, the transaction execution pipeline, per-scenario
//! context and run-wide coverage, wired together by [`Harness`].

pub mod config;
pub mod context;
pub mod error;
pub mod harness;
pub mod runner;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use config::{HarnessConfig, HarnessConfigBuilder};
pub use context::{ScenarioContext, ScenarioDiagnostics};
pub use error::{HarnessError, HarnessResult, TransportError, TransportErrorKind};
pub use harness::Harness;
pub use traits::*;
pub use types::*;
