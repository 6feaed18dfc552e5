//! Shared model for the simulator conformance harness
//!
//! Transaction kinds, requests, outcomes and the ISO field container used by
//! the engine and by anything that inspects its results.

pub mod batch;
pub mod errors;
pub mod fields;
pub mod kind;
pub mod logging;
pub mod outcome;
pub mod request;
pub mod validation;

pub use batch::BatchSummary;
pub use errors::*;
pub use fields::FieldSet;
pub use kind::TransactionKind;
pub use outcome::{ErrorClass, TransactionOutcome};
pub use request::{TestDataDefaults, TransactionRequest, TransactionRequestBuilder};
