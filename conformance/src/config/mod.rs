//! Configuration Management
//!
//! Simulator endpoint, client timeout, settle intervals and the card data
//! used to seed request builders.

pub mod builder;
pub mod harness;

pub use builder::HarnessConfigBuilder;
pub use harness::HarnessConfig;
