//! Conformance engine services

pub mod connection_manager;
pub mod coverage;
pub mod http_transport;
pub mod pipeline;

#[cfg(test)]
pub mod tests;

pub use connection_manager::*;
pub use coverage::*;
pub use http_transport::*;
pub use pipeline::*;
