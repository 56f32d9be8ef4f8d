//! # Observability Module
//!
//! Structured logging setup. Metrics are emitted through the `metrics` facade
//! by the transport client; installing an exporter is left to the embedding
//! process.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};
