//! # Observability
//!
//! Prometheus metrics served on `/metrics`. Logging goes through `tracing`
//! and is configured at startup.

pub mod metrics;
