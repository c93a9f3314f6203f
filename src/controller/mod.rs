//! # Controller
//!
//! The dependency-aware reconciliation runtime shared by every kind:
//! adapter contract, kind registry, reference resolution, custom-resource
//! stores, the engine itself and the health/metrics server.

pub mod adapter;
pub mod backoff;
pub mod reconciler;
pub mod references;
pub mod registry;
pub mod server;
pub mod store;
