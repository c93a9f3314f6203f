//! Engine integration scenarios
//!
//! Drives the reconciliation engine through the in-memory harness: a fake
//! cloud, fake object and secret stores, and one engine per managed kind.
//! Each test ticks objects explicitly, so ordering is deterministic and no
//! cluster or cloud account is needed.
//!
//! Run with: `cargo test --test integration_engine_scenarios`

#[path = "integration/engine_scenarios/mod.rs"]
mod engine_scenarios;

pub use engine_scenarios::*;
