//! # Runtime
//!
//! Process startup, the per-kind controller loops, and the policy applied to
//! errors that escape the engine.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::{run_watch_loop, ControllerContext};
