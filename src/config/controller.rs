//! # Controller Configuration
//!
//! Reconciliation engine settings loaded from environment variables.

use super::{env_var_or_default, optional_env_var};
use std::path::PathBuf;

/// Engine and watch configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Consecutive errors after which an object in `Error` stops being retried
    pub max_reset_counter: u32,
    /// Deadline for a single reconciliation tick (seconds)
    pub reconcile_timeout_secs: u64,
    /// First error retry delay (seconds)
    pub backoff_base_secs: u64,
    /// Ceiling for error retry delays (seconds)
    pub backoff_max_secs: u64,
    /// Poll cadence for outstanding work requests (seconds)
    pub work_request_poll_secs: u64,
    /// Poll cadence while a cloud lifecycle is transitional (seconds)
    pub transitional_poll_secs: u64,
    /// Steady-state resync interval (seconds)
    pub resync_secs: u64,
    /// Scratch space for wallet unpacking; system temp dir when unset
    pub wallet_scratch_dir: Option<PathBuf>,
    /// Restrict every controller to one namespace; all namespaces when unset
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            max_reset_counter: DEFAULT_MAX_RESET_COUNTER,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            work_request_poll_secs: DEFAULT_WORK_REQUEST_POLL_SECS,
            transitional_poll_secs: DEFAULT_TRANSITIONAL_POLL_SECS,
            resync_secs: DEFAULT_RESYNC_SECS,
            wallet_scratch_dir: None,
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            max_reset_counter: env_var_or_default("MAX_RESET_COUNTER", DEFAULT_MAX_RESET_COUNTER),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            backoff_base_secs: env_var_or_default("BACKOFF_BASE_SECS", DEFAULT_BACKOFF_BASE_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            work_request_poll_secs: env_var_or_default(
                "WORK_REQUEST_POLL_SECS",
                DEFAULT_WORK_REQUEST_POLL_SECS,
            ),
            transitional_poll_secs: env_var_or_default(
                "TRANSITIONAL_POLL_SECS",
                DEFAULT_TRANSITIONAL_POLL_SECS,
            ),
            resync_secs: env_var_or_default("RESYNC_SECS", DEFAULT_RESYNC_SECS),
            wallet_scratch_dir: optional_env_var("WALLET_SCRATCH_DIR").map(PathBuf::from),
            watch_namespace: optional_env_var("WATCH_NAMESPACE"),
        }
    }
}
