//! # Constants
//!
//! Defaults and well-known names shared across the operator.

/// API group served by every managed kind
pub const API_GROUP: &str = "oci.oracle.com";

/// API version served by every managed kind
pub const API_VERSION: &str = "v1beta1";

/// Finalizer placed on every adopted object so the engine observes deletions
pub const FINALIZER: &str = "oci.oracle.com/finalizer";

/// Field manager used for writes to the custom-resource store
pub const FIELD_MANAGER: &str = "oci-service-operator";

/// Prefix identifying a native cloud identifier inside a `*Ref` field
pub const OCID_PREFIX: &str = "ocid1.";

/// Message recorded on the common status after a successful tick
pub const STATUS_OK: &str = "OK";

// Server defaults
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

// Engine defaults
pub const DEFAULT_MAX_RESET_COUNTER: u32 = 30;
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
pub const DEFAULT_WORK_REQUEST_POLL_SECS: u64 = 10;
pub const DEFAULT_TRANSITIONAL_POLL_SECS: u64 = 15;
pub const DEFAULT_RESYNC_SECS: u64 = 600;

/// Requeue delay after an optimistic-concurrency reject
pub const STORE_CONFLICT_REQUEUE_MS: u64 = 500;

/// Watch timeout handed to the API server so idle watches are closed server-side
pub const WATCH_TIMEOUT_SECS: u32 = 290;

// Cloud configuration defaults
pub const DEFAULT_CREDENTIALS_SECRET: &str = "oci-credentials";
pub const DEFAULT_CREDENTIALS_NAMESPACE: &str = "oci-service-operator-system";

// Autonomous database side artifacts
pub const PASSWORD_LENGTH: usize = 30;
pub const PASSWORD_SECRET_KEY: &str = "password";
pub const WALLET_SECRET_SUFFIX: &str = "-wallet";
