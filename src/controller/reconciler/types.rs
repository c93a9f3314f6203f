//! # Reconciler Types
//!
//! Error taxonomy, tick outcomes and engine settings.

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffPolicy;
use crate::controller::store::StoreError;
use crate::provider::CloudError;
use crate::secrets::{SecretError, WalletError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("reference {kind}/{name} not found")]
    ReferenceMissing { kind: String, name: String },

    #[error("reference {kind}/{name} is not ready: {reason}")]
    ReferenceNotReady {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("invalid spec: {0}")]
    Validation(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("cloud resource is in lifecycle state {0}")]
    LifecycleFailed(String),

    #[error("work request {id} {state}: {message}")]
    WorkRequestFailed {
        id: String,
        state: String,
        message: String,
    },

    #[error("waiting for dependents to be deleted: {}", .0.join(", "))]
    DependentsPresent(Vec<String>),

    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("reconciliation timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ReconcilerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => Self::StoreConflict(what),
            other => Self::Store(other),
        }
    }
}

/// Engine-level classification of every error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ReferenceMissing,
    ReferenceNotReady,
    CloudTransient,
    CloudPermanent,
    NotFoundOnDelete,
    DependentsPresent,
    WorkRequestFailed,
    StoreConflict,
    Validation,
    Internal,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReferenceMissing => "reference_missing",
            Self::ReferenceNotReady => "reference_not_ready",
            Self::CloudTransient => "cloud_transient",
            Self::CloudPermanent => "cloud_permanent",
            Self::NotFoundOnDelete => "not_found_on_delete",
            Self::DependentsPresent => "dependents_present",
            Self::WorkRequestFailed => "work_request_failed",
            Self::StoreConflict => "store_conflict",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Reference failures leave the object `Pending`; they never park it
    pub fn is_reference(self) -> bool {
        matches!(self, Self::ReferenceMissing | Self::ReferenceNotReady)
    }
}

impl ReconcilerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ReferenceMissing { .. } => ErrorClass::ReferenceMissing,
            Self::ReferenceNotReady { .. } => ErrorClass::ReferenceNotReady,
            Self::Validation(_) => ErrorClass::Validation,
            Self::Cloud(e) if e.is_not_found() => ErrorClass::NotFoundOnDelete,
            Self::Cloud(e) if e.is_transient() => ErrorClass::CloudTransient,
            Self::Cloud(_) | Self::LifecycleFailed(_) | Self::Wallet(_) => ErrorClass::CloudPermanent,
            Self::WorkRequestFailed { .. } => ErrorClass::WorkRequestFailed,
            Self::DependentsPresent(_) => ErrorClass::DependentsPresent,
            Self::StoreConflict(_) => ErrorClass::StoreConflict,
            Self::Secret(_) | Self::Timeout(_) => ErrorClass::CloudTransient,
            Self::Store(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// True for cloud errors meaning the resource is already gone or going
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Cloud(e) if e.is_not_found() || e.is_already_deleting())
    }
}

/// Why a tick asked to be run again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueReason {
    /// Steady state; periodic drift check
    Resync,
    /// Outstanding cloud work request
    WorkRequest,
    /// Cloud lifecycle is provisioning, updating, ...
    Transitional,
    /// Error retry
    Backoff,
    /// Optimistic-concurrency reject
    Conflict,
}

impl RequeueReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resync => "resync",
            Self::WorkRequest => "work-request",
            Self::Transitional => "transitional",
            Self::Backoff => "error-backoff",
            Self::Conflict => "conflict",
        }
    }
}

/// Result of one reconciliation tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Requeue {
        after: Duration,
        reason: RequeueReason,
    },
    /// Reset counter exhausted; waits for a spec edit
    Parked,
    /// Object is gone or its finalizer was released
    Done,
}

impl TickOutcome {
    pub fn requeue(after: Duration, reason: RequeueReason) -> Self {
        Self::Requeue { after, reason }
    }

    pub fn reason(&self) -> Option<RequeueReason> {
        match self {
            Self::Requeue { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Engine settings shared by every kind
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_reset_counter: u32,
    pub reconcile_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub work_request_poll: Duration,
    pub transitional_poll: Duration,
    pub resync: Duration,
    pub conflict_requeue: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

impl From<&ControllerConfig> for EngineConfig {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            max_reset_counter: config.max_reset_counter,
            reconcile_timeout: Duration::from_secs(config.reconcile_timeout_secs),
            backoff: BackoffPolicy::new(
                Duration::from_secs(config.backoff_base_secs),
                Duration::from_secs(config.backoff_max_secs),
            ),
            work_request_poll: Duration::from_secs(config.work_request_poll_secs),
            transitional_poll: Duration::from_secs(config.transitional_poll_secs),
            resync: Duration::from_secs(config.resync_secs),
            conflict_requeue: Duration::from_millis(crate::constants::STORE_CONFLICT_REQUEUE_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let missing = ReconcilerError::ReferenceMissing {
            kind: "Compartment".into(),
            name: "c1".into(),
        };
        assert_eq!(missing.class(), ErrorClass::ReferenceMissing);
        assert!(missing.class().is_reference());
        assert_eq!(missing.to_string(), "reference Compartment/c1 not found");

        let throttled: ReconcilerError = CloudError::TooManyRequests("slow".into()).into();
        assert_eq!(throttled.class(), ErrorClass::CloudTransient);

        let denied: ReconcilerError = CloudError::NotAuthorized("no".into()).into();
        assert_eq!(denied.class(), ErrorClass::CloudPermanent);

        let conflict: ReconcilerError = StoreError::Conflict("ns/a".into()).into();
        assert_eq!(conflict.class(), ErrorClass::StoreConflict);
    }

    #[test]
    fn test_dependents_message_names_kinds() {
        let err = ReconcilerError::DependentsPresent(vec!["BackendSet".into(), "Listener".into()]);
        assert_eq!(
            err.to_string(),
            "waiting for dependents to be deleted: BackendSet, Listener"
        );
    }

    #[test]
    fn test_gone_errors() {
        let gone: ReconcilerError = CloudError::NotAuthorizedOrNotFound("x".into()).into();
        assert!(gone.is_gone());
        let deleting: ReconcilerError = CloudError::AlreadyDeleting("x".into()).into();
        assert!(deleting.is_gone());
        let other: ReconcilerError = CloudError::InvalidParameter("x".into()).into();
        assert!(!other.is_gone());
    }
}
