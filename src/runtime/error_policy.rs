//! # Error Policy
//!
//! The engine folds cloud and reference failures into the object's status and
//! schedules its own retries. What reaches this module escaped that path:
//! store failures, timeouts, and watch stream errors.

use crate::controller::adapter::Adapter;
use crate::controller::reconciler::types::{EngineConfig, ReconcilerError};
use crate::controller::reconciler::Engine;
use crate::crd::ManagedObject;
use crate::observability::metrics;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Requeue an object whose tick failed outside the engine's own handling
pub fn handle_reconciliation_error<A: Adapter>(
    obj: Arc<A::Object>,
    error: &ReconcilerError,
    engine: Arc<Engine<A>>,
) -> Action {
    let reset_counter = obj.common_status().map_or(0, |s| s.reset_counter);
    let delay = retry_delay(engine.config(), error, reset_counter);
    error!(
        resource.name = %obj.name_any(),
        resource.namespace = %obj.namespace().unwrap_or_default(),
        error = %error,
        retry_in_ms = delay.as_millis(),
        "Reconciliation error"
    );
    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Conflicts retry promptly; anything else backs off on the object's error count
pub fn retry_delay(config: &EngineConfig, error: &ReconcilerError, reset_counter: u32) -> Duration {
    match error {
        ReconcilerError::StoreConflict(_) => config.conflict_requeue,
        _ => config.backoff.jittered(reset_counter.saturating_add(1)),
    }
}

/// What a watch stream error means for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version expired, the watch relists
    Expired,
    /// 429: API server storage reinitializing
    Throttled,
    /// The object vanished between event and reconcile
    NotFound,
    Other,
}

pub fn classify_watch_error(message: &str) -> WatchErrorKind {
    if message.contains("401") || message.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if message.contains("410")
        || message.contains("too old resource version")
        || message.contains("Expired")
        || message.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if message.contains("429")
        || message.contains("storage is (re)initializing")
        || message.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else if message.contains("ObjectNotFound")
        || (message.contains("404") && message.contains("not found"))
    {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Log one controller stream item; the stream itself backs off and relists
pub fn log_controller_result<T: std::fmt::Debug, E: std::fmt::Display>(
    kind: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => debug!(kind, ?action, "Reconciliation completed"),
            Err(e) => {
                let message = e.to_string();
                match classify_watch_error(&message) {
                    WatchErrorKind::Unauthorized => {
                        error!(kind, error = %message, "Watch unauthorized; check the operator's ClusterRole and ServiceAccount");
                    }
                    WatchErrorKind::Expired => {
                        warn!(kind, error = %message, "Watch resource version expired, relisting");
                    }
                    WatchErrorKind::Throttled => {
                        warn!(kind, error = %message, "API server is throttling the watch");
                    }
                    WatchErrorKind::NotFound => {
                        debug!(kind, error = %message, "Object deleted before reconcile");
                    }
                    WatchErrorKind::Other => error!(kind, error = %message, "Controller stream error"),
                }
            }
        }
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_with_reset_counter() {
        let mut config = EngineConfig::default();
        config.backoff = crate::controller::backoff::BackoffPolicy::new(
            Duration::from_secs(2),
            Duration::from_secs(300),
        );
        let error = ReconcilerError::Internal("timed out".into());
        for _ in 0..20 {
            let first = retry_delay(&config, &error, 0);
            let fifth = retry_delay(&config, &error, 4);
            assert!(first <= Duration::from_secs(3), "{first:?}");
            assert!(fifth >= Duration::from_secs(16), "{fifth:?}");
        }
        let conflict = ReconcilerError::StoreConflict("resourceVersion".into());
        assert_eq!(retry_delay(&config, &conflict, 7), config.conflict_requeue);
    }

    #[test]
    fn test_classify_watch_error() {
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorKind::Unauthorized
        );
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorKind::Expired
        );
        assert_eq!(
            classify_watch_error("storage is (re)initializing"),
            WatchErrorKind::Throttled
        );
        assert_eq!(
            classify_watch_error("ObjectNotFound: compartments/c1"),
            WatchErrorKind::NotFound
        );
        assert_eq!(classify_watch_error("connection reset"), WatchErrorKind::Other);
    }
}
