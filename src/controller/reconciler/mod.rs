//! # Reconciler
//!
//! The generic engine run for every kind. One [`Engine`] per kind drives its
//! adapter through create, observe, update and delete:
//!
//! - `lifecycle`: the apply path for live objects
//! - `finalize`: the delete path for terminating objects
//! - `work_request`: polling of outstanding asynchronous cloud operations
//! - `dependents`: parent registration, release and fan-out
//! - `status`: error folding, parking and status persistence
//!
//! A tick re-reads the object by key, so every decision is made against the
//! latest `resourceVersion`. Long waits are requeues, never sleeps.

mod dependents;
mod finalize;
mod lifecycle;
mod status;
pub mod types;
pub mod validation;
mod work_request;

use crate::controller::adapter::Adapter;
use crate::controller::registry::KindRegistry;
use crate::controller::store::ObjectStore;
use crate::crd::{ManagedObject, ObjectKey};
use crate::observability::metrics;
use async_trait::async_trait;
use kube::Resource;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};
use types::{EngineConfig, ReconcilerError, TickOutcome};

/// One reconciliation tick for one object key
#[async_trait]
pub trait Ticker: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn tick(&self, key: &ObjectKey) -> Result<TickOutcome, ReconcilerError>;
}

/// Reconciliation engine for the kind served by `A`
pub struct Engine<A: Adapter> {
    adapter: Arc<A>,
    store: Arc<dyn ObjectStore<A::Object>>,
    registry: Arc<KindRegistry>,
    config: EngineConfig,
}

impl<A: Adapter> std::fmt::Debug for Engine<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.adapter.kind())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<A: Adapter> Engine<A> {
    pub fn new(
        adapter: Arc<A>,
        store: Arc<dyn ObjectStore<A::Object>>,
        registry: Arc<KindRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            adapter,
            store,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore<A::Object>> {
        &self.store
    }

    /// Idempotence token sent with cloud create and update calls
    fn retry_token(obj: &A::Object, key: &ObjectKey) -> String {
        obj.meta()
            .uid
            .clone()
            .filter(|uid| !uid.is_empty())
            .unwrap_or_else(|| key.to_string())
    }

    async fn run_tick(&self, key: &ObjectKey) -> Result<TickOutcome, ReconcilerError> {
        let Some(obj) = self.store.get(key).await? else {
            debug!("Object no longer exists");
            return Ok(TickOutcome::Done);
        };
        if obj.is_terminating() {
            self.finalize(key, obj).await
        } else {
            self.apply(key, obj).await
        }
    }
}

#[async_trait]
impl<A: Adapter> Ticker for Engine<A> {
    fn kind(&self) -> &'static str {
        self.adapter.kind()
    }

    async fn tick(&self, key: &ObjectKey) -> Result<TickOutcome, ReconcilerError> {
        let kind = self.adapter.kind();
        let span = info_span!(
            "reconcile",
            resource.kind = kind,
            resource.namespace = %key.namespace,
            resource.name = %key.name,
        );
        async {
            let start = Instant::now();
            metrics::increment_reconciliations_total(kind);

            let outcome = tokio::time::timeout(self.config.reconcile_timeout, self.run_tick(key))
                .await
                .unwrap_or(Err(ReconcilerError::Timeout(self.config.reconcile_timeout)));

            metrics::observe_reconciliation_duration(kind, start.elapsed().as_secs_f64());
            match &outcome {
                Ok(TickOutcome::Requeue { reason, after }) => {
                    metrics::increment_requeues_total(reason.as_str());
                    debug!(reason = reason.as_str(), after_ms = after.as_millis(), "Requeue");
                }
                Ok(_) => {}
                Err(e) => metrics::increment_reconciliation_errors_total(kind, e.class().as_str()),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}
