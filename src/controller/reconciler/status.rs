//! # Status Management
//!
//! Folds tick results into `status.common` and writes the status subresource,
//! skipping writes that would not change anything.

use super::types::{ErrorClass, ReconcilerError, RequeueReason, TickOutcome};
use super::Engine;
use crate::constants::FINALIZER;
use crate::controller::adapter::Adapter;
use crate::crd::{ManagedObject, OsokState, WorkRequestOperation, WorkRequestRecord, WorkRequestState};
use crate::observability::metrics;
use kube::Resource;
use tracing::{debug, info, warn};

impl<A: Adapter> Engine<A> {
    /// Add the engine's finalizer so deletions are seen before the object goes
    pub(super) async fn ensure_finalizer(
        &self,
        mut obj: A::Object,
    ) -> Result<A::Object, ReconcilerError> {
        if obj.has_finalizer(FINALIZER) {
            return Ok(obj);
        }
        obj.meta_mut()
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER.to_string());
        let stored = self.store.replace(&obj).await?;
        debug!("Added finalizer");
        Ok(stored)
    }

    pub(super) async fn release_finalizer(&self, obj: &mut A::Object) -> Result<(), ReconcilerError> {
        if let Some(finalizers) = obj.meta_mut().finalizers.as_mut() {
            finalizers.retain(|f| f != FINALIZER);
        }
        self.store.replace(obj).await?;
        info!("Released finalizer");
        Ok(())
    }

    /// Write the status subresource unless nothing changed since `original`
    pub(super) async fn persist_status(
        &self,
        original: &A::Object,
        obj: &mut A::Object,
    ) -> Result<(), ReconcilerError> {
        if self.adapter.equivalent(original, obj) {
            debug!("Skipping status update, nothing changed");
            return Ok(());
        }
        let stored = self.store.replace_status(obj).await?;
        obj.meta_mut().resource_version = stored.meta().resource_version.clone();
        Ok(())
    }

    pub(super) fn record_work_request(
        obj: &mut A::Object,
        id: String,
        operation: WorkRequestOperation,
    ) {
        info!(work_request = %id, operation = operation.as_str(), "Cloud accepted work request");
        obj.common_status_mut().work_request = Some(WorkRequestRecord {
            id,
            operation,
            state: WorkRequestState::Accepted,
        });
    }

    pub(super) fn mark_processed(&self, obj: &mut A::Object) {
        let status = obj.common_status_mut();
        // Ok never hands an error back
        let _ = status.handle_error(Ok(()));
        status.reset_counter = 0;
        status.work_request = None;
    }

    /// Error state with an exhausted reset counter; only a spec edit resumes it
    pub(super) fn is_parked(&self, obj: &A::Object) -> bool {
        !obj.is_terminating()
            && obj.common_status().is_some_and(|s| {
                s.state == OsokState::Error && s.reset_counter >= self.config.max_reset_counter
            })
    }

    /// Record a failed tick on the object and decide when to retry
    pub(super) async fn fail(
        &self,
        original: &A::Object,
        mut obj: A::Object,
        err: ReconcilerError,
    ) -> Result<TickOutcome, ReconcilerError> {
        let kind = self.adapter.kind();
        let class = err.class();
        if class == ErrorClass::StoreConflict {
            debug!(error = %err, "Store conflict, retrying with a fresh read");
            return Ok(TickOutcome::requeue(
                self.config.conflict_requeue,
                RequeueReason::Conflict,
            ));
        }
        metrics::increment_reconciliation_errors_total(kind, class.as_str());

        let status = obj.common_status_mut();
        match class {
            ErrorClass::ReferenceMissing | ErrorClass::ReferenceNotReady => {
                status.set_state(OsokState::Pending);
            }
            ErrorClass::DependentsPresent => {}
            _ => status.set_state(OsokState::Error),
        }
        status.reset_counter = status.reset_counter.saturating_add(1);
        status.message = err.to_string();
        let reset_counter = status.reset_counter;

        if class.is_reference() || class == ErrorClass::DependentsPresent {
            info!(error = %err, reset_counter, error.class = class.as_str(), "Waiting");
        } else {
            warn!(error = %err, reset_counter, error.class = class.as_str(), "Reconciliation failed");
        }

        match self.persist_status(original, &mut obj).await {
            Ok(()) => {}
            Err(ReconcilerError::StoreConflict(what)) => {
                debug!(object = %what, "Store conflict while recording error");
                return Ok(TickOutcome::requeue(
                    self.config.conflict_requeue,
                    RequeueReason::Conflict,
                ));
            }
            Err(e) => return Err(e),
        }

        if self.is_parked(&obj) {
            metrics::increment_parked_total(kind);
            warn!(
                reset_counter,
                max = self.config.max_reset_counter,
                "Reset counter exhausted, parking until the spec changes"
            );
            return Ok(TickOutcome::Parked);
        }
        Ok(TickOutcome::requeue(
            self.config.backoff.jittered(reset_counter),
            RequeueReason::Backoff,
        ))
    }
}
