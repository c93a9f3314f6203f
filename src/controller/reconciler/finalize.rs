//! Delete path: release the cloud resource, then the finalizer.
//!
//! Nothing is deleted at the cloud while the object still has dependents.

use super::types::{ReconcilerError, RequeueReason, TickOutcome};
use super::work_request::WorkRequestProgress;
use super::Engine;
use crate::constants::FINALIZER;
use crate::controller::adapter::{Adapter, Submission};
use crate::crd::{ManagedObject, ObjectKey, WorkRequestOperation};
use crate::observability::metrics;
use tracing::{debug, info, warn};

impl<A: Adapter> Engine<A> {
    pub(super) async fn finalize(
        &self,
        key: &ObjectKey,
        obj: A::Object,
    ) -> Result<TickOutcome, ReconcilerError> {
        if !obj.has_finalizer(FINALIZER) {
            return Ok(TickOutcome::Done);
        }
        let original = obj.clone();
        let mut obj = obj;
        match self.drive_delete(key, &mut obj, &original).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.fail(&original, obj, err).await,
        }
    }

    async fn drive_delete(
        &self,
        key: &ObjectKey,
        obj: &mut A::Object,
        original: &A::Object,
    ) -> Result<TickOutcome, ReconcilerError> {
        self.prune_dependents(key, obj).await?;
        if let Some(status) = obj.common_status().filter(|s| s.has_dependents()) {
            let blocking = status
                .blocking_kinds()
                .into_iter()
                .map(ToString::to_string)
                .collect();
            return Err(ReconcilerError::DependentsPresent(blocking));
        }

        let mut deleted = false;
        if let Some(record) = obj.common_status().and_then(|s| s.work_request.clone()) {
            match self.poll_work_request(obj, &record).await? {
                WorkRequestProgress::Running => {
                    self.persist_status(original, obj).await?;
                    return Ok(TickOutcome::requeue(
                        self.config.work_request_poll,
                        RequeueReason::WorkRequest,
                    ));
                }
                WorkRequestProgress::Succeeded => {
                    deleted = record.operation == WorkRequestOperation::Delete;
                }
            }
        }

        if !deleted && self.adapter.id(obj).is_some() {
            metrics::increment_cloud_operations_total(self.adapter.kind(), "delete");
            info!(id = self.adapter.id(obj).unwrap_or_default(), "Deleting cloud resource");
            match self.adapter.delete(obj).await {
                Ok(Submission::Accepted { work_request_id }) => {
                    Self::record_work_request(obj, work_request_id, WorkRequestOperation::Delete);
                    self.persist_status(original, obj).await?;
                    return Ok(TickOutcome::requeue(
                        self.config.work_request_poll,
                        RequeueReason::WorkRequest,
                    ));
                }
                Ok(Submission::Completed) => {}
                Err(e) if e.is_gone() => debug!(error = %e, "Cloud resource already gone"),
                Err(e) => return Err(e),
            }
        }

        obj.clear_resource();
        if let Err(e) = self.adapter.after_delete(obj).await {
            warn!(error = %e, "Cleanup after delete failed");
        }

        self.release_parents(key, obj).await?;
        self.release_finalizer(obj).await?;
        Ok(TickOutcome::Done)
    }
}
