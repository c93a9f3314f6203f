//! Apply path: drive a live object to `Processed`.

use super::types::{ReconcilerError, RequeueReason, TickOutcome};
use super::Engine;
use crate::controller::adapter::{Adapter, Submission};
use crate::controller::references::Resolver;
use crate::crd::{ManagedObject, ObjectKey, OsokState, WorkRequestOperation};
use crate::observability::metrics;
use super::work_request::WorkRequestProgress;
use kube::Resource;
use tracing::{debug, info};

impl<A: Adapter> Engine<A> {
    pub(super) async fn apply(
        &self,
        key: &ObjectKey,
        obj: A::Object,
    ) -> Result<TickOutcome, ReconcilerError> {
        let mut obj = self.ensure_finalizer(obj).await?;
        let original = obj.clone();

        let generation = obj.meta().generation;
        let status = obj.common_status_mut();
        if generation.is_some() && status.observed_generation != generation {
            if status.reset_counter > 0 {
                info!(
                    generation = generation.unwrap_or_default(),
                    reset_counter = status.reset_counter,
                    "Spec changed, resetting error counter"
                );
            }
            status.reset_counter = 0;
            status.observed_generation = generation;
        }

        if self.is_parked(&obj) {
            debug!("Reset counter exhausted, waiting for a spec edit");
            self.persist_status(&original, &mut obj).await?;
            return Ok(TickOutcome::Parked);
        }

        match self.drive(key, &mut obj, &original).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.fail(&original, obj, err).await,
        }
    }

    async fn drive(
        &self,
        key: &ObjectKey,
        obj: &mut A::Object,
        original: &A::Object,
    ) -> Result<TickOutcome, ReconcilerError> {
        let kind = self.adapter.kind();
        self.adapter.validate(obj)?;

        let resolver = Resolver::new(&self.registry, &key.namespace);
        let refs = self.adapter.depends_on_refs(obj, &resolver).await?;
        self.register_with_parents(key, &refs).await?;

        let retry_token = Self::retry_token(obj, key);
        let pending = obj.common_status().and_then(|s| s.work_request.clone());

        if let Some(record) = pending {
            match self.poll_work_request(obj, &record).await? {
                WorkRequestProgress::Running => {
                    self.persist_status(original, obj).await?;
                    return Ok(self.requeue_work_request());
                }
                WorkRequestProgress::Succeeded => self.adapter.get(obj, &refs).await?,
            }
        } else if self.adapter.id(obj).is_none() {
            metrics::increment_cloud_operations_total(kind, "create");
            info!("Creating cloud resource");
            if let Submission::Accepted { work_request_id } =
                self.adapter.create(obj, &refs, &retry_token).await?
            {
                Self::record_work_request(obj, work_request_id, WorkRequestOperation::Create);
                self.persist_status(original, obj).await?;
                return Ok(self.requeue_work_request());
            }
        } else {
            self.adapter.get(obj, &refs).await?;
        }

        if let Some(state) = self.adapter.failed_lifecycle(obj) {
            return Err(ReconcilerError::LifecycleFailed(state));
        }

        if self.adapter.is_transitional(obj) {
            obj.common_status_mut().set_state(OsokState::Created);
            if self.adapter.is_resource_status_changed(original, obj) {
                debug!(
                    lifecycle = self.adapter.lifecycle_state(obj).unwrap_or_default(),
                    "Lifecycle changed"
                );
            }
            self.persist_status(original, obj).await?;
            return Ok(TickOutcome::requeue(
                self.config.transitional_poll,
                RequeueReason::Transitional,
            ));
        }

        if !self.adapter.is_resource_compliant(obj, &refs) {
            metrics::increment_cloud_operations_total(kind, "update");
            info!("Cloud resource drifted from spec, updating");
            if let Submission::Accepted { work_request_id } =
                self.adapter.update(obj, &refs, &retry_token).await?
            {
                Self::record_work_request(obj, work_request_id, WorkRequestOperation::Update);
                self.persist_status(original, obj).await?;
                return Ok(self.requeue_work_request());
            }
        }

        self.adapter.after_ready(obj).await?;

        let was_processed = original.state() == OsokState::Processed;
        self.mark_processed(obj);
        self.persist_status(original, obj).await?;

        if !was_processed {
            info!(id = self.adapter.id(obj).unwrap_or_default(), "Resource processed");
            self.fan_out(key, obj).await;
        }
        Ok(TickOutcome::requeue(self.config.resync, RequeueReason::Resync))
    }

    fn requeue_work_request(&self) -> TickOutcome {
        TickOutcome::requeue(self.config.work_request_poll, RequeueReason::WorkRequest)
    }
}
