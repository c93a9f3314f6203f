//! Polling of outstanding cloud work requests.
//!
//! A recorded work request is never resubmitted: every tick that finds one
//! polls it instead, until it reaches a terminal state.

use super::types::ReconcilerError;
use super::Engine;
use crate::controller::adapter::Adapter;
use crate::crd::{ManagedObject, WorkRequestRecord, WorkRequestState};
use crate::observability::metrics;
use tracing::{debug, info, warn};

/// Where an outstanding work request stands after one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WorkRequestProgress {
    /// Still accepted or in progress; the recorded state is up to date
    Running,
    /// Finished; the record is cleared and its result applied to the object
    Succeeded,
}

impl<A: Adapter> Engine<A> {
    /// Poll `record` and fold the result into `obj`
    ///
    /// A failed or canceled request clears the record and comes back as
    /// `WorkRequestFailed`.
    pub(super) async fn poll_work_request(
        &self,
        obj: &mut A::Object,
        record: &WorkRequestRecord,
    ) -> Result<WorkRequestProgress, ReconcilerError> {
        let work_request = self.adapter.work_request(&record.id).await?;
        metrics::increment_work_request_polls_total(self.adapter.kind(), work_request.state.as_str());

        match work_request.state {
            WorkRequestState::Succeeded => {
                info!(
                    work_request = %record.id,
                    operation = record.operation.as_str(),
                    "Work request succeeded"
                );
                obj.common_status_mut().work_request = None;
                self.adapter
                    .work_request_succeeded(obj, record.operation, &work_request);
                Ok(WorkRequestProgress::Succeeded)
            }
            WorkRequestState::Failed | WorkRequestState::Canceled => {
                warn!(
                    work_request = %record.id,
                    operation = record.operation.as_str(),
                    state = work_request.state.as_str(),
                    "Work request did not complete"
                );
                obj.common_status_mut().work_request = None;
                self.adapter.work_request_failed(obj, record.operation);
                Err(ReconcilerError::WorkRequestFailed {
                    id: record.id.clone(),
                    state: work_request.state.as_str().to_string(),
                    message: work_request.message.unwrap_or_default(),
                })
            }
            running => {
                if record.state != running {
                    debug!(
                        work_request = %record.id,
                        from = record.state.as_str(),
                        to = running.as_str(),
                        "Work request progressed"
                    );
                    obj.common_status_mut().work_request = Some(WorkRequestRecord {
                        state: running,
                        ..record.clone()
                    });
                }
                Ok(WorkRequestProgress::Running)
            }
        }
    }
}
