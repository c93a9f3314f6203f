use super::{certificate_reference, parent_id, renamed, ssl_details, ROLE_CERTIFICATE, ROLE_LOAD_BALANCER};
use crate::adapters::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{BackendSet, BackendSetResource, ManagedObject, WorkRequestOperation};
use crate::provider::{self as cloud, CloudError, LoadBalancerClient, WorkRequest};
use async_trait::async_trait;
use std::sync::Arc;

pub struct BackendSetAdapter {
    load_balancer: Arc<dyn LoadBalancerClient>,
}

impl std::fmt::Debug for BackendSetAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSetAdapter").finish_non_exhaustive()
    }
}

impl BackendSetAdapter {
    pub fn new(load_balancer: Arc<dyn LoadBalancerClient>) -> Self {
        Self { load_balancer }
    }

    fn health_checker(obj: &BackendSet) -> cloud::HealthCheckerDetails {
        let checker = &obj.spec.health_checker;
        cloud::HealthCheckerDetails {
            protocol: checker.protocol.as_str().to_string(),
            port: checker.port,
            url_path: checker.url_path.clone(),
            return_code: checker.return_code,
            interval_in_millis: checker.interval_in_millis,
            timeout_in_millis: checker.timeout_in_millis,
            retries: checker.retries,
        }
    }

    fn load_balancer_id(obj: &BackendSet) -> Result<String, ReconcilerError> {
        parent_id(
            "BackendSet",
            obj.status.as_ref().and_then(|s| s.load_balancer_id.as_ref()),
        )
    }
}

#[async_trait]
impl Adapter for BackendSetAdapter {
    type Object = BackendSet;

    fn references(&self, obj: &BackendSet) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            ROLE_LOAD_BALANCER,
            "LoadBalancer",
            obj.spec.load_balancer_ref.clone(),
        )];
        refs.extend(certificate_reference(obj.spec.ssl_configuration.as_ref()));
        refs
    }

    fn lifecycle_state(&self, _obj: &BackendSet) -> Option<String> {
        None
    }

    async fn create(
        &self,
        obj: &mut BackendSet,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let load_balancer_id = refs.require(ROLE_LOAD_BALANCER)?.to_string();
        let details = cloud::CreateBackendSetDetails {
            name: obj.spec.name.clone(),
            policy: obj.spec.policy.as_str().to_string(),
            health_checker: Self::health_checker(obj),
            ssl_configuration: ssl_details(obj.spec.ssl_configuration.as_ref(), refs)?,
        };
        let work_request = self
            .load_balancer
            .create_backend_set(&load_balancer_id, &details, retry_token)
            .await?;
        let name = obj.spec.name.clone();
        obj.adopt_cloud_id(&name);
        obj.status_mut().load_balancer_id = Some(load_balancer_id);
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut BackendSet, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self
            .load_balancer
            .get_backend_set(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        obj.status_mut().resource = Some(BackendSetResource {
            name: observed.name,
            policy: observed.policy,
            health_check_protocol: observed.health_checker.protocol,
            certificate_name: observed.ssl_configuration.map(|ssl| ssl.certificate_name),
            backends: observed.backends.into_iter().map(|b| b.name).collect(),
        });
        Ok(())
    }

    /// The update call replaces the backend list, so the current one is sent back
    async fn update(
        &self,
        obj: &mut BackendSet,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let name = require_id(obj)?;
        if name != obj.spec.name {
            return Err(renamed("backend set", &name, &obj.spec.name));
        }
        let load_balancer_id = Self::load_balancer_id(obj)?;
        let current = self
            .load_balancer
            .get_backend_set(&load_balancer_id, &name)
            .await?;
        let details = cloud::UpdateBackendSetDetails {
            policy: obj.spec.policy.as_str().to_string(),
            health_checker: Self::health_checker(obj),
            ssl_configuration: ssl_details(obj.spec.ssl_configuration.as_ref(), refs)?,
            backends: current.backends.iter().map(cloud::Backend::to_details).collect(),
        };
        let work_request = self
            .load_balancer
            .update_backend_set(&load_balancer_id, &name, &details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut BackendSet) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .load_balancer
            .delete_backend_set(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.load_balancer.get_work_request(id).await
    }

    /// The name was recorded at submission
    fn work_request_succeeded(
        &self,
        _obj: &mut BackendSet,
        _operation: WorkRequestOperation,
        _work_request: &WorkRequest,
    ) {
    }

    fn is_resource_compliant(&self, obj: &BackendSet, refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.name == obj.spec.name
                    && r.policy == obj.spec.policy.as_str()
                    && r.health_check_protocol == obj.spec.health_checker.protocol.as_str()
                    && r.certificate_name.as_deref() == refs.get(ROLE_CERTIFICATE)
            })
    }
}
