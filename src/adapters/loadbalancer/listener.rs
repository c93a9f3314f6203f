use super::{certificate_reference, parent_id, renamed, ssl_details, ROLE_CERTIFICATE, ROLE_LOAD_BALANCER};
use crate::adapters::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{Listener, ListenerResource, ManagedObject, WorkRequestOperation};
use crate::provider::{self as cloud, CloudError, LoadBalancerClient, WorkRequest};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_DEFAULT_BACKEND_SET: &str = "defaultBackendSet";

pub struct ListenerAdapter {
    load_balancer: Arc<dyn LoadBalancerClient>,
}

impl std::fmt::Debug for ListenerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerAdapter").finish_non_exhaustive()
    }
}

impl ListenerAdapter {
    pub fn new(load_balancer: Arc<dyn LoadBalancerClient>) -> Self {
        Self { load_balancer }
    }

    fn load_balancer_id(obj: &Listener) -> Result<String, ReconcilerError> {
        parent_id(
            "Listener",
            obj.status.as_ref().and_then(|s| s.load_balancer_id.as_ref()),
        )
    }
}

#[async_trait]
impl Adapter for ListenerAdapter {
    type Object = Listener;

    fn references(&self, obj: &Listener) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new(
                ROLE_LOAD_BALANCER,
                "LoadBalancer",
                obj.spec.load_balancer_ref.clone(),
            ),
            Reference::new(
                ROLE_DEFAULT_BACKEND_SET,
                "BackendSet",
                obj.spec.default_backend_set_ref.clone(),
            ),
        ];
        refs.extend(certificate_reference(obj.spec.ssl_configuration.as_ref()));
        refs
    }

    fn lifecycle_state(&self, _obj: &Listener) -> Option<String> {
        None
    }

    async fn create(
        &self,
        obj: &mut Listener,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let load_balancer_id = refs.require(ROLE_LOAD_BALANCER)?.to_string();
        let details = cloud::CreateListenerDetails {
            name: obj.spec.name.clone(),
            default_backend_set_name: refs.require(ROLE_DEFAULT_BACKEND_SET)?.to_string(),
            port: obj.spec.port,
            protocol: obj.spec.protocol.as_str().to_string(),
            ssl_configuration: ssl_details(obj.spec.ssl_configuration.as_ref(), refs)?,
        };
        let work_request = self
            .load_balancer
            .create_listener(&load_balancer_id, &details, retry_token)
            .await?;
        let name = obj.spec.name.clone();
        obj.adopt_cloud_id(&name);
        obj.status_mut().load_balancer_id = Some(load_balancer_id);
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut Listener, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self
            .load_balancer
            .get_listener(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        obj.status_mut().resource = Some(ListenerResource {
            name: observed.name,
            default_backend_set_name: observed.default_backend_set_name,
            port: observed.port,
            protocol: observed.protocol,
            certificate_name: observed.ssl_configuration.map(|ssl| ssl.certificate_name),
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Listener,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let name = require_id(obj)?;
        if name != obj.spec.name {
            return Err(renamed("listener", &name, &obj.spec.name));
        }
        let details = cloud::UpdateListenerDetails {
            default_backend_set_name: refs.require(ROLE_DEFAULT_BACKEND_SET)?.to_string(),
            port: obj.spec.port,
            protocol: obj.spec.protocol.as_str().to_string(),
            ssl_configuration: ssl_details(obj.spec.ssl_configuration.as_ref(), refs)?,
        };
        let work_request = self
            .load_balancer
            .update_listener(
                &Self::load_balancer_id(obj)?,
                &name,
                &details,
                retry_token,
            )
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut Listener) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .load_balancer
            .delete_listener(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.load_balancer.get_work_request(id).await
    }

    fn work_request_succeeded(
        &self,
        _obj: &mut Listener,
        _operation: WorkRequestOperation,
        _work_request: &WorkRequest,
    ) {
    }

    fn is_resource_compliant(&self, obj: &Listener, refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.name == obj.spec.name
                    && Some(r.default_backend_set_name.as_str()) == refs.get(ROLE_DEFAULT_BACKEND_SET)
                    && r.port == obj.spec.port
                    && r.protocol == obj.spec.protocol.as_str()
                    && r.certificate_name.as_deref() == refs.get(ROLE_CERTIFICATE)
            })
    }
}
