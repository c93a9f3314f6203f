//! # Load Balancer Adapters
//!
//! The load balancer itself has a cloud id. Its backend sets, backends,
//! listeners and certificates do not: they are addressed by name inside the
//! load balancer, so their "id" is that name and the parent load balancer id
//! is kept next to it in the status. Every mutation returns a work request.

mod backend;
mod backend_set;
mod certificate;
mod listener;

pub use backend::BackendAdapter;
pub use backend_set::BackendSetAdapter;
pub use certificate::CertificateAdapter;
pub use listener::ListenerAdapter;

use super::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{LoadBalancer, LoadBalancerResource, ManagedObject, SslConfiguration};
use crate::provider::{self as cloud, CloudError, LoadBalancerClient, WorkRequest};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_COMPARTMENT: &str = "compartment";
const ROLE_SUBNETS: &str = "subnets";
pub(crate) const ROLE_LOAD_BALANCER: &str = "loadBalancer";
pub(crate) const ROLE_CERTIFICATE: &str = "certificate";

/// The certificate an SSL configuration names, as a reference
pub(crate) fn certificate_reference(ssl: Option<&SslConfiguration>) -> Option<Reference> {
    ssl.map(|ssl| Reference::new(ROLE_CERTIFICATE, "Certificate", ssl.certificate_ref.clone()))
}

pub(crate) fn ssl_details(
    ssl: Option<&SslConfiguration>,
    refs: &ResolvedRefs,
) -> Result<Option<cloud::SslConfigurationDetails>, ReconcilerError> {
    let Some(ssl) = ssl else {
        return Ok(None);
    };
    Ok(Some(cloud::SslConfigurationDetails {
        certificate_name: refs.require(ROLE_CERTIFICATE)?.to_string(),
        verify_depth: ssl.verify_depth,
        verify_peer_certificate: Some(ssl.verify_peer_certificate),
    }))
}

/// Load balancer a nested object was created in
pub(crate) fn parent_id(kind: &str, load_balancer_id: Option<&String>) -> Result<String, ReconcilerError> {
    load_balancer_id
        .cloned()
        .ok_or_else(|| ReconcilerError::Internal(format!("{kind} has no load balancer id")))
}

/// Names are the cloud identity of nested objects and cannot change in place
pub(crate) fn renamed(what: &str, created: &str, desired: &str) -> ReconcilerError {
    ReconcilerError::Validation(format!(
        "{what} {created} cannot be renamed to {desired}; delete it and create a new one"
    ))
}

pub struct LoadBalancerAdapter {
    load_balancer: Arc<dyn LoadBalancerClient>,
}

impl std::fmt::Debug for LoadBalancerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancerAdapter").finish_non_exhaustive()
    }
}

impl LoadBalancerAdapter {
    pub fn new(load_balancer: Arc<dyn LoadBalancerClient>) -> Self {
        Self { load_balancer }
    }
}

#[async_trait]
impl Adapter for LoadBalancerAdapter {
    type Object = LoadBalancer;

    fn references(&self, obj: &LoadBalancer) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            ROLE_COMPARTMENT,
            "Compartment",
            obj.spec.compartment_ref.clone(),
        )];
        refs.extend(Reference::many(ROLE_SUBNETS, "Subnet", &obj.spec.subnet_refs));
        refs
    }

    fn lifecycle_state(&self, obj: &LoadBalancer) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut LoadBalancer,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateLoadBalancerDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            display_name: obj.spec.display_name.clone(),
            shape_name: obj.spec.shape_name.as_str().to_string(),
            subnet_ids: refs.all(ROLE_SUBNETS).to_vec(),
            is_private: obj.spec.is_private,
        };
        let work_request = self
            .load_balancer
            .create_load_balancer(&details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut LoadBalancer, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self
            .load_balancer
            .get_load_balancer(&require_id(obj)?)
            .await?;
        obj.status_mut().resource = Some(LoadBalancerResource {
            display_name: observed.display_name,
            compartment_id: observed.compartment_id,
            shape_name: observed.shape_name,
            subnet_ids: observed.subnet_ids,
            is_private: observed.is_private,
            ip_addresses: observed
                .ip_addresses
                .into_iter()
                .map(|ip| ip.ip_address)
                .collect(),
            lifecycle_state: observed.lifecycle_state,
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut LoadBalancer,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateLoadBalancerDetails {
            display_name: Some(obj.spec.display_name.clone()),
        };
        let work_request = self
            .load_balancer
            .update_load_balancer(&require_id(obj)?, &details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut LoadBalancer) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .load_balancer
            .delete_load_balancer(&require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.load_balancer.get_work_request(id).await
    }

    fn is_resource_compliant(&self, obj: &LoadBalancer, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| r.display_name == obj.spec.display_name)
    }
}
