//! Backends are named `<ip>:<port>` inside their backend set. The IP comes
//! from the spec or from the referenced instance's primary VNIC.

use super::{parent_id, ROLE_LOAD_BALANCER};
use crate::adapters::compute::primary_vnic;
use crate::adapters::require_id;
use crate::constants::OCID_PREFIX;
use crate::controller::adapter::{Adapter, Reference, Submission, ATTR_PRIVATE_IP};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::reconciler::validation;
use crate::controller::references::ResolvedRefs;
use crate::crd::{Backend, BackendResource, ManagedObject, WorkRequestOperation};
use crate::provider::{
    self as cloud, CloudError, ComputeClient, LoadBalancerClient, VirtualNetworkClient,
    WorkRequest,
};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_BACKEND_SET: &str = "backendSet";
const ROLE_INSTANCE: &str = "instance";
/// Weight the service assigns when none is given
const DEFAULT_WEIGHT: u16 = 1;

pub struct BackendAdapter {
    load_balancer: Arc<dyn LoadBalancerClient>,
    compute: Arc<dyn ComputeClient>,
    network: Arc<dyn VirtualNetworkClient>,
}

impl std::fmt::Debug for BackendAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendAdapter").finish_non_exhaustive()
    }
}

pub(crate) fn backend_name(ip_address: &str, port: u16) -> String {
    format!("{ip_address}:{port}")
}

impl BackendAdapter {
    pub fn new(
        load_balancer: Arc<dyn LoadBalancerClient>,
        compute: Arc<dyn ComputeClient>,
        network: Arc<dyn VirtualNetworkClient>,
    ) -> Self {
        Self {
            load_balancer,
            compute,
            network,
        }
    }

    /// Parent ids recorded at submission: load balancer and backend set name
    fn placement(obj: &Backend) -> Result<(String, String), ReconcilerError> {
        let status = obj.status.as_ref();
        let load_balancer_id = parent_id(
            "Backend",
            status.and_then(|s| s.load_balancer_id.as_ref()),
        )?;
        let backend_set_name = status
            .and_then(|s| s.backend_set_name.clone())
            .ok_or_else(|| ReconcilerError::Internal("Backend has no backend set name".into()))?;
        Ok((load_balancer_id, backend_set_name))
    }

    async fn ip_address(
        &self,
        obj: &Backend,
        refs: &ResolvedRefs,
    ) -> Result<String, ReconcilerError> {
        if let Some(ip) = &obj.spec.ip_address {
            return Ok(ip.clone());
        }
        let instance = refs.require(ROLE_INSTANCE)?;
        if !instance.starts_with(OCID_PREFIX) {
            // Sibling references resolve straight to the private IP
            return Ok(instance.to_string());
        }
        let observed = self.compute.get_instance(instance).await?;
        primary_vnic(
            self.compute.as_ref(),
            self.network.as_ref(),
            &observed.compartment_id,
            &observed.id,
        )
        .await?
        .and_then(|vnic| vnic.private_ip)
        .ok_or_else(|| ReconcilerError::ReferenceNotReady {
            kind: "ComputeInstance".to_string(),
            name: instance.to_string(),
            reason: "no private IP yet".to_string(),
        })
    }

    fn update_details(obj: &Backend) -> cloud::UpdateBackendDetails {
        cloud::UpdateBackendDetails {
            weight: obj.spec.weight,
            backup: obj.spec.backup,
            drain: obj.spec.drain,
            offline: obj.spec.offline,
        }
    }
}

#[async_trait]
impl Adapter for BackendAdapter {
    type Object = Backend;

    fn references(&self, obj: &Backend) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new(
                ROLE_LOAD_BALANCER,
                "LoadBalancer",
                obj.spec.load_balancer_ref.clone(),
            ),
            Reference::new(
                ROLE_BACKEND_SET,
                "BackendSet",
                obj.spec.backend_set_ref.clone(),
            ),
        ];
        if let Some(instance) = &obj.spec.instance_ref {
            refs.push(
                Reference::new(ROLE_INSTANCE, "ComputeInstance", instance.clone())
                    .reading(ATTR_PRIVATE_IP),
            );
        }
        refs
    }

    fn validate(&self, obj: &Backend) -> Result<(), ReconcilerError> {
        validation::validate_object_name(obj)?;
        validation::validate_references(&self.references(obj))?;
        match (&obj.spec.instance_ref, &obj.spec.ip_address) {
            (Some(_), Some(_)) => Err(ReconcilerError::Validation(
                "set either instanceRef or ipAddress, not both".to_string(),
            )),
            (None, None) => Err(ReconcilerError::Validation(
                "one of instanceRef or ipAddress is required".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn lifecycle_state(&self, _obj: &Backend) -> Option<String> {
        None
    }

    async fn create(
        &self,
        obj: &mut Backend,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let load_balancer_id = refs.require(ROLE_LOAD_BALANCER)?.to_string();
        let backend_set_name = refs.require(ROLE_BACKEND_SET)?.to_string();
        let ip_address = self.ip_address(obj, refs).await?;
        let details = cloud::BackendDetails {
            ip_address: ip_address.clone(),
            port: obj.spec.port,
            weight: obj.spec.weight,
            backup: Some(obj.spec.backup),
            drain: Some(obj.spec.drain),
            offline: Some(obj.spec.offline),
        };
        let work_request = self
            .load_balancer
            .create_backend(&load_balancer_id, &backend_set_name, &details, retry_token)
            .await?;
        obj.adopt_cloud_id(&backend_name(&ip_address, obj.spec.port));
        let status = obj.status_mut();
        status.load_balancer_id = Some(load_balancer_id);
        status.backend_set_name = Some(backend_set_name);
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut Backend, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let (load_balancer_id, backend_set_name) = Self::placement(obj)?;
        let name = require_id(obj)?;
        let observed = self
            .load_balancer
            .get_backend(&load_balancer_id, &backend_set_name, &name)
            .await?;
        obj.status_mut().resource = Some(BackendResource {
            name: observed.name,
            ip_address: observed.ip_address,
            port: observed.port,
            weight: observed.weight,
            backup: observed.backup,
            drain: observed.drain,
            offline: observed.offline,
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Backend,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let (load_balancer_id, backend_set_name) = Self::placement(obj)?;
        let name = require_id(obj)?;
        let work_request = self
            .load_balancer
            .update_backend(
                &load_balancer_id,
                &backend_set_name,
                &name,
                &Self::update_details(obj),
                retry_token,
            )
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut Backend) -> Result<Submission, ReconcilerError> {
        let (load_balancer_id, backend_set_name) = Self::placement(obj)?;
        let name = require_id(obj)?;
        let work_request = self
            .load_balancer
            .delete_backend(&load_balancer_id, &backend_set_name, &name)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.load_balancer.get_work_request(id).await
    }

    fn work_request_succeeded(
        &self,
        _obj: &mut Backend,
        _operation: WorkRequestOperation,
        _work_request: &WorkRequest,
    ) {
    }

    fn is_resource_compliant(&self, obj: &Backend, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                obj.spec
                    .weight
                    .is_none_or(|w| r.weight.unwrap_or(DEFAULT_WEIGHT) == w)
                    && r.backup == obj.spec.backup
                    && r.drain == obj.spec.drain
                    && r.offline == obj.spec.offline
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::BackendSpec;
    use std::collections::BTreeMap;

    fn backend(instance_ref: Option<&str>, ip_address: Option<&str>) -> Backend {
        Backend::new(
            "web-1",
            BackendSpec {
                load_balancer_ref: "lb".into(),
                backend_set_ref: "pool".into(),
                instance_ref: instance_ref.map(Into::into),
                ip_address: ip_address.map(Into::into),
                port: 8080,
                weight: None,
                backup: false,
                drain: false,
                offline: false,
                depends_on: BTreeMap::new(),
            },
        )
    }

    fn adapter() -> BackendAdapter {
        let cloud = Arc::new(crate::testing::FakeCloud::new());
        BackendAdapter::new(cloud.clone(), cloud.clone(), cloud)
    }

    #[test]
    fn test_backend_needs_exactly_one_address_source() {
        let adapter = adapter();
        assert!(adapter.validate(&backend(Some("web"), None)).is_ok());
        assert!(adapter.validate(&backend(None, Some("10.0.0.9"))).is_ok());
        assert!(matches!(
            adapter.validate(&backend(Some("web"), Some("10.0.0.9"))),
            Err(ReconcilerError::Validation(_))
        ));
        assert!(matches!(
            adapter.validate(&backend(None, None)),
            Err(ReconcilerError::Validation(_))
        ));
    }

    fn observed(obj: &mut Backend, weight: Option<u16>) {
        obj.status_mut().resource = Some(BackendResource {
            name: "10.0.0.9:8080".into(),
            ip_address: "10.0.0.9".into(),
            port: 8080,
            weight,
            backup: false,
            drain: false,
            offline: false,
        });
    }

    #[test]
    fn test_unset_weight_accepts_service_default() {
        let adapter = adapter();
        let refs = ResolvedRefs::default();
        let mut obj = backend(None, Some("10.0.0.9"));
        observed(&mut obj, Some(1));
        assert!(adapter.is_resource_compliant(&obj, &refs));
        observed(&mut obj, Some(5));
        assert!(adapter.is_resource_compliant(&obj, &refs));

        obj.spec.weight = Some(3);
        assert!(!adapter.is_resource_compliant(&obj, &refs));
        observed(&mut obj, Some(3));
        assert!(adapter.is_resource_compliant(&obj, &refs));

        obj.spec.weight = Some(1);
        observed(&mut obj, None);
        assert!(adapter.is_resource_compliant(&obj, &refs));
    }

    #[test]
    fn test_instance_reference_reads_private_ip() {
        let refs = adapter().references(&backend(Some("web"), None));
        let instance = refs.iter().find(|r| r.role == ROLE_INSTANCE).unwrap();
        assert_eq!(instance.attribute, ATTR_PRIVATE_IP);
        assert_eq!(backend_name("10.0.0.9", 8080), "10.0.0.9:8080");
    }
}
