use super::{parent_id, renamed, ROLE_LOAD_BALANCER};
use crate::adapters::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{Certificate, CertificateResource, ManagedObject, WorkRequestOperation};
use crate::provider::{self as cloud, CloudError, LoadBalancerClient, WorkRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Certificates cannot be changed in place; a new bundle needs a new name
pub struct CertificateAdapter {
    load_balancer: Arc<dyn LoadBalancerClient>,
}

impl std::fmt::Debug for CertificateAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAdapter").finish_non_exhaustive()
    }
}

impl CertificateAdapter {
    pub fn new(load_balancer: Arc<dyn LoadBalancerClient>) -> Self {
        Self { load_balancer }
    }

    fn load_balancer_id(obj: &Certificate) -> Result<String, ReconcilerError> {
        parent_id(
            "Certificate",
            obj.status.as_ref().and_then(|s| s.load_balancer_id.as_ref()),
        )
    }
}

fn same_pem(observed: Option<&str>, desired: Option<&str>) -> bool {
    match desired {
        Some(desired) => observed.is_some_and(|o| o.trim() == desired.trim()),
        None => true,
    }
}

#[async_trait]
impl Adapter for CertificateAdapter {
    type Object = Certificate;

    fn references(&self, obj: &Certificate) -> Vec<Reference> {
        vec![Reference::new(
            ROLE_LOAD_BALANCER,
            "LoadBalancer",
            obj.spec.load_balancer_ref.clone(),
        )]
    }

    fn lifecycle_state(&self, _obj: &Certificate) -> Option<String> {
        None
    }

    async fn create(
        &self,
        obj: &mut Certificate,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let load_balancer_id = refs.require(ROLE_LOAD_BALANCER)?.to_string();
        let details = cloud::CreateCertificateDetails {
            certificate_name: obj.spec.certificate_name.clone(),
            public_certificate: obj.spec.public_certificate.clone(),
            ca_certificate: obj.spec.ca_certificate.clone(),
            private_key: obj.spec.private_key.clone(),
            passphrase: obj.spec.passphrase.clone(),
        };
        let work_request = self
            .load_balancer
            .create_certificate(&load_balancer_id, &details, retry_token)
            .await?;
        let name = obj.spec.certificate_name.clone();
        obj.adopt_cloud_id(&name);
        obj.status_mut().load_balancer_id = Some(load_balancer_id);
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut Certificate, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self
            .load_balancer
            .get_certificate(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        obj.status_mut().resource = Some(CertificateResource {
            certificate_name: observed.certificate_name,
            public_certificate: observed.public_certificate,
            ca_certificate: observed.ca_certificate,
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Certificate,
        _refs: &ResolvedRefs,
        _retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let name = require_id(obj)?;
        if name != obj.spec.certificate_name {
            return Err(renamed("certificate", &name, &obj.spec.certificate_name));
        }
        Err(ReconcilerError::Validation(format!(
            "certificate {name} cannot be changed in place; use a new certificateName"
        )))
    }

    async fn delete(&self, obj: &mut Certificate) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .load_balancer
            .delete_certificate(&Self::load_balancer_id(obj)?, &require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.load_balancer.get_work_request(id).await
    }

    fn work_request_succeeded(
        &self,
        _obj: &mut Certificate,
        _operation: WorkRequestOperation,
        _work_request: &WorkRequest,
    ) {
    }

    fn is_resource_compliant(&self, obj: &Certificate, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.certificate_name == obj.spec.certificate_name
                    && same_pem(
                        r.public_certificate.as_deref(),
                        obj.spec.public_certificate.as_deref(),
                    )
                    && same_pem(r.ca_certificate.as_deref(), obj.spec.ca_certificate.as_deref())
            })
    }
}
