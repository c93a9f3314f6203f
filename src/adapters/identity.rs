//! Compartment adapter.

use super::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{Compartment, CompartmentResource, ManagedObject};
use crate::provider::{self as cloud, IdentityClient};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_COMPARTMENT: &str = "compartment";

pub struct CompartmentAdapter {
    identity: Arc<dyn IdentityClient>,
    tenancy_id: String,
}

impl std::fmt::Debug for CompartmentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompartmentAdapter")
            .field("tenancy_id", &self.tenancy_id)
            .finish_non_exhaustive()
    }
}

impl CompartmentAdapter {
    pub fn new(identity: Arc<dyn IdentityClient>, tenancy_id: String) -> Self {
        Self {
            identity,
            tenancy_id,
        }
    }

    fn record(obj: &mut Compartment, observed: cloud::Compartment) {
        obj.adopt_cloud_id(&observed.id);
        obj.status_mut().resource = Some(CompartmentResource {
            name: observed.name,
            description: observed.description,
            compartment_id: observed.compartment_id,
            lifecycle_state: observed.lifecycle_state,
            freeform_tags: observed.freeform_tags,
        });
    }
}

#[async_trait]
impl Adapter for CompartmentAdapter {
    type Object = Compartment;

    fn references(&self, obj: &Compartment) -> Vec<Reference> {
        obj.spec
            .compartment_ref
            .iter()
            .map(|parent| Reference::new(ROLE_COMPARTMENT, "Compartment", parent.clone()))
            .collect()
    }

    fn lifecycle_state(&self, obj: &Compartment) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut Compartment,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateCompartmentDetails {
            compartment_id: refs
                .get(ROLE_COMPARTMENT)
                .unwrap_or(self.tenancy_id.as_str())
                .to_string(),
            name: obj.spec.name.clone(),
            description: obj.spec.description.clone(),
            freeform_tags: obj.spec.freeform_tags.clone(),
        };
        let created = self.identity.create_compartment(&details, retry_token).await?;
        Self::record(obj, created);
        Ok(Submission::Completed)
    }

    async fn get(&self, obj: &mut Compartment, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self.identity.get_compartment(&require_id(obj)?).await?;
        Self::record(obj, observed);
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Compartment,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateCompartmentDetails {
            name: Some(obj.spec.name.clone()),
            description: Some(obj.spec.description.clone()),
            freeform_tags: Some(obj.spec.freeform_tags.clone()),
        };
        let updated = self
            .identity
            .update_compartment(&require_id(obj)?, &details, retry_token)
            .await?;
        Self::record(obj, updated);
        Ok(Submission::Completed)
    }

    async fn delete(&self, obj: &mut Compartment) -> Result<Submission, ReconcilerError> {
        self.identity.delete_compartment(&require_id(obj)?).await?;
        Ok(Submission::Completed)
    }

    fn is_resource_compliant(&self, obj: &Compartment, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.name == obj.spec.name
                    && r.description == obj.spec.description
                    && r.freeform_tags == obj.spec.freeform_tags
            })
    }
}
