//! Virtual network and subnet adapters.

use super::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{ManagedObject, Subnet, SubnetResource, VirtualNetwork, VirtualNetworkResource};
use crate::provider::{self as cloud, VirtualNetworkClient};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_COMPARTMENT: &str = "compartment";
const ROLE_VCN: &str = "vcn";

pub struct VirtualNetworkAdapter {
    network: Arc<dyn VirtualNetworkClient>,
}

impl std::fmt::Debug for VirtualNetworkAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualNetworkAdapter").finish_non_exhaustive()
    }
}

impl VirtualNetworkAdapter {
    pub fn new(network: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { network }
    }

    fn record(obj: &mut VirtualNetwork, observed: cloud::Vcn) {
        obj.adopt_cloud_id(&observed.id);
        obj.status_mut().resource = Some(VirtualNetworkResource {
            display_name: observed.display_name,
            compartment_id: observed.compartment_id,
            cidr_blocks: observed.cidr_blocks,
            dns_label: observed.dns_label,
            lifecycle_state: observed.lifecycle_state,
        });
    }
}

#[async_trait]
impl Adapter for VirtualNetworkAdapter {
    type Object = VirtualNetwork;

    fn references(&self, obj: &VirtualNetwork) -> Vec<Reference> {
        vec![Reference::new(
            ROLE_COMPARTMENT,
            "Compartment",
            obj.spec.compartment_ref.clone(),
        )]
    }

    fn lifecycle_state(&self, obj: &VirtualNetwork) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut VirtualNetwork,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateVcnDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            display_name: obj.spec.display_name.clone(),
            cidr_blocks: obj.spec.cidr_blocks.clone(),
            dns_label: obj.spec.dns_label.clone(),
        };
        let created = self.network.create_vcn(&details, retry_token).await?;
        Self::record(obj, created);
        Ok(Submission::Completed)
    }

    async fn get(
        &self,
        obj: &mut VirtualNetwork,
        _refs: &ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let observed = self.network.get_vcn(&require_id(obj)?).await?;
        Self::record(obj, observed);
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut VirtualNetwork,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateVcnDetails {
            display_name: Some(obj.spec.display_name.clone()),
        };
        let updated = self.network.update_vcn(&require_id(obj)?, &details, retry_token).await?;
        Self::record(obj, updated);
        Ok(Submission::Completed)
    }

    async fn delete(&self, obj: &mut VirtualNetwork) -> Result<Submission, ReconcilerError> {
        self.network.delete_vcn(&require_id(obj)?).await?;
        Ok(Submission::Completed)
    }

    fn is_resource_compliant(&self, obj: &VirtualNetwork, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| r.display_name == obj.spec.display_name)
    }
}

pub struct SubnetAdapter {
    network: Arc<dyn VirtualNetworkClient>,
}

impl std::fmt::Debug for SubnetAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubnetAdapter").finish_non_exhaustive()
    }
}

impl SubnetAdapter {
    pub fn new(network: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { network }
    }

    fn record(obj: &mut Subnet, observed: cloud::Subnet) {
        obj.adopt_cloud_id(&observed.id);
        obj.status_mut().resource = Some(SubnetResource {
            display_name: observed.display_name,
            compartment_id: observed.compartment_id,
            vcn_id: observed.vcn_id,
            cidr_block: observed.cidr_block,
            dns_label: observed.dns_label,
            prohibit_public_ip: observed.prohibit_public_ip_on_vnic,
            lifecycle_state: observed.lifecycle_state,
        });
    }
}

#[async_trait]
impl Adapter for SubnetAdapter {
    type Object = Subnet;

    fn references(&self, obj: &Subnet) -> Vec<Reference> {
        vec![
            Reference::new(ROLE_COMPARTMENT, "Compartment", obj.spec.compartment_ref.clone()),
            Reference::new(ROLE_VCN, "VirtualNetwork", obj.spec.vcn_ref.clone()),
        ]
    }

    fn lifecycle_state(&self, obj: &Subnet) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut Subnet,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateSubnetDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            vcn_id: refs.require(ROLE_VCN)?.to_string(),
            display_name: obj.spec.display_name.clone(),
            cidr_block: obj.spec.cidr_block.clone(),
            dns_label: obj.spec.dns_label.clone(),
            prohibit_public_ip_on_vnic: obj.spec.prohibit_public_ip,
        };
        let created = self.network.create_subnet(&details, retry_token).await?;
        Self::record(obj, created);
        Ok(Submission::Completed)
    }

    async fn get(&self, obj: &mut Subnet, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self.network.get_subnet(&require_id(obj)?).await?;
        Self::record(obj, observed);
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Subnet,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateSubnetDetails {
            display_name: Some(obj.spec.display_name.clone()),
            cidr_block: Some(obj.spec.cidr_block.clone()),
        };
        let updated = self
            .network
            .update_subnet(&require_id(obj)?, &details, retry_token)
            .await?;
        Self::record(obj, updated);
        Ok(Submission::Completed)
    }

    async fn delete(&self, obj: &mut Subnet) -> Result<Submission, ReconcilerError> {
        self.network.delete_subnet(&require_id(obj)?).await?;
        Ok(Submission::Completed)
    }

    fn is_resource_compliant(&self, obj: &Subnet, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.display_name == obj.spec.display_name && r.cidr_block == obj.spec.cidr_block
            })
    }
}
