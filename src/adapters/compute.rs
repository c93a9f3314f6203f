//! Compute instance adapter.
//!
//! The primary VNIC is not part of the instance model; it is discovered
//! through the instance's VNIC attachments once the instance runs, and its
//! private IP is what backends referencing the instance read.

use super::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission, ATTR_ID, ATTR_PRIVATE_IP};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{
    ComputeInstance, ComputeInstanceResource, ManagedObject, PrimaryVnic, ShapeConfig,
};
use crate::provider::{self as cloud, ComputeClient, VirtualNetworkClient};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const ROLE_COMPARTMENT: &str = "compartment";
const ROLE_SUBNET: &str = "subnet";
const RUNNING: &str = "RUNNING";

pub struct ComputeInstanceAdapter {
    compute: Arc<dyn ComputeClient>,
    network: Arc<dyn VirtualNetworkClient>,
}

impl std::fmt::Debug for ComputeInstanceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeInstanceAdapter").finish_non_exhaustive()
    }
}

impl ComputeInstanceAdapter {
    pub fn new(compute: Arc<dyn ComputeClient>, network: Arc<dyn VirtualNetworkClient>) -> Self {
        Self { compute, network }
    }

    fn shape_config(obj: &ComputeInstance) -> Option<cloud::InstanceShapeConfig> {
        if !obj.spec.shape.is_flex() {
            return None;
        }
        obj.spec
            .shape_config
            .as_ref()
            .map(|config| cloud::InstanceShapeConfig {
                ocpus: config.ocpus,
                memory_in_gbs: config.memory_in_gbs,
            })
    }

    /// Mirror the instance, keeping a VNIC discovered earlier
    fn record(obj: &mut ComputeInstance, observed: cloud::Instance) {
        obj.adopt_cloud_id(&observed.id);
        let primary_vnic = obj
            .status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .and_then(|r| r.primary_vnic.clone());
        obj.status_mut().resource = Some(ComputeInstanceResource {
            display_name: observed.display_name,
            compartment_id: observed.compartment_id,
            availability_domain: observed.availability_domain,
            shape: observed.shape,
            shape_config: observed.shape_config.map(|config| ShapeConfig {
                ocpus: config.ocpus,
                memory_in_gbs: config.memory_in_gbs,
            }),
            lifecycle_state: observed.lifecycle_state,
            primary_vnic,
        });
    }

    async fn refresh_vnic(&self, obj: &mut ComputeInstance) -> Result<(), ReconcilerError> {
        let Some(resource) = obj.status.as_ref().and_then(|s| s.resource.as_ref()) else {
            return Ok(());
        };
        if resource.lifecycle_state != RUNNING || obj.private_ip().is_some() {
            return Ok(());
        }
        let compartment_id = resource.compartment_id.clone();
        let instance_id = require_id(obj)?;
        let vnic = primary_vnic(
            self.compute.as_ref(),
            self.network.as_ref(),
            &compartment_id,
            &instance_id,
        )
        .await?;
        if let Some(resource) = obj.status_mut().resource.as_mut() {
            resource.primary_vnic = vnic;
        }
        Ok(())
    }
}

/// Primary VNIC of a running instance, if one is attached yet
pub(crate) async fn primary_vnic(
    compute: &dyn ComputeClient,
    network: &dyn VirtualNetworkClient,
    compartment_id: &str,
    instance_id: &str,
) -> Result<Option<PrimaryVnic>, ReconcilerError> {
    let attachments = compute
        .list_vnic_attachments(compartment_id, instance_id)
        .await?;
    for attachment in attachments
        .iter()
        .filter(|a| a.lifecycle_state.eq_ignore_ascii_case("ATTACHED"))
    {
        let Some(vnic_id) = attachment.vnic_id.as_deref() else {
            continue;
        };
        let vnic = network.get_vnic(vnic_id).await?;
        if vnic.is_primary {
            return Ok(Some(PrimaryVnic {
                id: vnic.id,
                private_ip: vnic.private_ip,
                public_ip: vnic.public_ip,
            }));
        }
    }
    debug!(instance_id, "No primary VNIC attached yet");
    Ok(None)
}

#[async_trait]
impl Adapter for ComputeInstanceAdapter {
    type Object = ComputeInstance;

    fn references(&self, obj: &ComputeInstance) -> Vec<Reference> {
        vec![
            Reference::new(ROLE_COMPARTMENT, "Compartment", obj.spec.compartment_ref.clone()),
            Reference::new(ROLE_SUBNET, "Subnet", obj.spec.subnet_ref.clone()),
        ]
    }

    fn is_ready(&self, obj: &ComputeInstance) -> bool {
        obj.cloud_id().is_some()
            && obj.state() == crate::crd::OsokState::Processed
            && !obj.is_terminating()
            && obj.private_ip().is_some()
    }

    fn attributes(&self, obj: &ComputeInstance) -> BTreeMap<String, String> {
        let mut attributes = BTreeMap::new();
        if let Some(id) = obj.cloud_id() {
            attributes.insert(ATTR_ID.to_string(), id.to_string());
        }
        if let Some(ip) = obj.private_ip() {
            attributes.insert(ATTR_PRIVATE_IP.to_string(), ip.to_string());
        }
        attributes
    }

    fn lifecycle_state(&self, obj: &ComputeInstance) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    /// Running without a known private IP still counts as settling
    fn is_transitional(&self, obj: &ComputeInstance) -> bool {
        match self.lifecycle_state(obj) {
            Some(state) if state.eq_ignore_ascii_case(RUNNING) => obj.private_ip().is_none(),
            Some(state) => {
                let state = state.to_ascii_uppercase();
                state == "PROVISIONING"
                    || state == "STARTING"
                    || state == "STOPPING"
                    || state == "TERMINATING"
                    || state.ends_with("_IN_PROGRESS")
            }
            None => false,
        }
    }

    async fn create(
        &self,
        obj: &mut ComputeInstance,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::LaunchInstanceDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            availability_domain: obj.spec.availability_domain.clone(),
            display_name: obj.spec.display_name.clone(),
            shape: obj.spec.shape.as_str().to_string(),
            shape_config: Self::shape_config(obj),
            create_vnic_details: cloud::CreateVnicDetails {
                subnet_id: refs.require(ROLE_SUBNET)?.to_string(),
                assign_public_ip: None,
            },
            source_details: cloud::InstanceSourceDetails::image(obj.spec.image_id.clone()),
        };
        let launched = self.compute.launch_instance(&details, retry_token).await?;
        Self::record(obj, launched);
        self.refresh_vnic(obj).await?;
        Ok(Submission::Completed)
    }

    async fn get(
        &self,
        obj: &mut ComputeInstance,
        _refs: &ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let observed = self.compute.get_instance(&require_id(obj)?).await?;
        Self::record(obj, observed);
        self.refresh_vnic(obj).await
    }

    async fn update(
        &self,
        obj: &mut ComputeInstance,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateInstanceDetails {
            display_name: Some(obj.spec.display_name.clone()),
            shape: Some(obj.spec.shape.as_str().to_string()),
            shape_config: Self::shape_config(obj),
        };
        let updated = self
            .compute
            .update_instance(&require_id(obj)?, &details, retry_token)
            .await?;
        Self::record(obj, updated);
        Ok(Submission::Completed)
    }

    async fn delete(&self, obj: &mut ComputeInstance) -> Result<Submission, ReconcilerError> {
        self.compute.terminate_instance(&require_id(obj)?).await?;
        Ok(Submission::Completed)
    }

    fn is_resource_compliant(&self, obj: &ComputeInstance, _refs: &ResolvedRefs) -> bool {
        let Some(resource) = obj.status.as_ref().and_then(|s| s.resource.as_ref()) else {
            return false;
        };
        let shape_config_matches = !obj.spec.shape.is_flex()
            || obj.spec.shape_config.is_none()
            || resource.shape_config == obj.spec.shape_config;
        resource.display_name == obj.spec.display_name
            && resource.shape == obj.spec.shape.as_str()
            && shape_config_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCloud;

    #[tokio::test]
    async fn test_primary_vnic_found_through_attachment() {
        let cloud = FakeCloud::new();
        cloud.queue_private_ip("10.0.5.7");
        let instance = cloud
            .launch_instance(
                &cloud::LaunchInstanceDetails {
                    compartment_id: "ocid1.compartment.oc1..c".into(),
                    availability_domain: "AD-1".into(),
                    display_name: "web".into(),
                    shape: "VM.Standard2.1".into(),
                    shape_config: None,
                    create_vnic_details: cloud::CreateVnicDetails {
                        subnet_id: "ocid1.subnet.oc1..s".into(),
                        assign_public_ip: None,
                    },
                    source_details: cloud::InstanceSourceDetails::image("ocid1.image.oc1..i"),
                },
                "token",
            )
            .await
            .unwrap();

        let vnic = primary_vnic(&cloud, &cloud, &instance.compartment_id, &instance.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vnic.private_ip.as_deref(), Some("10.0.5.7"));
    }

    #[tokio::test]
    async fn test_no_attachment_means_no_vnic() {
        let cloud = FakeCloud::new();
        let vnic = primary_vnic(&cloud, &cloud, "ocid1.compartment.oc1..c", "ocid1.instance.oc1..x")
            .await
            .unwrap();
        assert!(vnic.is_none());
    }
}
