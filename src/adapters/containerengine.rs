//! Container engine adapters. Every mutation here is asynchronous.

use super::require_id;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{Cluster, ClusterResource, ManagedObject, NodePool, NodePoolResource};
use crate::provider::{self as cloud, CloudError, ContainerEngineClient, WorkRequest};
use async_trait::async_trait;
use std::sync::Arc;

const ROLE_COMPARTMENT: &str = "compartment";
const ROLE_VCN: &str = "vcn";
const ROLE_SERVICE_LB_SUBNETS: &str = "serviceLbSubnets";
const ROLE_CLUSTER: &str = "cluster";
const ROLE_SUBNETS: &str = "subnets";

pub struct ClusterAdapter {
    container_engine: Arc<dyn ContainerEngineClient>,
}

impl std::fmt::Debug for ClusterAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterAdapter").finish_non_exhaustive()
    }
}

impl ClusterAdapter {
    pub fn new(container_engine: Arc<dyn ContainerEngineClient>) -> Self {
        Self { container_engine }
    }
}

#[async_trait]
impl Adapter for ClusterAdapter {
    type Object = Cluster;

    fn references(&self, obj: &Cluster) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new(ROLE_COMPARTMENT, "Compartment", obj.spec.compartment_ref.clone()),
            Reference::new(ROLE_VCN, "VirtualNetwork", obj.spec.vcn_ref.clone()),
        ];
        refs.extend(Reference::many(
            ROLE_SERVICE_LB_SUBNETS,
            "Subnet",
            &obj.spec.service_lb_subnet_refs,
        ));
        refs
    }

    fn lifecycle_state(&self, obj: &Cluster) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut Cluster,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateClusterDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            name: obj.spec.name.clone(),
            vcn_id: refs.require(ROLE_VCN)?.to_string(),
            kubernetes_version: obj.spec.kubernetes_version.clone(),
            options: cloud::ClusterCreateOptions {
                service_lb_subnet_ids: refs.all(ROLE_SERVICE_LB_SUBNETS).to_vec(),
            },
        };
        let work_request = self
            .container_engine
            .create_cluster(&details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut Cluster, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self.container_engine.get_cluster(&require_id(obj)?).await?;
        obj.status_mut().resource = Some(ClusterResource {
            name: observed.name,
            compartment_id: observed.compartment_id,
            vcn_id: observed.vcn_id,
            kubernetes_version: observed.kubernetes_version,
            lifecycle_state: observed.lifecycle_state,
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut Cluster,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateClusterDetails {
            name: Some(obj.spec.name.clone()),
            kubernetes_version: Some(obj.spec.kubernetes_version.clone()),
        };
        let work_request = self
            .container_engine
            .update_cluster(&require_id(obj)?, &details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut Cluster) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .container_engine
            .delete_cluster(&require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.container_engine.get_work_request(id).await
    }

    fn is_resource_compliant(&self, obj: &Cluster, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.name == obj.spec.name && r.kubernetes_version == obj.spec.kubernetes_version
            })
    }
}

pub struct NodePoolAdapter {
    container_engine: Arc<dyn ContainerEngineClient>,
}

impl std::fmt::Debug for NodePoolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodePoolAdapter").finish_non_exhaustive()
    }
}

impl NodePoolAdapter {
    pub fn new(container_engine: Arc<dyn ContainerEngineClient>) -> Self {
        Self { container_engine }
    }

    /// One placement per subnet, all in the spec's availability domain
    fn node_config(obj: &NodePool, refs: &ResolvedRefs) -> cloud::NodePoolNodeConfigDetails {
        cloud::NodePoolNodeConfigDetails {
            size: obj.spec.size,
            placement_configs: refs
                .all(ROLE_SUBNETS)
                .iter()
                .map(|subnet_id| cloud::NodePoolPlacementConfig {
                    availability_domain: obj.spec.availability_domain.clone(),
                    subnet_id: subnet_id.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Adapter for NodePoolAdapter {
    type Object = NodePool;

    fn references(&self, obj: &NodePool) -> Vec<Reference> {
        let mut refs = vec![
            Reference::new(ROLE_COMPARTMENT, "Compartment", obj.spec.compartment_ref.clone()),
            Reference::new(ROLE_CLUSTER, "Cluster", obj.spec.cluster_ref.clone()),
        ];
        refs.extend(Reference::many(ROLE_SUBNETS, "Subnet", &obj.spec.subnet_refs));
        refs
    }

    fn lifecycle_state(&self, obj: &NodePool) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut NodePool,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::CreateNodePoolDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            cluster_id: refs.require(ROLE_CLUSTER)?.to_string(),
            name: obj.spec.name.clone(),
            kubernetes_version: obj.spec.kubernetes_version.clone(),
            node_shape: obj.spec.node_shape.clone(),
            node_config_details: Self::node_config(obj, refs),
        };
        let work_request = self
            .container_engine
            .create_node_pool(&details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn get(&self, obj: &mut NodePool, _refs: &ResolvedRefs) -> Result<(), ReconcilerError> {
        let observed = self
            .container_engine
            .get_node_pool(&require_id(obj)?)
            .await?;
        let (size, subnet_ids) = observed
            .node_config_details
            .map(|config| {
                let subnets = config
                    .placement_configs
                    .into_iter()
                    .map(|placement| placement.subnet_id)
                    .collect();
                (config.size, subnets)
            })
            .unwrap_or_default();
        obj.status_mut().resource = Some(NodePoolResource {
            name: observed.name,
            cluster_id: observed.cluster_id,
            kubernetes_version: observed.kubernetes_version,
            node_shape: observed.node_shape,
            size,
            subnet_ids,
            lifecycle_state: observed.lifecycle_state,
        });
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut NodePool,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateNodePoolDetails {
            name: Some(obj.spec.name.clone()),
            kubernetes_version: Some(obj.spec.kubernetes_version.clone()),
            node_config_details: Some(Self::node_config(obj, refs)),
        };
        let work_request = self
            .container_engine
            .update_node_pool(&require_id(obj)?, &details, retry_token)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn delete(&self, obj: &mut NodePool) -> Result<Submission, ReconcilerError> {
        let work_request = self
            .container_engine
            .delete_node_pool(&require_id(obj)?)
            .await?;
        Ok(Submission::accepted(work_request))
    }

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.container_engine.get_work_request(id).await
    }

    fn is_resource_compliant(&self, obj: &NodePool, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.name == obj.spec.name
                    && r.kubernetes_version == obj.spec.kubernetes_version
                    && r.size == obj.spec.size
            })
    }
}
