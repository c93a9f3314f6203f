//! # Cloud Client Interfaces
//!
//! Narrow interfaces over the cloud calls each adapter needs. Production uses
//! the signed REST client in [`oci`]; tests use `testing::FakeCloud`.
//!
//! Calls that the cloud completes asynchronously return the work-request id
//! instead of the resource.

pub mod error;
pub mod models;
pub mod oci;

pub use error::CloudError;
pub use models::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Work-request id returned by asynchronous operations
pub type WorkRequestId = String;

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn create_compartment(
        &self,
        details: &CreateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError>;
    async fn get_compartment(&self, id: &str) -> Result<Compartment, CloudError>;
    async fn update_compartment(
        &self,
        id: &str,
        details: &UpdateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError>;
    async fn delete_compartment(&self, id: &str) -> Result<(), CloudError>;
}

#[async_trait]
pub trait VirtualNetworkClient: Send + Sync {
    async fn create_vcn(&self, details: &CreateVcnDetails, retry_token: &str)
        -> Result<Vcn, CloudError>;
    async fn get_vcn(&self, id: &str) -> Result<Vcn, CloudError>;
    async fn update_vcn(
        &self,
        id: &str,
        details: &UpdateVcnDetails,
        retry_token: &str,
    ) -> Result<Vcn, CloudError>;
    async fn delete_vcn(&self, id: &str) -> Result<(), CloudError>;

    async fn create_subnet(
        &self,
        details: &CreateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError>;
    async fn get_subnet(&self, id: &str) -> Result<Subnet, CloudError>;
    async fn update_subnet(
        &self,
        id: &str,
        details: &UpdateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError>;
    async fn delete_subnet(&self, id: &str) -> Result<(), CloudError>;

    async fn get_vnic(&self, id: &str) -> Result<Vnic, CloudError>;
}

#[async_trait]
pub trait ComputeClient: Send + Sync {
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError>;
    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError>;
    async fn update_instance(
        &self,
        id: &str,
        details: &UpdateInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError>;
    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError>;
    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, CloudError>;
}

#[async_trait]
pub trait ContainerEngineClient: Send + Sync {
    async fn create_cluster(
        &self,
        details: &CreateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_cluster(&self, id: &str) -> Result<Cluster, CloudError>;
    async fn update_cluster(
        &self,
        id: &str,
        details: &UpdateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_cluster(&self, id: &str) -> Result<WorkRequestId, CloudError>;

    async fn create_node_pool(
        &self,
        details: &CreateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_node_pool(&self, id: &str) -> Result<NodePool, CloudError>;
    async fn update_node_pool(
        &self,
        id: &str,
        details: &UpdateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_node_pool(&self, id: &str) -> Result<WorkRequestId, CloudError>;

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError>;
}

#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn create_autonomous_database(
        &self,
        details: &CreateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError>;
    async fn get_autonomous_database(&self, id: &str) -> Result<AutonomousDatabase, CloudError>;
    async fn update_autonomous_database(
        &self,
        id: &str,
        details: &UpdateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError>;
    async fn delete_autonomous_database(&self, id: &str) -> Result<(), CloudError>;
    /// Returns the raw wallet archive
    async fn generate_autonomous_database_wallet(
        &self,
        id: &str,
        details: &GenerateWalletDetails,
    ) -> Result<Vec<u8>, CloudError>;
}

#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    async fn create_load_balancer(
        &self,
        details: &CreateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, CloudError>;
    async fn update_load_balancer(
        &self,
        id: &str,
        details: &UpdateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_load_balancer(&self, id: &str) -> Result<WorkRequestId, CloudError>;

    async fn create_backend_set(
        &self,
        load_balancer_id: &str,
        details: &CreateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<BackendSet, CloudError>;
    async fn update_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError>;

    async fn create_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        details: &BackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<Backend, CloudError>;
    async fn update_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
        details: &UpdateBackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError>;

    async fn create_listener(
        &self,
        load_balancer_id: &str,
        details: &CreateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_listener(&self, load_balancer_id: &str, name: &str)
        -> Result<Listener, CloudError>;
    async fn update_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn delete_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError>;

    async fn create_certificate(
        &self,
        load_balancer_id: &str,
        details: &CreateCertificateDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError>;
    async fn get_certificate(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<Certificate, CloudError>;
    async fn delete_certificate(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError>;

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError>;
}

/// The cloud clients handed to adapters, shared across every controller
#[derive(Clone)]
pub struct CloudClients {
    pub identity: Arc<dyn IdentityClient>,
    pub network: Arc<dyn VirtualNetworkClient>,
    pub compute: Arc<dyn ComputeClient>,
    pub container_engine: Arc<dyn ContainerEngineClient>,
    pub database: Arc<dyn DatabaseClient>,
    pub load_balancer: Arc<dyn LoadBalancerClient>,
}

impl std::fmt::Debug for CloudClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClients").finish_non_exhaustive()
    }
}

impl CloudClients {
    /// Use one implementation for every service
    pub fn from_single<C>(client: &Arc<C>) -> Self
    where
        C: IdentityClient
            + VirtualNetworkClient
            + ComputeClient
            + ContainerEngineClient
            + DatabaseClient
            + LoadBalancerClient
            + 'static,
    {
        Self {
            identity: Arc::clone(client) as Arc<dyn IdentityClient>,
            network: Arc::clone(client) as Arc<dyn VirtualNetworkClient>,
            compute: Arc::clone(client) as Arc<dyn ComputeClient>,
            container_engine: Arc::clone(client) as Arc<dyn ContainerEngineClient>,
            database: Arc::clone(client) as Arc<dyn DatabaseClient>,
            load_balancer: Arc::clone(client) as Arc<dyn LoadBalancerClient>,
        }
    }
}
