//! # Cloud Models
//!
//! Request and response payloads for the cloud services used by the adapters.
//! Field names follow the cloud's JSON (camelCase) so the REST client can send
//! and receive these types directly.

use crate::crd::WorkRequestState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Identity

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompartmentDetails {
    /// Parent compartment (tenancy when the user gave no parent)
    pub compartment_id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompartmentDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeform_tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    pub id: String,
    pub compartment_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub lifecycle_state: String,
    #[serde(default)]
    pub freeform_tags: BTreeMap<String, String>,
}

// Virtual network

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVcnDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub cidr_blocks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVcnDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vcn {
    pub id: String,
    pub compartment_id: String,
    pub display_name: String,
    #[serde(default)]
    pub cidr_blocks: Vec<String>,
    #[serde(default)]
    pub dns_label: Option<String>,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubnetDetails {
    pub compartment_id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub cidr_block: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
    pub prohibit_public_ip_on_vnic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubnetDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    pub id: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub cidr_block: String,
    #[serde(default)]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub prohibit_public_ip_on_vnic: bool,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vnic {
    pub id: String,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

// Compute

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceShapeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocpus: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_in_gbs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    pub subnet_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_public_ip: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSourceDetails {
    pub source_type: String,
    pub image_id: String,
}

impl InstanceSourceDetails {
    pub fn image(image_id: impl Into<String>) -> Self {
        Self {
            source_type: "image".to_string(),
            image_id: image_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    pub compartment_id: String,
    pub availability_domain: String,
    pub display_name: String,
    pub shape: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<InstanceShapeConfig>,
    pub create_vnic_details: CreateVnicDetails,
    pub source_details: InstanceSourceDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstanceDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<InstanceShapeConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub compartment_id: String,
    pub availability_domain: String,
    pub display_name: String,
    pub shape: String,
    #[serde(default)]
    pub shape_config: Option<InstanceShapeConfig>,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnicAttachment {
    pub id: String,
    pub instance_id: String,
    #[serde(default)]
    pub vnic_id: Option<String>,
    pub lifecycle_state: String,
}

// Container engine

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCreateOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_lb_subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClusterDetails {
    pub compartment_id: String,
    pub name: String,
    pub vcn_id: String,
    pub kubernetes_version: String,
    pub options: ClusterCreateOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub compartment_id: String,
    pub name: String,
    pub vcn_id: String,
    pub kubernetes_version: String,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlacementConfig {
    pub availability_domain: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolNodeConfigDetails {
    pub size: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placement_configs: Vec<NodePoolPlacementConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodePoolDetails {
    pub compartment_id: String,
    pub cluster_id: String,
    pub name: String,
    pub kubernetes_version: String,
    pub node_shape: String,
    pub node_config_details: NodePoolNodeConfigDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodePoolDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_config_details: Option<NodePoolNodeConfigDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePool {
    pub id: String,
    pub compartment_id: String,
    pub cluster_id: String,
    pub name: String,
    pub kubernetes_version: String,
    pub node_shape: String,
    #[serde(default)]
    pub node_config_details: Option<NodePoolNodeConfigDetails>,
    pub lifecycle_state: String,
}

/// A resource touched by a work request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestResource {
    pub entity_type: String,
    pub action_type: String,
    pub identifier: String,
}

/// Asynchronous cloud operation handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    pub id: String,
    pub operation_type: String,
    pub state: WorkRequestState,
    #[serde(default)]
    pub resources: Vec<WorkRequestResource>,
    #[serde(default)]
    pub message: Option<String>,
}

impl WorkRequest {
    /// Identifier of the first resource the request created, if reported
    pub fn created_identifier(&self) -> Option<&str> {
        self.resources
            .iter()
            .find(|r| r.action_type.eq_ignore_ascii_case("CREATED"))
            .or_else(|| self.resources.first())
            .map(|r| r.identifier.as_str())
    }
}

// Database

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutonomousDatabaseDetails {
    pub compartment_id: String,
    pub db_name: String,
    pub display_name: String,
    pub admin_password: String,
    pub cpu_core_count: u32,
    pub data_storage_size_in_tbs: u32,
    pub db_workload: String,
    pub is_auto_scaling_enabled: bool,
}

impl std::fmt::Debug for CreateAutonomousDatabaseDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateAutonomousDatabaseDetails")
            .field("compartment_id", &self.compartment_id)
            .field("db_name", &self.db_name)
            .field("display_name", &self.display_name)
            .field("cpu_core_count", &self.cpu_core_count)
            .field("data_storage_size_in_tbs", &self.data_storage_size_in_tbs)
            .field("db_workload", &self.db_workload)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAutonomousDatabaseDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_core_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_storage_size_in_tbs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_auto_scaling_enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabase {
    pub id: String,
    pub compartment_id: String,
    pub db_name: String,
    pub display_name: String,
    pub cpu_core_count: u32,
    pub data_storage_size_in_tbs: u32,
    #[serde(default)]
    pub db_workload: String,
    #[serde(default)]
    pub is_auto_scaling_enabled: bool,
    pub lifecycle_state: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWalletDetails {
    pub password: String,
    pub generate_type: String,
}

impl std::fmt::Debug for GenerateWalletDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateWalletDetails")
            .field("generate_type", &self.generate_type)
            .finish_non_exhaustive()
    }
}

// Load balancer

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoadBalancerDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub shape_name: String,
    pub subnet_ids: Vec<String>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLoadBalancerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    pub ip_address: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub id: String,
    pub compartment_id: String,
    pub display_name: String,
    pub shape_name: String,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckerDetails {
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_in_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_in_millis: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslConfigurationDetails {
    pub certificate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_peer_certificate: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDetails {
    pub ip_address: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBackendSetDetails {
    pub name: String,
    pub policy: String,
    pub health_checker: HealthCheckerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfigurationDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBackendSetDetails {
    pub policy: String,
    pub health_checker: HealthCheckerDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfigurationDetails>,
    /// The update replaces the full backend list, so current backends are carried over
    pub backends: Vec<BackendDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    #[serde(default)]
    pub weight: Option<u16>,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub drain: bool,
    #[serde(default)]
    pub offline: bool,
}

impl Backend {
    pub fn to_details(&self) -> BackendDetails {
        BackendDetails {
            ip_address: self.ip_address.clone(),
            port: self.port,
            weight: self.weight,
            backup: Some(self.backup),
            drain: Some(self.drain),
            offline: Some(self.offline),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSet {
    pub name: String,
    pub policy: String,
    pub health_checker: HealthCheckerDetails,
    #[serde(default)]
    pub ssl_configuration: Option<SslConfigurationDetails>,
    #[serde(default)]
    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBackendDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    pub backup: bool,
    pub drain: bool,
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListenerDetails {
    pub name: String,
    pub default_backend_set_name: String,
    pub port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfigurationDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListenerDetails {
    pub default_backend_set_name: String,
    pub port: u16,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfigurationDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub name: String,
    pub default_backend_set_name: String,
    pub port: u16,
    pub protocol: String,
    #[serde(default)]
    pub ssl_configuration: Option<SslConfigurationDetails>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCertificateDetails {
    pub certificate_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for CreateCertificateDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateCertificateDetails")
            .field("certificate_name", &self.certificate_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub certificate_name: String,
    #[serde(default)]
    pub public_certificate: Option<String>,
    #[serde(default)]
    pub ca_certificate: Option<String>,
}
