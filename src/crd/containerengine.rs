//! # Container engine kinds

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A managed Kubernetes cluster
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Cluster",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "ClusterStatus",
    shortname = "ocicluster",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Version", "type":"string", "jsonPath":".status.resource.kubernetesVersion"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[schemars(length(min = 1, max = 255))]
    pub name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1))]
    pub vcn_ref: String,
    #[schemars(regex(pattern = r"^v\d+\.\d+\.\d+$"))]
    pub kubernetes_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_lb_subnet_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ClusterResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResource {
    pub name: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub kubernetes_version: String,
    pub lifecycle_state: String,
}

managed_object!(Cluster, ClusterStatus);

/// A node pool attached to a cluster
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "NodePool",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "NodePoolStatus",
    shortname = "ocinodepool",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Size", "type":"integer", "jsonPath":".status.resource.size"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    #[schemars(length(min = 1, max = 255))]
    pub name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1))]
    pub cluster_ref: String,
    #[schemars(regex(pattern = r"^v\d+\.\d+\.\d+$"))]
    pub kubernetes_version: String,
    #[schemars(length(min = 1))]
    pub node_shape: String,
    #[schemars(range(min = 0, max = 1000))]
    pub size: u32,
    /// Availability domain the nodes are placed in
    #[schemars(length(min = 1))]
    pub availability_domain: String,
    #[schemars(length(min = 1))]
    pub subnet_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<NodePoolResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolResource {
    pub name: String,
    pub cluster_id: String,
    pub kubernetes_version: String,
    pub node_shape: String,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_ids: Vec<String>,
    pub lifecycle_state: String,
}

managed_object!(NodePool, NodePoolStatus);
