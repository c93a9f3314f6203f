//! # Virtual network kinds

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A virtual cloud network
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "VirtualNetwork",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "VirtualNetworkStatus",
    shortname = "ocivcn",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkSpec {
    #[schemars(length(min = 1, max = 255))]
    pub display_name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1))]
    pub cidr_blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[a-zA-Z][a-zA-Z0-9]{0,14}$"))]
    pub dns_label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<VirtualNetworkResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkResource {
    pub display_name: String,
    pub compartment_id: String,
    pub cidr_blocks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
    pub lifecycle_state: String,
}

managed_object!(VirtualNetwork, VirtualNetworkStatus);

/// A subnet inside a virtual network
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Subnet",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "SubnetStatus",
    shortname = "ocisubnet",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    #[schemars(length(min = 1, max = 255))]
    pub display_name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1))]
    pub vcn_ref: String,
    #[schemars(length(min = 1))]
    pub cidr_block: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(regex(pattern = r"^[a-zA-Z][a-zA-Z0-9]{0,14}$"))]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub prohibit_public_ip: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubnetStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<SubnetResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubnetResource {
    pub display_name: String,
    pub compartment_id: String,
    pub vcn_id: String,
    pub cidr_block: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_label: Option<String>,
    #[serde(default)]
    pub prohibit_public_ip: bool,
    pub lifecycle_state: String,
}

managed_object!(Subnet, SubnetStatus);
