//! # Compute kinds

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance shapes the operator accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum InstanceShape {
    #[serde(rename = "VM.Standard2.1")]
    VmStandard2_1,
    #[serde(rename = "VM.Standard2.2")]
    VmStandard2_2,
    #[serde(rename = "VM.Standard.E3.Flex")]
    VmStandardE3Flex,
    #[serde(rename = "VM.Standard.E4.Flex")]
    VmStandardE4Flex,
    #[serde(rename = "VM.Standard3.Flex")]
    VmStandard3Flex,
    #[serde(rename = "VM.Standard.A1.Flex")]
    VmStandardA1Flex,
    #[serde(rename = "BM.Standard2.52")]
    BmStandard2_52,
}

impl InstanceShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VmStandard2_1 => "VM.Standard2.1",
            Self::VmStandard2_2 => "VM.Standard2.2",
            Self::VmStandardE3Flex => "VM.Standard.E3.Flex",
            Self::VmStandardE4Flex => "VM.Standard.E4.Flex",
            Self::VmStandard3Flex => "VM.Standard3.Flex",
            Self::VmStandardA1Flex => "VM.Standard.A1.Flex",
            Self::BmStandard2_52 => "BM.Standard2.52",
        }
    }

    /// Flexible shapes take an explicit shape config
    pub fn is_flex(self) -> bool {
        self.as_str().ends_with(".Flex")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShapeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1.0, max = 128.0))]
    pub ocpus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1.0, max = 1024.0))]
    pub memory_in_gbs: Option<f64>,
}

/// A compute instance
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ComputeInstance",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "ComputeInstanceStatus",
    shortname = "ociinstance",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"PrivateIp", "type":"string", "jsonPath":".status.resource.primaryVnic.privateIp"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstanceSpec {
    #[schemars(length(min = 1, max = 255))]
    pub display_name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1))]
    pub availability_domain: String,
    pub shape: InstanceShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<ShapeConfig>,
    #[schemars(length(min = 1))]
    pub subnet_ref: String,
    #[schemars(length(min = 1))]
    pub image_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstanceStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ComputeInstanceResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstanceResource {
    pub display_name: String,
    pub compartment_id: String,
    pub availability_domain: String,
    pub shape: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<ShapeConfig>,
    pub lifecycle_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_vnic: Option<PrimaryVnic>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryVnic {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_ip: Option<String>,
}

managed_object!(ComputeInstance, ComputeInstanceStatus);

impl ComputeInstance {
    /// Private IP of the primary VNIC, once known
    pub fn private_ip(&self) -> Option<&str> {
        self.status
            .as_ref()?
            .resource
            .as_ref()?
            .primary_vnic
            .as_ref()?
            .private_ip
            .as_deref()
    }
}
