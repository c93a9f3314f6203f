//! # Identity kinds
//!
//! Compartments, the containers every other cloud resource lives in.

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A cloud compartment
///
/// # Example
///
/// ```yaml
/// apiVersion: oci.oracle.com/v1beta1
/// kind: Compartment
/// metadata:
///   name: c1
///   namespace: default
/// spec:
///   name: team-a
///   description: Team A resources
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Compartment",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "CompartmentStatus",
    shortname = "ocicomp",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentSpec {
    #[schemars(length(min = 1, max = 100))]
    pub name: String,
    #[schemars(length(min = 1, max = 400))]
    pub description: String,
    /// Parent compartment; the tenancy when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1))]
    pub compartment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<CompartmentResource>,
}

/// Observed compartment
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentResource {
    pub name: String,
    pub description: String,
    pub compartment_id: String,
    pub lifecycle_state: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
}

managed_object!(Compartment, CompartmentStatus);
