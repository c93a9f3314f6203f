//! # Database kinds

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DbWorkload {
    #[default]
    Oltp,
    Dw,
    Ajd,
    Apex,
}

impl DbWorkload {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oltp => "OLTP",
            Self::Dw => "DW",
            Self::Ajd => "AJD",
            Self::Apex => "APEX",
        }
    }
}

/// Wallet generation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletSpec {
    /// Generate the `<name>-wallet` secret once the database is available
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for WalletSpec {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// An autonomous database
///
/// The admin password is generated on first create and kept in the secret
/// `<name>` under key `password`; the client wallet lands in `<name>-wallet`.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AutonomousDatabase",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "AutonomousDatabaseStatus",
    shortname = "ociadb",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Lifecycle", "type":"string", "jsonPath":".status.resource.lifecycleState"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabaseSpec {
    #[schemars(regex(pattern = r"^[a-zA-Z][a-zA-Z0-9]{0,13}$"))]
    pub db_name: String,
    #[schemars(length(min = 1, max = 255))]
    pub display_name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(range(min = 1, max = 128))]
    pub cpu_core_count: u32,
    #[schemars(range(min = 1, max = 128))]
    pub data_storage_size_in_tbs: u32,
    #[serde(default)]
    pub db_workload: DbWorkload,
    #[serde(default)]
    pub is_auto_scaling_enabled: bool,
    #[serde(default)]
    pub wallet: WalletSpec,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabaseStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<AutonomousDatabaseResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutonomousDatabaseResource {
    pub db_name: String,
    pub display_name: String,
    pub compartment_id: String,
    pub cpu_core_count: u32,
    pub data_storage_size_in_tbs: u32,
    pub db_workload: String,
    pub is_auto_scaling_enabled: bool,
    pub lifecycle_state: String,
}

managed_object!(AutonomousDatabase, AutonomousDatabaseStatus);
