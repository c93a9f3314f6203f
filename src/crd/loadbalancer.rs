//! # Load balancer kinds
//!
//! The load balancer itself plus the building blocks that live inside it.
//! Nested kinds (backend sets, backends, listeners, certificates) are named
//! within their parent, so their cloud identifier is that name and the parent
//! load balancer id is kept in status.

use super::{managed_object, CommonStatus, DependsOnSelector};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum LoadBalancerShape {
    #[serde(rename = "10Mbps")]
    Mbps10,
    #[serde(rename = "100Mbps")]
    Mbps100,
    #[serde(rename = "400Mbps")]
    Mbps400,
    #[serde(rename = "8000Mbps")]
    Mbps8000,
    #[serde(rename = "flexible")]
    Flexible,
}

impl LoadBalancerShape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mbps10 => "10Mbps",
            Self::Mbps100 => "100Mbps",
            Self::Mbps400 => "400Mbps",
            Self::Mbps8000 => "8000Mbps",
            Self::Flexible => "flexible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadBalancerPolicy {
    RoundRobin,
    LeastConnections,
    IpHash,
}

impl LoadBalancerPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "ROUND_ROBIN",
            Self::LeastConnections => "LEAST_CONNECTIONS",
            Self::IpHash => "IP_HASH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListenerProtocol {
    Http,
    Http2,
    Tcp,
}

impl ListenerProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Http2 => "HTTP2",
            Self::Tcp => "TCP",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthCheckProtocol {
    Http,
    Tcp,
}

impl HealthCheckProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Tcp => "TCP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecker {
    pub protocol: HealthCheckProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 65535))]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_in_millis: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_millis: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SslConfiguration {
    /// Certificate kind name inside the same load balancer
    #[schemars(length(min = 1))]
    pub certificate_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 10))]
    pub verify_depth: Option<u8>,
    #[serde(default)]
    pub verify_peer_certificate: bool,
}

/// A load balancer
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "LoadBalancer",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "LoadBalancerStatus",
    shortname = "ocilb",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Id", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerSpec {
    #[schemars(length(min = 1, max = 1024))]
    pub display_name: String,
    #[schemars(length(min = 1))]
    pub compartment_ref: String,
    #[schemars(length(min = 1, max = 2))]
    pub subnet_refs: Vec<String>,
    pub shape_name: LoadBalancerShape,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<LoadBalancerResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerResource {
    pub display_name: String,
    pub compartment_id: String,
    pub shape_name: String,
    pub subnet_ids: Vec<String>,
    pub is_private: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    pub lifecycle_state: String,
}

managed_object!(LoadBalancer, LoadBalancerStatus);

/// A backend set inside a load balancer
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "BackendSet",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "BackendSetStatus",
    shortname = "ocibs",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"WorkRequest", "type":"string", "jsonPath":".status.common.workRequest.state"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackendSetSpec {
    #[schemars(length(min = 1, max = 32))]
    pub name: String,
    #[schemars(length(min = 1))]
    pub load_balancer_ref: String,
    pub policy: LoadBalancerPolicy,
    pub health_checker: HealthChecker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfiguration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendSetStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BackendSetResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendSetResource {
    pub name: String,
    pub policy: String,
    pub health_check_protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backends: Vec<String>,
}

managed_object!(BackendSet, BackendSetStatus);

/// A backend server inside a backend set
///
/// The backend's cloud name is `<ip>:<port>`, where the IP is `ipAddress`
/// or the primary private IP of the referenced compute instance.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Backend",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "BackendStatus",
    shortname = "ocibackend",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Name", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackendSpec {
    #[schemars(length(min = 1))]
    pub load_balancer_ref: String,
    #[schemars(length(min = 1))]
    pub backend_set_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(length(min = 1))]
    pub instance_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[schemars(range(min = 1, max = 65535))]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 100))]
    pub weight: Option<u16>,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub drain: bool,
    #[serde(default)]
    pub offline: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_set_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<BackendResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendResource {
    pub name: String,
    pub ip_address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u16>,
    pub backup: bool,
    pub drain: bool,
    pub offline: bool,
}

managed_object!(Backend, BackendStatus);

/// A listener on a load balancer
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Listener",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "ListenerStatus",
    shortname = "ocilistener",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Port", "type":"integer", "jsonPath":".spec.port"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ListenerSpec {
    #[schemars(length(min = 1, max = 255))]
    pub name: String,
    #[schemars(length(min = 1))]
    pub load_balancer_ref: String,
    #[schemars(length(min = 1))]
    pub default_backend_set_ref: String,
    #[schemars(range(min = 1, max = 65535))]
    pub port: u16,
    pub protocol: ListenerProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_configuration: Option<SslConfiguration>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ListenerResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListenerResource {
    pub name: String,
    pub default_backend_set_name: String,
    pub port: u16,
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_name: Option<String>,
}

managed_object!(Listener, ListenerStatus);

/// A TLS certificate bundle stored on a load balancer
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Certificate",
    group = "oci.oracle.com",
    version = "v1beta1",
    namespaced,
    status = "CertificateStatus",
    shortname = "ocicert",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.common.state"}, {"name":"Name", "type":"string", "jsonPath":".status.id"}, {"name":"Message", "type":"string", "jsonPath":".status.common.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    #[schemars(length(min = 1, max = 255))]
    pub certificate_name: String,
    #[schemars(length(min = 1))]
    pub load_balancer_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub depends_on: BTreeMap<String, DependsOnSelector>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    #[serde(default)]
    pub common: CommonStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<CertificateResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResource {
    pub certificate_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate: Option<String>,
}

managed_object!(Certificate, CertificateStatus);
