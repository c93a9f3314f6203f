//! # OCI REST Client
//!
//! Signed JSON calls against the regional service endpoints. One client
//! implements every service interface; the endpoint host and API version are
//! picked per call.
//!
//! Asynchronous operations answer with an `opc-work-request-id` header.
//! Creates and updates carry the caller's `opc-retry-token`.

mod signer;

pub use signer::RequestSigner;

use crate::config::CloudCredentials;
use crate::provider::models::*;
use crate::provider::{
    CloudError, ComputeClient, ContainerEngineClient, DatabaseClient, IdentityClient,
    LoadBalancerClient, VirtualNetworkClient, WorkRequestId,
};
use crate::crd::WorkRequestState;
use async_trait::async_trait;
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_TOKEN_HEADER: &str = "opc-retry-token";
const WORK_REQUEST_HEADER: &str = "opc-work-request-id";
const REQUEST_ID_HEADER: &str = "opc-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    Identity,
    Core,
    ContainerEngine,
    Database,
    LoadBalancer,
}

impl Service {
    fn host_prefix(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Core | Self::LoadBalancer => "iaas",
            Self::ContainerEngine => "containerengine",
            Self::Database => "database",
        }
    }

    fn api_version(self) -> &'static str {
        match self {
            Self::Identity | Self::Core | Self::Database => "20160918",
            Self::ContainerEngine => "20180222",
            Self::LoadBalancer => "20170115",
        }
    }
}

/// Error body returned by every service
#[derive(Debug, Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

/// Work requests as the services report them; container engine uses
/// `status` and `resources`, load balancing `lifecycleState` and `loadBalancerId`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireWorkRequest {
    id: String,
    #[serde(default, alias = "type")]
    operation_type: String,
    #[serde(alias = "lifecycleState")]
    status: String,
    #[serde(default)]
    resources: Vec<WorkRequestResource>,
    #[serde(default)]
    load_balancer_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl WireWorkRequest {
    fn into_work_request(self) -> Result<WorkRequest, CloudError> {
        let state = WorkRequestState::from_wire(&self.status).ok_or_else(|| {
            CloudError::InvalidResponse(format!("unknown work request state {}", self.status))
        })?;
        let mut resources = self.resources;
        if let Some(load_balancer_id) = self.load_balancer_id {
            let action_type = if self.operation_type.to_ascii_lowercase().contains("create") {
                "CREATED"
            } else {
                "UPDATED"
            };
            resources.push(WorkRequestResource {
                entity_type: "loadbalancer".to_string(),
                action_type: action_type.to_string(),
                identifier: load_balancer_id,
            });
        }
        Ok(WorkRequest {
            id: self.id,
            operation_type: self.operation_type,
            state,
            resources,
            message: self.message,
        })
    }
}

/// Signed client for every service the operator manages
pub struct OciRestClient {
    http: reqwest::Client,
    signer: RequestSigner,
    region: String,
    endpoint_override: Option<String>,
}

impl std::fmt::Debug for OciRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OciRestClient")
            .field("region", &self.region)
            .field("endpoint_override", &self.endpoint_override)
            .finish_non_exhaustive()
    }
}

fn endpoint(
    base: &str,
    service: Service,
    segments: &[&str],
    query: &[(&str, &str)],
) -> Result<Url, CloudError> {
    let mut url = Url::parse(base)
        .map_err(|e| CloudError::InvalidParameter(format!("invalid endpoint {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| CloudError::InvalidParameter(format!("endpoint {base} cannot have a path")))?
        .pop_if_empty()
        .push(service.api_version())
        .extend(segments);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Listener `name` out of a load balancer document
fn listener_from(load_balancer: &serde_json::Value, name: &str) -> Result<Listener, CloudError> {
    let listener = load_balancer
        .get("listeners")
        .and_then(|listeners| listeners.get(name))
        .ok_or_else(|| CloudError::NotAuthorizedOrNotFound(format!("listener {name}")))?;
    serde_json::from_value(listener.clone())
        .map_err(|e| CloudError::InvalidResponse(format!("listener {name}: {e}")))
}

impl OciRestClient {
    /// # Errors
    /// Fails if the private key cannot be used for signing.
    pub fn new(credentials: &CloudCredentials) -> Result<Self, CloudError> {
        let signer = RequestSigner::new(credentials.key_id(), &credentials.private_key_pem)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CloudError::from)?;
        Ok(Self {
            http,
            signer,
            region: credentials.region.clone(),
            endpoint_override: credentials.endpoint_override.clone(),
        })
    }

    fn url(
        &self,
        service: Service,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url, CloudError> {
        let base = self.endpoint_override.clone().unwrap_or_else(|| {
            format!(
                "https://{}.{}.oraclecloud.com",
                service.host_prefix(),
                self.region
            )
        });
        endpoint(&base, service, segments, query)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        retry_token: Option<&str>,
    ) -> Result<Response, CloudError> {
        let headers = self.signer.sign(&method, &url, body.as_deref())?;
        debug!(method = %method, url = %url, "Cloud request");
        let mut request = self
            .http
            .request(method, url)
            .headers(headers)
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().simple().to_string());
        if let Some(token) = retry_token {
            request = request.header(RETRY_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await.unwrap_or_default();
        let error: ServiceError = serde_json::from_str(&text).unwrap_or(ServiceError {
            code: None,
            message: Some(text),
        });
        let message = format!(
            "{} (opc-request-id {request_id})",
            error.message.unwrap_or_default()
        );
        Err(CloudError::from_status(
            status.as_u16(),
            error.code.as_deref(),
            message,
        ))
    }

    fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>, CloudError> {
        serde_json::to_vec(body).map_err(|e| CloudError::InvalidParameter(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CloudError> {
        Ok(self.send(Method::GET, url, None, None).await?.json().await?)
    }

    async fn write_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        retry_token: Option<&str>,
    ) -> Result<T, CloudError> {
        let body = Self::encode(body)?;
        Ok(self
            .send(method, url, Some(body), retry_token)
            .await?
            .json()
            .await?)
    }

    async fn delete(&self, url: Url) -> Result<Response, CloudError> {
        self.send(Method::DELETE, url, None, None).await
    }

    fn work_request_id(response: &Response) -> Result<WorkRequestId, CloudError> {
        response
            .headers()
            .get(WORK_REQUEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .ok_or_else(|| {
                CloudError::InvalidResponse(format!("response has no {WORK_REQUEST_HEADER} header"))
            })
    }

    /// Submit an asynchronous operation and return its work request id
    async fn submit<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        retry_token: Option<&str>,
    ) -> Result<WorkRequestId, CloudError> {
        let body = body.map(Self::encode).transpose()?;
        let response = self.send(method, url, body, retry_token).await?;
        Self::work_request_id(&response)
    }

    async fn work_request(&self, service: Service, path: &str, id: &str) -> Result<WorkRequest, CloudError> {
        let wire: WireWorkRequest = self.get_json(self.url(service, &[path, id], &[])?).await?;
        wire.into_work_request()
    }
}

#[async_trait]
impl IdentityClient for OciRestClient {
    async fn create_compartment(
        &self,
        details: &CreateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError> {
        let url = self.url(Service::Identity, &["compartments"], &[])?;
        self.write_json(Method::POST, url, details, Some(retry_token))
            .await
    }

    async fn get_compartment(&self, id: &str) -> Result<Compartment, CloudError> {
        self.get_json(self.url(Service::Identity, &["compartments", id], &[])?)
            .await
    }

    async fn update_compartment(
        &self,
        id: &str,
        details: &UpdateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError> {
        let url = self.url(Service::Identity, &["compartments", id], &[])?;
        self.write_json(Method::PUT, url, details, Some(retry_token))
            .await
    }

    async fn delete_compartment(&self, id: &str) -> Result<(), CloudError> {
        self.delete(self.url(Service::Identity, &["compartments", id], &[])?)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VirtualNetworkClient for OciRestClient {
    async fn create_vcn(&self, details: &CreateVcnDetails, retry_token: &str) -> Result<Vcn, CloudError> {
        let url = self.url(Service::Core, &["vcns"], &[])?;
        self.write_json(Method::POST, url, details, Some(retry_token))
            .await
    }

    async fn get_vcn(&self, id: &str) -> Result<Vcn, CloudError> {
        self.get_json(self.url(Service::Core, &["vcns", id], &[])?)
            .await
    }

    async fn update_vcn(
        &self,
        id: &str,
        details: &UpdateVcnDetails,
        retry_token: &str,
    ) -> Result<Vcn, CloudError> {
        let url = self.url(Service::Core, &["vcns", id], &[])?;
        self.write_json(Method::PUT, url, details, Some(retry_token))
            .await
    }

    async fn delete_vcn(&self, id: &str) -> Result<(), CloudError> {
        self.delete(self.url(Service::Core, &["vcns", id], &[])?)
            .await?;
        Ok(())
    }

    async fn create_subnet(
        &self,
        details: &CreateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError> {
        let url = self.url(Service::Core, &["subnets"], &[])?;
        self.write_json(Method::POST, url, details, Some(retry_token))
            .await
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet, CloudError> {
        self.get_json(self.url(Service::Core, &["subnets", id], &[])?)
            .await
    }

    async fn update_subnet(
        &self,
        id: &str,
        details: &UpdateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError> {
        let url = self.url(Service::Core, &["subnets", id], &[])?;
        self.write_json(Method::PUT, url, details, Some(retry_token))
            .await
    }

    async fn delete_subnet(&self, id: &str) -> Result<(), CloudError> {
        self.delete(self.url(Service::Core, &["subnets", id], &[])?)
            .await?;
        Ok(())
    }

    async fn get_vnic(&self, id: &str) -> Result<Vnic, CloudError> {
        self.get_json(self.url(Service::Core, &["vnics", id], &[])?)
            .await
    }
}

#[async_trait]
impl ComputeClient for OciRestClient {
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError> {
        let url = self.url(Service::Core, &["instances"], &[])?;
        self.write_json(Method::POST, url, details, Some(retry_token))
            .await
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError> {
        self.get_json(self.url(Service::Core, &["instances", id], &[])?)
            .await
    }

    async fn update_instance(
        &self,
        id: &str,
        details: &UpdateInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError> {
        let url = self.url(Service::Core, &["instances", id], &[])?;
        self.write_json(Method::PUT, url, details, Some(retry_token))
            .await
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError> {
        self.delete(self.url(Service::Core, &["instances", id], &[])?)
            .await?;
        Ok(())
    }

    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, CloudError> {
        let url = self.url(
            Service::Core,
            &["vnicAttachments"],
            &[("compartmentId", compartment_id), ("instanceId", instance_id)],
        )?;
        self.get_json(url).await
    }
}

#[async_trait]
impl ContainerEngineClient for OciRestClient {
    async fn create_cluster(
        &self,
        details: &CreateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["clusters"], &[])?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    async fn get_cluster(&self, id: &str) -> Result<Cluster, CloudError> {
        self.get_json(self.url(Service::ContainerEngine, &["clusters", id], &[])?)
            .await
    }

    async fn update_cluster(
        &self,
        id: &str,
        details: &UpdateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["clusters", id], &[])?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_cluster(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["clusters", id], &[])?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn create_node_pool(
        &self,
        details: &CreateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["nodePools"], &[])?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    async fn get_node_pool(&self, id: &str) -> Result<NodePool, CloudError> {
        self.get_json(self.url(Service::ContainerEngine, &["nodePools", id], &[])?)
            .await
    }

    async fn update_node_pool(
        &self,
        id: &str,
        details: &UpdateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["nodePools", id], &[])?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_node_pool(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::ContainerEngine, &["nodePools", id], &[])?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.work_request(Service::ContainerEngine, "workRequests", id)
            .await
    }
}

#[async_trait]
impl DatabaseClient for OciRestClient {
    async fn create_autonomous_database(
        &self,
        details: &CreateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError> {
        let url = self.url(Service::Database, &["autonomousDatabases"], &[])?;
        self.write_json(Method::POST, url, details, Some(retry_token))
            .await
    }

    async fn get_autonomous_database(&self, id: &str) -> Result<AutonomousDatabase, CloudError> {
        self.get_json(self.url(Service::Database, &["autonomousDatabases", id], &[])?)
            .await
    }

    async fn update_autonomous_database(
        &self,
        id: &str,
        details: &UpdateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError> {
        let url = self.url(Service::Database, &["autonomousDatabases", id], &[])?;
        self.write_json(Method::PUT, url, details, Some(retry_token))
            .await
    }

    async fn delete_autonomous_database(&self, id: &str) -> Result<(), CloudError> {
        self.delete(self.url(Service::Database, &["autonomousDatabases", id], &[])?)
            .await?;
        Ok(())
    }

    async fn generate_autonomous_database_wallet(
        &self,
        id: &str,
        details: &GenerateWalletDetails,
    ) -> Result<Vec<u8>, CloudError> {
        let url = self.url(
            Service::Database,
            &["autonomousDatabases", id, "actions", "generateWallet"],
            &[],
        )?;
        let body = Self::encode(details)?;
        let response = self.send(Method::POST, url, Some(body), None).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LoadBalancerClient for OciRestClient {
    async fn create_load_balancer(
        &self,
        details: &CreateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::LoadBalancer, &["loadBalancers"], &[])?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, CloudError> {
        self.get_json(self.url(Service::LoadBalancer, &["loadBalancers", id], &[])?)
            .await
    }

    async fn update_load_balancer(
        &self,
        id: &str,
        details: &UpdateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::LoadBalancer, &["loadBalancers", id], &[])?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_load_balancer(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let url = self.url(Service::LoadBalancer, &["loadBalancers", id], &[])?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn create_backend_set(
        &self,
        load_balancer_id: &str,
        details: &CreateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets"],
            &[],
        )?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    async fn get_backend_set(&self, load_balancer_id: &str, name: &str) -> Result<BackendSet, CloudError> {
        self.get_json(self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", name],
            &[],
        )?)
        .await
    }

    async fn update_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", name],
            &[],
        )?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", name],
            &[],
        )?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn create_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        details: &BackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", backend_set_name, "backends"],
            &[],
        )?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    async fn get_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<Backend, CloudError> {
        self.get_json(self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", backend_set_name, "backends", name],
            &[],
        )?)
        .await
    }

    async fn update_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
        details: &UpdateBackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", backend_set_name, "backends", name],
            &[],
        )?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "backendSets", backend_set_name, "backends", name],
            &[],
        )?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn create_listener(
        &self,
        load_balancer_id: &str,
        details: &CreateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "listeners"],
            &[],
        )?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    /// Listeners have no endpoint of their own; they are read off the load balancer
    async fn get_listener(&self, load_balancer_id: &str, name: &str) -> Result<Listener, CloudError> {
        let load_balancer: serde_json::Value = self
            .get_json(self.url(Service::LoadBalancer, &["loadBalancers", load_balancer_id], &[])?)
            .await?;
        listener_from(&load_balancer, name)
    }

    async fn update_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "listeners", name],
            &[],
        )?;
        self.submit(Method::PUT, url, Some(details), Some(retry_token))
            .await
    }

    async fn delete_listener(&self, load_balancer_id: &str, name: &str) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "listeners", name],
            &[],
        )?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn create_certificate(
        &self,
        load_balancer_id: &str,
        details: &CreateCertificateDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "certificates"],
            &[],
        )?;
        self.submit(Method::POST, url, Some(details), Some(retry_token))
            .await
    }

    /// Certificates can only be listed, not fetched by name
    async fn get_certificate(&self, load_balancer_id: &str, name: &str) -> Result<Certificate, CloudError> {
        let certificates: Vec<Certificate> = self
            .get_json(self.url(
                Service::LoadBalancer,
                &["loadBalancers", load_balancer_id, "certificates"],
                &[],
            )?)
            .await?;
        certificates
            .into_iter()
            .find(|c| c.certificate_name == name)
            .ok_or_else(|| CloudError::NotAuthorizedOrNotFound(format!("certificate {name}")))
    }

    async fn delete_certificate(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let url = self.url(
            Service::LoadBalancer,
            &["loadBalancers", load_balancer_id, "certificates", name],
            &[],
        )?;
        self.submit::<()>(Method::DELETE, url, None, None).await
    }

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.work_request(Service::LoadBalancer, "loadBalancerWorkRequests", id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_layout_and_escaping() {
        let url = endpoint(
            "https://iaas.us-ashburn-1.oraclecloud.com",
            Service::LoadBalancer,
            &["loadBalancers", "ocid1.loadbalancer.oc1..a", "backendSets", "pool", "backends", "10.0.0.5:8080"],
            &[],
        )
        .unwrap();
        assert_eq!(
            url.path(),
            "/20170115/loadBalancers/ocid1.loadbalancer.oc1..a/backendSets/pool/backends/10.0.0.5:8080"
        );

        let url = endpoint(
            "http://localhost:9000/",
            Service::Core,
            &["vnicAttachments"],
            &[("compartmentId", "c"), ("instanceId", "i")],
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/20160918/vnicAttachments?compartmentId=c&instanceId=i");
    }

    #[test]
    fn test_work_request_shapes() {
        let container_engine: WireWorkRequest = serde_json::from_value(serde_json::json!({
            "id": "wr1",
            "operationType": "CLUSTER_CREATE",
            "status": "IN_PROGRESS",
            "resources": [{"entityType": "cluster", "actionType": "CREATED", "identifier": "ocid1.cluster.oc1..c"}]
        }))
        .unwrap();
        let wr = container_engine.into_work_request().unwrap();
        assert_eq!(wr.state, WorkRequestState::InProgress);
        assert_eq!(wr.created_identifier(), Some("ocid1.cluster.oc1..c"));

        let load_balancer: WireWorkRequest = serde_json::from_value(serde_json::json!({
            "id": "wr2",
            "type": "CreateLoadBalancer",
            "lifecycleState": "SUCCEEDED",
            "loadBalancerId": "ocid1.loadbalancer.oc1..l",
            "message": "done"
        }))
        .unwrap();
        let wr = load_balancer.into_work_request().unwrap();
        assert_eq!(wr.state, WorkRequestState::Succeeded);
        assert_eq!(wr.created_identifier(), Some("ocid1.loadbalancer.oc1..l"));

        let unknown: WireWorkRequest = serde_json::from_value(serde_json::json!({
            "id": "wr3", "status": "EXPLODED"
        }))
        .unwrap();
        assert!(unknown.into_work_request().is_err());
    }

    #[test]
    fn test_listener_read_from_load_balancer() {
        let load_balancer = serde_json::json!({
            "listeners": {
                "http": {
                    "name": "http",
                    "defaultBackendSetName": "pool",
                    "port": 80,
                    "protocol": "HTTP"
                }
            }
        });
        let listener = listener_from(&load_balancer, "http").unwrap();
        assert_eq!(listener.default_backend_set_name, "pool");
        assert!(listener_from(&load_balancer, "https").unwrap_err().is_not_found());
    }
}
