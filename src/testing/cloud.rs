//! In-memory cloud.
//!
//! Implements every cloud client interface over plain maps. Operations that
//! the real cloud runs asynchronously return a work request whose effect is
//! applied at submission; the work request itself reports `InProgress` for a
//! configurable number of polls before settling. A failed work request rolls
//! its effect back.
//!
//! Every call is logged, failures can be injected per operation, and retry
//! tokens make creates idempotent the way the cloud does.

use crate::crd::WorkRequestState;
use crate::provider::models::*;
use crate::provider::{
    CloudError, ComputeClient, ContainerEngineClient, DatabaseClient, IdentityClient,
    LoadBalancerClient, VirtualNetworkClient, WorkRequestId,
};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One logged cloud call
#[derive(Debug, Clone, PartialEq)]
pub struct CloudCall {
    pub operation: String,
    pub target: String,
    pub retry_token: Option<String>,
    pub details: Option<serde_json::Value>,
}

type Rollback = Box<dyn FnOnce(&mut State) + Send>;

struct FakeWorkRequest {
    operation_type: String,
    entity_type: String,
    action_type: String,
    identifier: String,
    polls_left: u32,
    final_state: WorkRequestState,
    on_fail: Option<Rollback>,
}

struct Injected {
    error: CloudError,
    always: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    calls: Vec<CloudCall>,
    tokens: HashMap<(String, String), String>,
    failures: HashMap<String, Injected>,
    work_request_polls: u32,
    fail_next_work_request: bool,
    transitional_gets: u32,
    private_ips: VecDeque<String>,
    wallet: Vec<u8>,

    compartments: BTreeMap<String, Compartment>,
    vcns: BTreeMap<String, Vcn>,
    subnets: BTreeMap<String, Subnet>,
    instances: BTreeMap<String, Instance>,
    vnics: BTreeMap<String, Vnic>,
    vnic_attachments: Vec<VnicAttachment>,
    clusters: BTreeMap<String, Cluster>,
    node_pools: BTreeMap<String, NodePool>,
    databases: BTreeMap<String, AutonomousDatabase>,
    load_balancers: BTreeMap<String, LoadBalancer>,
    backend_sets: BTreeMap<(String, String), BackendSet>,
    listeners: BTreeMap<(String, String), Listener>,
    certificates: BTreeMap<(String, String), Certificate>,
    work_requests: BTreeMap<String, FakeWorkRequest>,
}

impl State {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn new_id(&mut self, resource_type: &str) -> String {
        let n = self.next();
        format!("ocid1.{resource_type}.oc1..fake{n}")
    }

    fn replay(&self, operation: &str, retry_token: &str) -> Option<String> {
        self.tokens
            .get(&(operation.to_string(), retry_token.to_string()))
            .cloned()
    }

    fn remember(&mut self, operation: &str, retry_token: &str, result: &str) {
        self.tokens.insert(
            (operation.to_string(), retry_token.to_string()),
            result.to_string(),
        );
    }

    /// Lifecycle as reported by a get
    fn observed(&mut self, actual: &str) -> String {
        if self.transitional_gets > 0 {
            self.transitional_gets -= 1;
            "PROVISIONING".to_string()
        } else {
            actual.to_string()
        }
    }

    fn submit(
        &mut self,
        operation_type: &str,
        entity_type: &str,
        action_type: &str,
        identifier: &str,
        on_fail: Option<Rollback>,
    ) -> String {
        let n = self.next();
        let id = format!("wr-{n}");
        let final_state = if std::mem::take(&mut self.fail_next_work_request) {
            WorkRequestState::Failed
        } else {
            WorkRequestState::Succeeded
        };
        self.work_requests.insert(
            id.clone(),
            FakeWorkRequest {
                operation_type: operation_type.to_string(),
                entity_type: entity_type.to_string(),
                action_type: action_type.to_string(),
                identifier: identifier.to_string(),
                polls_left: self.work_request_polls,
                final_state,
                on_fail,
            },
        );
        id
    }

    fn load_balancer_exists(&self, load_balancer_id: &str) -> Result<(), CloudError> {
        if self.load_balancers.contains_key(load_balancer_id) {
            Ok(())
        } else {
            Err(not_found("load balancer", load_balancer_id))
        }
    }
}

fn not_found(what: &str, id: &str) -> CloudError {
    CloudError::NotAuthorizedOrNotFound(format!("{what} {id} not found"))
}

fn to_details<T: serde::Serialize>(details: &T) -> Option<serde_json::Value> {
    serde_json::to_value(details).ok()
}

fn pair(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn backend_name(ip_address: &str, port: u16) -> String {
    format!("{ip_address}:{port}")
}

fn backend_from(details: &BackendDetails) -> Backend {
    Backend {
        name: backend_name(&details.ip_address, details.port),
        ip_address: details.ip_address.clone(),
        port: details.port,
        weight: details.weight,
        backup: details.backup.unwrap_or_default(),
        drain: details.drain.unwrap_or_default(),
        offline: details.offline.unwrap_or_default(),
    }
}

/// Gzipped tar archive holding `files`
pub fn wallet_archive(files: &[(&str, &[u8])]) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o600);
        builder.append_data(&mut header, path, *data)?;
    }
    builder.into_inner()?.finish()
}

/// The archive returned by wallet generation unless overridden
pub fn default_wallet() -> Vec<u8> {
    wallet_archive(&[
        ("cwallet.sso", b"sso-bytes".as_slice()),
        ("tnsnames.ora", b"adb_high = (description=...)".as_slice()),
        ("sqlnet.ora", b"WALLET_LOCATION = (SOURCE = (METHOD = file))".as_slice()),
    ])
    .unwrap_or_default()
}

pub struct FakeCloud {
    state: Mutex<State>,
}

impl std::fmt::Debug for FakeCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeCloud").finish_non_exhaustive()
    }
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                wallet: default_wallet(),
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log the call, then fail it if an error was injected for `operation`
    fn begin(
        &self,
        operation: &str,
        target: &str,
        retry_token: Option<&str>,
        details: Option<serde_json::Value>,
    ) -> Result<MutexGuard<'_, State>, CloudError> {
        let mut state = self.lock();
        state.calls.push(CloudCall {
            operation: operation.to_string(),
            target: target.to_string(),
            retry_token: retry_token.map(ToString::to_string),
            details,
        });
        if let Some(injected) = state.failures.get(operation) {
            let error = injected.error.clone();
            if !injected.always {
                state.failures.remove(operation);
            }
            return Err(error);
        }
        Ok(state)
    }

    // Scripting

    /// Fail every call to `operation` until cleared
    pub fn fail_always(&self, operation: &str, error: CloudError) {
        self.lock().failures.insert(
            operation.to_string(),
            Injected {
                error,
                always: true,
            },
        );
    }

    /// Fail the next call to `operation` only
    pub fn fail_next(&self, operation: &str, error: CloudError) {
        self.lock().failures.insert(
            operation.to_string(),
            Injected {
                error,
                always: false,
            },
        );
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// New work requests report `InProgress` for this many polls
    pub fn set_work_request_polls(&self, polls: u32) {
        self.lock().work_request_polls = polls;
    }

    /// The next submitted work request ends `Failed`
    pub fn fail_next_work_request(&self) {
        self.lock().fail_next_work_request = true;
    }

    /// The next `gets` resource reads report `PROVISIONING`
    pub fn set_transitional_gets(&self, gets: u32) {
        self.lock().transitional_gets = gets;
    }

    /// Private IP handed to the next launched instance
    pub fn queue_private_ip(&self, ip: &str) {
        self.lock().private_ips.push_back(ip.to_string());
    }

    pub fn set_wallet(&self, archive: Vec<u8>) {
        self.lock().wallet = archive;
    }

    /// Change a resource's lifecycle state out of band
    pub fn set_lifecycle(&self, id: &str, lifecycle_state: &str) -> bool {
        let mut state = self.lock();
        let lifecycle = lifecycle_state.to_string();
        macro_rules! set_in {
            ($($map:ident),*) => {
                $(
                    if let Some(resource) = state.$map.get_mut(id) {
                        resource.lifecycle_state = lifecycle;
                        return true;
                    }
                )*
            };
        }
        set_in!(compartments, vcns, subnets, instances, clusters, node_pools, databases, load_balancers);
        false
    }

    // Inspection

    pub fn calls(&self, operation: &str) -> Vec<CloudCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Calls that create, update or delete something
    pub fn mutating_calls(&self) -> Vec<CloudCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| !c.operation.starts_with("get_") && !c.operation.starts_with("list_"))
            .cloned()
            .collect()
    }

    pub fn compartment(&self, id: &str) -> Option<Compartment> {
        self.lock().compartments.get(id).cloned()
    }

    pub fn instance(&self, id: &str) -> Option<Instance> {
        self.lock().instances.get(id).cloned()
    }

    pub fn cluster(&self, id: &str) -> Option<Cluster> {
        self.lock().clusters.get(id).cloned()
    }

    pub fn node_pool(&self, id: &str) -> Option<NodePool> {
        self.lock().node_pools.get(id).cloned()
    }

    pub fn database(&self, id: &str) -> Option<AutonomousDatabase> {
        self.lock().databases.get(id).cloned()
    }

    pub fn load_balancer(&self, id: &str) -> Option<LoadBalancer> {
        self.lock().load_balancers.get(id).cloned()
    }

    pub fn backend_set(&self, load_balancer_id: &str, name: &str) -> Option<BackendSet> {
        self.lock()
            .backend_sets
            .get(&pair(load_balancer_id, name))
            .cloned()
    }

    pub fn listener(&self, load_balancer_id: &str, name: &str) -> Option<Listener> {
        self.lock()
            .listeners
            .get(&pair(load_balancer_id, name))
            .cloned()
    }

    pub fn certificate(&self, load_balancer_id: &str, name: &str) -> Option<Certificate> {
        self.lock()
            .certificates
            .get(&pair(load_balancer_id, name))
            .cloned()
    }

    pub fn database_count(&self) -> usize {
        self.lock().databases.len()
    }

    fn poll_work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        let mut state = self.begin("get_work_request", id, None, None)?;
        let entry = state
            .work_requests
            .get_mut(id)
            .ok_or_else(|| not_found("work request", id))?;
        let observed = if entry.polls_left > 0 {
            entry.polls_left -= 1;
            WorkRequestState::InProgress
        } else {
            entry.final_state
        };
        let rollback = if observed == WorkRequestState::Failed {
            entry.on_fail.take()
        } else {
            None
        };
        let work_request = WorkRequest {
            id: id.to_string(),
            operation_type: entry.operation_type.clone(),
            state: observed,
            resources: vec![WorkRequestResource {
                entity_type: entry.entity_type.clone(),
                action_type: entry.action_type.clone(),
                identifier: entry.identifier.clone(),
            }],
            message: (observed == WorkRequestState::Failed)
                .then(|| "injected work request failure".to_string()),
        };
        if let Some(rollback) = rollback {
            rollback(&mut *state);
        }
        Ok(work_request)
    }
}

#[async_trait]
impl IdentityClient for FakeCloud {
    async fn create_compartment(
        &self,
        details: &CreateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError> {
        let op = "create_compartment";
        let mut state = self.begin(op, &details.name, Some(retry_token), to_details(details))?;
        if let Some(existing) = state
            .replay(op, retry_token)
            .and_then(|id| state.compartments.get(&id).cloned())
        {
            return Ok(existing);
        }
        let compartment = Compartment {
            id: state.new_id("compartment"),
            compartment_id: details.compartment_id.clone(),
            name: details.name.clone(),
            description: details.description.clone(),
            lifecycle_state: "ACTIVE".to_string(),
            freeform_tags: details.freeform_tags.clone(),
        };
        state.remember(op, retry_token, &compartment.id);
        state
            .compartments
            .insert(compartment.id.clone(), compartment.clone());
        Ok(compartment)
    }

    async fn get_compartment(&self, id: &str) -> Result<Compartment, CloudError> {
        let mut state = self.begin("get_compartment", id, None, None)?;
        let mut compartment = state
            .compartments
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("compartment", id))?;
        compartment.lifecycle_state = state.observed(&compartment.lifecycle_state);
        Ok(compartment)
    }

    async fn update_compartment(
        &self,
        id: &str,
        details: &UpdateCompartmentDetails,
        retry_token: &str,
    ) -> Result<Compartment, CloudError> {
        let mut state = self.begin("update_compartment", id, Some(retry_token), to_details(details))?;
        let compartment = state
            .compartments
            .get_mut(id)
            .ok_or_else(|| not_found("compartment", id))?;
        if let Some(name) = &details.name {
            compartment.name.clone_from(name);
        }
        if let Some(description) = &details.description {
            compartment.description.clone_from(description);
        }
        if let Some(tags) = &details.freeform_tags {
            compartment.freeform_tags.clone_from(tags);
        }
        Ok(compartment.clone())
    }

    async fn delete_compartment(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.begin("delete_compartment", id, None, None)?;
        state
            .compartments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("compartment", id))
    }
}

#[async_trait]
impl VirtualNetworkClient for FakeCloud {
    async fn create_vcn(
        &self,
        details: &CreateVcnDetails,
        retry_token: &str,
    ) -> Result<Vcn, CloudError> {
        let op = "create_vcn";
        let mut state = self.begin(op, &details.display_name, Some(retry_token), to_details(details))?;
        if let Some(existing) = state
            .replay(op, retry_token)
            .and_then(|id| state.vcns.get(&id).cloned())
        {
            return Ok(existing);
        }
        let vcn = Vcn {
            id: state.new_id("vcn"),
            compartment_id: details.compartment_id.clone(),
            display_name: details.display_name.clone(),
            cidr_blocks: details.cidr_blocks.clone(),
            dns_label: details.dns_label.clone(),
            lifecycle_state: "AVAILABLE".to_string(),
        };
        state.remember(op, retry_token, &vcn.id);
        state.vcns.insert(vcn.id.clone(), vcn.clone());
        Ok(vcn)
    }

    async fn get_vcn(&self, id: &str) -> Result<Vcn, CloudError> {
        let mut state = self.begin("get_vcn", id, None, None)?;
        let mut vcn = state
            .vcns
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("vcn", id))?;
        vcn.lifecycle_state = state.observed(&vcn.lifecycle_state);
        Ok(vcn)
    }

    async fn update_vcn(
        &self,
        id: &str,
        details: &UpdateVcnDetails,
        retry_token: &str,
    ) -> Result<Vcn, CloudError> {
        let mut state = self.begin("update_vcn", id, Some(retry_token), to_details(details))?;
        let vcn = state.vcns.get_mut(id).ok_or_else(|| not_found("vcn", id))?;
        if let Some(name) = &details.display_name {
            vcn.display_name.clone_from(name);
        }
        Ok(vcn.clone())
    }

    async fn delete_vcn(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.begin("delete_vcn", id, None, None)?;
        if state.subnets.values().any(|s| s.vcn_id == id) {
            return Err(CloudError::Conflict(format!("vcn {id} still has subnets")));
        }
        state
            .vcns
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("vcn", id))
    }

    async fn create_subnet(
        &self,
        details: &CreateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError> {
        let op = "create_subnet";
        let mut state = self.begin(op, &details.display_name, Some(retry_token), to_details(details))?;
        if let Some(existing) = state
            .replay(op, retry_token)
            .and_then(|id| state.subnets.get(&id).cloned())
        {
            return Ok(existing);
        }
        let subnet = Subnet {
            id: state.new_id("subnet"),
            compartment_id: details.compartment_id.clone(),
            vcn_id: details.vcn_id.clone(),
            display_name: details.display_name.clone(),
            cidr_block: details.cidr_block.clone(),
            dns_label: details.dns_label.clone(),
            prohibit_public_ip_on_vnic: details.prohibit_public_ip_on_vnic,
            lifecycle_state: "AVAILABLE".to_string(),
        };
        state.remember(op, retry_token, &subnet.id);
        state.subnets.insert(subnet.id.clone(), subnet.clone());
        Ok(subnet)
    }

    async fn get_subnet(&self, id: &str) -> Result<Subnet, CloudError> {
        let mut state = self.begin("get_subnet", id, None, None)?;
        let mut subnet = state
            .subnets
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("subnet", id))?;
        subnet.lifecycle_state = state.observed(&subnet.lifecycle_state);
        Ok(subnet)
    }

    async fn update_subnet(
        &self,
        id: &str,
        details: &UpdateSubnetDetails,
        retry_token: &str,
    ) -> Result<Subnet, CloudError> {
        let mut state = self.begin("update_subnet", id, Some(retry_token), to_details(details))?;
        let subnet = state
            .subnets
            .get_mut(id)
            .ok_or_else(|| not_found("subnet", id))?;
        if let Some(name) = &details.display_name {
            subnet.display_name.clone_from(name);
        }
        if let Some(cidr) = &details.cidr_block {
            subnet.cidr_block.clone_from(cidr);
        }
        Ok(subnet.clone())
    }

    async fn delete_subnet(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.begin("delete_subnet", id, None, None)?;
        state
            .subnets
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("subnet", id))
    }

    async fn get_vnic(&self, id: &str) -> Result<Vnic, CloudError> {
        let state = self.begin("get_vnic", id, None, None)?;
        state
            .vnics
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("vnic", id))
    }
}

#[async_trait]
impl ComputeClient for FakeCloud {
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError> {
        let op = "launch_instance";
        let mut state = self.begin(op, &details.display_name, Some(retry_token), to_details(details))?;
        if let Some(existing) = state
            .replay(op, retry_token)
            .and_then(|id| state.instances.get(&id).cloned())
        {
            return Ok(existing);
        }
        let instance = Instance {
            id: state.new_id("instance"),
            compartment_id: details.compartment_id.clone(),
            availability_domain: details.availability_domain.clone(),
            display_name: details.display_name.clone(),
            shape: details.shape.clone(),
            shape_config: details.shape_config.clone(),
            lifecycle_state: "RUNNING".to_string(),
        };
        let vnic_id = state.new_id("vnic");
        let n = state.next();
        let private_ip = state
            .private_ips
            .pop_front()
            .unwrap_or_else(|| format!("10.0.0.{}", n % 250 + 2));
        state.vnics.insert(
            vnic_id.clone(),
            Vnic {
                id: vnic_id.clone(),
                private_ip: Some(private_ip),
                public_ip: None,
                is_primary: true,
            },
        );
        let attachment_id = state.new_id("vnicattachment");
        state.vnic_attachments.push(VnicAttachment {
            id: attachment_id,
            instance_id: instance.id.clone(),
            vnic_id: Some(vnic_id),
            lifecycle_state: "ATTACHED".to_string(),
        });
        state.remember(op, retry_token, &instance.id);
        state.instances.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    async fn get_instance(&self, id: &str) -> Result<Instance, CloudError> {
        let mut state = self.begin("get_instance", id, None, None)?;
        let mut instance = state
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("instance", id))?;
        instance.lifecycle_state = state.observed(&instance.lifecycle_state);
        Ok(instance)
    }

    async fn update_instance(
        &self,
        id: &str,
        details: &UpdateInstanceDetails,
        retry_token: &str,
    ) -> Result<Instance, CloudError> {
        let mut state = self.begin("update_instance", id, Some(retry_token), to_details(details))?;
        let instance = state
            .instances
            .get_mut(id)
            .ok_or_else(|| not_found("instance", id))?;
        if let Some(name) = &details.display_name {
            instance.display_name.clone_from(name);
        }
        if let Some(shape) = &details.shape {
            instance.shape.clone_from(shape);
        }
        if details.shape_config.is_some() {
            instance.shape_config.clone_from(&details.shape_config);
        }
        Ok(instance.clone())
    }

    async fn terminate_instance(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.begin("terminate_instance", id, None, None)?;
        state
            .instances
            .remove(id)
            .ok_or_else(|| not_found("instance", id))?;
        state.vnic_attachments.retain(|a| a.instance_id != id);
        Ok(())
    }

    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, CloudError> {
        let state = self.begin(
            "list_vnic_attachments",
            instance_id,
            None,
            Some(serde_json::json!({ "compartmentId": compartment_id })),
        )?;
        Ok(state
            .vnic_attachments
            .iter()
            .filter(|a| a.instance_id == instance_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContainerEngineClient for FakeCloud {
    async fn create_cluster(
        &self,
        details: &CreateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_cluster";
        let mut state = self.begin(op, &details.name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        let cluster = Cluster {
            id: state.new_id("cluster"),
            compartment_id: details.compartment_id.clone(),
            name: details.name.clone(),
            vcn_id: details.vcn_id.clone(),
            kubernetes_version: details.kubernetes_version.clone(),
            lifecycle_state: "ACTIVE".to_string(),
        };
        let id = cluster.id.clone();
        state.clusters.insert(id.clone(), cluster);
        let rollback_id = id.clone();
        let work_request = state.submit(
            "CLUSTER_CREATE",
            "cluster",
            "CREATED",
            &id,
            Some(Box::new(move |s: &mut State| {
                s.clusters.remove(&rollback_id);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_cluster(&self, id: &str) -> Result<Cluster, CloudError> {
        let mut state = self.begin("get_cluster", id, None, None)?;
        let mut cluster = state
            .clusters
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("cluster", id))?;
        cluster.lifecycle_state = state.observed(&cluster.lifecycle_state);
        Ok(cluster)
    }

    async fn update_cluster(
        &self,
        id: &str,
        details: &UpdateClusterDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("update_cluster", id, Some(retry_token), to_details(details))?;
        let cluster = state
            .clusters
            .get_mut(id)
            .ok_or_else(|| not_found("cluster", id))?;
        if let Some(name) = &details.name {
            cluster.name.clone_from(name);
        }
        if let Some(version) = &details.kubernetes_version {
            cluster.kubernetes_version.clone_from(version);
        }
        Ok(state.submit("CLUSTER_UPDATE", "cluster", "UPDATED", id, None))
    }

    async fn delete_cluster(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_cluster", id, None, None)?;
        let removed = state
            .clusters
            .remove(id)
            .ok_or_else(|| not_found("cluster", id))?;
        let restore_id = id.to_string();
        Ok(state.submit(
            "CLUSTER_DELETE",
            "cluster",
            "DELETED",
            id,
            Some(Box::new(move |s: &mut State| {
                s.clusters.insert(restore_id, removed);
            })),
        ))
    }

    async fn create_node_pool(
        &self,
        details: &CreateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_node_pool";
        let mut state = self.begin(op, &details.name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        let node_pool = NodePool {
            id: state.new_id("nodepool"),
            compartment_id: details.compartment_id.clone(),
            cluster_id: details.cluster_id.clone(),
            name: details.name.clone(),
            kubernetes_version: details.kubernetes_version.clone(),
            node_shape: details.node_shape.clone(),
            node_config_details: Some(details.node_config_details.clone()),
            lifecycle_state: "ACTIVE".to_string(),
        };
        let id = node_pool.id.clone();
        state.node_pools.insert(id.clone(), node_pool);
        let rollback_id = id.clone();
        let work_request = state.submit(
            "NODEPOOL_CREATE",
            "nodepool",
            "CREATED",
            &id,
            Some(Box::new(move |s: &mut State| {
                s.node_pools.remove(&rollback_id);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_node_pool(&self, id: &str) -> Result<NodePool, CloudError> {
        let mut state = self.begin("get_node_pool", id, None, None)?;
        let mut node_pool = state
            .node_pools
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("node pool", id))?;
        node_pool.lifecycle_state = state.observed(&node_pool.lifecycle_state);
        Ok(node_pool)
    }

    async fn update_node_pool(
        &self,
        id: &str,
        details: &UpdateNodePoolDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("update_node_pool", id, Some(retry_token), to_details(details))?;
        let node_pool = state
            .node_pools
            .get_mut(id)
            .ok_or_else(|| not_found("node pool", id))?;
        if let Some(name) = &details.name {
            node_pool.name.clone_from(name);
        }
        if let Some(version) = &details.kubernetes_version {
            node_pool.kubernetes_version.clone_from(version);
        }
        if details.node_config_details.is_some() {
            node_pool
                .node_config_details
                .clone_from(&details.node_config_details);
        }
        Ok(state.submit("NODEPOOL_UPDATE", "nodepool", "UPDATED", id, None))
    }

    async fn delete_node_pool(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_node_pool", id, None, None)?;
        let removed = state
            .node_pools
            .remove(id)
            .ok_or_else(|| not_found("node pool", id))?;
        let restore_id = id.to_string();
        Ok(state.submit(
            "NODEPOOL_DELETE",
            "nodepool",
            "DELETED",
            id,
            Some(Box::new(move |s: &mut State| {
                s.node_pools.insert(restore_id, removed);
            })),
        ))
    }

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.poll_work_request(id)
    }
}

#[async_trait]
impl DatabaseClient for FakeCloud {
    async fn create_autonomous_database(
        &self,
        details: &CreateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError> {
        let op = "create_autonomous_database";
        let mut state = self.begin(op, &details.db_name, Some(retry_token), to_details(details))?;
        if let Some(existing) = state
            .replay(op, retry_token)
            .and_then(|id| state.databases.get(&id).cloned())
        {
            return Ok(existing);
        }
        let database = AutonomousDatabase {
            id: state.new_id("autonomousdatabase"),
            compartment_id: details.compartment_id.clone(),
            db_name: details.db_name.clone(),
            display_name: details.display_name.clone(),
            cpu_core_count: details.cpu_core_count,
            data_storage_size_in_tbs: details.data_storage_size_in_tbs,
            db_workload: details.db_workload.clone(),
            is_auto_scaling_enabled: details.is_auto_scaling_enabled,
            lifecycle_state: "AVAILABLE".to_string(),
        };
        state.remember(op, retry_token, &database.id);
        state.databases.insert(database.id.clone(), database.clone());
        Ok(database)
    }

    async fn get_autonomous_database(&self, id: &str) -> Result<AutonomousDatabase, CloudError> {
        let mut state = self.begin("get_autonomous_database", id, None, None)?;
        let mut database = state
            .databases
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("autonomous database", id))?;
        database.lifecycle_state = state.observed(&database.lifecycle_state);
        Ok(database)
    }

    async fn update_autonomous_database(
        &self,
        id: &str,
        details: &UpdateAutonomousDatabaseDetails,
        retry_token: &str,
    ) -> Result<AutonomousDatabase, CloudError> {
        let op = "update_autonomous_database";
        let mut state = self.begin(op, id, Some(retry_token), to_details(details))?;
        let database = state
            .databases
            .get_mut(id)
            .ok_or_else(|| not_found("autonomous database", id))?;
        if let Some(name) = &details.display_name {
            database.display_name.clone_from(name);
        }
        if let Some(cpus) = details.cpu_core_count {
            database.cpu_core_count = cpus;
        }
        if let Some(size) = details.data_storage_size_in_tbs {
            database.data_storage_size_in_tbs = size;
        }
        if let Some(auto_scaling) = details.is_auto_scaling_enabled {
            database.is_auto_scaling_enabled = auto_scaling;
        }
        Ok(database.clone())
    }

    async fn delete_autonomous_database(&self, id: &str) -> Result<(), CloudError> {
        let mut state = self.begin("delete_autonomous_database", id, None, None)?;
        state
            .databases
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("autonomous database", id))
    }

    async fn generate_autonomous_database_wallet(
        &self,
        id: &str,
        details: &GenerateWalletDetails,
    ) -> Result<Vec<u8>, CloudError> {
        let state = self.begin(
            "generate_autonomous_database_wallet",
            id,
            None,
            Some(serde_json::json!({ "generateType": details.generate_type })),
        )?;
        if !state.databases.contains_key(id) {
            return Err(not_found("autonomous database", id));
        }
        Ok(state.wallet.clone())
    }
}

#[async_trait]
impl LoadBalancerClient for FakeCloud {
    async fn create_load_balancer(
        &self,
        details: &CreateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_load_balancer";
        let mut state = self.begin(op, &details.display_name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        let n = state.next();
        let load_balancer = LoadBalancer {
            id: state.new_id("loadbalancer"),
            compartment_id: details.compartment_id.clone(),
            display_name: details.display_name.clone(),
            shape_name: details.shape_name.clone(),
            subnet_ids: details.subnet_ids.clone(),
            is_private: details.is_private,
            ip_addresses: vec![IpAddress {
                ip_address: format!("192.0.2.{}", n % 250 + 2),
                is_public: !details.is_private,
            }],
            lifecycle_state: "ACTIVE".to_string(),
        };
        let id = load_balancer.id.clone();
        state.load_balancers.insert(id.clone(), load_balancer);
        let rollback_id = id.clone();
        let work_request = state.submit(
            "CreateLoadBalancer",
            "loadbalancer",
            "CREATED",
            &id,
            Some(Box::new(move |s: &mut State| {
                s.load_balancers.remove(&rollback_id);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, CloudError> {
        let mut state = self.begin("get_load_balancer", id, None, None)?;
        let mut load_balancer = state
            .load_balancers
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("load balancer", id))?;
        load_balancer.lifecycle_state = state.observed(&load_balancer.lifecycle_state);
        Ok(load_balancer)
    }

    async fn update_load_balancer(
        &self,
        id: &str,
        details: &UpdateLoadBalancerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "update_load_balancer";
        let mut state = self.begin(op, id, Some(retry_token), to_details(details))?;
        let load_balancer = state
            .load_balancers
            .get_mut(id)
            .ok_or_else(|| not_found("load balancer", id))?;
        if let Some(name) = &details.display_name {
            load_balancer.display_name.clone_from(name);
        }
        Ok(state.submit("UpdateLoadBalancer", "loadbalancer", "UPDATED", id, None))
    }

    async fn delete_load_balancer(&self, id: &str) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_load_balancer", id, None, None)?;
        let removed = state
            .load_balancers
            .remove(id)
            .ok_or_else(|| not_found("load balancer", id))?;
        let restore_id = id.to_string();
        Ok(state.submit(
            "DeleteLoadBalancer",
            "loadbalancer",
            "DELETED",
            id,
            Some(Box::new(move |s: &mut State| {
                s.load_balancers.insert(restore_id, removed);
            })),
        ))
    }

    async fn create_backend_set(
        &self,
        load_balancer_id: &str,
        details: &CreateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_backend_set";
        let mut state = self.begin(op, &details.name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        state.load_balancer_exists(load_balancer_id)?;
        let key = pair(load_balancer_id, &details.name);
        if state.backend_sets.contains_key(&key) {
            return Err(CloudError::Conflict(format!(
                "backend set {} already exists",
                details.name
            )));
        }
        state.backend_sets.insert(
            key.clone(),
            BackendSet {
                name: details.name.clone(),
                policy: details.policy.clone(),
                health_checker: details.health_checker.clone(),
                ssl_configuration: details.ssl_configuration.clone(),
                backends: Vec::new(),
            },
        );
        let work_request = state.submit(
            "CreateBackendSet",
            "backendset",
            "CREATED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.backend_sets.remove(&key);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<BackendSet, CloudError> {
        let state = self.begin("get_backend_set", name, None, None)?;
        state
            .backend_sets
            .get(&pair(load_balancer_id, name))
            .cloned()
            .ok_or_else(|| not_found("backend set", name))
    }

    async fn update_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateBackendSetDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("update_backend_set", name, Some(retry_token), to_details(details))?;
        let backend_set = state
            .backend_sets
            .get_mut(&pair(load_balancer_id, name))
            .ok_or_else(|| not_found("backend set", name))?;
        backend_set.policy.clone_from(&details.policy);
        backend_set.health_checker = details.health_checker.clone();
        backend_set
            .ssl_configuration
            .clone_from(&details.ssl_configuration);
        backend_set.backends = details.backends.iter().map(backend_from).collect();
        Ok(state.submit("UpdateBackendSet", "backendset", "UPDATED", load_balancer_id, None))
    }

    async fn delete_backend_set(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_backend_set", name, None, None)?;
        let key = pair(load_balancer_id, name);
        if state.listeners.values().any(|l| l.default_backend_set_name == name) {
            return Err(CloudError::InvalidParameter(format!(
                "backend set {name} is used by a listener"
            )));
        }
        let removed = state
            .backend_sets
            .remove(&key)
            .ok_or_else(|| not_found("backend set", name))?;
        Ok(state.submit(
            "DeleteBackendSet",
            "backendset",
            "DELETED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.backend_sets.insert(key, removed);
            })),
        ))
    }

    async fn create_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        details: &BackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_backend";
        let name = backend_name(&details.ip_address, details.port);
        let mut state = self.begin(op, &name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        let key = pair(load_balancer_id, backend_set_name);
        let backend_set = state
            .backend_sets
            .get_mut(&key)
            .ok_or_else(|| not_found("backend set", backend_set_name))?;
        if backend_set.backends.iter().any(|b| b.name == name) {
            return Err(CloudError::Conflict(format!("backend {name} already exists")));
        }
        backend_set.backends.push(backend_from(details));
        let rollback_name = name.clone();
        let work_request = state.submit(
            "CreateBackend",
            "backend",
            "CREATED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                if let Some(set) = s.backend_sets.get_mut(&key) {
                    set.backends.retain(|b| b.name != rollback_name);
                }
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<Backend, CloudError> {
        let state = self.begin("get_backend", name, None, None)?;
        state
            .backend_sets
            .get(&pair(load_balancer_id, backend_set_name))
            .and_then(|set| set.backends.iter().find(|b| b.name == name))
            .cloned()
            .ok_or_else(|| not_found("backend", name))
    }

    async fn update_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
        details: &UpdateBackendDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("update_backend", name, Some(retry_token), to_details(details))?;
        let backend = state
            .backend_sets
            .get_mut(&pair(load_balancer_id, backend_set_name))
            .and_then(|set| set.backends.iter_mut().find(|b| b.name == name))
            .ok_or_else(|| not_found("backend", name))?;
        backend.weight = details.weight;
        backend.backup = details.backup;
        backend.drain = details.drain;
        backend.offline = details.offline;
        Ok(state.submit("UpdateBackend", "backend", "UPDATED", load_balancer_id, None))
    }

    async fn delete_backend(
        &self,
        load_balancer_id: &str,
        backend_set_name: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_backend", name, None, None)?;
        let key = pair(load_balancer_id, backend_set_name);
        let backend_set = state
            .backend_sets
            .get_mut(&key)
            .ok_or_else(|| not_found("backend set", backend_set_name))?;
        let position = backend_set
            .backends
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| not_found("backend", name))?;
        let removed = backend_set.backends.remove(position);
        Ok(state.submit(
            "DeleteBackend",
            "backend",
            "DELETED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                if let Some(set) = s.backend_sets.get_mut(&key) {
                    set.backends.push(removed);
                }
            })),
        ))
    }

    async fn create_listener(
        &self,
        load_balancer_id: &str,
        details: &CreateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_listener";
        let mut state = self.begin(op, &details.name, Some(retry_token), to_details(details))?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        state.load_balancer_exists(load_balancer_id)?;
        if !state
            .backend_sets
            .contains_key(&pair(load_balancer_id, &details.default_backend_set_name))
        {
            return Err(CloudError::InvalidParameter(format!(
                "backend set {} does not exist",
                details.default_backend_set_name
            )));
        }
        let key = pair(load_balancer_id, &details.name);
        state.listeners.insert(
            key.clone(),
            Listener {
                name: details.name.clone(),
                default_backend_set_name: details.default_backend_set_name.clone(),
                port: details.port,
                protocol: details.protocol.clone(),
                ssl_configuration: details.ssl_configuration.clone(),
            },
        );
        let work_request = state.submit(
            "CreateListener",
            "listener",
            "CREATED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.listeners.remove(&key);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<Listener, CloudError> {
        let state = self.begin("get_listener", name, None, None)?;
        state
            .listeners
            .get(&pair(load_balancer_id, name))
            .cloned()
            .ok_or_else(|| not_found("listener", name))
    }

    async fn update_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
        details: &UpdateListenerDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("update_listener", name, Some(retry_token), to_details(details))?;
        let listener = state
            .listeners
            .get_mut(&pair(load_balancer_id, name))
            .ok_or_else(|| not_found("listener", name))?;
        listener
            .default_backend_set_name
            .clone_from(&details.default_backend_set_name);
        listener.port = details.port;
        listener.protocol.clone_from(&details.protocol);
        listener
            .ssl_configuration
            .clone_from(&details.ssl_configuration);
        Ok(state.submit("UpdateListener", "listener", "UPDATED", load_balancer_id, None))
    }

    async fn delete_listener(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_listener", name, None, None)?;
        let key = pair(load_balancer_id, name);
        let removed = state
            .listeners
            .remove(&key)
            .ok_or_else(|| not_found("listener", name))?;
        Ok(state.submit(
            "DeleteListener",
            "listener",
            "DELETED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.listeners.insert(key, removed);
            })),
        ))
    }

    async fn create_certificate(
        &self,
        load_balancer_id: &str,
        details: &CreateCertificateDetails,
        retry_token: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let op = "create_certificate";
        let mut state = self.begin(
            op,
            &details.certificate_name,
            Some(retry_token),
            Some(serde_json::json!({ "certificateName": details.certificate_name })),
        )?;
        if let Some(work_request) = state.replay(op, retry_token) {
            return Ok(work_request);
        }
        state.load_balancer_exists(load_balancer_id)?;
        let key = pair(load_balancer_id, &details.certificate_name);
        state.certificates.insert(
            key.clone(),
            Certificate {
                certificate_name: details.certificate_name.clone(),
                public_certificate: details.public_certificate.clone(),
                ca_certificate: details.ca_certificate.clone(),
            },
        );
        let work_request = state.submit(
            "CreateCertificate",
            "certificate",
            "CREATED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.certificates.remove(&key);
            })),
        );
        state.remember(op, retry_token, &work_request);
        Ok(work_request)
    }

    async fn get_certificate(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<Certificate, CloudError> {
        let state = self.begin("get_certificate", name, None, None)?;
        state
            .certificates
            .get(&pair(load_balancer_id, name))
            .cloned()
            .ok_or_else(|| not_found("certificate", name))
    }

    async fn delete_certificate(
        &self,
        load_balancer_id: &str,
        name: &str,
    ) -> Result<WorkRequestId, CloudError> {
        let mut state = self.begin("delete_certificate", name, None, None)?;
        let key = pair(load_balancer_id, name);
        let removed = state
            .certificates
            .remove(&key)
            .ok_or_else(|| not_found("certificate", name))?;
        Ok(state.submit(
            "DeleteCertificate",
            "certificate",
            "DELETED",
            load_balancer_id,
            Some(Box::new(move |s: &mut State| {
                s.certificates.insert(key, removed);
            })),
        ))
    }

    async fn get_work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        self.poll_work_request(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lb_details() -> CreateLoadBalancerDetails {
        CreateLoadBalancerDetails {
            compartment_id: "ocid1.compartment.oc1..c".into(),
            display_name: "lb".into(),
            shape_name: "100Mbps".into(),
            subnet_ids: vec!["ocid1.subnet.oc1..s".into()],
            is_private: true,
        }
    }

    #[tokio::test]
    async fn test_work_request_reports_progress_then_success() {
        let cloud = FakeCloud::new();
        cloud.set_work_request_polls(2);
        let wr = cloud.create_load_balancer(&lb_details(), "t1").await.unwrap();

        let poll = || LoadBalancerClient::get_work_request(&cloud, &wr);
        assert_eq!(poll().await.unwrap().state, WorkRequestState::InProgress);
        assert_eq!(poll().await.unwrap().state, WorkRequestState::InProgress);
        let done = poll().await.unwrap();
        assert_eq!(done.state, WorkRequestState::Succeeded);
        let id = done.created_identifier().unwrap().to_string();
        assert!(cloud.load_balancer(&id).is_some());
    }

    #[tokio::test]
    async fn test_failed_work_request_rolls_back() {
        let cloud = FakeCloud::new();
        cloud.fail_next_work_request();
        let wr = cloud.create_load_balancer(&lb_details(), "t1").await.unwrap();
        let result = LoadBalancerClient::get_work_request(&cloud, &wr).await.unwrap();
        assert_eq!(result.state, WorkRequestState::Failed);
        let id = result.created_identifier().unwrap();
        assert!(cloud.load_balancer(id).is_none());
    }

    #[tokio::test]
    async fn test_retry_token_replays_create() {
        let cloud = FakeCloud::new();
        let first = cloud.create_load_balancer(&lb_details(), "same").await.unwrap();
        let second = cloud.create_load_balancer(&lb_details(), "same").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cloud.count("create_load_balancer"), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let cloud = FakeCloud::new();
        cloud.fail_next("get_compartment", CloudError::ServiceUnavailable("busy".into()));
        let err = cloud.get_compartment("ocid1.compartment.oc1..x").await.unwrap_err();
        assert!(err.is_transient());
        let err = cloud.get_compartment("ocid1.compartment.oc1..x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_default_wallet_is_gzip() {
        let wallet = default_wallet();
        assert_eq!(&wallet[..2], &[0x1f, 0x8b]);
    }
}
