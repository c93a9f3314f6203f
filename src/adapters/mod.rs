//! # Kind Adapters
//!
//! One [`Adapter`](crate::controller::adapter::Adapter) per managed kind,
//! mapping its spec onto cloud calls and the observed resource back onto
//! `status.resource`.
//!
//! [`register_all`] wires every adapter to its store and returns the
//! read-only kind registry the engines share.

mod compute;
mod containerengine;
mod database;
mod identity;
mod loadbalancer;
mod network;

pub use compute::ComputeInstanceAdapter;
pub use containerengine::{ClusterAdapter, NodePoolAdapter};
pub use database::AutonomousDatabaseAdapter;
pub use identity::CompartmentAdapter;
pub use loadbalancer::{
    BackendAdapter, BackendSetAdapter, CertificateAdapter, ListenerAdapter, LoadBalancerAdapter,
};
pub use network::{SubnetAdapter, VirtualNetworkAdapter};

use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::registry::KindRegistry;
use crate::controller::store::{ObjectStore, Stores};
use crate::crd::{
    AutonomousDatabase, Backend, BackendSet, Certificate, Cluster, Compartment, ComputeInstance,
    Listener, LoadBalancer, ManagedObject, NodePool, Subnet, VirtualNetwork,
};
use crate::provider::CloudClients;
use crate::secrets::{SecretStore, WalletUnpacker};
use std::sync::Arc;

/// What adapters need besides their own object
#[derive(Clone)]
pub struct AdapterContext {
    pub clients: CloudClients,
    pub secrets: Arc<dyn SecretStore>,
    pub unpacker: Arc<dyn WalletUnpacker>,
    /// Parent of compartments created without a `compartmentRef`
    pub tenancy_id: String,
}

impl std::fmt::Debug for AdapterContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterContext")
            .field("tenancy_id", &self.tenancy_id)
            .finish_non_exhaustive()
    }
}

fn store<K: ManagedObject>(stores: &Stores) -> Result<Arc<dyn ObjectStore<K>>, ReconcilerError> {
    stores
        .get::<K>()
        .ok_or_else(|| ReconcilerError::Internal(format!("no store configured for {}", K::KIND)))
}

/// Register every managed kind, parents before children
///
/// # Errors
/// Fails when a kind has no store or is registered twice.
pub fn register_all(
    context: &AdapterContext,
    stores: &Stores,
) -> Result<KindRegistry, ReconcilerError> {
    let clients = &context.clients;
    KindRegistry::builder()
        .register(
            Arc::new(CompartmentAdapter::new(
                Arc::clone(&clients.identity),
                context.tenancy_id.clone(),
            )),
            store::<Compartment>(stores)?,
        )
        .register(
            Arc::new(VirtualNetworkAdapter::new(Arc::clone(&clients.network))),
            store::<VirtualNetwork>(stores)?,
        )
        .register(
            Arc::new(SubnetAdapter::new(Arc::clone(&clients.network))),
            store::<Subnet>(stores)?,
        )
        .register(
            Arc::new(ComputeInstanceAdapter::new(
                Arc::clone(&clients.compute),
                Arc::clone(&clients.network),
            )),
            store::<ComputeInstance>(stores)?,
        )
        .register(
            Arc::new(ClusterAdapter::new(Arc::clone(&clients.container_engine))),
            store::<Cluster>(stores)?,
        )
        .register(
            Arc::new(NodePoolAdapter::new(Arc::clone(&clients.container_engine))),
            store::<NodePool>(stores)?,
        )
        .register(
            Arc::new(AutonomousDatabaseAdapter::new(
                Arc::clone(&clients.database),
                Arc::clone(&context.secrets),
                Arc::clone(&context.unpacker),
            )),
            store::<AutonomousDatabase>(stores)?,
        )
        .register(
            Arc::new(LoadBalancerAdapter::new(Arc::clone(&clients.load_balancer))),
            store::<LoadBalancer>(stores)?,
        )
        .register(
            Arc::new(BackendSetAdapter::new(Arc::clone(&clients.load_balancer))),
            store::<BackendSet>(stores)?,
        )
        .register(
            Arc::new(BackendAdapter::new(
                Arc::clone(&clients.load_balancer),
                Arc::clone(&clients.compute),
                Arc::clone(&clients.network),
            )),
            store::<Backend>(stores)?,
        )
        .register(
            Arc::new(ListenerAdapter::new(Arc::clone(&clients.load_balancer))),
            store::<Listener>(stores)?,
        )
        .register(
            Arc::new(CertificateAdapter::new(Arc::clone(&clients.load_balancer))),
            store::<Certificate>(stores)?,
        )
        .build()
}

/// Cloud id recorded on `obj`, required by every call after create
pub(crate) fn require_id<K: ManagedObject>(obj: &K) -> Result<String, ReconcilerError> {
    obj.cloud_id()
        .map(ToString::to_string)
        .ok_or_else(|| ReconcilerError::Internal(format!("{} has no cloud id", K::KIND)))
}

/// `(namespace, name)` of an object read from the store
pub(crate) fn namespaced_name<K: ManagedObject>(obj: &K) -> (String, String) {
    use kube::ResourceExt;
    (obj.namespace().unwrap_or_default(), obj.name_any())
}
