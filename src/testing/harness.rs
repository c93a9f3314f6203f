//! Every kind wired over fakes, ticked by hand.
//!
//! Panics on store failures: it only backs tests.

use super::{FakeCloud, FakeSecretStore, FakeStore};
use crate::adapters::{register_all, AdapterContext};
use crate::controller::reconciler::types::{EngineConfig, ReconcilerError, TickOutcome};
use crate::controller::reconciler::Ticker;
use crate::controller::registry::KindRegistry;
use crate::controller::store::{ObjectStore, Stores};
use crate::crd::{
    AutonomousDatabase, Backend, BackendSet, Certificate, Cluster, Compartment, ComputeInstance,
    Listener, LoadBalancer, ManagedObject, NodePool, ObjectKey, Subnet, VirtualNetwork,
};
use crate::provider::CloudClients;
use crate::secrets::{SecretStore, TarGzUnpacker};
use kube::Resource;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const NAMESPACE: &str = "default";
pub const TENANCY_ID: &str = "ocid1.tenancy.oc1..fake";

/// Engine-facing stores plus the concrete fakes behind them, for scripting
#[derive(Default)]
struct FakeStores {
    stores: Stores,
    fakes: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl FakeStores {
    fn with<K: ManagedObject>(mut self) -> Self {
        let fake = Arc::new(FakeStore::<K>::new());
        self.fakes.insert(TypeId::of::<K>(), Arc::clone(&fake) as Arc<dyn Any + Send + Sync>);
        self.stores = self.stores.with::<K>(fake);
        self
    }
}

fn fake_stores() -> FakeStores {
    FakeStores::default()
        .with::<Compartment>()
        .with::<VirtualNetwork>()
        .with::<Subnet>()
        .with::<ComputeInstance>()
        .with::<Cluster>()
        .with::<NodePool>()
        .with::<AutonomousDatabase>()
        .with::<LoadBalancer>()
        .with::<BackendSet>()
        .with::<Backend>()
        .with::<Listener>()
        .with::<Certificate>()
}

pub struct Harness {
    cloud: Arc<FakeCloud>,
    secrets: Arc<FakeSecretStore>,
    stores: FakeStores,
    registry: Arc<KindRegistry>,
    tickers: BTreeMap<&'static str, Arc<dyn Ticker>>,
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("kinds", &self.registry.kinds())
            .finish_non_exhaustive()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let cloud = Arc::new(FakeCloud::new());
        let secrets = Arc::new(FakeSecretStore::new());
        let stores = fake_stores();
        let context = AdapterContext {
            clients: CloudClients::from_single(&cloud),
            secrets: Arc::clone(&secrets) as Arc<dyn SecretStore>,
            unpacker: Arc::new(TarGzUnpacker::default()),
            tenancy_id: TENANCY_ID.to_string(),
        };
        let registry = Arc::new(
            register_all(&context, &stores.stores).expect("every kind has a fake store"),
        );
        let tickers = registry
            .entries()
            .map(|entry| {
                (
                    entry.handle.kind(),
                    entry.handle.ticker(Arc::clone(&registry), config.clone()),
                )
            })
            .collect();
        Self {
            cloud,
            secrets,
            stores,
            registry,
            tickers,
        }
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    pub fn namespace(&self) -> &str {
        NAMESPACE
    }

    pub fn cloud(&self) -> &FakeCloud {
        &self.cloud
    }

    pub fn secrets(&self) -> &FakeSecretStore {
        &self.secrets
    }

    pub fn store<K: ManagedObject>(&self) -> Arc<dyn ObjectStore<K>> {
        self.stores
            .stores
            .get::<K>()
            .unwrap_or_else(|| panic!("no store for {}", K::KIND))
    }

    /// The fake behind [`Harness::store`], for injecting store failures
    pub fn fake_store<K: ManagedObject>(&self) -> Arc<FakeStore<K>> {
        self.stores
            .fakes
            .get(&TypeId::of::<K>())
            .and_then(|fake| Arc::clone(fake).downcast::<FakeStore<K>>().ok())
            .unwrap_or_else(|| panic!("no fake store for {}", K::KIND))
    }

    fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(NAMESPACE, name)
    }

    /// Create `obj` as a user would; any status on it is dropped
    pub async fn apply<K: ManagedObject>(&self, mut obj: K) -> K {
        obj.meta_mut().namespace = Some(NAMESPACE.to_string());
        self.store::<K>()
            .create(&obj)
            .await
            .unwrap_or_else(|e| panic!("create {}: {e}", K::KIND))
    }

    /// Create `obj` and then write its status as given
    pub async fn apply_with_status<K: ManagedObject>(&self, mut obj: K) -> K {
        obj.meta_mut().namespace = Some(NAMESPACE.to_string());
        let created = self.apply(obj.clone()).await;
        *obj.meta_mut() = created.meta().clone();
        self.store::<K>()
            .replace_status(&obj)
            .await
            .unwrap_or_else(|e| panic!("status {}: {e}", K::KIND))
    }

    pub async fn get<K: ManagedObject>(&self, name: &str) -> Option<K> {
        self.store::<K>()
            .get(&self.key(name))
            .await
            .unwrap_or_else(|e| panic!("get {}: {e}", K::KIND))
    }

    /// Edit the spec or metadata of a stored object, as `kubectl edit` would
    pub async fn edit<K: ManagedObject>(&self, name: &str, edit: impl FnOnce(&mut K)) -> K {
        let mut obj = self
            .get::<K>(name)
            .await
            .unwrap_or_else(|| panic!("{} {name} not found", K::KIND));
        edit(&mut obj);
        self.store::<K>()
            .replace(&obj)
            .await
            .unwrap_or_else(|e| panic!("replace {}: {e}", K::KIND))
    }

    /// Request deletion; objects with finalizers only get a deletion timestamp
    pub async fn delete<K: ManagedObject>(&self, name: &str) {
        self.store::<K>()
            .delete(&self.key(name))
            .await
            .unwrap_or_else(|e| panic!("delete {}: {e}", K::KIND));
    }

    pub async fn tick<K: ManagedObject>(&self, name: &str) -> Result<TickOutcome, ReconcilerError> {
        let ticker = self
            .tickers
            .get(K::KIND)
            .unwrap_or_else(|| panic!("no engine for {}", K::KIND));
        ticker.tick(&self.key(name)).await
    }

    /// Tick until `done` holds for the stored object, up to `max_ticks` times
    pub async fn tick_until<K: ManagedObject>(
        &self,
        name: &str,
        max_ticks: usize,
        done: impl Fn(&K) -> bool,
    ) -> K {
        for _ in 0..max_ticks {
            // Errors are folded into status; the predicate decides
            let _ = self.tick::<K>(name).await;
            if let Some(obj) = self.get::<K>(name).await {
                if done(&obj) {
                    return obj;
                }
            }
        }
        panic!("{} {name} did not settle in {max_ticks} ticks", K::KIND);
    }

    /// Tick until the object is gone from the store
    pub async fn tick_until_gone<K: ManagedObject>(&self, name: &str, max_ticks: usize) {
        for _ in 0..max_ticks {
            let _ = self.tick::<K>(name).await;
            if self.get::<K>(name).await.is_none() {
                return;
            }
        }
        panic!("{} {name} still present after {max_ticks} ticks", K::KIND);
    }

    /// Keys enqueued for `kind` since the last call
    pub fn triggered(&self, kind: &str) -> Vec<ObjectKey> {
        self.registry
            .handle(kind)
            .map(|handle| handle.drain_triggers())
            .unwrap_or_default()
    }
}
