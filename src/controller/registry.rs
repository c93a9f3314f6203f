//! # Kind Registry
//!
//! Process-wide map from `(group, kind)` to everything the runtime needs for
//! that kind: plural name, controller name, CRD (with its validation schema)
//! and a type-erased [`KindHandle`] wrapping the adapter and store.
//!
//! The registry is assembled once at startup and is read-only afterwards.
//! Handles are how one kind's engine reaches another kind's objects: parent
//! lookups during reference resolution, dependent bookkeeping and fan-out.

use crate::constants::API_GROUP;
use crate::controller::adapter::Adapter;
use crate::controller::reconciler::types::{EngineConfig, ReconcilerError};
use crate::controller::reconciler::{Engine, Ticker};
use crate::controller::store::{ObjectStore, StoreError};
use crate::crd::{DependsOnSelector, ManagedObject, ObjectKey, OsokState};
use crate::runtime::watch_loop::{self, ControllerContext};
use async_trait::async_trait;
use futures::future::BoxFuture;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::core::GroupVersionResource;
use kube::runtime::reflector::ObjectRef;
use kube::Resource;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// What a child needs to know about a parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSummary {
    pub id: Option<String>,
    pub ready: bool,
    pub terminating: bool,
    pub state: OsokState,
    pub attributes: BTreeMap<String, String>,
}

impl ParentSummary {
    /// Why the parent cannot be used yet; `None` when it is ready
    pub fn unready_reason(&self) -> Option<String> {
        if self.terminating {
            Some("it is being deleted".to_string())
        } else if self.id.is_none() {
            Some(format!("it has no cloud id yet (state {})", self.state))
        } else if !self.ready {
            Some(format!("it is in state {}", self.state))
        } else {
            None
        }
    }
}

/// Whether a `dependsOn` selector picks out a given parent
pub type SelectedBy<'a> = &'a (dyn Fn(&DependsOnSelector) -> bool + Sync);

/// Type-erased access to one registered kind
#[async_trait]
pub trait KindHandle: Send + Sync {
    fn kind(&self) -> &'static str;

    fn plural(&self) -> String;

    fn group_version_resource(&self) -> GroupVersionResource;

    async fn summary(&self, key: &ObjectKey) -> Result<Option<ParentSummary>, StoreError>;

    /// Same-namespace objects matching a `dependsOn` selector
    async fn select(
        &self,
        namespace: &str,
        selector: &DependsOnSelector,
    ) -> Result<Vec<(ObjectKey, ParentSummary)>, StoreError>;

    /// Record `child` in the parent's dependents; false if it already was
    async fn add_dependent(
        &self,
        parent: &ObjectKey,
        child_kind: &str,
        child: &ObjectKey,
    ) -> Result<bool, ReconcilerError>;

    /// Drop `child` from the parent's dependents; false if nothing changed
    async fn remove_dependent(
        &self,
        parent: &ObjectKey,
        child_kind: &str,
        child: &ObjectKey,
    ) -> Result<bool, ReconcilerError>;

    /// Whether `child` (of this kind) exists and still points at the parent,
    /// by name or through a selector the parent satisfies
    async fn still_depends_on(
        &self,
        child: &ObjectKey,
        parent_kind: &str,
        parent: &ObjectKey,
        selected_by: SelectedBy<'_>,
    ) -> Result<bool, StoreError>;

    /// Enqueue every object of this kind referring to `parent`, a resource of
    /// `gvr` that just became available. Returns how many were enqueued.
    async fn update_for_resource(
        &self,
        registry: &KindRegistry,
        gvr: &GroupVersionResource,
        parent: &ObjectKey,
        selected_by: SelectedBy<'_>,
    ) -> Result<usize, ReconcilerError>;

    /// Ask this kind's controller to reconcile `key` soon
    fn enqueue(&self, key: &ObjectKey);

    /// Pending enqueued keys, for drivers that run ticks by hand
    fn drain_triggers(&self) -> Vec<ObjectKey>;

    fn ticker(&self, registry: Arc<KindRegistry>, config: EngineConfig) -> Arc<dyn Ticker>;

    /// Run this kind's controller until shutdown
    fn run(
        &self,
        registry: Arc<KindRegistry>,
        context: ControllerContext,
    ) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// [`KindHandle`] for an adapter and its store
pub struct TypedKindHandle<A: Adapter> {
    adapter: Arc<A>,
    store: Arc<dyn ObjectStore<A::Object>>,
    trigger_tx: UnboundedSender<ObjectRef<A::Object>>,
    trigger_rx: Mutex<Option<UnboundedReceiver<ObjectRef<A::Object>>>>,
}

impl<A: Adapter> std::fmt::Debug for TypedKindHandle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedKindHandle")
            .field("kind", &self.adapter.kind())
            .finish_non_exhaustive()
    }
}

impl<A: Adapter> TypedKindHandle<A> {
    pub fn new(adapter: Arc<A>, store: Arc<dyn ObjectStore<A::Object>>) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        Self {
            adapter,
            store,
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
        }
    }

    fn summarize(&self, obj: &A::Object) -> ParentSummary {
        ParentSummary {
            id: self.adapter.id(obj).map(ToString::to_string),
            ready: self.adapter.is_ready(obj),
            terminating: obj.is_terminating(),
            state: obj.state(),
            attributes: self.adapter.attributes(obj),
        }
    }

    fn refers_to(
        &self,
        obj: &A::Object,
        parent_kind: &str,
        parent_name: &str,
        selected_by: SelectedBy<'_>,
    ) -> bool {
        self.adapter
            .references(obj)
            .iter()
            .any(|r| r.kind == parent_kind && r.value.trim() == parent_name)
            || self
                .adapter
                .depends_on(obj)
                .get(parent_kind)
                .is_some_and(selected_by)
    }

    /// Read-modify-write of a parent's common status
    async fn edit_dependents(
        &self,
        parent: &ObjectKey,
        edit: impl FnOnce(&mut A::Object) -> bool + Send,
    ) -> Result<bool, ReconcilerError> {
        let Some(mut obj) = self.store.get(parent).await? else {
            return Err(ReconcilerError::ReferenceMissing {
                kind: self.adapter.kind().to_string(),
                name: parent.name.clone(),
            });
        };
        if !edit(&mut obj) {
            return Ok(false);
        }
        self.store.replace_status(&obj).await?;
        Ok(true)
    }
}

fn json_path<'v>(value: &'v serde_json::Value, path: &str) -> Option<&'v serde_json::Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// Labels are a subset match; fields compare the value at a dotted JSON path
pub fn matches_selector<K: ManagedObject>(obj: &K, selector: &DependsOnSelector) -> bool {
    let labels = obj.meta().labels.clone().unwrap_or_default();
    let labels_match = selector
        .match_labels
        .iter()
        .all(|(k, v)| labels.get(k) == Some(v));
    if !labels_match {
        return false;
    }
    if selector.match_fields.is_empty() {
        return true;
    }
    let Ok(value) = serde_json::to_value(obj) else {
        return false;
    };
    selector.match_fields.iter().all(|(path, expected)| {
        match json_path(&value, path) {
            Some(serde_json::Value::String(s)) => s == expected,
            Some(other) => other.to_string() == *expected,
            None => false,
        }
    })
}

#[async_trait]
impl<A: Adapter> KindHandle for TypedKindHandle<A> {
    fn kind(&self) -> &'static str {
        self.adapter.kind()
    }

    fn plural(&self) -> String {
        self.adapter.resource()
    }

    fn group_version_resource(&self) -> GroupVersionResource {
        self.adapter.group_version_resource()
    }

    async fn summary(&self, key: &ObjectKey) -> Result<Option<ParentSummary>, StoreError> {
        Ok(self.store.get(key).await?.map(|obj| self.summarize(&obj)))
    }

    async fn select(
        &self,
        namespace: &str,
        selector: &DependsOnSelector,
    ) -> Result<Vec<(ObjectKey, ParentSummary)>, StoreError> {
        let objects = self.store.list(Some(namespace)).await?;
        Ok(objects
            .iter()
            .filter(|obj| matches_selector(*obj, selector))
            .filter_map(|obj| Some((ObjectKey::of(obj)?, self.summarize(obj))))
            .collect())
    }

    async fn add_dependent(
        &self,
        parent: &ObjectKey,
        child_kind: &str,
        child: &ObjectKey,
    ) -> Result<bool, ReconcilerError> {
        self.edit_dependents(parent, |obj| {
            obj.common_status_mut().add_dependent(child_kind, child)
        })
        .await
    }

    async fn remove_dependent(
        &self,
        parent: &ObjectKey,
        child_kind: &str,
        child: &ObjectKey,
    ) -> Result<bool, ReconcilerError> {
        match self
            .edit_dependents(parent, |obj| {
                obj.common_status().is_some_and(|s| s.is_dependent_registered(child_kind, child))
                    && obj.common_status_mut().remove_dependent(child_kind, child)
            })
            .await
        {
            Err(ReconcilerError::ReferenceMissing { .. }) => Ok(false),
            other => other,
        }
    }

    async fn still_depends_on(
        &self,
        child: &ObjectKey,
        parent_kind: &str,
        parent: &ObjectKey,
        selected_by: SelectedBy<'_>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get(child)
            .await?
            .is_some_and(|obj| self.refers_to(&obj, parent_kind, &parent.name, selected_by)))
    }

    async fn update_for_resource(
        &self,
        registry: &KindRegistry,
        gvr: &GroupVersionResource,
        parent: &ObjectKey,
        selected_by: SelectedBy<'_>,
    ) -> Result<usize, ReconcilerError> {
        let Some(parent_kind) = registry.kind_for_resource(gvr) else {
            return Ok(0);
        };
        let objects = self.store.list(Some(&parent.namespace)).await?;
        let mut enqueued = 0;
        for obj in &objects {
            if !self.refers_to(obj, parent_kind, &parent.name, selected_by) {
                continue;
            }
            if let Some(key) = ObjectKey::of(obj) {
                self.enqueue(&key);
                enqueued += 1;
            }
        }
        if enqueued > 0 {
            debug!(
                parent.kind = parent_kind,
                parent = %parent,
                child.kind = self.kind(),
                count = enqueued,
                "Enqueued referring objects"
            );
        }
        Ok(enqueued)
    }

    fn enqueue(&self, key: &ObjectKey) {
        let target = ObjectRef::new(&key.name).within(&key.namespace);
        if self.trigger_tx.send(target).is_err() {
            debug!(kind = self.kind(), key = %key, "Trigger channel closed, dropping enqueue");
        }
    }

    fn drain_triggers(&self) -> Vec<ObjectKey> {
        let mut guard = self
            .trigger_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(rx) = guard.as_mut() else {
            return Vec::new();
        };
        let mut keys = Vec::new();
        while let Ok(target) = rx.try_recv() {
            keys.push(ObjectKey::new(
                target.namespace.unwrap_or_default(),
                target.name,
            ));
        }
        keys
    }

    fn ticker(&self, registry: Arc<KindRegistry>, config: EngineConfig) -> Arc<dyn Ticker> {
        Arc::new(Engine::new(
            Arc::clone(&self.adapter),
            Arc::clone(&self.store),
            registry,
            config,
        ))
    }

    fn run(
        &self,
        registry: Arc<KindRegistry>,
        context: ControllerContext,
    ) -> BoxFuture<'static, anyhow::Result<()>> {
        let triggers = self
            .trigger_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let engine = Arc::new(Engine::new(
            Arc::clone(&self.adapter),
            Arc::clone(&self.store),
            registry,
            context.engine.clone(),
        ));
        Box::pin(watch_loop::run_controller(engine, context, triggers))
    }
}

/// Registration record for one kind
pub struct KindEntry {
    pub group: &'static str,
    pub kind: &'static str,
    pub plural: String,
    pub controller_name: String,
    pub crd: CustomResourceDefinition,
    pub handle: Arc<dyn KindHandle>,
}

impl std::fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindEntry")
            .field("group", &self.group)
            .field("kind", &self.kind)
            .field("plural", &self.plural)
            .field("controller_name", &self.controller_name)
            .finish_non_exhaustive()
    }
}

/// Read-only `(group, kind)` registry
#[derive(Debug, Default)]
pub struct KindRegistry {
    entries: Vec<KindEntry>,
    index: HashMap<(&'static str, &'static str), usize>,
}

impl KindRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn entry(&self, kind: &str) -> Option<&KindEntry> {
        self.index
            .get(&(API_GROUP, kind))
            .and_then(|i| self.entries.get(*i))
    }

    pub fn handle(&self, kind: &str) -> Option<&Arc<dyn KindHandle>> {
        self.entry(kind).map(|e| &e.handle)
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &KindEntry> {
        self.entries.iter()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.kind).collect()
    }

    pub fn kind_for_resource(&self, gvr: &GroupVersionResource) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.group == gvr.group && e.plural == gvr.resource)
            .map(|e| e.kind)
    }
}

/// Collects registrations; duplicates are reported by [`RegistryBuilder::build`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: KindRegistry,
    duplicates: Vec<&'static str>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn register<A: Adapter>(
        mut self,
        adapter: Arc<A>,
        store: Arc<dyn ObjectStore<A::Object>>,
    ) -> Self {
        use kube::CustomResourceExt;
        let kind = adapter.kind();
        let key = (API_GROUP, kind);
        if self.registry.index.contains_key(&key) {
            self.duplicates.push(kind);
            return self;
        }
        let plural = adapter.resource();
        let entry = KindEntry {
            group: API_GROUP,
            kind,
            controller_name: format!("{}-controller", kind.to_ascii_lowercase()),
            crd: <A::Object as CustomResourceExt>::crd(),
            plural,
            handle: Arc::new(TypedKindHandle::new(adapter, store)),
        };
        self.registry.index.insert(key, self.registry.entries.len());
        self.registry.entries.push(entry);
        self
    }

    /// # Errors
    /// Fails if a kind was registered twice.
    pub fn build(self) -> Result<KindRegistry, ReconcilerError> {
        if !self.duplicates.is_empty() {
            return Err(ReconcilerError::Internal(format!(
                "kinds registered more than once: {}",
                self.duplicates.join(", ")
            )));
        }
        Ok(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, CompartmentSpec};
    use crate::testing::Harness;

    fn labelled(name: &str, tier: &str) -> Compartment {
        let mut c = Compartment::new(
            name,
            CompartmentSpec {
                name: format!("{name}-display"),
                description: "d".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        );
        c.metadata.labels = Some(BTreeMap::from([("tier".to_string(), tier.to_string())]));
        c
    }

    #[test]
    fn test_matches_selector_labels_and_fields() {
        let c = labelled("c1", "db");
        let by_label = DependsOnSelector {
            match_labels: BTreeMap::from([("tier".to_string(), "db".to_string())]),
            match_fields: BTreeMap::new(),
        };
        assert!(matches_selector(&c, &by_label));

        let by_field = DependsOnSelector {
            match_labels: BTreeMap::new(),
            match_fields: BTreeMap::from([("spec.name".to_string(), "c1-display".to_string())]),
        };
        assert!(matches_selector(&c, &by_field));

        let wrong = DependsOnSelector {
            match_labels: BTreeMap::from([("tier".to_string(), "web".to_string())]),
            match_fields: BTreeMap::new(),
        };
        assert!(!matches_selector(&c, &wrong));
    }

    fn tier(value: &str) -> DependsOnSelector {
        DependsOnSelector {
            match_labels: BTreeMap::from([("tier".to_string(), value.to_string())]),
            match_fields: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_depends_on_refers_only_to_selected_parents() {
        let harness = Harness::new();
        let db = harness.apply(labelled("db", "db")).await;
        let web = harness.apply(labelled("web", "web")).await;
        let mut child = labelled("child", "app");
        child.spec.depends_on = BTreeMap::from([("Compartment".to_string(), tier("db"))]);
        let child = harness.apply(child).await;

        let handle = harness.registry().handle("Compartment").unwrap();
        let child_key = ObjectKey::of(&child).unwrap();
        let db_key = ObjectKey::of(&db).unwrap();
        let web_key = ObjectKey::of(&web).unwrap();
        let selects_db = |selector: &DependsOnSelector| matches_selector(&db, selector);
        let selects_web = |selector: &DependsOnSelector| matches_selector(&web, selector);

        assert!(handle
            .still_depends_on(&child_key, "Compartment", &db_key, &selects_db)
            .await
            .unwrap());
        assert!(!handle
            .still_depends_on(&child_key, "Compartment", &web_key, &selects_web)
            .await
            .unwrap());

        let gvr = handle.group_version_resource();
        let registry = harness.registry();
        assert_eq!(
            handle
                .update_for_resource(registry, &gvr, &web_key, &selects_web)
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            handle
                .update_for_resource(registry, &gvr, &db_key, &selects_db)
                .await
                .unwrap(),
            1
        );
        assert_eq!(harness.triggered("Compartment"), vec![child_key]);
    }

    #[test]
    fn test_registry_lookups() {
        let harness = Harness::new();
        let registry = harness.registry();
        assert_eq!(registry.kinds().len(), 12);
        let entry = registry.entry("BackendSet").unwrap();
        assert_eq!(entry.plural, "backendsets");
        assert_eq!(entry.controller_name, "backendset-controller");
        let gvr = entry.handle.group_version_resource();
        assert_eq!(registry.kind_for_resource(&gvr), Some("BackendSet"));
        assert!(registry.handle("Bucket").is_none());
    }

    #[test]
    fn test_unready_reason() {
        let mut summary = ParentSummary {
            id: None,
            ready: false,
            terminating: false,
            state: OsokState::Pending,
            attributes: BTreeMap::new(),
        };
        assert!(summary.unready_reason().unwrap().contains("no cloud id"));
        summary.id = Some("ocid1.x".into());
        summary.ready = true;
        assert!(summary.unready_reason().is_none());
        summary.terminating = true;
        assert!(summary.unready_reason().unwrap().contains("deleted"));
    }
}
