//! In-memory custom-resource store.
//!
//! Emulates the API server behaviour the engine relies on: `resourceVersion`
//! preconditions, generation bumps on spec changes, the status subresource
//! being written separately from metadata and spec, and finalizer-gated
//! deletion.

use crate::controller::store::{ObjectStore, StoreError};
use crate::crd::{ManagedObject, ObjectKey};
use async_trait::async_trait;
use kube::Resource;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Inner<K> {
    objects: BTreeMap<ObjectKey, K>,
    version: u64,
    /// Status writes still to be rejected as if another writer got there first
    status_conflicts: usize,
}

pub struct FakeStore<K> {
    inner: Mutex<Inner<K>>,
}

impl<K> std::fmt::Debug for FakeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeStore")
            .field("kind", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<K> Default for FakeStore<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                objects: BTreeMap::new(),
                version: 0,
                status_conflicts: 0,
            }),
        }
    }
}

fn to_json<K: ManagedObject>(obj: &K) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(obj).map_err(|e| StoreError::Other(e.to_string()))
}

fn from_json<K: ManagedObject>(value: serde_json::Value) -> Result<K, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Other(e.to_string()))
}

/// `target` with its top-level `field` taken from `source`
fn splice<K: ManagedObject>(target: &K, source: &K, field: &str) -> Result<K, StoreError> {
    let mut target = to_json(target)?;
    let source = to_json(source)?;
    if let Some(map) = target.as_object_mut() {
        match source.get(field) {
            Some(value) => map.insert(field.to_string(), value.clone()),
            None => map.remove(field),
        };
    }
    from_json(target)
}

fn deletion_timestamp() -> Result<k8s_openapi::apimachinery::pkg::apis::meta::v1::Time, StoreError> {
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(now))
        .map_err(|e| StoreError::Other(e.to_string()))
}

impl<K: ManagedObject> FakeStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key_of(obj: &K) -> Result<ObjectKey, StoreError> {
        ObjectKey::of(obj)
            .ok_or_else(|| StoreError::Other("object is missing name or namespace".to_string()))
    }

    /// Insert as-is, status included, overwriting any existing object
    pub fn insert_raw(&self, mut obj: K) -> Result<K, StoreError> {
        let key = Self::key_of(&obj)?;
        let mut inner = self.lock();
        inner.version += 1;
        let meta = obj.meta_mut();
        meta.resource_version = Some(inner.version.to_string());
        meta.uid.get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
        meta.generation.get_or_insert(1);
        inner.objects.insert(key, obj.clone());
        Ok(obj)
    }

    pub fn snapshot(&self, key: &ObjectKey) -> Option<K> {
        self.lock().objects.get(key).cloned()
    }

    /// Reject the next `count` status writes with a conflict
    pub fn conflict_status_writes(&self, count: usize) {
        self.lock().status_conflicts = count;
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_version(stored: &K, incoming: &K, key: &ObjectKey) -> Result<(), StoreError> {
        match incoming.meta().resource_version.as_deref() {
            Some(version) if Some(version) != stored.meta().resource_version.as_deref() => {
                Err(StoreError::Conflict(key.to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<K: ManagedObject> ObjectStore<K> for FakeStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        Ok(self.snapshot(key))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError> {
        Ok(self
            .lock()
            .objects
            .iter()
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        let mut value = to_json(obj)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("status");
        }
        let mut created: K = from_json(value)?;

        let mut inner = self.lock();
        if inner.objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        inner.version += 1;
        let meta = created.meta_mut();
        meta.resource_version = Some(inner.version.to_string());
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
        meta.generation = Some(1);
        meta.deletion_timestamp = None;
        inner.objects.insert(key, created.clone());
        Ok(created)
    }

    async fn replace(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        let mut inner = self.lock();
        let stored = inner
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Self::check_version(&stored, obj, &key)?;

        let mut updated = splice(obj, &stored, "status")?;
        let spec_changed = to_json(obj)?.get("spec") != to_json(&stored)?.get("spec");
        inner.version += 1;
        let version = inner.version;
        let meta = updated.meta_mut();
        meta.resource_version = Some(version.to_string());
        meta.uid.clone_from(&stored.meta().uid);
        meta.deletion_timestamp.clone_from(&stored.meta().deletion_timestamp);
        let generation = stored.meta().generation.unwrap_or(1);
        meta.generation = Some(if spec_changed { generation + 1 } else { generation });

        let released = updated.meta().deletion_timestamp.is_some()
            && updated.meta().finalizers.as_ref().is_none_or(Vec::is_empty);
        if released {
            inner.objects.remove(&key);
        } else {
            inner.objects.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn replace_status(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        let mut inner = self.lock();
        let stored = inner
            .objects
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Self::check_version(&stored, obj, &key)?;
        if inner.status_conflicts > 0 {
            inner.status_conflicts -= 1;
            return Err(StoreError::Conflict(key.to_string()));
        }

        let mut updated = splice(&stored, obj, "status")?;
        inner.version += 1;
        updated.meta_mut().resource_version = Some(inner.version.to_string());
        inner.objects.insert(key, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let Some(stored) = inner.objects.get(key).cloned() else {
            return Err(StoreError::NotFound(key.to_string()));
        };
        if stored.meta().finalizers.as_ref().is_none_or(Vec::is_empty) {
            inner.objects.remove(key);
            return Ok(());
        }
        if stored.meta().deletion_timestamp.is_none() {
            let mut marked = stored;
            marked.meta_mut().deletion_timestamp = Some(deletion_timestamp()?);
            inner.version += 1;
            marked.meta_mut().resource_version = Some(inner.version.to_string());
            inner.objects.insert(key.clone(), marked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, CompartmentSpec};

    fn compartment() -> Compartment {
        let mut c = Compartment::new(
            "c1",
            CompartmentSpec {
                name: "c1".into(),
                description: "d".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        );
        c.metadata.namespace = Some("ns".into());
        c
    }

    #[tokio::test]
    async fn test_stale_writes_conflict() {
        let store = FakeStore::<Compartment>::new();
        let created = store.create(&compartment()).await.unwrap();
        let mut first = created.clone();
        first.common_status_mut().message = "first".into();
        store.replace_status(&first).await.unwrap();

        let mut stale = created;
        stale.common_status_mut().message = "stale".into();
        let err = store.replace_status(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_injected_status_conflicts_are_used_up() {
        let store = FakeStore::<Compartment>::new();
        let created = store.create(&compartment()).await.unwrap();
        store.conflict_status_writes(1);
        assert!(store.replace_status(&created).await.unwrap_err().is_conflict());
        let written = store.replace_status(&created).await.unwrap();
        assert_ne!(written.metadata.resource_version, created.metadata.resource_version);
    }

    #[tokio::test]
    async fn test_replace_keeps_status_and_bumps_generation_on_spec_change() {
        let store = FakeStore::<Compartment>::new();
        let created = store.create(&compartment()).await.unwrap();
        let mut with_status = created.clone();
        with_status.common_status_mut().message = "kept".into();
        let with_status = store.replace_status(&with_status).await.unwrap();

        let mut edited = with_status.clone();
        edited.spec.description = "new".into();
        edited.status = None;
        let replaced = store.replace(&edited).await.unwrap();
        assert_eq!(replaced.metadata.generation, Some(2));
        assert_eq!(replaced.status.unwrap().common.message, "kept");
    }

    #[tokio::test]
    async fn test_delete_waits_for_finalizers() {
        let store = FakeStore::<Compartment>::new();
        let mut obj = compartment();
        obj.metadata.finalizers = Some(vec!["test/finalizer".into()]);
        store.create(&obj).await.unwrap();
        let key = ObjectKey::new("ns", "c1");

        store.delete(&key).await.unwrap();
        let mut terminating = store.get(&key).await.unwrap().unwrap();
        assert!(terminating.is_terminating());

        terminating.metadata.finalizers = Some(Vec::new());
        store.replace(&terminating).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
