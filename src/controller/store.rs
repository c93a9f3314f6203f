//! # Custom-resource Store
//!
//! Per-kind access to the cluster's custom-resource store. Every write is
//! conditional on the `resourceVersion` the caller read, so concurrent writers
//! surface as [`StoreError::Conflict`] instead of lost updates.

use crate::constants::FIELD_MANAGER;
use crate::crd::{ManagedObject, ObjectKey};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict writing {0}: object was modified")]
    Conflict(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(api_err) if api_err.code == 404 => Self::NotFound(what.to_string()),
            kube::Error::Api(api_err) if api_err.code == 409 && api_err.reason == "AlreadyExists" => {
                Self::AlreadyExists(what.to_string())
            }
            kube::Error::Api(api_err) if api_err.code == 409 => Self::Conflict(what.to_string()),
            other => Self::Other(format!("{what}: {other}")),
        }
    }
}

/// Custom-resource store operations for one kind
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;
    /// List objects in `namespace`, or in every namespace when `None`
    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError>;
    async fn create(&self, obj: &K) -> Result<K, StoreError>;
    /// Write metadata and spec
    async fn replace(&self, obj: &K) -> Result<K, StoreError>;
    /// Write the status subresource
    async fn replace_status(&self, obj: &K) -> Result<K, StoreError>;
    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

/// [`ObjectStore`] backed by the Kubernetes API
pub struct KubeStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> std::fmt::Debug for KubeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore")
            .field("kind", &std::any::type_name::<K>())
            .finish_non_exhaustive()
    }
}

impl<K> KubeStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K: ManagedObject> KubeStore<K> {
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn key_of(obj: &K) -> Result<ObjectKey, StoreError> {
        ObjectKey::of(obj)
            .ok_or_else(|| StoreError::Other("object is missing name or namespace".to_string()))
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        }
    }
}

#[async_trait]
impl<K: ManagedObject> ObjectStore<K> for KubeStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        self.api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn list(&self, namespace: Option<&str>) -> Result<Vec<K>, StoreError> {
        let api: Api<K> = match namespace {
            Some(ns) => self.api(ns),
            None => Api::all(self.client.clone()),
        };
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| StoreError::from_kube(e, K::kind(&()).as_ref()))
    }

    async fn create(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        self.api(&key.namespace)
            .create(&Self::post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn replace(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        self.api(&key.namespace)
            .replace(&key.name, &Self::post_params(), obj)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn replace_status(&self, obj: &K) -> Result<K, StoreError> {
        let key = Self::key_of(obj)?;
        let body = serde_json::to_vec(obj).map_err(|e| StoreError::Other(e.to_string()))?;
        self.api(&key.namespace)
            .replace_status(&key.name, &Self::post_params(), body)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        match self
            .api(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => Err(StoreError::from_kube(e, &key.to_string())),
        }
    }
}

/// Type map from kind to its store, assembled once at startup
#[derive(Default, Clone)]
pub struct Stores {
    by_kind: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("kinds", &self.by_kind.len())
            .finish()
    }
}

impl Stores {
    #[must_use]
    pub fn with<K: ManagedObject>(mut self, store: Arc<dyn ObjectStore<K>>) -> Self {
        self.by_kind.insert(TypeId::of::<K>(), Arc::new(store));
        self
    }

    pub fn get<K: ManagedObject>(&self) -> Option<Arc<dyn ObjectStore<K>>> {
        self.by_kind
            .get(&TypeId::of::<K>())?
            .downcast_ref::<Arc<dyn ObjectStore<K>>>()
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, Subnet};
    use crate::testing::FakeStore;

    #[test]
    fn test_stores_type_map() {
        let compartments: Arc<dyn ObjectStore<Compartment>> = Arc::new(FakeStore::<Compartment>::new());
        let stores = Stores::default().with::<Compartment>(compartments);
        assert!(stores.get::<Compartment>().is_some());
        assert!(stores.get::<Subnet>().is_none());
    }
}
