//! In-memory secret store.

use crate::secrets::{SecretData, SecretError, SecretStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct FakeSecretStore {
    secrets: Mutex<BTreeMap<(String, String), SecretData>>,
    creates: AtomicUsize,
    /// Next create fails with a store error
    fail_create: Mutex<bool>,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(String, String), SecretData>> {
        self.secrets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a secret without counting it as a create
    pub fn insert(&self, namespace: &str, name: &str, data: SecretData) {
        self.lock()
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<SecretData> {
        self.lock()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.secret(namespace, name).is_some()
    }

    /// Successful creates so far
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fail_next_create(&self) {
        *self.fail_create.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, SecretError> {
        Ok(self.secret(namespace, name))
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<(), SecretError> {
        let secret = format!("{namespace}/{name}");
        {
            let mut fail = self.fail_create.lock().unwrap_or_else(PoisonError::into_inner);
            if std::mem::take(&mut *fail) {
                return Err(SecretError::Store {
                    secret,
                    message: "injected failure".to_string(),
                });
            }
        }
        let mut secrets = self.lock();
        let key = (namespace.to_string(), name.to_string());
        if secrets.contains_key(&key) {
            return Err(SecretError::AlreadyExists(secret));
        }
        secrets.insert(key, data);
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool, SecretError> {
        Ok(self
            .lock()
            .remove(&(namespace.to_string(), name.to_string()))
            .is_some())
    }
}
