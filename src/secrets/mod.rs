//! # Secrets
//!
//! Cluster secrets produced for kinds that generate credentials: the
//! autonomous database admin password and its client wallet. Secret I/O sits
//! behind [`SecretStore`] and archive handling behind [`WalletUnpacker`] so
//! both can be swapped in tests.

mod password;
mod wallet;

pub use password::{ensure_password, generate_password, read_password};
pub use wallet::{TarGzUnpacker, WalletError, WalletUnpacker};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, DeleteParams, ObjectMeta, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use thiserror::Error;

/// Secret payload: key to raw bytes
pub type SecretData = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {0} already exists")]
    AlreadyExists(String),
    #[error("secret {secret} has no key {key}")]
    MissingKey { secret: String, key: String },
    #[error("secret store error for {secret}: {message}")]
    Store { secret: String, message: String },
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, SecretError>;
    /// Create a new secret; fails with `AlreadyExists` rather than overwriting
    async fn create(&self, namespace: &str, name: &str, data: SecretData)
        -> Result<(), SecretError>;
    /// Returns false when there was nothing to delete
    async fn delete(&self, namespace: &str, name: &str) -> Result<bool, SecretError>;
}

/// [`SecretStore`] backed by core/v1 Secrets
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn store_error(namespace: &str, name: &str, err: &kube::Error) -> SecretError {
    SecretError::Store {
        secret: format!("{namespace}/{name}"),
        message: err.to_string(),
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, SecretError> {
        let secret = self
            .api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| store_error(namespace, name, &e))?;
        Ok(secret.map(|s| {
            s.data
                .unwrap_or_default()
                .into_iter()
                .map(|(k, ByteString(v))| (k, v))
                .collect()
        }))
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<(), SecretError> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: Some(BTreeMap::from([(
                    "app.kubernetes.io/managed-by".to_string(),
                    crate::constants::FIELD_MANAGER.to_string(),
                )])),
                ..ObjectMeta::default()
            },
            data: Some(data.into_iter().map(|(k, v)| (k, ByteString(v))).collect()),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        };
        match self
            .api(namespace)
            .create(&PostParams::default(), &secret)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                Err(SecretError::AlreadyExists(format!("{namespace}/{name}")))
            }
            Err(e) => Err(store_error(namespace, name, &e)),
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<bool, SecretError> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(false),
            Err(e) => Err(store_error(namespace, name, &e)),
        }
    }
}
