//! Autonomous database adapter.
//!
//! The admin password is generated once and kept in the secret named after
//! the object; creates reuse it so a retried create submits the same value.
//! Once the database is available its wallet is downloaded, unpacked and
//! stored in `<name>-wallet`. Both secrets are removed after the database is.

use super::{namespaced_name, require_id};
use crate::constants::WALLET_SECRET_SUFFIX;
use crate::controller::adapter::{Adapter, Reference, Submission};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::references::ResolvedRefs;
use crate::crd::{AutonomousDatabase, AutonomousDatabaseResource, ManagedObject};
use crate::provider::{self as cloud, DatabaseClient};
use crate::secrets::{
    ensure_password, read_password, SecretError, SecretStore, WalletUnpacker,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

const ROLE_COMPARTMENT: &str = "compartment";
const AVAILABLE: &str = "AVAILABLE";
const WALLET_TYPE: &str = "SINGLE";

pub struct AutonomousDatabaseAdapter {
    database: Arc<dyn DatabaseClient>,
    secrets: Arc<dyn SecretStore>,
    unpacker: Arc<dyn WalletUnpacker>,
}

impl std::fmt::Debug for AutonomousDatabaseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutonomousDatabaseAdapter")
            .finish_non_exhaustive()
    }
}

fn wallet_secret_name(name: &str) -> String {
    format!("{name}{WALLET_SECRET_SUFFIX}")
}

impl AutonomousDatabaseAdapter {
    pub fn new(
        database: Arc<dyn DatabaseClient>,
        secrets: Arc<dyn SecretStore>,
        unpacker: Arc<dyn WalletUnpacker>,
    ) -> Self {
        Self {
            database,
            secrets,
            unpacker,
        }
    }

    fn record(obj: &mut AutonomousDatabase, observed: cloud::AutonomousDatabase) {
        obj.adopt_cloud_id(&observed.id);
        obj.status_mut().resource = Some(AutonomousDatabaseResource {
            db_name: observed.db_name,
            display_name: observed.display_name,
            compartment_id: observed.compartment_id,
            cpu_core_count: observed.cpu_core_count,
            data_storage_size_in_tbs: observed.data_storage_size_in_tbs,
            db_workload: observed.db_workload,
            is_auto_scaling_enabled: observed.is_auto_scaling_enabled,
            lifecycle_state: observed.lifecycle_state,
        });
    }

    async fn store_wallet(
        &self,
        obj: &AutonomousDatabase,
        namespace: &str,
        name: &str,
    ) -> Result<(), ReconcilerError> {
        let wallet_name = wallet_secret_name(name);
        let password = read_password(self.secrets.as_ref(), namespace, name)
            .await?
            .ok_or_else(|| SecretError::MissingKey {
                secret: format!("{namespace}/{name}"),
                key: crate::constants::PASSWORD_SECRET_KEY.to_string(),
            })?;
        let details = cloud::GenerateWalletDetails {
            password: password.to_string(),
            generate_type: WALLET_TYPE.to_string(),
        };
        let archive = self
            .database
            .generate_autonomous_database_wallet(&require_id(obj)?, &details)
            .await?;
        let data = self.unpacker.unpack(&archive)?;
        let files = data.len();
        match self.secrets.create(namespace, &wallet_name, data).await {
            Ok(()) => {
                info!(secret = %format!("{namespace}/{wallet_name}"), files, "Stored database wallet");
                Ok(())
            }
            Err(SecretError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Adapter for AutonomousDatabaseAdapter {
    type Object = AutonomousDatabase;

    fn references(&self, obj: &AutonomousDatabase) -> Vec<Reference> {
        vec![Reference::new(
            ROLE_COMPARTMENT,
            "Compartment",
            obj.spec.compartment_ref.clone(),
        )]
    }

    fn lifecycle_state(&self, obj: &AutonomousDatabase) -> Option<String> {
        obj.status
            .as_ref()?
            .resource
            .as_ref()
            .map(|r| r.lifecycle_state.clone())
    }

    async fn create(
        &self,
        obj: &mut AutonomousDatabase,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let (namespace, name) = namespaced_name(obj);
        let password = ensure_password(self.secrets.as_ref(), &namespace, &name).await?;
        let details = cloud::CreateAutonomousDatabaseDetails {
            compartment_id: refs.require(ROLE_COMPARTMENT)?.to_string(),
            db_name: obj.spec.db_name.clone(),
            display_name: obj.spec.display_name.clone(),
            admin_password: password.to_string(),
            cpu_core_count: obj.spec.cpu_core_count,
            data_storage_size_in_tbs: obj.spec.data_storage_size_in_tbs,
            db_workload: obj.spec.db_workload.as_str().to_string(),
            is_auto_scaling_enabled: obj.spec.is_auto_scaling_enabled,
        };
        let created = self
            .database
            .create_autonomous_database(&details, retry_token)
            .await?;
        Self::record(obj, created);
        Ok(Submission::Completed)
    }

    async fn get(
        &self,
        obj: &mut AutonomousDatabase,
        _refs: &ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let observed = self
            .database
            .get_autonomous_database(&require_id(obj)?)
            .await?;
        Self::record(obj, observed);
        Ok(())
    }

    async fn update(
        &self,
        obj: &mut AutonomousDatabase,
        _refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError> {
        let details = cloud::UpdateAutonomousDatabaseDetails {
            display_name: Some(obj.spec.display_name.clone()),
            cpu_core_count: Some(obj.spec.cpu_core_count),
            data_storage_size_in_tbs: Some(obj.spec.data_storage_size_in_tbs),
            is_auto_scaling_enabled: Some(obj.spec.is_auto_scaling_enabled),
        };
        let updated = self
            .database
            .update_autonomous_database(&require_id(obj)?, &details, retry_token)
            .await?;
        Self::record(obj, updated);
        Ok(Submission::Completed)
    }

    async fn delete(&self, obj: &mut AutonomousDatabase) -> Result<Submission, ReconcilerError> {
        self.database
            .delete_autonomous_database(&require_id(obj)?)
            .await?;
        Ok(Submission::Completed)
    }

    fn is_resource_compliant(&self, obj: &AutonomousDatabase, _refs: &ResolvedRefs) -> bool {
        obj.status
            .as_ref()
            .and_then(|s| s.resource.as_ref())
            .is_some_and(|r| {
                r.display_name == obj.spec.display_name
                    && r.cpu_core_count == obj.spec.cpu_core_count
                    && r.data_storage_size_in_tbs == obj.spec.data_storage_size_in_tbs
                    && r.is_auto_scaling_enabled == obj.spec.is_auto_scaling_enabled
            })
    }

    async fn after_ready(&self, obj: &mut AutonomousDatabase) -> Result<(), ReconcilerError> {
        if !obj.spec.wallet.enabled
            || !self
                .lifecycle_state(obj)
                .is_some_and(|state| state.eq_ignore_ascii_case(AVAILABLE))
        {
            return Ok(());
        }
        let (namespace, name) = namespaced_name(obj);
        if self
            .secrets
            .get(&namespace, &wallet_secret_name(&name))
            .await?
            .is_some()
        {
            return Ok(());
        }
        self.store_wallet(obj, &namespace, &name).await
    }

    async fn after_delete(&self, obj: &AutonomousDatabase) -> Result<(), ReconcilerError> {
        let (namespace, name) = namespaced_name(obj);
        for secret in [name.clone(), wallet_secret_name(&name)] {
            match self.secrets.delete(&namespace, &secret).await {
                Ok(true) => info!(secret = %format!("{namespace}/{secret}"), "Deleted secret"),
                Ok(false) => {}
                Err(e) => {
                    warn!(secret = %format!("{namespace}/{secret}"), error = %e, "Failed to delete secret");
                }
            }
        }
        Ok(())
    }
}
