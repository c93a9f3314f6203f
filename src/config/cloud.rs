//! # Cloud Configuration
//!
//! Region, tenancy and signing identity for the REST client. Identity fields
//! come from the environment and may be overridden by the credentials secret,
//! which must hold the PEM private key under `privateKey`.

use super::{env_var_or_default, optional_env_var};
use crate::secrets::SecretStore;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Where to find the signing key
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub region: Option<String>,
    pub tenancy_id: Option<String>,
    pub user_id: Option<String>,
    pub fingerprint: Option<String>,
    pub credentials_secret: String,
    pub credentials_namespace: String,
    /// Base URL replacing `https://<service>.<region>.oraclecloud.com`
    pub endpoint_override: Option<String>,
}

impl CloudConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            region: optional_env_var("OCI_REGION"),
            tenancy_id: optional_env_var("OCI_TENANCY_ID"),
            user_id: optional_env_var("OCI_USER_ID"),
            fingerprint: optional_env_var("OCI_FINGERPRINT"),
            credentials_secret: env_var_or_default(
                "OCI_CREDENTIALS_SECRET",
                DEFAULT_CREDENTIALS_SECRET.to_string(),
            ),
            credentials_namespace: env_var_or_default(
                "OCI_CREDENTIALS_NAMESPACE",
                DEFAULT_CREDENTIALS_NAMESPACE.to_string(),
            ),
            endpoint_override: optional_env_var("OCI_ENDPOINT_OVERRIDE"),
        }
    }

    /// Merge the credentials secret over the environment
    ///
    /// # Errors
    /// Fails if the secret is missing, lacks `privateKey`, or a required
    /// identity field is unset in both places.
    pub async fn resolve(&self, secrets: &dyn SecretStore) -> Result<CloudCredentials> {
        let data = secrets
            .get(&self.credentials_namespace, &self.credentials_secret)
            .await?
            .with_context(|| {
                format!(
                    "credentials secret {}/{} not found",
                    self.credentials_namespace, self.credentials_secret
                )
            })?;

        let field = |key: &str, fallback: &Option<String>| -> Result<String> {
            data.get(key)
                .map(|v| String::from_utf8_lossy(v).trim().to_string())
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.clone())
                .with_context(|| format!("cloud identity field {key} is not configured"))
        };

        let private_key = data
            .get("privateKey")
            .map(|v| Zeroizing::new(v.clone()))
            .context("credentials secret has no privateKey")?;

        Ok(CloudCredentials {
            region: field("region", &self.region)?,
            tenancy_id: field("tenancy", &self.tenancy_id)?,
            user_id: field("user", &self.user_id)?,
            fingerprint: field("fingerprint", &self.fingerprint)?,
            private_key_pem: private_key,
            endpoint_override: self.endpoint_override.clone(),
        })
    }
}

/// Fully resolved signing identity
pub struct CloudCredentials {
    pub region: String,
    pub tenancy_id: String,
    pub user_id: String,
    pub fingerprint: String,
    pub private_key_pem: Zeroizing<Vec<u8>>,
    pub endpoint_override: Option<String>,
}

impl std::fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("region", &self.region)
            .field("tenancy_id", &self.tenancy_id)
            .field("user_id", &self.user_id)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl CloudCredentials {
    /// `tenancy/user/fingerprint`, the key id used in request signatures
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy_id, self.user_id, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSecretStore;
    use std::collections::BTreeMap;

    fn config() -> CloudConfig {
        CloudConfig {
            region: Some("us-ashburn-1".into()),
            tenancy_id: Some("ocid1.tenancy.oc1..t".into()),
            user_id: Some("ocid1.user.oc1..u".into()),
            fingerprint: None,
            credentials_secret: "oci-credentials".into(),
            credentials_namespace: "system".into(),
            endpoint_override: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_merges_secret_over_env() {
        let secrets = FakeSecretStore::new();
        let mut data = BTreeMap::new();
        data.insert("privateKey".to_string(), b"PEM".to_vec());
        data.insert("fingerprint".to_string(), b"aa:bb".to_vec());
        data.insert("region".to_string(), b"eu-frankfurt-1".to_vec());
        secrets.insert("system", "oci-credentials", data);

        let creds = config().resolve(&secrets).await.unwrap();
        assert_eq!(creds.region, "eu-frankfurt-1");
        assert_eq!(creds.fingerprint, "aa:bb");
        assert_eq!(
            creds.key_id(),
            "ocid1.tenancy.oc1..t/ocid1.user.oc1..u/aa:bb"
        );
    }

    #[tokio::test]
    async fn test_resolve_requires_private_key() {
        let secrets = FakeSecretStore::new();
        let mut data = BTreeMap::new();
        data.insert("fingerprint".to_string(), b"aa:bb".to_vec());
        secrets.insert("system", "oci-credentials", data);
        assert!(config().resolve(&secrets).await.is_err());
    }
}
