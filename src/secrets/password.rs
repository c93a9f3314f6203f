//! Admin password generation and storage.

use super::{SecretData, SecretError, SecretStore};
use crate::constants::{PASSWORD_LENGTH, PASSWORD_SECRET_KEY};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Random password drawn from the 62-character alphanumeric alphabet
pub fn generate_password(length: usize) -> Zeroizing<String> {
    Zeroizing::new(
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect(),
    )
}

/// Read the stored password from secret `name`, if it exists
///
/// # Errors
/// Fails if the secret exists without a usable `password` key.
pub async fn read_password(
    secrets: &dyn SecretStore,
    namespace: &str,
    name: &str,
) -> Result<Option<Zeroizing<String>>, SecretError> {
    let Some(data) = secrets.get(namespace, name).await? else {
        return Ok(None);
    };
    let value = data
        .get(PASSWORD_SECRET_KEY)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SecretError::MissingKey {
            secret: format!("{namespace}/{name}"),
            key: PASSWORD_SECRET_KEY.to_string(),
        })?;
    let password = String::from_utf8(value.clone()).map_err(|_| SecretError::MissingKey {
        secret: format!("{namespace}/{name}"),
        key: PASSWORD_SECRET_KEY.to_string(),
    })?;
    Ok(Some(Zeroizing::new(password)))
}

/// Reuse the password stored in secret `name`, or generate and store a new one
///
/// A secret written by an earlier attempt whose cloud create never ran is
/// reused as is.
pub async fn ensure_password(
    secrets: &dyn SecretStore,
    namespace: &str,
    name: &str,
) -> Result<Zeroizing<String>, SecretError> {
    if let Some(existing) = read_password(secrets, namespace, name).await? {
        debug!(secret = %format!("{namespace}/{name}"), "Reusing stored password");
        return Ok(existing);
    }

    let password = generate_password(PASSWORD_LENGTH);
    let mut data = SecretData::new();
    data.insert(
        PASSWORD_SECRET_KEY.to_string(),
        password.as_bytes().to_vec(),
    );
    match secrets.create(namespace, name, data).await {
        Ok(()) => {
            info!(secret = %format!("{namespace}/{name}"), "Stored generated password");
            Ok(password)
        }
        // Lost a race with another writer; theirs wins
        Err(SecretError::AlreadyExists(_)) => read_password(secrets, namespace, name)
            .await?
            .ok_or_else(|| SecretError::MissingKey {
                secret: format!("{namespace}/{name}"),
                key: PASSWORD_SECRET_KEY.to_string(),
            }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSecretStore;

    #[test]
    fn test_generate_password_alphabet_and_length() {
        let password = generate_password(30);
        assert_eq!(password.len(), 30);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(*password, *generate_password(30));
    }

    #[tokio::test]
    async fn test_ensure_password_is_stable() {
        let secrets = FakeSecretStore::new();
        let first = ensure_password(&secrets, "ns", "adb1").await.unwrap();
        let second = ensure_password(&secrets, "ns", "adb1").await.unwrap();
        assert_eq!(*first, *second);
        assert_eq!(secrets.create_count(), 1);
    }

    #[tokio::test]
    async fn test_read_password_rejects_secret_without_key() {
        let secrets = FakeSecretStore::new();
        secrets.insert("ns", "adb1", SecretData::new());
        assert!(matches!(
            read_password(&secrets, "ns", "adb1").await,
            Err(SecretError::MissingKey { .. })
        ));
    }
}
