//! Autonomous database: generated admin password, wallet secret and cleanup

use super::common::*;
use oci_service_operator::crd::{AutonomousDatabase, Compartment, ManagedObject, OsokState};
use oci_service_operator::secrets::SecretStore;
use oci_service_operator::testing::Harness;

#[tokio::test]
async fn database_gets_password_and_wallet_secrets() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    h.tick_until::<Compartment>("c1", 3, processed).await;
    h.apply(database("adb1", "c1")).await;
    let adb1 = h.tick_until::<AutonomousDatabase>("adb1", 3, processed).await;
    let id = adb1.cloud_id().unwrap().to_string();

    let secret = h.secrets().secret("default", "adb1").unwrap();
    let password = String::from_utf8(secret["password"].clone()).unwrap();
    assert_eq!(password.len(), 30);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let creates = h.cloud().calls("create_autonomous_database");
    assert_eq!(creates.len(), 1);
    assert_eq!(
        creates[0].details.as_ref().unwrap()["adminPassword"],
        password.as_str()
    );

    let wallet = h.secrets().secret("default", "adb1-wallet").unwrap();
    assert!(wallet.contains_key("cwallet.sso"));
    assert!(wallet.contains_key("sqlnet.ora"));
    assert_eq!(
        wallet.get("tnsnames.ora").map(Vec::as_slice),
        Some(b"adb_high = (description=...)".as_slice())
    );

    // Another pass leaves both secrets alone
    h.tick::<AutonomousDatabase>("adb1").await.unwrap();
    assert_eq!(h.cloud().count("generate_autonomous_database_wallet"), 1);

    h.delete::<AutonomousDatabase>("adb1").await;
    h.tick_until_gone::<AutonomousDatabase>("adb1", 3).await;
    assert!(h.cloud().database(&id).is_none());
    assert_eq!(h.cloud().database_count(), 0);
    assert!(!h.secrets().contains("default", "adb1"));
    assert!(!h.secrets().contains("default", "adb1-wallet"));
}

#[tokio::test]
async fn wallet_waits_for_available_database() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    h.tick_until::<Compartment>("c1", 3, processed).await;
    h.apply(database("adb1", "c1")).await;
    let adb1 = h.tick_until::<AutonomousDatabase>("adb1", 3, processed).await;
    let id = adb1.cloud_id().unwrap().to_string();

    assert!(h.secrets().delete("default", "adb1-wallet").await.unwrap());
    assert!(h.cloud().set_lifecycle(&id, "UPDATING"));
    h.tick::<AutonomousDatabase>("adb1").await.unwrap();
    let adb1 = h.get::<AutonomousDatabase>("adb1").await.unwrap();
    assert_eq!(adb1.state(), OsokState::Created);
    assert!(!h.secrets().contains("default", "adb1-wallet"));
    assert_eq!(h.cloud().count("generate_autonomous_database_wallet"), 1);

    assert!(h.cloud().set_lifecycle(&id, "AVAILABLE"));
    h.tick::<AutonomousDatabase>("adb1").await.unwrap();
    let adb1 = h.get::<AutonomousDatabase>("adb1").await.unwrap();
    assert_eq!(adb1.state(), OsokState::Processed);
    assert!(h.secrets().contains("default", "adb1-wallet"));
    assert_eq!(h.cloud().count("generate_autonomous_database_wallet"), 2);
}

#[tokio::test]
async fn password_survives_a_failed_create() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    h.tick_until::<Compartment>("c1", 3, processed).await;
    h.cloud().fail_next(
        "create_autonomous_database",
        oci_service_operator::provider::CloudError::ServiceUnavailable("try later".to_string()),
    );
    h.apply(database("adb1", "c1")).await;

    h.tick::<AutonomousDatabase>("adb1").await.unwrap();
    let adb1 = h.get::<AutonomousDatabase>("adb1").await.unwrap();
    assert_eq!(adb1.state(), OsokState::Error);
    assert!(adb1.cloud_id().is_none());

    h.tick_until::<AutonomousDatabase>("adb1", 3, processed).await;
    let creates = h.cloud().calls("create_autonomous_database");
    assert_eq!(creates.len(), 2);
    assert_eq!(
        creates[0].details.as_ref().unwrap()["adminPassword"],
        creates[1].details.as_ref().unwrap()["adminPassword"]
    );
    assert_eq!(h.secrets().create_count(), 2);
}
