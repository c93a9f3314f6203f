//! Error counting, parking, and recovery after a spec change

use super::common::*;
use oci_service_operator::controller::reconciler::types::{EngineConfig, TickOutcome};
use oci_service_operator::crd::{Compartment, ManagedObject, OsokState, VirtualNetwork};
use oci_service_operator::provider::CloudError;
use oci_service_operator::testing::Harness;

#[tokio::test]
async fn repeated_failures_park_until_the_spec_changes() {
    let h = Harness::with_config(EngineConfig {
        max_reset_counter: 3,
        ..EngineConfig::default()
    });
    h.cloud().fail_always(
        "create_compartment",
        CloudError::NotAuthorized("not allowed in tenancy".to_string()),
    );
    h.apply(compartment("c1")).await;

    for attempt in 1..=3u32 {
        let outcome = h.tick::<Compartment>("c1").await.unwrap();
        let c1 = h.get::<Compartment>("c1").await.unwrap();
        let common = c1.common_status().unwrap();
        assert_eq!(common.state, OsokState::Error);
        assert_eq!(common.reset_counter, attempt);
        assert!(common.message.contains("not allowed in tenancy"));
        if attempt < 3 {
            assert!(matches!(outcome, TickOutcome::Requeue { .. }));
        } else {
            assert_eq!(outcome, TickOutcome::Parked);
        }
    }
    assert_eq!(h.cloud().count("create_compartment"), 3);

    assert_eq!(h.tick::<Compartment>("c1").await.unwrap(), TickOutcome::Parked);
    assert_eq!(h.cloud().count("create_compartment"), 3);

    h.cloud().clear_failures();
    h.edit::<Compartment>("c1", |c1| {
        c1.spec.description = "retry after policy fix".to_string();
    })
    .await;
    let c1 = h.tick_until::<Compartment>("c1", 2, processed).await;
    let common = c1.common_status().unwrap();
    assert_eq!(common.reset_counter, 0);
    assert_eq!(common.message, "OK");
    assert_eq!(common.observed_generation, c1.metadata.generation);
    assert_eq!(h.cloud().count("create_compartment"), 4);
}

#[tokio::test]
async fn pending_references_never_park() {
    let h = Harness::with_config(EngineConfig {
        max_reset_counter: 2,
        ..EngineConfig::default()
    });
    h.apply(vcn("v1", "c1")).await;
    for _ in 0..4 {
        let outcome = h.tick::<VirtualNetwork>("v1").await.unwrap();
        assert!(matches!(outcome, TickOutcome::Requeue { .. }));
    }
    let v1 = h.get::<VirtualNetwork>("v1").await.unwrap();
    assert_eq!(v1.state(), OsokState::Pending);
    assert!(v1.common_status().unwrap().message.contains("c1"));
    assert_eq!(h.cloud().count("create_vcn"), 0);

    h.apply(compartment("c1")).await;
    h.tick_until::<Compartment>("c1", 3, processed).await;
    h.tick_until::<VirtualNetwork>("v1", 3, processed).await;
    assert_eq!(h.cloud().count("create_vcn"), 1);
}
