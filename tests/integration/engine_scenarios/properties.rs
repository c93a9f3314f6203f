//! Engine guarantees that hold across kinds

use super::common::*;
use oci_service_operator::controller::reconciler::types::RequeueReason;
use oci_service_operator::controller::store::ObjectStore;
use oci_service_operator::crd::{
    Compartment, DependsOnSelector, LoadBalancer, ManagedObject, ObjectKey, OsokState, Subnet,
    VirtualNetwork,
};
use oci_service_operator::provider::CloudError;
use oci_service_operator::testing::Harness;
use std::collections::BTreeMap;

#[tokio::test]
async fn create_replays_after_status_is_lost() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    let c1 = h.tick_until::<Compartment>("c1", 3, processed).await;
    let first_id = c1.cloud_id().unwrap().to_string();

    // The create landed but its status write did not
    let mut lost = c1.clone();
    lost.status_mut().id = None;
    lost.status_mut().resource = None;
    lost.common_status_mut().state = OsokState::Pending;
    h.store::<Compartment>().replace_status(&lost).await.unwrap();

    let c1 = h.tick_until::<Compartment>("c1", 3, processed).await;
    assert_eq!(c1.cloud_id(), Some(first_id.as_str()));
    let creates = h.cloud().calls("create_compartment");
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[0].retry_token, creates[1].retry_token);
    assert_eq!(creates[0].retry_token.as_deref(), c1.metadata.uid.as_deref());
}

#[tokio::test]
async fn processed_objects_stay_quiet() {
    let h = Harness::new();
    load_balancer_ready(&h).await;
    let mutations = h.cloud().mutating_calls().len();

    for _ in 0..3 {
        h.tick::<Compartment>("c1").await.unwrap();
        h.tick::<LoadBalancer>("lb1").await.unwrap();
    }
    assert_eq!(h.cloud().mutating_calls().len(), mutations);
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    assert_eq!(lb1.state(), OsokState::Processed);
}

#[tokio::test]
async fn dependents_are_recorded_once_and_released_on_delete() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    h.tick_until::<Compartment>("c1", 3, processed).await;
    for name in ["v1", "v2", "v3"] {
        h.apply(vcn(name, "c1")).await;
        h.tick_until::<VirtualNetwork>(name, 3, processed).await;
        h.tick::<VirtualNetwork>(name).await.unwrap();
    }

    let c1 = h.get::<Compartment>("c1").await.unwrap();
    assert_eq!(
        dependents_of(&c1, "VirtualNetwork"),
        vec!["default/v1", "default/v2", "default/v3"]
    );

    h.delete::<VirtualNetwork>("v2").await;
    h.tick_until_gone::<VirtualNetwork>("v2", 3).await;
    let c1 = h.get::<Compartment>("c1").await.unwrap();
    assert_eq!(
        dependents_of(&c1, "VirtualNetwork"),
        vec!["default/v1", "default/v3"]
    );
}

#[tokio::test]
async fn failed_work_request_clears_the_pending_create() {
    let h = Harness::new();
    network(&h).await;
    h.cloud().fail_next_work_request();
    h.apply(load_balancer("lb1", "c1", &["s1"])).await;

    h.tick::<LoadBalancer>("lb1").await.unwrap();
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    let record = lb1.common_status().unwrap().work_request.clone().unwrap();

    h.tick::<LoadBalancer>("lb1").await.unwrap();
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    let common = lb1.common_status().unwrap();
    assert_eq!(common.state, OsokState::Error);
    assert!(common.work_request.is_none());
    assert!(common.message.contains(&record.id));
    assert!(lb1.cloud_id().is_none());
    assert_eq!(h.cloud().count("create_load_balancer"), 1);
}

#[tokio::test]
async fn deleting_an_uncreated_object_makes_no_cloud_calls() {
    let h = Harness::new();
    h.apply(vcn("v1", "missing")).await;
    h.tick::<VirtualNetwork>("v1").await.unwrap();
    let v1 = h.get::<VirtualNetwork>("v1").await.unwrap();
    assert_eq!(v1.state(), OsokState::Pending);

    h.delete::<VirtualNetwork>("v1").await;
    h.tick_until_gone::<VirtualNetwork>("v1", 2).await;
    assert!(h.cloud().mutating_calls().is_empty());
}

#[tokio::test]
async fn terminating_parent_is_not_a_valid_reference() {
    let h = Harness::new();
    network(&h).await;
    h.delete::<Compartment>("c1").await;
    h.tick::<Compartment>("c1").await.unwrap();

    h.apply(vcn("v2", "c1")).await;
    h.tick::<VirtualNetwork>("v2").await.unwrap();
    let v2 = h.get::<VirtualNetwork>("v2").await.unwrap();
    assert_eq!(v2.state(), OsokState::Pending);
    assert_eq!(h.cloud().count("create_vcn"), 1);

    let c1 = h.get::<Compartment>("c1").await.unwrap();
    assert!(c1.is_terminating());
    assert_eq!(h.cloud().count("delete_compartment"), 0);
}

#[tokio::test]
async fn status_conflict_retries_without_counting_an_error() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    let c1 = h.tick_until::<Compartment>("c1", 3, processed).await;

    h.edit::<Compartment>("c1", |c1| c1.spec.description = "platform team".to_string())
        .await;
    h.fake_store::<Compartment>().conflict_status_writes(1);
    let outcome = h.tick::<Compartment>("c1").await.unwrap();
    assert_eq!(outcome.reason(), Some(RequeueReason::Conflict));
    let stored = h.get::<Compartment>("c1").await.unwrap();
    let common = stored.common_status().unwrap();
    assert_eq!(common.reset_counter, 0);
    assert_eq!(common.state, OsokState::Processed);
    assert_eq!(common.message, c1.common_status().unwrap().message);

    h.tick_until::<Compartment>("c1", 3, |c1: &Compartment| {
        processed(c1)
            && c1.status.as_ref().unwrap().resource.as_ref().unwrap().description
                == "platform team"
    })
    .await;
    let updates = h.cloud().calls("update_compartment");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].retry_token.as_deref(), c1.metadata.uid.as_deref());
    assert_eq!(
        h.get::<Compartment>("c1").await.unwrap().common_status().unwrap().reset_counter,
        0
    );
}

#[tokio::test]
async fn delete_treats_vanished_cloud_resources_as_deleted() {
    let h = Harness::new();
    network(&h).await;

    h.cloud().fail_next(
        "delete_subnet",
        CloudError::NotAuthorizedOrNotFound("subnet s1 not found".to_string()),
    );
    h.delete::<Subnet>("s1").await;
    h.tick_until_gone::<Subnet>("s1", 3).await;

    h.cloud().fail_next(
        "delete_vcn",
        CloudError::AlreadyDeleting("vcn v1 is already being deleted".to_string()),
    );
    h.delete::<VirtualNetwork>("v1").await;
    h.tick_until_gone::<VirtualNetwork>("v1", 3).await;

    assert_eq!(h.cloud().count("delete_subnet"), 1);
    assert_eq!(h.cloud().count("delete_vcn"), 1);
    let c1 = h.get::<Compartment>("c1").await.unwrap();
    assert!(dependents_of(&c1, "Subnet").is_empty());
    assert!(dependents_of(&c1, "VirtualNetwork").is_empty());
    assert_eq!(c1.common_status().unwrap().reset_counter, 0);
}

#[tokio::test]
async fn depends_on_selector_waits_for_and_registers_with_matching_parents() {
    let h = Harness::new();
    let mut shared = compartment("shared");
    shared.metadata.labels = Some(BTreeMap::from([("tier".to_string(), "shared".to_string())]));
    h.apply(shared).await;
    h.apply(compartment("other")).await;
    h.tick_until::<Compartment>("other", 3, processed).await;

    let mut team = compartment("team");
    team.spec.depends_on = BTreeMap::from([(
        "Compartment".to_string(),
        DependsOnSelector {
            match_labels: BTreeMap::from([("tier".to_string(), "shared".to_string())]),
            match_fields: BTreeMap::new(),
        },
    )]);
    h.apply(team).await;
    h.tick::<Compartment>("team").await.unwrap();
    let team = h.get::<Compartment>("team").await.unwrap();
    assert_eq!(team.state(), OsokState::Pending);
    assert!(team.cloud_id().is_none());
    h.triggered("Compartment");

    h.tick_until::<Compartment>("shared", 3, processed).await;
    let woken = h.triggered("Compartment");
    assert!(woken.contains(&ObjectKey::new("default", "team")));
    assert!(!woken.contains(&ObjectKey::new("default", "other")));

    h.tick_until::<Compartment>("team", 3, processed).await;
    let shared = h.get::<Compartment>("shared").await.unwrap();
    let other = h.get::<Compartment>("other").await.unwrap();
    assert_eq!(dependents_of(&shared, "Compartment"), vec!["default/team"]);
    assert!(dependents_of(&other, "Compartment").is_empty());

    h.delete::<Compartment>("shared").await;
    h.tick::<Compartment>("shared").await.unwrap();
    let shared = h.get::<Compartment>("shared").await.unwrap();
    assert!(shared.common_status().unwrap().message.contains("Compartment"));
    assert_eq!(h.cloud().count("delete_compartment"), 0);

    h.delete::<Compartment>("team").await;
    h.tick_until_gone::<Compartment>("team", 3).await;
    h.tick_until_gone::<Compartment>("shared", 3).await;
    assert_eq!(h.cloud().count("delete_compartment"), 2);
}
