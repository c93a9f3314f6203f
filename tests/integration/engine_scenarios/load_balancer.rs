//! Load balancer family: reference gating, work request progress,
//! backends resolved through instances, listeners and certificates, and the
//! deletion guard.

use super::common::*;
use oci_service_operator::crd::{
    Backend, BackendSet, Certificate, Compartment, ComputeInstance, Listener, LoadBalancer,
    ManagedObject, ObjectKey, OsokState, Subnet, VirtualNetwork, WorkRequestOperation,
    WorkRequestState,
};
use oci_service_operator::testing::Harness;
use serde_json::json;

#[tokio::test]
async fn load_balancer_waits_for_its_references() {
    let h = Harness::new();
    h.apply(compartment("c1")).await;
    h.apply(vcn("v1", "c1")).await;
    h.apply(subnet("s1", "c1", "v1")).await;
    h.apply(load_balancer("lb1", "c1", &["s1"])).await;

    h.tick::<LoadBalancer>("lb1").await.unwrap();
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    assert_eq!(lb1.state(), OsokState::Pending);
    assert!(lb1.common_status().unwrap().message.contains("Compartment"));
    assert_eq!(h.cloud().count("create_load_balancer"), 0);

    h.tick_until::<Compartment>("c1", 3, processed).await;
    assert!(h
        .triggered("LoadBalancer")
        .contains(&ObjectKey::new("default", "lb1")));

    h.tick::<LoadBalancer>("lb1").await.unwrap();
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    assert_eq!(lb1.state(), OsokState::Pending);
    assert!(lb1.common_status().unwrap().message.contains("Subnet"));
    assert_eq!(h.cloud().count("create_load_balancer"), 0);

    h.tick_until::<VirtualNetwork>("v1", 3, processed).await;
    h.tick_until::<Subnet>("s1", 3, processed).await;
    let lb1 = h.tick_until::<LoadBalancer>("lb1", 5, processed).await;

    let c1 = h.get::<Compartment>("c1").await.unwrap();
    let s1 = h.get::<Subnet>("s1").await.unwrap();
    let creates = h.cloud().calls("create_load_balancer");
    assert_eq!(creates.len(), 1);
    let details = creates[0].details.as_ref().unwrap();
    assert_eq!(details["compartmentId"], c1.cloud_id().unwrap());
    assert_eq!(details["subnetIds"], json!([s1.cloud_id().unwrap()]));

    let lb_id = lb1.cloud_id().unwrap();
    assert!(h.cloud().load_balancer(lb_id).is_some());
    assert_eq!(lb1.common_status().unwrap().reset_counter, 0);
    assert_eq!(dependents_of(&c1, "LoadBalancer"), vec!["default/lb1"]);
    assert_eq!(dependents_of(&s1, "LoadBalancer"), vec!["default/lb1"]);
}

#[tokio::test]
async fn backend_set_follows_its_work_request() {
    let h = Harness::new();
    let lb1 = load_balancer_ready(&h).await;
    h.cloud().set_work_request_polls(5);
    h.apply(backend_set("bs1", "lb1")).await;

    h.tick::<BackendSet>("bs1").await.unwrap();
    let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
    let record = bs1.common_status().unwrap().work_request.clone().unwrap();
    assert!(record.id.starts_with("wr-"));
    assert_eq!(record.operation, WorkRequestOperation::Create);
    assert_eq!(record.state, WorkRequestState::Accepted);

    for _ in 0..5 {
        h.tick::<BackendSet>("bs1").await.unwrap();
        let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
        let pending = bs1.common_status().unwrap().work_request.as_ref().unwrap();
        assert_eq!(pending.id, record.id);
        assert_eq!(pending.state, WorkRequestState::InProgress);
        assert_ne!(bs1.state(), OsokState::Processed);
    }

    h.tick::<BackendSet>("bs1").await.unwrap();
    let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
    assert_eq!(bs1.state(), OsokState::Processed);
    assert!(bs1.common_status().unwrap().work_request.is_none());
    assert_eq!(
        bs1.status.as_ref().unwrap().load_balancer_id.as_deref(),
        lb1.cloud_id()
    );
    assert_eq!(h.cloud().count("create_backend_set"), 1);
    let polls = h
        .cloud()
        .calls("get_work_request")
        .into_iter()
        .filter(|call| call.target == record.id)
        .count();
    assert_eq!(polls, 6);
}

#[tokio::test]
async fn backend_targets_instance_private_ip() {
    let h = Harness::new();
    load_balancer_ready(&h).await;
    backend_set_ready(&h).await;
    h.cloud().queue_private_ip("10.0.0.5");
    h.apply(instance("i1", "c1", "s1")).await;
    let i1 = h.tick_until::<ComputeInstance>("i1", 3, processed).await;
    assert_eq!(i1.private_ip(), Some("10.0.0.5"));

    h.cloud().set_work_request_polls(2);
    h.apply(backend("b1", "lb1", "bs1", "i1")).await;
    h.tick::<Backend>("b1").await.unwrap();

    let creates = h.cloud().calls("create_backend");
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].target, "10.0.0.5:1983");
    let details = creates[0].details.as_ref().unwrap();
    assert_eq!(details["ipAddress"], "10.0.0.5");
    assert_eq!(details["port"], 1983);
    assert_eq!(details["weight"], 1);

    h.tick::<Backend>("b1").await.unwrap();
    assert_eq!(h.cloud().count("create_backend"), 1);

    let b1 = h.tick_until::<Backend>("b1", 5, processed).await;
    assert_eq!(b1.cloud_id(), Some("10.0.0.5:1983"));
    assert_eq!(h.cloud().count("create_backend"), 1);

    let i1 = h.get::<ComputeInstance>("i1").await.unwrap();
    assert_eq!(dependents_of(&i1, "Backend"), vec!["default/b1"]);
}

#[tokio::test]
async fn load_balancer_delete_waits_for_backend_sets() {
    let h = Harness::new();
    let lb1 = load_balancer_ready(&h).await;
    let lb_id = lb1.cloud_id().unwrap().to_string();
    backend_set_ready(&h).await;

    h.delete::<LoadBalancer>("lb1").await;
    for _ in 0..3 {
        h.tick::<LoadBalancer>("lb1").await.unwrap();
    }
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    assert!(lb1.is_terminating());
    assert!(lb1.common_status().unwrap().message.contains("BackendSet"));
    assert_eq!(h.cloud().count("delete_load_balancer"), 0);
    assert!(h.cloud().load_balancer(&lb_id).is_some());

    h.delete::<BackendSet>("bs1").await;
    h.tick_until_gone::<BackendSet>("bs1", 5).await;
    assert_eq!(h.cloud().count("delete_backend_set"), 1);
    assert!(h.cloud().backend_set(&lb_id, "bs1").is_none());
    let lb1 = h.get::<LoadBalancer>("lb1").await.unwrap();
    assert!(dependents_of(&lb1, "BackendSet").is_empty());

    h.tick_until_gone::<LoadBalancer>("lb1", 5).await;
    assert_eq!(h.cloud().count("delete_load_balancer"), 1);
    assert!(h.cloud().load_balancer(&lb_id).is_none());

    let c1 = h.get::<Compartment>("c1").await.unwrap();
    let s1 = h.get::<Subnet>("s1").await.unwrap();
    assert!(dependents_of(&c1, "LoadBalancer").is_empty());
    assert!(dependents_of(&s1, "LoadBalancer").is_empty());
}

#[tokio::test]
async fn renamed_backend_set_is_deleted_under_its_created_name() {
    let h = Harness::new();
    let lb1 = load_balancer_ready(&h).await;
    let lb_id = lb1.cloud_id().unwrap().to_string();
    backend_set_ready(&h).await;

    h.edit::<BackendSet>("bs1", |bs1| bs1.spec.name = "renamed".to_string())
        .await;
    h.tick::<BackendSet>("bs1").await.unwrap();
    let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
    assert_eq!(bs1.state(), OsokState::Error);
    assert!(bs1.common_status().unwrap().message.contains("cannot be renamed"));
    assert_eq!(bs1.cloud_id(), Some("bs1"));
    assert_eq!(h.cloud().count("update_backend_set"), 0);

    h.delete::<BackendSet>("bs1").await;
    h.tick_until_gone::<BackendSet>("bs1", 5).await;
    let deletes = h.cloud().calls("delete_backend_set");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].target, "bs1");
    assert!(h.cloud().backend_set(&lb_id, "bs1").is_none());
    assert!(h.cloud().backend_set(&lb_id, "renamed").is_none());
}

#[tokio::test]
async fn listener_routes_to_its_backend_set() {
    let h = Harness::new();
    let lb1 = load_balancer_ready(&h).await;
    let lb_id = lb1.cloud_id().unwrap().to_string();
    h.apply(listener("http", "lb1", "bs1")).await;

    h.tick::<Listener>("http").await.unwrap();
    let http = h.get::<Listener>("http").await.unwrap();
    assert_eq!(http.state(), OsokState::Pending);
    assert!(http.common_status().unwrap().message.contains("BackendSet"));
    assert_eq!(h.cloud().count("create_listener"), 0);

    backend_set_ready(&h).await;
    let http = h.tick_until::<Listener>("http", 5, processed).await;
    assert_eq!(http.cloud_id(), Some("http"));
    let created = h.cloud().listener(&lb_id, "http").unwrap();
    assert_eq!(created.default_backend_set_name, "bs1");
    assert_eq!(created.port, 80);
    let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
    assert_eq!(dependents_of(&bs1, "Listener"), vec!["default/http"]);

    h.edit::<Listener>("http", |http| http.spec.port = 8080).await;
    h.tick_until::<Listener>("http", 5, |http: &Listener| {
        processed(http) && http.status.as_ref().unwrap().resource.as_ref().unwrap().port == 8080
    })
    .await;
    let updates = h.cloud().calls("update_listener");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].target, "http");
    assert_eq!(h.cloud().listener(&lb_id, "http").unwrap().port, 8080);

    h.delete::<Listener>("http").await;
    h.tick_until_gone::<Listener>("http", 5).await;
    assert!(h.cloud().listener(&lb_id, "http").is_none());
    let bs1 = h.get::<BackendSet>("bs1").await.unwrap();
    assert!(dependents_of(&bs1, "Listener").is_empty());
}

#[tokio::test]
async fn certificate_is_immutable_once_uploaded() {
    let h = Harness::new();
    let lb1 = load_balancer_ready(&h).await;
    let lb_id = lb1.cloud_id().unwrap().to_string();
    h.apply(certificate("site", "lb1")).await;

    let site = h.tick_until::<Certificate>("site", 5, processed).await;
    assert_eq!(site.cloud_id(), Some("site"));
    let uploaded = h.cloud().certificate(&lb_id, "site").unwrap();
    assert_eq!(uploaded.public_certificate.as_deref(), Some(PUBLIC_CERTIFICATE));

    h.edit::<Certificate>("site", |site| {
        site.spec.certificate_name = "site-2027".to_string();
    })
    .await;
    h.tick::<Certificate>("site").await.unwrap();
    let site = h.get::<Certificate>("site").await.unwrap();
    assert_eq!(site.state(), OsokState::Error);
    assert!(site.common_status().unwrap().message.contains("cannot be renamed"));
    assert_eq!(h.cloud().count("create_certificate"), 1);

    h.delete::<Certificate>("site").await;
    h.tick_until_gone::<Certificate>("site", 5).await;
    let deletes = h.cloud().calls("delete_certificate");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].target, "site");
    assert!(h.cloud().certificate(&lb_id, "site").is_none());
}
