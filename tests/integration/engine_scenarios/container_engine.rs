//! Clusters and node pools: asynchronous creates, in-place updates, and a
//! cluster that outlives its node pools.

use super::common::*;
use oci_service_operator::crd::{
    Cluster, ManagedObject, NodePool, OsokState, Subnet, VirtualNetwork,
};
use oci_service_operator::testing::Harness;

#[tokio::test]
async fn cluster_and_node_pool_lifecycle() {
    let h = Harness::new();
    network(&h).await;
    h.apply(cluster("k1", "c1", "v1", &["s1"])).await;
    h.apply(node_pool("np1", "c1", "k1", &["s1"])).await;

    h.tick::<NodePool>("np1").await.unwrap();
    let np1 = h.get::<NodePool>("np1").await.unwrap();
    assert_eq!(np1.state(), OsokState::Pending);
    assert!(np1.common_status().unwrap().message.contains("Cluster"));

    let k1 = h.tick_until::<Cluster>("k1", 5, processed).await;
    let cluster_id = k1.cloud_id().unwrap().to_string();
    let created = h.cloud().cluster(&cluster_id).unwrap();
    let v1 = h.get::<VirtualNetwork>("v1").await.unwrap();
    assert_eq!(created.vcn_id, v1.cloud_id().unwrap());
    assert_eq!(dependents_of(&v1, "Cluster"), vec!["default/k1"]);

    let np1 = h.tick_until::<NodePool>("np1", 5, processed).await;
    let pool_id = np1.cloud_id().unwrap().to_string();
    let pool = h.cloud().node_pool(&pool_id).unwrap();
    assert_eq!(pool.cluster_id, cluster_id);
    let s1 = h.get::<Subnet>("s1").await.unwrap();
    let placements = pool.node_config_details.unwrap().placement_configs;
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].subnet_id, s1.cloud_id().unwrap());

    h.edit::<NodePool>("np1", |np1| np1.spec.size = 5).await;
    h.tick_until::<NodePool>("np1", 5, |np1: &NodePool| {
        processed(np1) && np1.status.as_ref().unwrap().resource.as_ref().unwrap().size == 5
    })
    .await;
    let updates = h.cloud().calls("update_node_pool");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].target, pool_id);
    assert_eq!(updates[0].retry_token.as_deref(), np1.metadata.uid.as_deref());
    let pool = h.cloud().node_pool(&pool_id).unwrap();
    assert_eq!(pool.node_config_details.unwrap().size, 5);

    h.delete::<Cluster>("k1").await;
    for _ in 0..2 {
        h.tick::<Cluster>("k1").await.unwrap();
    }
    let k1 = h.get::<Cluster>("k1").await.unwrap();
    assert!(k1.common_status().unwrap().message.contains("NodePool"));
    assert_eq!(h.cloud().count("delete_cluster"), 0);

    h.delete::<NodePool>("np1").await;
    h.tick_until_gone::<NodePool>("np1", 5).await;
    assert!(h.cloud().node_pool(&pool_id).is_none());

    h.tick_until_gone::<Cluster>("k1", 5).await;
    assert!(h.cloud().cluster(&cluster_id).is_none());
    let v1 = h.get::<VirtualNetwork>("v1").await.unwrap();
    assert!(dependents_of(&v1, "Cluster").is_empty());
}

#[tokio::test]
async fn cluster_upgrade_is_applied_in_place() {
    let h = Harness::new();
    network(&h).await;
    h.apply(cluster("k1", "c1", "v1", &["s1"])).await;
    let k1 = h.tick_until::<Cluster>("k1", 5, processed).await;
    let cluster_id = k1.cloud_id().unwrap().to_string();

    h.edit::<Cluster>("k1", |k1| k1.spec.kubernetes_version = "v1.31.0".to_string())
        .await;
    h.tick_until::<Cluster>("k1", 5, |k1: &Cluster| {
        processed(k1)
            && k1.status.as_ref().unwrap().resource.as_ref().unwrap().kubernetes_version
                == "v1.31.0"
    })
    .await;
    assert_eq!(h.cloud().count("create_cluster"), 1);
    let updates = h.cloud().calls("update_cluster");
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].retry_token.as_deref(), k1.metadata.uid.as_deref());
    assert_eq!(h.cloud().cluster(&cluster_id).unwrap().kubernetes_version, "v1.31.0");
    assert_eq!(h.get::<Cluster>("k1").await.unwrap().cloud_id(), Some(cluster_id.as_str()));
}
