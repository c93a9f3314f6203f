//! # Watch Loop
//!
//! One kube-runtime `Controller` per registered kind. Watch events and
//! fan-out triggers from parents both feed the controller's queue; every
//! reconcile is one engine tick for the object's key.

use super::error_policy::{handle_reconciliation_error, log_controller_result};
use crate::constants::WATCH_TIMEOUT_SECS;
use crate::controller::adapter::Adapter;
use crate::controller::reconciler::types::{EngineConfig, ReconcilerError, TickOutcome};
use crate::controller::reconciler::{Engine, Ticker};
use crate::controller::registry::KindRegistry;
use crate::crd::ObjectKey;
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{watcher, Config as WatcherConfig};
use kube::runtime::{predicates, reflector, Predicate, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{error, info, warn};

/// What every kind's controller shares
#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    pub engine: EngineConfig,
    /// Watch a single namespace instead of the whole cluster
    pub namespace: Option<String>,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("engine", &self.engine)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ControllerContext {
    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

/// Spec edits, label edits and deletion reach the queue; the engine's own
/// status writes do not
pub fn watch_predicate<K: kube::Resource>() -> impl Predicate<K> {
    predicates::generation::<K>
        .combine(predicates::labels::<K>)
        .combine(|obj: &K| Some(u64::from(obj.meta().deletion_timestamp.is_some())))
}

async fn reconcile<A: Adapter>(
    obj: Arc<A::Object>,
    engine: Arc<Engine<A>>,
) -> Result<Action, ReconcilerError> {
    let key = ObjectKey::of(obj.as_ref()).ok_or_else(|| {
        ReconcilerError::Internal(format!("{} without name or namespace", obj.name_any()))
    })?;
    Ok(match engine.tick(&key).await? {
        TickOutcome::Requeue { after, .. } => Action::requeue(after),
        TickOutcome::Parked | TickOutcome::Done => Action::await_change(),
    })
}

/// Log how many objects of `kind` exist, per namespace, before the watch starts
async fn summarize_existing<K>(kind: &str, api: &Api<K>)
where
    K: kube::Resource + Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.list(&ListParams::default()).await {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
            for item in &list.items {
                *by_namespace
                    .entry(item.namespace().unwrap_or_default())
                    .or_default() += 1;
            }
            info!(
                kind,
                total = list.items.len(),
                namespaces = by_namespace.len(),
                "Startup resource summary"
            );
            for (namespace, count) in by_namespace {
                info!(kind, namespace = %namespace, count, "Existing resources");
            }
        }
        Err(e) => {
            error!(kind, error = %e, "CRD is not queryable. Is it installed?");
            warn!(kind, "Continuing; the watch will retry until the CRD appears");
        }
    }
}

/// Run the controller for one kind until shutdown
pub async fn run_controller<A: Adapter>(
    engine: Arc<Engine<A>>,
    context: ControllerContext,
    triggers: Option<UnboundedReceiver<ObjectRef<A::Object>>>,
) -> anyhow::Result<()> {
    let kind = engine.kind();
    let api = context.api::<A::Object>();
    summarize_existing(kind, &api).await;

    let (reader, writer) = reflector::store();
    let events = reflector(
        writer,
        watcher(api, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)),
    )
    .default_backoff()
    .applied_objects()
    .predicate_filter(watch_predicate::<A::Object>());
    let mut controller = Controller::for_stream(events, reader);
    if let Some(triggers) = triggers {
        controller = controller.reconcile_on(UnboundedReceiverStream::new(triggers));
    } else {
        warn!(kind, "Trigger channel already taken; dependents will only see watch events");
    }

    info!(kind, "Starting controller");
    controller
        .shutdown_on_signal()
        .run(reconcile::<A>, handle_reconciliation_error::<A>, engine)
        .for_each(log_controller_result(kind))
        .await;
    info!(kind, "Controller stopped");
    Ok(())
}

/// Run every registered kind's controller concurrently
pub async fn run_watch_loop(
    registry: Arc<KindRegistry>,
    context: ControllerContext,
) -> anyhow::Result<()> {
    let controllers = registry
        .entries()
        .map(|entry| entry.handle.run(Arc::clone(&registry), context.clone()));
    let results = futures::future::join_all(controllers).await;
    for result in results {
        if let Err(e) = result {
            error!(error = %e, "Controller exited with error");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, CompartmentSpec, ManagedObject};
    use std::collections::BTreeMap;

    fn compartment() -> Compartment {
        let mut obj = Compartment::new(
            "c1",
            CompartmentSpec {
                name: "c1".into(),
                description: "team".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        );
        obj.metadata.generation = Some(1);
        obj
    }

    #[test]
    fn test_status_writes_do_not_pass_the_watch_filter() {
        let predicate = watch_predicate::<Compartment>();
        let obj = compartment();
        let seen = predicate.hash_property(&obj);

        let mut written = obj.clone();
        written.common_status_mut().reset_counter = 3;
        assert!(written.adopt_cloud_id("ocid1.compartment.oc1..a"));
        written.metadata.resource_version = Some("42".into());
        assert_eq!(predicate.hash_property(&written), seen);

        let mut edited = obj.clone();
        edited.metadata.generation = Some(2);
        assert_ne!(predicate.hash_property(&edited), seen);

        let mut labelled = obj.clone();
        labelled.metadata.labels = Some(BTreeMap::from([("tier".into(), "web".into())]));
        assert_ne!(predicate.hash_property(&labelled), seen);

        let mut deleting = obj;
        deleting.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
        assert_ne!(predicate.hash_property(&deleting), seen);
    }
}
