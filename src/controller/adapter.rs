//! # Adapter Contract
//!
//! The interface every managed kind implements. The engine owns the lifecycle
//! (finalizers, references, work requests, retries, status writes); an adapter
//! only knows how its kind maps onto the cloud.
//!
//! Cloud operations receive the object mutably and record what they observe
//! (cloud id, `status.resource` mirror) directly on it. The engine decides
//! whether anything needs to be persisted.

use crate::constants::{API_GROUP, API_VERSION};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::reconciler::validation;
use crate::controller::references::{ResolvedRefs, Resolver};
use crate::crd::{DependsOnSelector, ManagedObject, WorkRequestOperation};
use crate::provider::{CloudError, WorkRequest};
use async_trait::async_trait;
use kube::core::GroupVersionResource;
use std::collections::BTreeMap;

/// Outcome of submitting a cloud operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The operation finished synchronously
    Completed,
    /// The cloud accepted the operation; poll the work request
    Accepted { work_request_id: String },
}

impl Submission {
    pub fn accepted(work_request_id: impl Into<String>) -> Self {
        Self::Accepted {
            work_request_id: work_request_id.into(),
        }
    }
}

/// Attribute read from a resolved parent; `id` is the cloud identifier
pub const ATTR_ID: &str = "id";
/// Primary private IP of a compute instance
pub const ATTR_PRIVATE_IP: &str = "privateIp";

/// One `*Ref` field of a spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Logical role, e.g. `compartment` or `subnets`
    pub role: &'static str,
    /// Kind of the referenced sibling
    pub kind: &'static str,
    /// Sibling name or a native cloud identifier
    pub value: String,
    /// Which attribute of the parent the child needs
    pub attribute: &'static str,
}

impl Reference {
    pub fn new(role: &'static str, kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            value: value.into(),
            attribute: ATTR_ID,
        }
    }

    /// All elements of an array reference under one role
    pub fn many<'a>(
        role: &'static str,
        kind: &'static str,
        values: impl IntoIterator<Item = &'a String>,
    ) -> Vec<Self> {
        values
            .into_iter()
            .map(|value| Self::new(role, kind, value.clone()))
            .collect()
    }

    #[must_use]
    pub fn reading(mut self, attribute: &'static str) -> Self {
        self.attribute = attribute;
        self
    }
}

/// Cloud lifecycle states in which a resource is still settling
const TRANSITIONAL_STATES: &[&str] = &[
    "PROVISIONING",
    "CREATING",
    "UPDATING",
    "SCALING",
    "STARTING",
    "STOPPING",
    "DELETING",
    "TERMINATING",
    "RESTARTING",
    "BACKUP_IN_PROGRESS",
    "RESTORE_IN_PROGRESS",
    "MAINTENANCE_IN_PROGRESS",
];

/// Cloud lifecycle states a resource never leaves on its own
const FAILED_STATES: &[&str] = &["FAILED", "TERMINATED", "DELETED"];

#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    type Object: ManagedObject;

    fn kind(&self) -> &'static str {
        <Self::Object as ManagedObject>::KIND
    }

    /// Plural resource name
    fn resource(&self) -> String {
        <Self::Object as kube::Resource>::plural(&()).into_owned()
    }

    fn group_version_resource(&self) -> GroupVersionResource {
        GroupVersionResource::gvr(API_GROUP, API_VERSION, &self.resource())
    }

    fn id<'a>(&self, obj: &'a Self::Object) -> Option<&'a str> {
        obj.cloud_id()
    }

    /// Every `*Ref` field present in the spec
    fn references(&self, obj: &Self::Object) -> Vec<Reference>;

    fn depends_on<'a>(&self, obj: &'a Self::Object) -> &'a BTreeMap<String, DependsOnSelector> {
        obj.depends_on()
    }

    /// Resolve references and `dependsOn` selectors to parents
    async fn depends_on_refs(
        &self,
        obj: &Self::Object,
        resolver: &Resolver<'_>,
    ) -> Result<ResolvedRefs, ReconcilerError> {
        resolver
            .resolve(&self.references(obj), self.depends_on(obj))
            .await
    }

    fn dependents(&self, obj: &Self::Object) -> BTreeMap<String, Vec<String>> {
        obj.common_status()
            .map(|s| s.dependents.clone())
            .unwrap_or_default()
    }

    /// Checks the schema cannot express
    fn validate(&self, obj: &Self::Object) -> Result<(), ReconcilerError> {
        validation::validate_object_name(obj)?;
        validation::validate_references(&self.references(obj))
    }

    /// Whether children may use this object as a parent
    fn is_ready(&self, obj: &Self::Object) -> bool {
        obj.cloud_id().is_some()
            && obj.state() == crate::crd::OsokState::Processed
            && !obj.is_terminating()
    }

    /// Attributes children may read through a reference
    fn attributes(&self, obj: &Self::Object) -> BTreeMap<String, String> {
        obj.cloud_id()
            .map(|id| BTreeMap::from([(ATTR_ID.to_string(), id.to_string())]))
            .unwrap_or_default()
    }

    /// Observed cloud lifecycle state from the status mirror
    fn lifecycle_state(&self, obj: &Self::Object) -> Option<String>;

    fn is_transitional(&self, obj: &Self::Object) -> bool {
        self.lifecycle_state(obj).is_some_and(|state| {
            let state = state.to_ascii_uppercase();
            TRANSITIONAL_STATES.contains(&state.as_str()) || state.ends_with("_IN_PROGRESS")
        })
    }

    /// The lifecycle state, if it is one the resource cannot recover from
    fn failed_lifecycle(&self, obj: &Self::Object) -> Option<String> {
        self.lifecycle_state(obj)
            .filter(|state| FAILED_STATES.contains(&state.to_ascii_uppercase().as_str()))
    }

    async fn create(
        &self,
        obj: &mut Self::Object,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError>;

    /// Refresh the status mirror from the cloud
    async fn get(&self, obj: &mut Self::Object, refs: &ResolvedRefs) -> Result<(), ReconcilerError>;

    async fn update(
        &self,
        obj: &mut Self::Object,
        refs: &ResolvedRefs,
        retry_token: &str,
    ) -> Result<Submission, ReconcilerError>;

    async fn delete(&self, obj: &mut Self::Object) -> Result<Submission, ReconcilerError>;

    async fn work_request(&self, id: &str) -> Result<WorkRequest, CloudError> {
        Err(CloudError::Unsupported(format!(
            "{} has no work requests (asked for {id})",
            self.kind()
        )))
    }

    /// Record what a finished work request produced
    fn work_request_succeeded(
        &self,
        obj: &mut Self::Object,
        operation: WorkRequestOperation,
        work_request: &WorkRequest,
    ) {
        if operation == WorkRequestOperation::Create {
            if let Some(id) = work_request.created_identifier() {
                obj.adopt_cloud_id(id);
            }
        }
    }

    /// Undo what a failed work request left behind
    fn work_request_failed(&self, obj: &mut Self::Object, operation: WorkRequestOperation) {
        if operation == WorkRequestOperation::Create {
            obj.clear_resource();
        }
    }

    /// Observed cloud state matches the spec
    fn is_resource_compliant(&self, obj: &Self::Object, refs: &ResolvedRefs) -> bool;

    fn is_resource_status_changed(&self, old: &Self::Object, new: &Self::Object) -> bool {
        self.lifecycle_state(old) != self.lifecycle_state(new)
    }

    /// True iff both copies would reconcile identically
    fn equivalent(&self, a: &Self::Object, b: &Self::Object) -> bool {
        equivalent_objects(a, b)
    }

    /// Runs once the resource is compliant, before it is marked processed
    async fn after_ready(&self, _obj: &mut Self::Object) -> Result<(), ReconcilerError> {
        Ok(())
    }

    /// Best-effort cleanup after the cloud resource is gone
    async fn after_delete(&self, _obj: &Self::Object) -> Result<(), ReconcilerError> {
        Ok(())
    }
}

/// Compare spec, status, labels and finalizers; server-managed metadata is ignored
pub fn equivalent_objects<K: ManagedObject>(a: &K, b: &K) -> bool {
    fn comparable<K: ManagedObject>(obj: &K) -> Option<serde_json::Value> {
        let mut value = serde_json::to_value(obj).ok()?;
        let metadata = value.get("metadata").cloned().unwrap_or_default();
        value.as_object_mut()?.insert(
            "metadata".to_string(),
            serde_json::json!({
                "labels": metadata.get("labels"),
                "finalizers": metadata.get("finalizers"),
                "deletionTimestamp": metadata.get("deletionTimestamp"),
            }),
        );
        Some(value)
    }
    match (comparable(a), comparable(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, CompartmentSpec};

    fn compartment() -> Compartment {
        Compartment::new(
            "c1",
            CompartmentSpec {
                name: "c1".into(),
                description: "team".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn test_equivalent_ignores_resource_version() {
        let a = compartment();
        let mut b = a.clone();
        b.metadata.resource_version = Some("42".into());
        b.metadata.generation = Some(3);
        assert!(equivalent_objects(&a, &b));

        b.common_status_mut().message = "changed".into();
        assert!(!equivalent_objects(&a, &b));
    }

    #[test]
    fn test_equivalent_is_read_only() {
        let a = compartment();
        let mut b = a.clone();
        b.spec.description = "other".into();
        let before = serde_json::to_value(&b).unwrap();
        assert!(!equivalent_objects(&a, &b));
        assert_eq!(serde_json::to_value(&b).unwrap(), before);
    }

    #[test]
    fn test_reference_builders() {
        let subnets = vec!["s1".to_string(), "s2".to_string()];
        let refs = Reference::many("subnets", "Subnet", &subnets);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].value, "s2");
        assert_eq!(refs[0].attribute, ATTR_ID);
        let ip = Reference::new("instance", "ComputeInstance", "i1").reading(ATTR_PRIVATE_IP);
        assert_eq!(ip.attribute, "privateIp");
    }
}
