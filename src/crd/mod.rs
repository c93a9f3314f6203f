//! # Custom Resource Definitions
//!
//! CRD types for every kind the operator manages, all served under
//! `oci.oracle.com/v1beta1`.
//!
//! Each kind's status carries the [`CommonStatus`] sub-record (`status.common`),
//! the cloud identifier (`status.id`) and a kind-specific mirror of the observed
//! cloud resource (`status.resource`).

mod compute;
mod containerengine;
mod database;
mod identity;
mod loadbalancer;
mod network;
mod status;

pub use compute::*;
pub use containerengine::*;
pub use database::*;
pub use identity::*;
pub use loadbalancer::*;
pub use network::*;
pub use status::*;

use k8s_openapi::NamespaceResourceScope;
use kube::{CustomResourceExt, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Uniform access to the parts of a managed object the engine reads and writes
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + CustomResourceExt
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind name, as used in `dependents` keys and `dependsOn` selectors
    const KIND: &'static str;

    fn common_status(&self) -> Option<&CommonStatus>;

    /// Mutable common status, creating an empty status first if needed
    fn common_status_mut(&mut self) -> &mut CommonStatus;

    /// Cloud identifier recorded in status; `None` while uncreated
    fn cloud_id(&self) -> Option<&str>;

    /// Record the cloud identifier. An identifier, once written, is never
    /// replaced by a different one; returns false if a different id was kept.
    fn adopt_cloud_id(&mut self, id: &str) -> bool;

    /// Forget the cloud identifier and mirror after a successful delete
    fn clear_resource(&mut self);

    /// Explicit `spec.dependsOn` selectors keyed by kind
    fn depends_on(&self) -> &BTreeMap<String, DependsOnSelector>;

    fn state(&self) -> OsokState {
        self.common_status().map(|s| s.state).unwrap_or_default()
    }

    fn is_terminating(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }

    fn has_finalizer(&self, finalizer: &str) -> bool {
        self.meta()
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == finalizer))
    }
}

/// Implements [`ManagedObject`] for a kind whose status struct has the
/// `common`, `id` and `resource` fields, plus a typed `status_mut` helper.
macro_rules! managed_object {
    ($kind:ident, $status:ty) => {
        impl $kind {
            /// Mutable status, creating an empty one first if needed
            pub fn status_mut(&mut self) -> &mut $status {
                self.status.get_or_insert_with(Default::default)
            }
        }

        impl $crate::crd::ManagedObject for $kind {
            const KIND: &'static str = stringify!($kind);

            fn common_status(&self) -> Option<&$crate::crd::CommonStatus> {
                self.status.as_ref().map(|s| &s.common)
            }

            fn common_status_mut(&mut self) -> &mut $crate::crd::CommonStatus {
                &mut self.status_mut().common
            }

            fn cloud_id(&self) -> Option<&str> {
                self.status
                    .as_ref()
                    .and_then(|s| s.id.as_deref())
                    .filter(|id| !id.is_empty())
            }

            fn adopt_cloud_id(&mut self, id: &str) -> bool {
                let status = self.status_mut();
                match status.id.as_deref() {
                    Some(existing) if !existing.is_empty() => existing == id,
                    _ => {
                        status.id = Some(id.to_string());
                        true
                    }
                }
            }

            fn clear_resource(&mut self) {
                if let Some(status) = self.status.as_mut() {
                    status.id = None;
                    status.resource = None;
                }
            }

            fn depends_on(
                &self,
            ) -> &std::collections::BTreeMap<String, $crate::crd::DependsOnSelector> {
                &self.spec.depends_on
            }
        }
    };
}

pub(crate) use managed_object;

/// CustomResourceDefinitions of every managed kind, in registration order
pub fn all_crds() -> Vec<k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition>
{
    vec![
        Compartment::crd(),
        VirtualNetwork::crd(),
        Subnet::crd(),
        ComputeInstance::crd(),
        Cluster::crd(),
        NodePool::crd(),
        AutonomousDatabase::crd(),
        LoadBalancer::crd(),
        BackendSet::crd(),
        Backend::crd(),
        Listener::crd(),
        Certificate::crd(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_share_group_and_version() {
        for crd in all_crds() {
            assert_eq!(crd.spec.group, "oci.oracle.com");
            assert_eq!(crd.spec.versions.len(), 1);
            assert_eq!(crd.spec.versions[0].name, "v1beta1");
            assert_eq!(crd.spec.scope, "Namespaced");
        }
    }

    #[test]
    fn test_adopt_cloud_id_never_rewrites() {
        let mut c = Compartment::new(
            "c1",
            CompartmentSpec {
                name: "c1".into(),
                description: "d".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        );
        assert!(c.cloud_id().is_none());
        assert!(c.adopt_cloud_id("ocid1.compartment.oc1..a"));
        assert!(c.adopt_cloud_id("ocid1.compartment.oc1..a"));
        assert!(!c.adopt_cloud_id("ocid1.compartment.oc1..b"));
        assert_eq!(c.cloud_id(), Some("ocid1.compartment.oc1..a"));
        c.clear_resource();
        assert!(c.cloud_id().is_none());
    }

    #[test]
    fn test_kind_const_matches_resource_kind() {
        assert_eq!(<Backend as ManagedObject>::KIND, Backend::kind(&()));
        assert_eq!(<NodePool as ManagedObject>::KIND, "NodePool");
    }

    #[test]
    fn test_crd_names() {
        assert_eq!(
            BackendSet::crd().metadata.name.as_deref(),
            Some("backendsets.oci.oracle.com")
        );
        assert_eq!(
            AutonomousDatabase::crd().metadata.name.as_deref(),
            Some("autonomousdatabases.oci.oracle.com")
        );
    }
}
