//! # Reference Resolution
//!
//! Turns the `*Ref` strings and `dependsOn` selectors of a spec into cloud
//! identifiers (or other parent attributes) and the list of parent objects
//! the child must register with.
//!
//! A value starting with `ocid1.` is a native cloud identifier and is used
//! verbatim. Anything else names a sibling of the expected kind in the same
//! namespace, which must exist and be ready.

use crate::constants::OCID_PREFIX;
use crate::controller::adapter::Reference;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::registry::{KindHandle, KindRegistry};
use crate::crd::{DependsOnSelector, ObjectKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A parent the child registers itself with
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParentLink {
    pub kind: String,
    pub key: ObjectKey,
}

/// Resolved reference values by role, plus the parents they came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRefs {
    values: BTreeMap<String, Vec<String>>,
    parents: Vec<ParentLink>,
}

impl ResolvedRefs {
    /// First value resolved for `role`
    pub fn get(&self, role: &str) -> Option<&str> {
        self.values.get(role)?.first().map(String::as_str)
    }

    /// Every value resolved for an array role, in spec order
    pub fn all(&self, role: &str) -> &[String] {
        self.values.get(role).map_or(&[], Vec::as_slice)
    }

    /// Like [`Self::get`] but fails when the role was never resolved
    pub fn require(&self, role: &str) -> Result<&str, ReconcilerError> {
        self.get(role)
            .ok_or_else(|| ReconcilerError::Internal(format!("reference {role} was not resolved")))
    }

    pub fn parents(&self) -> &[ParentLink] {
        &self.parents
    }

    pub fn insert(&mut self, role: &str, value: impl Into<String>) {
        self.values
            .entry(role.to_string())
            .or_default()
            .push(value.into());
    }

    fn add_parent(&mut self, kind: &str, key: ObjectKey) {
        let link = ParentLink {
            kind: kind.to_string(),
            key,
        };
        if !self.parents.contains(&link) {
            self.parents.push(link);
        }
    }
}

fn describe_selector(selector: &DependsOnSelector) -> String {
    let terms: Vec<String> = selector
        .match_labels
        .iter()
        .chain(selector.match_fields.iter())
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    format!("selector[{}]", terms.join(","))
}

/// Resolves references for objects in one namespace
pub struct Resolver<'a> {
    registry: &'a KindRegistry,
    namespace: &'a str,
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a KindRegistry, namespace: &'a str) -> Self {
        Self {
            registry,
            namespace,
        }
    }

    fn handle(&self, kind: &str) -> Result<&'a Arc<dyn KindHandle>, ReconcilerError> {
        self.registry
            .handle(kind)
            .ok_or_else(|| ReconcilerError::Validation(format!("unknown kind {kind}")))
    }

    /// Resolve every reference and selector; the first failure aborts
    ///
    /// # Errors
    /// `ReferenceMissing` when a named sibling does not exist or a selector
    /// matches nothing, `ReferenceNotReady` when a parent exists but is not
    /// ready, `Validation` for empty values or unknown kinds.
    pub async fn resolve(
        &self,
        references: &[Reference],
        depends_on: &BTreeMap<String, DependsOnSelector>,
    ) -> Result<ResolvedRefs, ReconcilerError> {
        let mut resolved = ResolvedRefs::default();
        for reference in references {
            self.resolve_reference(reference, &mut resolved).await?;
        }
        for (kind, selector) in depends_on {
            self.resolve_selector(kind, selector, &mut resolved).await?;
        }
        Ok(resolved)
    }

    async fn resolve_reference(
        &self,
        reference: &Reference,
        resolved: &mut ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let value = reference.value.trim();
        if value.is_empty() {
            return Err(ReconcilerError::Validation(format!(
                "{} reference must not be empty",
                reference.role
            )));
        }
        if value.starts_with(OCID_PREFIX) {
            resolved.insert(reference.role, value);
            return Ok(());
        }

        let key = ObjectKey::new(self.namespace, value);
        let summary = self
            .handle(reference.kind)?
            .summary(&key)
            .await?
            .ok_or_else(|| ReconcilerError::ReferenceMissing {
                kind: reference.kind.to_string(),
                name: value.to_string(),
            })?;
        if let Some(reason) = summary.unready_reason() {
            return Err(ReconcilerError::ReferenceNotReady {
                kind: reference.kind.to_string(),
                name: value.to_string(),
                reason,
            });
        }
        let attribute = summary.attributes.get(reference.attribute).ok_or_else(|| {
            ReconcilerError::ReferenceNotReady {
                kind: reference.kind.to_string(),
                name: value.to_string(),
                reason: format!("{} is not known yet", reference.attribute),
            }
        })?;

        debug!(
            reference.role = reference.role,
            reference.kind = reference.kind,
            reference.name = value,
            "Resolved reference"
        );
        resolved.insert(reference.role, attribute.clone());
        resolved.add_parent(reference.kind, key);
        Ok(())
    }

    async fn resolve_selector(
        &self,
        kind: &str,
        selector: &DependsOnSelector,
        resolved: &mut ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let matches = self.handle(kind)?.select(self.namespace, selector).await?;
        if matches.is_empty() {
            return Err(ReconcilerError::ReferenceMissing {
                kind: kind.to_string(),
                name: describe_selector(selector),
            });
        }
        let role = format!("dependsOn.{kind}");
        for (key, summary) in matches {
            if let Some(reason) = summary.unready_reason() {
                return Err(ReconcilerError::ReferenceNotReady {
                    kind: kind.to_string(),
                    name: key.name,
                    reason,
                });
            }
            if let Some(id) = summary.id {
                resolved.insert(&role, id);
            }
            resolved.add_parent(kind, key);
        }
        Ok(())
    }

    /// Parents named by references and selectors, without readiness checks
    ///
    /// Used on the delete path, where parents may already be going away.
    pub async fn parents_of(
        &self,
        references: &[Reference],
        depends_on: &BTreeMap<String, DependsOnSelector>,
    ) -> Vec<ParentLink> {
        let mut links = ResolvedRefs::default();
        for reference in references {
            let value = reference.value.trim();
            if value.is_empty() || value.starts_with(OCID_PREFIX) {
                continue;
            }
            links.add_parent(reference.kind, ObjectKey::new(self.namespace, value));
        }
        for (kind, selector) in depends_on {
            let Ok(handle) = self.handle(kind) else {
                continue;
            };
            match handle.select(self.namespace, selector).await {
                Ok(matches) => {
                    for (key, _) in matches {
                        links.add_parent(kind, key);
                    }
                }
                Err(e) => warn!(kind = %kind, error = %e, "Failed to list dependsOn parents"),
            }
        }
        links.parents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Compartment, CompartmentSpec, ManagedObject, OsokState};
    use crate::testing::Harness;

    fn compartment(name: &str) -> Compartment {
        Compartment::new(
            name,
            CompartmentSpec {
                name: name.into(),
                description: "d".into(),
                compartment_ref: None,
                freeform_tags: BTreeMap::new(),
                depends_on: BTreeMap::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_ocid_passes_through_without_lookup() {
        let harness = Harness::new();
        let resolver = Resolver::new(harness.registry(), harness.namespace());
        let refs = vec![Reference::new(
            "compartment",
            "Compartment",
            "ocid1.compartment.oc1..root",
        )];
        let resolved = resolver.resolve(&refs, &BTreeMap::new()).await.unwrap();
        assert_eq!(resolved.get("compartment"), Some("ocid1.compartment.oc1..root"));
        assert!(resolved.parents().is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_unready_siblings() {
        let harness = Harness::new();
        let resolver = Resolver::new(harness.registry(), harness.namespace());
        let refs = vec![Reference::new("compartment", "Compartment", "c1")];

        let err = resolver.resolve(&refs, &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::ReferenceMissing { .. }), "{err}");

        harness.apply(compartment("c1")).await;
        let err = resolver.resolve(&refs, &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, ReconcilerError::ReferenceNotReady { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_ready_sibling_resolves_to_id_and_parent() {
        let harness = Harness::new();
        let mut c1 = compartment("c1");
        c1.adopt_cloud_id("ocid1.compartment.oc1..c1");
        c1.common_status_mut().set_state(OsokState::Processed);
        harness.apply_with_status(c1).await;

        let resolver = Resolver::new(harness.registry(), harness.namespace());
        let refs = vec![Reference::new("compartment", "Compartment", "c1")];
        let resolved = resolver.resolve(&refs, &BTreeMap::new()).await.unwrap();
        assert_eq!(resolved.require("compartment").unwrap(), "ocid1.compartment.oc1..c1");
        assert_eq!(resolved.parents().len(), 1);
        assert_eq!(resolved.parents()[0].kind, "Compartment");
        assert!(resolved.require("vcn").is_err());
    }

    #[tokio::test]
    async fn test_selector_matching_nothing_is_missing() {
        let harness = Harness::new();
        let resolver = Resolver::new(harness.registry(), harness.namespace());
        let selector = DependsOnSelector {
            match_labels: BTreeMap::from([("tier".to_string(), "db".to_string())]),
            match_fields: BTreeMap::new(),
        };
        let depends_on = BTreeMap::from([("Compartment".to_string(), selector)]);
        let err = resolver.resolve(&[], &depends_on).await.unwrap_err();
        assert!(err.to_string().contains("tier=db"), "{err}");
    }
}
