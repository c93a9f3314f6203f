//! Dependent bookkeeping across kinds.
//!
//! Children record themselves in each parent's `status.common.dependents`
//! before any cloud call, and remove themselves once their cloud resource is
//! gone. Parents refuse to delete while the map is non-empty.

use super::types::ReconcilerError;
use super::Engine;
use crate::controller::adapter::Adapter;
use crate::controller::references::{ResolvedRefs, Resolver};
use crate::controller::registry::matches_selector;
use crate::crd::{DependsOnSelector, ManagedObject, ObjectKey};
use tracing::{debug, info, warn};

impl<A: Adapter> Engine<A> {
    /// Register `key` as a dependent of every resolved parent
    pub(super) async fn register_with_parents(
        &self,
        key: &ObjectKey,
        refs: &ResolvedRefs,
    ) -> Result<(), ReconcilerError> {
        let kind = self.adapter.kind();
        for parent in refs.parents() {
            let handle = self.registry.handle(&parent.kind).ok_or_else(|| {
                ReconcilerError::Internal(format!("kind {} is not registered", parent.kind))
            })?;
            if handle.add_dependent(&parent.key, kind, key).await? {
                debug!(parent.kind = %parent.kind, parent = %parent.key, "Registered as dependent");
            }
        }
        Ok(())
    }

    /// Remove `key` from every parent and wake the parents up
    pub(super) async fn release_parents(
        &self,
        key: &ObjectKey,
        obj: &A::Object,
    ) -> Result<(), ReconcilerError> {
        let kind = self.adapter.kind();
        let resolver = Resolver::new(&self.registry, &key.namespace);
        let parents = resolver
            .parents_of(&self.adapter.references(obj), self.adapter.depends_on(obj))
            .await;
        for parent in parents {
            let Some(handle) = self.registry.handle(&parent.kind) else {
                continue;
            };
            if handle.remove_dependent(&parent.key, kind, key).await? {
                debug!(parent.kind = %parent.kind, parent = %parent.key, "Removed from parent dependents");
            }
            handle.enqueue(&parent.key);
        }
        Ok(())
    }

    /// Drop dependents that no longer exist or no longer point here.
    /// Returns true if anything was pruned.
    pub(super) async fn prune_dependents(
        &self,
        key: &ObjectKey,
        obj: &mut A::Object,
    ) -> Result<bool, ReconcilerError> {
        let kind = self.adapter.kind();
        let mut pruned = false;
        for (child_kind, children) in self.adapter.dependents(obj) {
            let handle = self.registry.handle(&child_kind);
            for child in children {
                let Some(child_key) = ObjectKey::parse(&child) else {
                    warn!(child = %child, "Dropping malformed dependent key");
                    obj.common_status_mut().dependents.entry(child_kind.clone()).and_modify(|slot| {
                        slot.retain(|k| *k != child);
                    });
                    pruned = true;
                    continue;
                };
                let alive = match handle {
                    Some(handle) => {
                        let parent: &A::Object = obj;
                        let selected_by =
                            |selector: &DependsOnSelector| matches_selector(parent, selector);
                        handle
                            .still_depends_on(&child_key, kind, key, &selected_by)
                            .await?
                    }
                    None => false,
                };
                if !alive {
                    info!(child.kind = %child_kind, child = %child_key, "Pruning stale dependent");
                    obj.common_status_mut()
                        .remove_dependent(&child_kind, &child_key);
                    pruned = true;
                }
            }
        }
        obj.common_status_mut()
            .dependents
            .retain(|_, slot| !slot.is_empty());
        Ok(pruned)
    }

    /// Wake every object that may have been waiting for this one
    pub(super) async fn fan_out(&self, key: &ObjectKey, obj: &A::Object) {
        let gvr = self.adapter.group_version_resource();
        let selected_by = |selector: &DependsOnSelector| matches_selector(obj, selector);
        for entry in self.registry.entries() {
            if let Err(e) = entry
                .handle
                .update_for_resource(&self.registry, &gvr, key, &selected_by)
                .await
            {
                warn!(child.kind = entry.kind, error = %e, "Failed to enqueue referring objects");
            }
        }
        for (child_kind, children) in self.adapter.dependents(obj) {
            let Some(handle) = self.registry.handle(&child_kind) else {
                continue;
            };
            for child in children.iter().filter_map(|c| ObjectKey::parse(c)) {
                handle.enqueue(&child);
            }
        }
    }
}
