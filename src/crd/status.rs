//! # Common Status
//!
//! The status sub-record embedded in every managed kind: lifecycle phase,
//! consecutive-error counter, last message, the reverse dependents index and
//! the outstanding cloud work request.

use crate::constants::STATUS_OK;
use crate::provider::CloudError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle phase of a managed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum OsokState {
    /// Waiting on references or on the first cloud create
    #[default]
    Pending,
    /// Cloud resource exists but is not yet steady
    Created,
    /// Cloud resource matches the spec
    Processed,
    /// Last tick failed; see `message`
    Error,
}

impl OsokState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Created => "Created",
            Self::Processed => "Processed",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for OsokState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced object key, rendered as `namespace/name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` key as stored in a dependents map
    pub fn parse(key: &str) -> Option<Self> {
        let (namespace, name) = key.split_once('/')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }

    /// Key of a stored object; `None` when metadata lacks name or namespace
    pub fn of<K: kube::Resource>(obj: &K) -> Option<Self> {
        let meta = obj.meta();
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Operation a cloud work request was submitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum WorkRequestOperation {
    Create,
    Update,
    Delete,
}

impl WorkRequestOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Lifecycle state reported for a cloud work request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum WorkRequestState {
    Accepted,
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl WorkRequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::InProgress => "InProgress",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }

    /// Parse the cloud's wire spelling (`IN_PROGRESS`, `SUCCEEDED`, ...)
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().replace('-', "_").as_str() {
            "ACCEPTED" => Some(Self::Accepted),
            "IN_PROGRESS" | "INPROGRESS" | "CANCELING" => Some(Self::InProgress),
            "SUCCEEDED" => Some(Self::Succeeded),
            "FAILED" => Some(Self::Failed),
            "CANCELED" | "CANCELLED" => Some(Self::Canceled),
            _ => None,
        }
    }
}

/// An outstanding cloud work request and its last observed state
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestRecord {
    pub id: String,
    pub operation: WorkRequestOperation,
    pub state: WorkRequestState,
}

/// Selector used by `spec.dependsOn`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependsOnSelector {
    /// Labels every selected object must carry
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Dotted JSON paths (`metadata.name`, `spec.displayName`) and expected string values
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_fields: BTreeMap<String, String>,
}

/// Status sub-record shared by every managed kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonStatus {
    #[serde(default)]
    pub state: OsokState,
    /// Consecutive-error count; cleared on success and on spec edits
    #[serde(default)]
    pub reset_counter: u32,
    /// Last error or `OK`
    #[serde(default)]
    pub message: String,
    /// Reverse edges: child kind to `namespace/name` keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependents: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_request: Option<WorkRequestRecord>,
    /// Generation the counter was last reset for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    /// RFC3339 time of the last state transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl CommonStatus {
    /// Register `child` as a dependent of kind `kind`. Returns true if it was added.
    pub fn add_dependent(&mut self, kind: &str, child: &ObjectKey) -> bool {
        let key = child.to_string();
        let slot = self.dependents.entry(kind.to_string()).or_default();
        if slot.contains(&key) {
            return false;
        }
        slot.push(key);
        true
    }

    pub fn is_dependent_registered(&self, kind: &str, child: &ObjectKey) -> bool {
        let key = child.to_string();
        self.dependents
            .get(kind)
            .is_some_and(|slot| slot.contains(&key))
    }

    /// Remove one occurrence of `child`; drops the kind entry once it is empty.
    /// Returns true if anything was removed.
    pub fn remove_dependent(&mut self, kind: &str, child: &ObjectKey) -> bool {
        let key = child.to_string();
        let Some(slot) = self.dependents.get_mut(kind) else {
            return false;
        };
        let removed = match slot.iter().position(|k| *k == key) {
            Some(index) => {
                slot.remove(index);
                true
            }
            None => false,
        };
        if slot.is_empty() {
            self.dependents.remove(kind);
        }
        removed
    }

    pub fn has_dependents(&self) -> bool {
        self.dependents.values().any(|slot| !slot.is_empty())
    }

    /// Kinds that still hold dependents, in map order
    pub fn blocking_kinds(&self) -> Vec<&str> {
        self.dependents
            .iter()
            .filter(|(_, slot)| !slot.is_empty())
            .map(|(kind, _)| kind.as_str())
            .collect()
    }

    /// Move to `state`, stamping the transition time only when the phase changes
    pub fn set_state(&mut self, state: OsokState) {
        if self.state != state {
            self.state = state;
            self.last_transition_time = Some(chrono::Utc::now().to_rfc3339());
        }
    }

    /// Fold a cloud outcome into the status.
    ///
    /// `Ok` marks the object `Processed` with message `OK`. A
    /// `NotAuthorizedOrNotFound` error is treated as already gone and swallowed.
    /// Any other error sets `Error`, records its text and is handed back to the caller.
    pub fn handle_error(&mut self, outcome: Result<(), CloudError>) -> Result<(), CloudError> {
        match outcome {
            Ok(()) => {
                self.set_state(OsokState::Processed);
                STATUS_OK.clone_into(&mut self.message);
                Ok(())
            }
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => {
                self.set_state(OsokState::Error);
                self.message = err.to_string();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ObjectKey {
        ObjectKey::new("ns", name)
    }

    #[test]
    fn test_add_dependent_is_idempotent() {
        let mut status = CommonStatus::default();
        assert!(status.add_dependent("Subnet", &key("s1")));
        assert!(!status.add_dependent("Subnet", &key("s1")));
        assert!(status.add_dependent("Subnet", &key("s2")));
        assert_eq!(status.dependents["Subnet"], vec!["ns/s1", "ns/s2"]);
        assert!(status.is_dependent_registered("Subnet", &key("s2")));
        assert!(!status.is_dependent_registered("LoadBalancer", &key("s2")));
    }

    #[test]
    fn test_remove_dependent_keeps_tail_and_drops_empty_slot() {
        let mut status = CommonStatus::default();
        for name in ["a", "b", "c"] {
            status.add_dependent("Backend", &key(name));
        }
        assert!(status.remove_dependent("Backend", &key("a")));
        assert_eq!(status.dependents["Backend"], vec!["ns/b", "ns/c"]);
        assert!(!status.remove_dependent("Backend", &key("zzz")));
        assert!(status.remove_dependent("Backend", &key("c")));
        assert!(status.remove_dependent("Backend", &key("b")));
        assert!(!status.dependents.contains_key("Backend"));
        assert!(!status.has_dependents());
    }

    #[test]
    fn test_blocking_kinds() {
        let mut status = CommonStatus::default();
        status.add_dependent("Listener", &key("l1"));
        status.add_dependent("BackendSet", &key("bs1"));
        assert_eq!(status.blocking_kinds(), vec!["BackendSet", "Listener"]);
    }

    #[test]
    fn test_handle_error_paths() {
        let mut status = CommonStatus::default();
        assert!(status.handle_error(Ok(())).is_ok());
        assert_eq!(status.state, OsokState::Processed);
        assert_eq!(status.message, "OK");

        let gone = CloudError::NotAuthorizedOrNotFound("missing".into());
        assert!(status.handle_error(Err(gone)).is_ok());
        assert_eq!(status.state, OsokState::Processed);

        let denied = CloudError::NotAuthorized("denied".into());
        assert!(status.handle_error(Err(denied)).is_err());
        assert_eq!(status.state, OsokState::Error);
        assert!(status.message.contains("denied"));
    }

    #[test]
    fn test_set_state_stamps_only_on_change() {
        let mut status = CommonStatus::default();
        status.set_state(OsokState::Pending);
        assert!(status.last_transition_time.is_none());
        status.set_state(OsokState::Created);
        assert!(status.last_transition_time.is_some());
    }

    #[test]
    fn test_object_key_parse() {
        assert_eq!(ObjectKey::parse("ns/a"), Some(key("a")));
        assert_eq!(ObjectKey::parse("nope"), None);
        assert_eq!(ObjectKey::parse("/a"), None);
    }

    #[test]
    fn test_work_request_state_wire() {
        assert_eq!(
            WorkRequestState::from_wire("IN_PROGRESS"),
            Some(WorkRequestState::InProgress)
        );
        assert_eq!(
            WorkRequestState::from_wire("Succeeded"),
            Some(WorkRequestState::Succeeded)
        );
        assert!(WorkRequestState::Failed.is_terminal());
        assert!(!WorkRequestState::Accepted.is_terminal());
    }
}
