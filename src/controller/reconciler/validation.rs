//! # Validation
//!
//! Object-name and reference checks applied before any cloud call.

use crate::constants::OCID_PREFIX;
use crate::controller::adapter::Reference;
use crate::controller::reconciler::types::ReconcilerError;
use kube::Resource;
use regex::Regex;

/// RFC 1123 subdomain, the shape Kubernetes requires of object names
const DNS_SUBDOMAIN_PATTERN: &str =
    r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";
const DNS_SUBDOMAIN_MAX_LEN: usize = 253;

/// Check that `name` is hostname-shaped
///
/// # Errors
/// Returns `Validation` naming the offending value.
pub fn validate_hostname(name: &str, what: &str) -> Result<(), ReconcilerError> {
    if name.is_empty() {
        return Err(ReconcilerError::Validation(format!("{what} must not be empty")));
    }
    if name.len() > DNS_SUBDOMAIN_MAX_LEN {
        return Err(ReconcilerError::Validation(format!(
            "{what} '{name}' is longer than {DNS_SUBDOMAIN_MAX_LEN} characters"
        )));
    }
    let pattern = Regex::new(DNS_SUBDOMAIN_PATTERN)
        .map_err(|e| ReconcilerError::Internal(format!("Failed to compile regex: {e}")))?;
    if !pattern.is_match(name) {
        return Err(ReconcilerError::Validation(format!(
            "{what} '{name}' must consist of lower case alphanumeric characters, '-' or '.', \
             and must start and end with an alphanumeric character"
        )));
    }
    Ok(())
}

pub fn validate_object_name<K: Resource>(obj: &K) -> Result<(), ReconcilerError> {
    let name = obj.meta().name.as_deref().unwrap_or_default();
    validate_hostname(name, "metadata.name")
}

/// Reference values are either a cloud identifier or a sibling name
pub fn validate_references(references: &[Reference]) -> Result<(), ReconcilerError> {
    for reference in references {
        let value = reference.value.trim();
        if value.is_empty() {
            return Err(ReconcilerError::Validation(format!(
                "{} reference ({}) must not be empty",
                reference.role, reference.kind
            )));
        }
        if value.starts_with(OCID_PREFIX) {
            continue;
        }
        validate_hostname(value, &format!("{} reference", reference.role))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("lb1", "name").is_ok());
        assert!(validate_hostname("backend.b1", "name").is_ok());
        assert!(validate_hostname("a-b-1", "name").is_ok());
        assert!(validate_hostname("", "name").is_err());
        assert!(validate_hostname("Upper", "name").is_err());
        assert!(validate_hostname("-lead", "name").is_err());
        assert!(validate_hostname("trail-", "name").is_err());
        assert!(validate_hostname("under_score", "name").is_err());
        assert!(validate_hostname(&"a".repeat(254), "name").is_err());
    }

    #[test]
    fn test_validate_references_accepts_ocids() {
        let refs = vec![
            Reference::new("compartment", "Compartment", "ocid1.compartment.oc1..aaaa"),
            Reference::new("subnets", "Subnet", "s1"),
        ];
        assert!(validate_references(&refs).is_ok());

        let empty = vec![Reference::new("loadBalancer", "LoadBalancer", " ")];
        let err = validate_references(&empty).unwrap_err();
        assert!(err.to_string().contains("loadBalancer"), "{err}");
    }
}
