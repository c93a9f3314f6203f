//! # OCI Service Operator
//!
//! A Kubernetes operator that manages Oracle Cloud Infrastructure resources
//! declared as custom resources.
//!
//! ## Overview
//!
//! Every managed kind (compartments, networks, compute, container engine,
//! autonomous databases and load balancers) is driven by the same
//! reconciliation engine:
//!
//! 1. **References** - `*Ref` fields naming sibling objects or native OCIDs are
//!    resolved before any cloud call, and the referrer is recorded as a
//!    dependent on each sibling.
//! 2. **Create / adopt** - the cloud resource is created with a stable retry
//!    token, or adopted when the object already carries its OCID.
//! 3. **Work requests** - asynchronous operations are polled until terminal.
//! 4. **Drift** - the observed resource is compared with the spec and updated
//!    when they differ.
//! 5. **Deletion** - guarded by the dependents list and the finalizer.
//!
//! Autonomous databases additionally get an admin-password secret and, once
//! available, a wallet secret.
//!
//! ## Binaries
//!
//! - `oci-service-operator` runs the controllers.
//! - `crdgen` prints the CustomResourceDefinitions as YAML.

pub mod adapters;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod secrets;
pub mod testing;
