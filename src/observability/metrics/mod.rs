//! # Metrics
//!
//! Reconciliation metrics, labelled by kind where it makes sense.

mod controller_metrics;
mod registry;

pub use controller_metrics::*;
pub use registry::gather_text;

/// Register every metric with the process registry
#[allow(clippy::missing_errors_doc, reason = "registration only fails on duplicate names")]
pub fn register_metrics() -> anyhow::Result<()> {
    controller_metrics::register_controller_metrics()?;
    Ok(())
}
