//! # Controller Metrics
//!
//! Reconciliation counts, errors by class, durations, cloud operations,
//! requeues, parked objects and work-request polls.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};
use std::sync::LazyLock;

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_reconciliations_total",
            "Total number of reconciliation ticks",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_reconciliation_errors_total",
            "Total number of failed reconciliation ticks by error class",
        ),
        &["kind", "class"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "oci_operator_reconciliation_duration_seconds",
            "Duration of reconciliation ticks in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static CLOUD_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_cloud_operations_total",
            "Total number of cloud create, update and delete submissions",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create CLOUD_OPERATIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static PARKED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_parked_total",
            "Total number of objects parked after exhausting their reset counter",
        ),
        &["kind"],
    )
    .expect("Failed to create PARKED_TOTAL metric - this should never happen")
});

static WORK_REQUEST_POLLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "oci_operator_work_request_polls_total",
            "Total number of work request polls by observed state",
        ),
        &["kind", "state"],
    )
    .expect("Failed to create WORK_REQUEST_POLLS_TOTAL metric - this should never happen")
});

pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CLOUD_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PARKED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WORK_REQUEST_POLLS_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations_total(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors_total(kind: &str, class: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, class])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_cloud_operations_total(kind: &str, operation: &str) {
    CLOUD_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_parked_total(kind: &str) {
    PARKED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_work_request_polls_total(kind: &str, state: &str) {
    WORK_REQUEST_POLLS_TOTAL
        .with_label_values(&[kind, state])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliation_errors_total() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["TestKind", "cloud_transient"])
            .get();
        increment_reconciliation_errors_total("TestKind", "cloud_transient");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["TestKind", "cloud_transient"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_requeues_total() {
        let before = REQUEUES_TOTAL.with_label_values(&["test-reason"]).get();
        increment_requeues_total("test-reason");
        let after = REQUEUES_TOTAL.with_label_values(&["test-reason"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_parked_total() {
        let before = PARKED_TOTAL.with_label_values(&["ParkedKind"]).get();
        increment_parked_total("ParkedKind");
        let after = PARKED_TOTAL.with_label_values(&["ParkedKind"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        observe_reconciliation_duration("TestKind", 0.2);
        let count = RECONCILIATION_DURATION
            .with_label_values(&["TestKind"])
            .get_sample_count();
        assert!(count >= 1);
    }
}
