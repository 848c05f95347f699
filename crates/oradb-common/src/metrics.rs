//! OpenTelemetry instruments for oradb
//!
//! Instruments are created lazily against the global meter provider, which
//! is a no-op until telemetry installs an exporter.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::KeyValue;

static METER: Lazy<Meter> = Lazy::new(|| global::meter("oradb"));

/// Backups recorded for a Pitr across all incarnations
///
/// Labels:
/// - `pitr`: Pitr name
/// - `namespace`: Pitr namespace
pub static PITR_BACKUPS_TOTAL: Lazy<Gauge<i64>> = Lazy::new(|| {
    METER
        .i64_gauge("oradb_pitr_backups_total")
        .with_description("Number of backups taken for a PITR across incarnations")
        .with_unit("{backups}")
        .build()
});

/// Restores that reached a terminal state
///
/// Labels:
/// - `result`: success, failure
pub static RESTORE_OPERATIONS_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("oradb_restore_operations_total")
        .with_description("Physical restores by terminal result")
        .with_unit("{restores}")
        .build()
});

/// Reconcile duration
///
/// Labels:
/// - `controller`: instance, pitr
/// - `result`: success, error
pub static RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("oradb_reconcile_duration_seconds")
        .with_description("Duration of reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Terminal restore result label value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreResult {
    /// Restore completed
    Success,
    /// Restore reported an error
    Failure,
}

impl RestoreResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Record a terminal restore
pub fn record_restore(result: RestoreResult) {
    RESTORE_OPERATIONS_TOTAL.add(1, &[KeyValue::new("result", result.as_str())]);
}

/// Record the backup count observed for a Pitr
pub fn record_pitr_backups(namespace: &str, pitr: &str, total: i64) {
    PITR_BACKUPS_TOTAL.record(
        total,
        &[
            KeyValue::new("namespace", namespace.to_string()),
            KeyValue::new("pitr", pitr.to_string()),
        ],
    );
}

/// Times one reconcile and records it on drop
pub struct ReconcileTimer {
    controller: &'static str,
    start: std::time::Instant,
    ok: bool,
}

impl ReconcileTimer {
    /// Start timing a reconcile for `controller`
    pub fn start(controller: &'static str) -> Self {
        Self {
            controller,
            start: std::time::Instant::now(),
            ok: false,
        }
    }

    /// Mark the reconcile as successful before the timer drops
    pub fn success(mut self) {
        self.ok = true;
    }
}

impl Drop for ReconcileTimer {
    fn drop(&mut self) {
        let result = if self.ok { "success" } else { "error" };
        RECONCILE_DURATION.record(
            self.start.elapsed().as_secs_f64(),
            &[
                KeyValue::new("controller", self.controller),
                KeyValue::new("result", result),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_exporter_is_harmless() {
        record_restore(RestoreResult::Success);
        record_restore(RestoreResult::Failure);
        record_pitr_backups("db", "nightly", 3);
        ReconcileTimer::start("pitr").success();
        drop(ReconcileTimer::start("instance"));
    }

    #[test]
    fn restore_result_labels() {
        assert_eq!(RestoreResult::Success.as_str(), "success");
        assert_eq!(RestoreResult::Failure.as_str(), "failure");
    }
}
