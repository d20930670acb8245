//! Reload pass metrics using OpenTelemetry.

use crate::reload::ReloadReport;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for reload passes.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_registry::metrics::ReloadMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("hotswap-registry");
/// let metrics = ReloadMetrics::new(meter);
/// ```
#[derive(Clone)]
pub struct ReloadMetrics {
    passes: Counter<u64>,
    load_failures: Counter<u64>,
    aborted: Counter<u64>,
    slots_updated: Counter<u64>,
    slots_rejected: Counter<u64>,
    pass_duration: Histogram<f64>,
    tracked_keys: Gauge<i64>,
}

impl ReloadMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let passes = meter
            .u64_counter("hotswap_registry.reload.passes")
            .with_description("Total number of reload passes started")
            .build();

        let load_failures = meter
            .u64_counter("hotswap_registry.reload.failures")
            .with_description("Passes where the config files failed to evaluate")
            .build();

        let aborted = meter
            .u64_counter("hotswap_registry.reload.aborted")
            .with_description("Passes aborted because of an untyped slot")
            .build();

        let slots_updated = meter
            .u64_counter("hotswap_registry.slots.updated")
            .with_description("Slot values replaced by reload passes")
            .build();

        let slots_rejected = meter
            .u64_counter("hotswap_registry.slots.rejected")
            .with_description("Candidate values that failed validation")
            .build();

        let pass_duration = meter
            .f64_histogram("hotswap_registry.reload.duration")
            .with_description("Duration of reload passes in seconds")
            .with_unit("s")
            .build();

        let tracked_keys = meter
            .i64_gauge("hotswap_registry.keys.tracked")
            .with_description("Number of registered keys")
            .build();

        Self {
            passes,
            load_failures,
            aborted,
            slots_updated,
            slots_rejected,
            pass_duration,
            tracked_keys,
        }
    }

    /// Count a pass as started.
    pub fn start_pass(&self) {
        self.passes.add(1, &[]);
    }

    /// Record a completed pass that began at `start`.
    pub fn record_pass(&self, start: Instant, report: &ReloadReport, keys: usize) {
        self.pass_duration.record(start.elapsed().as_secs_f64(), &[]);
        if report.load_failed {
            self.load_failures.add(1, &[]);
        }
        self.slots_updated.add(report.updated as u64, &[]);
        self.slots_rejected.add(report.rejected as u64, &[]);
        self.tracked_keys.record(keys as i64, &[]);
    }

    /// Record a pass that was aborted before touching any slot.
    pub fn record_aborted(&self, start: Instant) {
        self.aborted.add(1, &[]);
        self.pass_duration.record(start.elapsed().as_secs_f64(), &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::global;

    #[test]
    fn test_metrics_creation() {
        let metrics = ReloadMetrics::new(global::meter("test"));

        let start = Instant::now();
        metrics.start_pass();
        metrics.record_pass(
            start,
            &ReloadReport {
                generation: 1,
                updated: 3,
                rejected: 1,
                ..ReloadReport::default()
            },
            4,
        );

        metrics.start_pass();
        metrics.record_aborted(Instant::now());
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = ReloadMetrics::new(global::meter("test"));
        let metrics2 = metrics.clone();

        metrics.start_pass();
        metrics2.start_pass();
        metrics2.record_pass(
            Instant::now(),
            &ReloadReport {
                load_failed: true,
                ..ReloadReport::default()
            },
            0,
        );
    }
}
