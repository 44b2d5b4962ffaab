//! Prometheus metrics for the simulation bench.

use crate::protocol::OutcomeRecord;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use sim_core::WriteStats;
use std::sync::LazyLock;

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Operation Metrics
// ============================================================================

/// Outcomes by device kind and status
pub static OPERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "sim_operations_total",
            "Operations applied to simulated devices by kind and status",
        ),
        &["kind", "status"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Self-test results by device kind
pub static SELF_TESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "sim_self_tests_total",
            "Self-tests run by device kind and result",
        ),
        &["kind", "result"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Bench State Metrics
// ============================================================================

/// Simulated power rail (1 = on, 0 = off)
pub static POWER_ON: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("sim_power_on", "Simulated power rail state (1=on, 0=off)").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Accepted pin writes on the simulated bank
pub static PIN_WRITES: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("sim_pin_writes", "Pin writes accepted by the simulated bank").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Rejected pin writes on the simulated bank
pub static PIN_FAULTS: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("sim_pin_faults", "Pin writes rejected by the simulated bank").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Latest output written per device
pub static DEVICE_OUTPUT: LazyLock<GaugeVec> = LazyLock::new(|| {
    let gauge = GaugeVec::new(
        Opts::new("sim_device_output", "Latest output written per device"),
        &["device"],
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Count one outcome. `kind` is empty for bench-level operations.
pub fn record_outcome(kind: &str, outcome: &OutcomeRecord) {
    let kind = if kind.is_empty() { "bench" } else { kind };
    OPERATIONS
        .with_label_values(&[kind, outcome.status.as_str()])
        .inc();

    if outcome.op == "self_test" || outcome.op == "self_test_all" {
        SELF_TESTS
            .with_label_values(&[kind, outcome.status.as_str()])
            .inc();
    }

    if let (Some(device), Some(output)) = (outcome.device.as_deref(), outcome.output) {
        DEVICE_OUTPUT.with_label_values(&[device]).set(output);
    }
}

pub fn record_power(on: bool) {
    POWER_ON.set(i64::from(on));
}

pub fn record_pin_stats(stats: &WriteStats) {
    PIN_WRITES.set(i64::try_from(stats.writes).unwrap_or(i64::MAX));
    PIN_FAULTS.set(i64::try_from(stats.faults).unwrap_or(i64::MAX));
}

/// Text exposition of every registered metric.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    LazyLock::force(&OPERATIONS);
    LazyLock::force(&SELF_TESTS);
    let _ = POWER_ON.get();
    let _ = PIN_WRITES.get();
    let _ = PIN_FAULTS.get();
    LazyLock::force(&DEVICE_OUTPUT);
}
