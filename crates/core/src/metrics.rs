//! Prometheus metrics for the transform stage.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

/// Transform runs by result.
pub static TRANSFORM_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transform_runs_total", "Total file pair transforms"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Failures by error kind.
pub static TRANSFORM_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("transform_failures_total", "Total transform failures"),
        &["kind"],
    )
    .unwrap()
});

/// Transform duration in seconds, probe included.
pub static TRANSFORM_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "transform_duration_seconds",
            "Duration of file pair transforms",
        )
        .buckets(vec![
            1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
        ]),
    )
    .unwrap()
});

/// Registers all metrics with `registry`.
pub fn register_metrics(registry: &Registry) -> prometheus::Result<()> {
    registry.register(Box::new(TRANSFORM_RUNS.clone()))?;
    registry.register(Box::new(TRANSFORM_FAILURES.clone()))?;
    registry.register(Box::new(TRANSFORM_DURATION.clone()))?;
    Ok(())
}
