//! Prometheus metrics for the publishing pipeline
//!
//! This module provides metrics tracking for:
//! - Topic allocation: probes per allocation, exhaustion
//! - Pipeline runs: outcome by recorded status, sanitize passes, status
//!   downgrades, draft fallbacks
//! - Weekly runs: published / skipped / failed subjects
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all pipeline metrics
struct PipelineMetrics {
    allocation_attempts: Histogram,
    allocation_exhausted: Counter,
    runs: CounterVec,
    sanitize_passes: Counter,
    status_downgrades: Counter,
    publish_fallbacks: Counter,
    weekly_subjects: CounterVec,
}

/// Global storage for pipeline metrics
static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = dalbit::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = PipelineMetrics {
        allocation_attempts: register_histogram!(
            "dalbit_allocation_attempts",
            "Ledger probes needed to allocate a topic",
            vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0, 50.0, 100.0]
        )?,
        allocation_exhausted: register_counter!(
            "dalbit_allocation_exhausted_total",
            "Allocations that gave up because every probe collided"
        )?,
        runs: register_counter_vec!(
            "dalbit_pipeline_runs_total",
            "Pipeline runs by recorded ledger status",
            &["status"]
        )?,
        sanitize_passes: register_counter!(
            "dalbit_sanitize_passes_total",
            "Drafts rewritten by the sanitizer"
        )?,
        status_downgrades: register_counter!(
            "dalbit_status_downgrades_total",
            "Drafts forced to draft status by failed validation"
        )?,
        publish_fallbacks: register_counter!(
            "dalbit_publish_fallbacks_total",
            "Publishes that fell back to draft status"
        )?,
        weekly_subjects: register_counter_vec!(
            "dalbit_weekly_subjects_total",
            "Weekly subjects by result",
            &["result"]
        )?,
    };

    PIPELINE_METRICS
        .set(metrics)
        .map_err(|_| "Pipeline metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    PIPELINE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one allocation
pub fn record_allocation(attempts: u32, success: bool) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    m.allocation_attempts.observe(f64::from(attempts));
    if !success {
        m.allocation_exhausted.inc();
    }
}

/// Record a finished run by the status written to the ledger
pub fn record_run(status: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.runs.with_label_values(&[status]).inc();
    }
}

/// Runs counted so far under `status`; 0 before initialization
pub fn run_count(status: &str) -> u64 {
    PIPELINE_METRICS
        .get()
        .map(|m| m.runs.with_label_values(&[status]).get() as u64)
        .unwrap_or(0)
}

/// Record a sanitizer pass
pub fn record_sanitize() {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.sanitize_passes.inc();
    }
}

/// Record a forced draft after failed validation
pub fn record_downgrade() {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.status_downgrades.inc();
    }
}

/// Record a draft fallback after publish failures
pub fn record_fallback() {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.publish_fallbacks.inc();
    }
}

/// Record weekly run results
pub fn record_weekly(published: usize, skipped: usize, failed: usize) {
    let Some(m) = PIPELINE_METRICS.get() else {
        return;
    };

    for (result, count) in [
        ("published", published),
        ("skipped", skipped),
        ("failed", failed),
    ] {
        if count > 0 {
            m.weekly_subjects
                .with_label_values(&[result])
                .inc_by(count as f64);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
