//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, register_int_gauge_with_registry, Counter, CounterVec,
    Histogram, IntGauge, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Inference client metrics
    pub inference_requests: CounterVec,
    pub inference_request_duration: Histogram,

    // Conversation metrics
    pub turns_total: Counter,

    // Memory store metrics
    pub memory_entries: IntGauge,
    pub memory_words: IntGauge,
    pub memory_evictions: Counter,
    pub memory_overflows: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();

        let inference_requests = register_counter_vec_with_registry!(
            Opts::new("inference_requests_total", "Total inference requests"),
            &["status"],
            registry
        )?;

        let inference_request_duration = register_histogram_with_registry!(
            "inference_request_duration_seconds",
            "Inference request duration in seconds",
            registry
        )?;

        let turns_total = register_counter_with_registry!(
            Opts::new(
                "conversation_turns_total",
                "Total completed conversation turns"
            ),
            registry
        )?;

        let memory_entries = register_int_gauge_with_registry!(
            Opts::new("memory_entries", "Entries currently held in the memory store"),
            registry
        )?;

        let memory_words = register_int_gauge_with_registry!(
            Opts::new(
                "memory_words",
                "Total word count currently held in the memory store"
            ),
            registry
        )?;

        let memory_evictions = register_counter_with_registry!(
            Opts::new(
                "memory_evictions_total",
                "Total entries evicted to restore the budget"
            ),
            registry
        )?;

        let memory_overflows = register_counter_with_registry!(
            Opts::new(
                "memory_overflows_total",
                "Times a single remaining entry exceeded the budget"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            inference_requests,
            inference_request_duration,
            turns_total,
            memory_entries,
            memory_words,
            memory_evictions,
            memory_overflows,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record an inference request outcome
    pub fn record_inference(&self, success: bool) {
        let status = if success { "success" } else { "error" };
        self.inference_requests.with_label_values(&[status]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
