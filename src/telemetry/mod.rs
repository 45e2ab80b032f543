//! Telemetry
//!
//! Observability components for OAuth2 operations. Structured logging goes
//! through `tracing` at the call sites; this module holds the metrics sink.

pub mod metrics;

pub use metrics::{
    create_in_memory_metrics, no_op_metrics, InMemoryMetrics, MetricEntry, MetricLabels,
    NoOpMetrics, OAuth2Metrics,
};
