//! Metrics
//!
//! OAuth2 metrics collection interfaces and implementations.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Metric labels.
pub type MetricLabels = HashMap<String, String>;

/// OAuth2 metrics interface.
pub trait OAuth2Metrics: Send + Sync {
    /// Record a grant request and whether it produced a token.
    fn record_token_request(&self, grant_type: &str, success: bool);

    /// Record a caller joining a refresh already in flight.
    fn record_refresh_coalesced(&self);

    /// Record error.
    fn record_error(&self, error_code: &str);
}

/// No-op metrics implementation.
pub struct NoOpMetrics;

impl OAuth2Metrics for NoOpMetrics {
    fn record_token_request(&self, _grant_type: &str, _success: bool) {}
    fn record_refresh_coalesced(&self) {}
    fn record_error(&self, _error_code: &str) {}
}

/// No-op metrics singleton.
pub fn no_op_metrics() -> NoOpMetrics {
    NoOpMetrics
}

/// Metric entry for in-memory storage.
#[derive(Debug, Clone)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub labels: MetricLabels,
    pub timestamp: u64,
}

/// In-memory metrics for testing.
#[derive(Default)]
pub struct InMemoryMetrics {
    entries: Mutex<Vec<MetricEntry>>,
}

impl InMemoryMetrics {
    /// Create new in-memory metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn get_entries(&self) -> Vec<MetricEntry> {
        self.entries.lock().clone()
    }

    /// Get entries by name.
    pub fn get_entries_by_name(&self, name: &str) -> Vec<MetricEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn record(&self, name: &str, value: f64, labels: MetricLabels) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        self.entries.lock().push(MetricEntry {
            name: name.to_string(),
            value,
            labels,
            timestamp: now,
        });
    }
}

impl OAuth2Metrics for InMemoryMetrics {
    fn record_token_request(&self, grant_type: &str, success: bool) {
        let mut labels = MetricLabels::new();
        labels.insert("grant_type".to_string(), grant_type.to_string());
        labels.insert("success".to_string(), success.to_string());
        self.record("oauth2_token_requests_total", 1.0, labels);
    }

    fn record_refresh_coalesced(&self) {
        self.record("oauth2_refresh_coalesced_total", 1.0, MetricLabels::new());
    }

    fn record_error(&self, error_code: &str) {
        let mut labels = MetricLabels::new();
        labels.insert("error_code".to_string(), error_code.to_string());
        self.record("oauth2_errors_total", 1.0, labels);
    }
}

/// Create in-memory metrics for testing.
pub fn create_in_memory_metrics() -> InMemoryMetrics {
    InMemoryMetrics::new()
}
