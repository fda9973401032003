use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-stage counters, shared between the worker and observers
#[derive(Debug, Clone, Default)]
pub struct StageMetrics {
    /// Items transformed and handed downstream
    processed: Arc<AtomicU64>,
    /// Items the transform declined to produce output for
    dropped: Arc<AtomicU64>,
    /// Forward-hook calls that returned an error
    forward_errors: Arc<AtomicU64>,
}

impl StageMetrics {
    /// Create a zeroed metrics collector for a stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed item
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item dropped by the transform
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed forward to the downstream stage
    pub fn record_forward_error(&self) {
        self.forward_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total items processed so far
    pub fn total_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Total items dropped so far
    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Total forward errors so far
    pub fn total_forward_errors(&self) -> u64 {
        self.forward_errors.load(Ordering::Relaxed)
    }

    /// Get a snapshot of current counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.total_processed(),
            dropped: self.total_dropped(),
            forward_errors: self.total_forward_errors(),
        }
    }
}

/// A point-in-time copy of a stage's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub dropped: u64,
    pub forward_errors: u64,
}

impl MetricsSnapshot {
    /// Format counters as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "Processed: {}, Dropped: {}, Forward errors: {}",
            self.processed, self.dropped, self.forward_errors
        )
    }
}
