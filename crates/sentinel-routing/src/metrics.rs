//! Token savings counters.
//!
//! Volatile diagnostics, not a source of truth: counters live in process
//! memory and are lost on restart by design. The cost model is a flat
//! per-request token estimate, intentionally coarse.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::policy::RoutingDecision;

/// Process-wide counters for generation calls avoided by the classifier.
///
/// Owned by the service instance, not a module-level global; reset is a
/// constructor call, which keeps tests isolated.
#[derive(Debug)]
pub struct TokenMetrics {
    total_requests: AtomicU64,
    skipped_by_classifier: AtomicU64,
    saved_tokens: AtomicU64,
    avg_tokens_per_request: u64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct TokenMetricsSnapshot {
    pub total_requests: u64,
    pub skipped_by_classifier: u64,
    pub saved_tokens: u64,
    pub avg_tokens_per_request: u64,
    pub savings_percent: f64,
}

impl TokenMetrics {
    /// `avg_tokens_per_request` is the flat estimate added to the saved
    /// total for every skipped turn.
    pub fn new(avg_tokens_per_request: u64) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            skipped_by_classifier: AtomicU64::new(0),
            saved_tokens: AtomicU64::new(0),
            avg_tokens_per_request,
        }
    }

    /// Record one routed chat turn. Atomic increments, so concurrent
    /// callers never lose updates.
    pub fn record(&self, routing: &RoutingDecision) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if routing.should_skip_generation {
            self.skipped_by_classifier.fetch_add(1, Ordering::Relaxed);
            self.saved_tokens
                .fetch_add(self.avg_tokens_per_request, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> TokenMetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let skipped = self.skipped_by_classifier.load(Ordering::Relaxed);
        TokenMetricsSnapshot {
            total_requests: total,
            skipped_by_classifier: skipped,
            saved_tokens: self.saved_tokens.load(Ordering::Relaxed),
            avg_tokens_per_request: self.avg_tokens_per_request,
            savings_percent: if total == 0 {
                0.0
            } else {
                skipped as f64 / total as f64 * 100.0
            },
        }
    }
}

impl Default for TokenMetrics {
    fn default() -> Self {
        Self::new(150)
    }
}
