//! Counters for session manager activity
//!
//! Shared between the manager and whoever exports them; all counters are
//! relaxed atomics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for one session manager
#[derive(Debug, Default)]
pub struct SessionMetrics {
    /// Engine sessions opened
    pub sessions_opened: AtomicU64,
    /// Engine sessions closed by the last `close()`
    pub sessions_closed: AtomicU64,
    /// Provisioning requests posted to the worker
    pub provision_requests: AtomicU64,
    /// Key requests posted to the worker
    pub key_requests: AtomicU64,
    /// Responses applied to the state machine
    pub responses_applied: AtomicU64,
    /// Responses discarded as stale
    pub stale_responses: AtomicU64,
    /// Key responses accepted by the engine
    pub keys_loaded: AtomicU64,
    /// Failures reported through the error sink
    pub errors_reported: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provision_request(&self) {
        self.provision_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_request(&self) {
        self.key_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a response leaving the inbound queue
    ///
    /// # Arguments
    /// * `stale` - Whether the response was discarded without effect
    pub fn record_response(&self, stale: bool) {
        if stale {
            self.stale_responses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.responses_applied.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_keys_loaded(&self) {
        self.keys_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_reported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            provision_requests: self.provision_requests.load(Ordering::Relaxed),
            key_requests: self.key_requests.load(Ordering::Relaxed),
            responses_applied: self.responses_applied.load(Ordering::Relaxed),
            stale_responses: self.stale_responses.load(Ordering::Relaxed),
            keys_loaded: self.keys_loaded.load(Ordering::Relaxed),
            errors_reported: self.errors_reported.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SessionMetrics`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub provision_requests: u64,
    pub key_requests: u64,
    pub responses_applied: u64,
    pub stale_responses: u64,
    pub keys_loaded: u64,
    pub errors_reported: u64,
}
