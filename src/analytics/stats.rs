use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct SubmissionStats {
    pub documents_submitted: AtomicU64,
    pub documents_failed: AtomicU64,
    pub admissions_interrupted: AtomicU64,

    // Last observed value only, gauge-like.
    pub last_submission_latency_ms: AtomicU64,
}

impl SubmissionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.documents_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_interrupted(&self) {
        self.admissions_interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_submission_latency(&self, ms: u64) {
        self.last_submission_latency_ms.store(ms, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.documents_submitted.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.documents_failed.load(Ordering::Relaxed)
    }

    pub fn interrupted(&self) -> u64 {
        self.admissions_interrupted.load(Ordering::Relaxed)
    }

    pub fn log_stats(&self) {
        let latency = self.last_submission_latency_ms.load(Ordering::Relaxed);

        info!(
            "STATS: Documents: {} Submitted, {} Failed | Interrupted admissions: {} | Last latency: {}ms",
            self.submitted(),
            self.failed(),
            self.interrupted(),
            latency
        );
    }
}
