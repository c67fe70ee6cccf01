//! Fixed-window admission control.
//!
//! A [`RateLimiter`] admits at most `request_limit` operations per window. It pairs an
//! [`AdmissionGate`] (a fair, blocking permit pool) with a [`Replenisher`] that resets
//! the pool to full capacity at the start of every window.
//!
//! Because the pool is reset rather than topped up gradually, a burst at the end of
//! one window followed by a burst at the start of the next can admit up to twice the
//! limit in less than one window.

pub mod gate;
pub mod replenisher;
pub mod window;

pub use gate::{AdmissionGate, Permit};
pub use replenisher::{Replenish, Replenisher};
pub use window::WindowUnit;

use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::info;

use crate::error::LimiterError;

pub struct RateLimiter {
    gate: AdmissionGate,
    replenisher: Replenisher,
}

impl RateLimiter {
    /// Admits at most `request_limit` operations per one `window` unit.
    ///
    /// Must be called from within a tokio runtime, which drives replenishment.
    pub fn new(window: WindowUnit, request_limit: usize) -> Result<Self, LimiterError> {
        Self::with_interval(window.duration(), request_limit)
    }

    pub fn with_interval(interval: Duration, request_limit: usize) -> Result<Self, LimiterError> {
        let capacity = NonZeroUsize::new(request_limit).ok_or(LimiterError::InvalidCapacity)?;
        let gate = AdmissionGate::new(capacity);
        let replenisher = Replenisher::start(gate.clone(), interval)?;

        info!(
            "Rate limiter started: {} requests per {:?}",
            request_limit, interval
        );

        Ok(Self { gate, replenisher })
    }

    pub async fn acquire(&self) -> Result<Permit, LimiterError> {
        self.gate.acquire().await
    }

    pub async fn acquire_or_cancel<C: Future>(&self, cancel: C) -> Result<Permit, LimiterError> {
        self.gate.acquire_or_cancel(cancel).await
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    pub fn interval(&self) -> Duration {
        self.replenisher.interval()
    }

    pub fn replenishments(&self) -> u64 {
        self.replenisher.ticks()
    }

    /// Stops replenishment. Callers still holding a gate handle keep whatever permits
    /// are left; once those run out, further acquires wait forever.
    pub async fn close(self) {
        let ticks = self.replenisher.ticks();
        self.replenisher.stop().await;
        info!("Rate limiter closed after {} replenishments", ticks);
    }
}
