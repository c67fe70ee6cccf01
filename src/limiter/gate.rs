use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::LimiterError;

struct GateState {
    available: usize,
    // Invariant: `available > 0` implies the queue is empty.
    // A cancelled waiter prunes closed senders when it drops.
    waiters: VecDeque<oneshot::Sender<()>>,
}

struct GateInner {
    capacity: usize,
    state: Mutex<GateState>,
}

/// A fair counting permit pool of fixed capacity.
///
/// Callers take a [`Permit`] before doing a unit of work; dropping the permit gives it
/// back. When the pool is empty, callers queue up and are served strictly in arrival
/// order, both when a permit is released and when the pool is reset.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Creates a gate with the whole capacity available.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            inner: Arc::new(GateInner {
                capacity,
                state: Mutex::new(GateState {
                    available: capacity,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Snapshot of the permits currently available.
    pub fn available(&self) -> usize {
        self.inner.state.lock().available
    }

    /// Number of callers currently suspended in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.inner
            .state
            .lock()
            .waiters
            .iter()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }

    /// Waits for a permit and takes it.
    ///
    /// Dropping the returned future before it completes is a cancellation: no permit is
    /// consumed, and a permit granted concurrently with the drop is handed on to the next
    /// caller.
    pub async fn acquire(&self) -> Result<Permit, LimiterError> {
        let rx = {
            let mut state = self.inner.state.lock();
            if state.available > 0 {
                state.available -= 1;
                return Ok(Permit::new(self.clone()));
            }
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            rx
        };

        trace!("Gate exhausted, queued for a permit");
        Waiter {
            rx,
            gate: self,
            done: false,
        }
        .await?;

        Ok(Permit::new(self.clone()))
    }

    /// Like [`acquire`](Self::acquire), but gives up with [`LimiterError::Interrupted`]
    /// as soon as `cancel` completes. A permit that is already free wins over a
    /// cancellation that is already complete.
    pub async fn acquire_or_cancel<C>(&self, cancel: C) -> Result<Permit, LimiterError>
    where
        C: Future,
    {
        tokio::select! {
            biased;
            permit = self.acquire() => permit,
            _ = cancel => {
                trace!("Admission cancelled while waiting");
                Err(LimiterError::Interrupted)
            }
        }
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.inner.state.lock();
        if state.available == 0 {
            return None;
        }
        state.available -= 1;
        Some(Permit::new(self.clone()))
    }

    /// Gives one permit back, to the longest waiting caller if there is one.
    ///
    /// Assumes balanced acquire/release. Surplus releases are absorbed: the pool never
    /// grows past capacity.
    pub fn release(&self) {
        let mut state = self.inner.state.lock();
        if Self::grant_next(&mut state) {
            return;
        }
        if state.available < self.inner.capacity {
            state.available += 1;
        }
    }

    /// Sets the pool to full capacity regardless of its current value, then serves
    /// queued callers in arrival order out of the refilled pool.
    ///
    /// This is a hard reset, not an additive refill.
    pub fn reset_to_capacity(&self) {
        let mut state = self.inner.state.lock();
        state.available = self.inner.capacity;
        while state.available > 0 && Self::grant_next(&mut state) {
            state.available -= 1;
        }
    }

    fn grant_next(state: &mut GateState) -> bool {
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                return true;
            }
        }
        false
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AdmissionGate")
            .field("capacity", &self.inner.capacity)
            .field("available", &state.available)
            .field("queued", &state.waiters.len())
            .finish()
    }
}

struct Waiter<'a> {
    rx: oneshot::Receiver<()>,
    gate: &'a AdmissionGate,
    done: bool,
}

impl Future for Waiter<'_> {
    type Output = Result<(), LimiterError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(())) => {
                this.done = true;
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(_)) => {
                this.done = true;
                Poll::Ready(Err(LimiterError::Interrupted))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        // Granted between the last poll and the drop.
        if self.rx.try_recv().is_ok() {
            self.gate.release();
            return;
        }
        self.gate
            .inner
            .state
            .lock()
            .waiters
            .retain(|waiter| !waiter.is_closed());
    }
}

/// One admission slot. Released back to its gate on drop, on every exit path.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    gate: AdmissionGate,
}

impl Permit {
    fn new(gate: AdmissionGate) -> Self {
        Self { gate }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("capacity", &self.gate.capacity())
            .finish()
    }
}
