use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::error::LimiterError;
use crate::limiter::gate::AdmissionGate;

// Timer resolution; shorter windows are widened to this.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Something the replenisher tops up once per tick.
pub trait Replenish: Send + Sync + 'static {
    fn replenish(&self);
}

impl Replenish for AdmissionGate {
    fn replenish(&self) {
        self.reset_to_capacity();
    }
}

/// Owned periodic task that replenishes a target at a fixed rate.
///
/// The first tick runs synchronously inside [`start`](Self::start); tick `k` then fires
/// at `start + k * interval`, independent of how long earlier ticks took. Ticks missed
/// while the runtime was stalled are skipped, not replayed, so a stall never produces
/// more than one reset.
pub struct Replenisher {
    interval: Duration,
    ticks: Arc<AtomicU64>,
    shutdown: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl Replenisher {
    pub fn start<R: Replenish>(target: R, interval: Duration) -> Result<Self, LimiterError> {
        if interval.is_zero() {
            return Err(LimiterError::SchedulerInit(
                "Replenishment interval must be non-zero".into(),
            ));
        }
        let runtime = Handle::try_current()
            .map_err(|e| LimiterError::SchedulerInit(e.to_string()))?;
        if interval < MIN_TICK {
            warn!("Replenishment interval {:?} widened to {:?}", interval, MIN_TICK);
        }
        let interval = interval.max(MIN_TICK);

        let started = Instant::now();
        let ticks = Arc::new(AtomicU64::new(0));

        target.replenish();
        ticks.fetch_add(1, Ordering::Relaxed);

        let (shutdown, mut shutdown_rx) = broadcast::channel(1);
        let task_ticks = ticks.clone();
        let task = runtime.spawn(async move {
            let mut ticker = interval_at(started + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        target.replenish();
                        let tick = task_ticks.fetch_add(1, Ordering::Relaxed) + 1;
                        trace!("Replenishment tick {}", tick);
                    }
                }
            }
        });

        debug!("Replenisher started with interval {:?}", interval);

        Ok(Self {
            interval,
            ticks,
            shutdown,
            task: Some(task),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks fired so far, including the one at start.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Cancels all future ticks and waits for the task to finish. A tick already
    /// running completes first.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown.send(());
            if let Err(e) = task.await {
                warn!("Replenisher task ended abnormally: {}", e);
            }
        }
        debug!("Replenisher stopped after {} ticks", self.ticks());
    }
}

impl Drop for Replenisher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
