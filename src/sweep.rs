//! Periodic eviction.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// An eviction policy run on a timer.
pub trait Sweep: Send + Sync + 'static {
    /// Remove unreachable entries. Returns how many were removed.
    fn sweep(&self) -> usize;
}

/// Background task calling [`Sweep::sweep`] once per period.
///
/// The task holds only a weak reference to its policy and exits once the
/// policy is gone. Dropping the timer stops it; a sweep already running
/// finishes first, since sweeps never yield.
#[derive(Debug)]
pub struct SweepTimer {
    name: String,
    task: JoinHandle<()>,
}

impl SweepTimer {
    /// Start sweeping `target` every `period`.
    ///
    /// Returns `None` without spawning when `period` is `None` or when called
    /// outside a tokio runtime.
    pub fn start(name: impl Into<String>, target: Weak<dyn Sweep>, period: Option<Duration>) -> Option<Self> {
        let name = name.into();
        let Some(period) = period else {
            debug!("Sweeping disabled for {}", name);
            return None;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, {} will not be swept", name);
            return None;
        };

        let task_name = name.clone();
        let task = runtime.spawn(async move {
            // First sweep one full period after start.
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(policy) = target.upgrade() else {
                    debug!("{} dropped, sweep timer exiting", task_name);
                    break;
                };
                let removed = policy.sweep();
                debug!("Swept {} entries from {}", removed, task_name);
            }
        });

        info!("Started sweep timer for {} every {}s", name, period.as_secs());
        Some(Self { name, task })
    }

    /// Stop the timer. Same as dropping it.
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepTimer {
    fn drop(&mut self) {
        self.task.abort();
        debug!("Stopped sweep timer for {}", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Sweep for Counter {
        fn sweep(&self) -> usize {
            self.0.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    fn weak(counter: &Arc<Counter>) -> Weak<dyn Sweep> {
        let target: Arc<dyn Sweep> = counter.clone();
        Arc::downgrade(&target)
    }

    #[test]
    fn test_no_timer_without_period() {
        let counter = Arc::new(Counter::default());
        assert!(SweepTimer::start("test", weak(&counter), None).is_none());
    }

    #[test]
    fn test_no_timer_outside_runtime() {
        let counter = Arc::new(Counter::default());
        assert!(SweepTimer::start("test", weak(&counter), Some(Duration::from_secs(1))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let counter = Arc::new(Counter::default());
        let timer = SweepTimer::start("test", weak(&counter), Some(Duration::from_secs(10))).unwrap();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(21)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        timer.stop();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_policy_dropped() {
        let counter = Arc::new(Counter::default());
        let timer = SweepTimer::start("test", weak(&counter), Some(Duration::from_secs(1))).unwrap();

        drop(counter);
        time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(timer.is_finished());
    }
}
