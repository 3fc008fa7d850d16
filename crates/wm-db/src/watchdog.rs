//! Interrupts a running statement once its run is cancelled or out of time.

use crate::context::RunContext;
use crate::traits::Interrupt;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How often the cancel flag is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Background thread watching a [`RunContext`]; stopped and joined on drop.
pub(crate) struct Watchdog {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Start watching `ctx`, firing `handle` at most once.
    pub(crate) fn arm(ctx: &RunContext, handle: Arc<dyn Interrupt>) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let ctx = ctx.clone();
        let spawned = std::thread::Builder::new()
            .name("wm-watchdog".to_string())
            .spawn(move || loop {
                let wait = ctx.deadline().map_or(POLL_INTERVAL, |deadline| {
                    deadline
                        .saturating_duration_since(Instant::now())
                        .min(POLL_INTERVAL)
                });
                match stopped.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(reason) = ctx.check() {
                            log::warn!("Interrupting running statement: {reason}");
                            handle.interrupt();
                            return;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            });

        let thread = match spawned {
            Ok(thread) => Some(thread),
            Err(e) => {
                log::warn!("Could not start watchdog, deadlines apply between statements only: {e}");
                None
            }
        };
        Self {
            stop: Some(stop),
            thread,
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Closing the channel wakes the thread.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Watchdog thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Interrupt for Counter {
        fn interrupt(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fires_once_after_deadline() {
        let counter = Arc::new(Counter::default());
        let ctx = RunContext::with_timeout(Duration::from_millis(30));
        let watchdog = Watchdog::arm(&ctx, counter.clone());
        std::thread::sleep(Duration::from_millis(200));
        drop(watchdog);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fires_on_cancel() {
        let counter = Arc::new(Counter::default());
        let ctx = RunContext::new();
        let watchdog = Watchdog::arm(&ctx, counter.clone());
        ctx.cancel_handle().cancel();
        std::thread::sleep(Duration::from_millis(200));
        drop(watchdog);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarmed_before_deadline_never_fires() {
        let counter = Arc::new(Counter::default());
        let ctx = RunContext::with_timeout(Duration::from_secs(3600));
        drop(Watchdog::arm(&ctx, counter.clone()));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
