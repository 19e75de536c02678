//! Periodic timers that drive the engine from outside the UI loop.
//!
//! Each [`Tick`] runs its closure after an initial delay and then on every
//! interval until stopped. The closures only post a message and wake the UI;
//! the engine itself is never touched from a timer task.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        mpsc::{Receiver, channel},
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Upper bound on how long a blocking stop waits for a task to exit.
pub const STOP_WAIT_TIMEOUT_MS: u64 = 50;

/// Poll interval used when waiting for ticker tasks to finish.
pub const STOP_POLL_INTERVAL_MS: u64 = 2;

/// The engine's periodic jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tick {
    /// Window geometry and liveness poll.
    Poll,
    /// Permission recheck.
    Permissions,
    /// Preferences file recheck.
    Preferences,
}

/// A running timer.
struct TickerEntry {
    /// Cancels the task.
    token: CancellationToken,
    /// Task handle.
    handle: JoinHandle<()>,
    /// Signalled when the task exits.
    done_rx: Receiver<()>,
}

/// Schedules a closure after an initial delay and then on each interval tick.
/// Supports cancellation and a short bounded wait for completion.
#[derive(Clone)]
pub struct Ticker {
    /// Runtime the timer tasks run on.
    rt: Handle,
    /// Active timers.
    entries: Arc<Mutex<HashMap<Tick, TickerEntry>>>,
}

impl Ticker {
    /// Timers spawned onto `rt`.
    pub fn new(rt: Handle) -> Self {
        Self {
            rt,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check if a timer is active for `tick`.
    pub fn is_active(&self, tick: Tick) -> bool {
        self.entries.lock().contains_key(&tick)
    }

    /// Start or replace the timer for `tick`.
    pub fn start<F>(&self, tick: Tick, initial: Duration, interval: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop(tick);

        let token = CancellationToken::new();
        let cancel = token.clone();
        let (done_tx, done_rx) = channel::<()>();
        let interval = interval.max(Duration::from_millis(1));

        let fut = async move {
            trace!(
                ?tick,
                init_ms = initial.as_millis(),
                int_ms = interval.as_millis(),
                "ticker_start"
            );

            tokio::select! {
                _ = time::sleep(initial) => {}
                _ = cancel.cancelled() => {
                    trace!(?tick, "ticker_cancelled_initial");
                    let _ignored = done_tx.send(());
                    return;
                }
            }

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!(?tick, "ticker_cancelled");
                        let _ignored = done_tx.send(());
                        return;
                    }
                    _ = ticker.tick() => {
                        on_tick();
                    }
                }
            }
        };

        let handle = self.rt.spawn(fut);
        self.entries.lock().insert(
            tick,
            TickerEntry {
                token,
                handle,
                done_rx,
            },
        );
    }

    /// Stop a timer if present (non-blocking).
    pub fn stop(&self, tick: Tick) {
        if let Some(entry) = self.entries.lock().remove(&tick) {
            entry.token.cancel();
            trace!(?tick, "ticker_stop");
        }
    }

    /// Cancel and wait briefly for every timer to finish (blocking).
    pub fn clear_sync(&self) {
        let entries: Vec<TickerEntry> = {
            let mut map = self.entries.lock();
            map.drain().map(|(_, e)| e).collect()
        };
        for e in &entries {
            e.token.cancel();
        }
        let deadline = Instant::now() + Duration::from_millis(STOP_WAIT_TIMEOUT_MS);
        for e in entries {
            let _ignored = e
                .done_rx
                .recv_timeout(deadline.saturating_duration_since(Instant::now()));
            while !e.handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(STOP_POLL_INTERVAL_MS));
            }
        }
        trace!("ticker_clear_sync");
    }

    /// Cancel and wait for every timer to finish (async).
    pub async fn clear_async(&self) {
        let entries: Vec<TickerEntry> = {
            let mut map = self.entries.lock();
            map.drain().map(|(_, e)| e).collect()
        };
        for e in &entries {
            e.token.cancel();
        }
        for e in entries {
            let _ignored =
                time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), e.handle).await;
        }
        trace!("ticker_clear_async");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn ticks_after_delay_then_on_interval() {
        let ticker = Ticker::new(Handle::current());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        ticker.start(
            Tick::Poll,
            Duration::from_millis(100),
            Duration::from_millis(500),
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(ticker.is_active(Tick::Poll));

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        // First interval tick fires immediately after the initial delay.
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        ticker.stop(Tick::Poll);
        assert!(!ticker.is_active(Tick::Poll));
        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn restart_replaces_and_clear_stops_all() {
        let ticker = Ticker::new(Handle::current());
        let hits = Arc::new(AtomicUsize::new(0));
        let start = |tick| {
            let h = hits.clone();
            ticker.start(tick, Duration::ZERO, Duration::from_secs(2), move || {
                h.fetch_add(1, Ordering::SeqCst);
            });
        };
        start(Tick::Poll);
        start(Tick::Permissions);
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        start(Tick::Poll);
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        ticker.clear_async().await;
        assert!(!ticker.is_active(Tick::Poll));
        assert!(!ticker.is_active(Tick::Permissions));
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
