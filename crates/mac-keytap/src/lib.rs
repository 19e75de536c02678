//! mac-keytap: a CoreGraphics keyboard tap for the switcher chord.
//!
//! The tap runs on its own thread with its own CFRunLoop. For every key
//! event it asks a [`ChordTracker`] whether to deliver or drop the event,
//! and forwards the resulting [`TapEvent`]s over a channel. The receiver
//! lives on the main context, which owns all switcher state; the tap
//! thread never touches it.
//!
//! Only the 47 shortcut keys (plus Escape and a keyed trigger) are ever
//! dropped, and only while the chord is engaged.
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use keyswitch_keys::Trigger;
use parking_lot::Mutex;
use tracing::{debug, warn};

mod error;
mod policy;
mod sys;

pub use error::{Error, Result};
pub use policy::{ChordTracker, Decision, RawKey};

/// How long [`Manager::start`] waits for the tap thread to report readiness.
const START_TIMEOUT: Duration = Duration::from_secs(2);

/// Events forwarded from the tap to the main context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapEvent {
    /// The trigger chord was pressed.
    TriggerDown,
    /// The trigger chord was released.
    TriggerUp,
    /// A shortcut key was pressed while the chord was engaged.
    Select {
        /// Slot index into the shortcut sequence.
        index: usize,
    },
    /// Escape was pressed.
    Escape,
    /// The OS disabled the tap and it was re-enabled.
    Reenabled,
}

/// Callback used to wake the main context after an event is queued.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// State shared between the tap callback and the [`Manager`].
#[derive(Clone)]
pub(crate) struct CallbackCtx {
    /// Chord tracker; locked for the duration of one classification.
    pub(crate) tracker: Arc<Mutex<ChordTracker>>,
    /// Outgoing events.
    pub(crate) tx: Sender<TapEvent>,
    /// Wakes the receiving loop.
    pub(crate) waker: Waker,
}

impl CallbackCtx {
    /// Queue an event and wake the receiver.
    pub(crate) fn emit(&self, ev: TapEvent) {
        if self.tx.send(ev).is_err() {
            warn!("tap_event_receiver_gone");
            return;
        }
        (self.waker)();
    }
}

/// Owns the tap thread.
///
/// Dropping the manager stops the run loop and joins the thread.
pub struct Manager {
    /// Shared callback context.
    ctx: CallbackCtx,
    /// Event receiver for the main context.
    rx: Receiver<TapEvent>,
    /// Run-loop control for shutdown.
    ctrl: Arc<sys::SysControl>,
    /// Tap thread handle.
    thread: Option<JoinHandle<()>>,
}

impl Manager {
    /// Install the tap for `trigger` on a dedicated thread.
    ///
    /// Blocks until the tap reports readiness. Fails if Input Monitoring is
    /// not granted or CoreGraphics refuses the tap; callers surface the
    /// failure and must not retry in a loop.
    pub fn start(trigger: Trigger, waker: Waker) -> Result<Self> {
        let (tx, rx) = unbounded();
        let ctx = CallbackCtx {
            tracker: Arc::new(Mutex::new(ChordTracker::new(trigger))),
            tx,
            waker,
        };
        let ctrl = Arc::new(sys::SysControl::new());
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);

        let cb_ctx = ctx.clone();
        let thread_ctrl = ctrl.clone();
        let thread = thread::Builder::new()
            .name("keyswitch-tap".into())
            .spawn(move || {
                if let Err(e) = sys::run_event_loop(cb_ctx, &ready_tx, &thread_ctrl) {
                    warn!(error = %e, "event_tap_thread_error");
                }
            })
            .map_err(|_| Error::EventTapStart)?;

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(())) => {
                debug!(%trigger, "event_tap_ready");
                Ok(Self {
                    ctx,
                    rx,
                    ctrl,
                    thread: Some(thread),
                })
            }
            Ok(Err(e)) => {
                let _ignored = thread.join();
                Err(e)
            }
            Err(_) => {
                ctrl.stop();
                Err(Error::ThreadExited)
            }
        }
    }

    /// Receiver for tap events; drain it on the main context.
    pub fn events(&self) -> &Receiver<TapEvent> {
        &self.rx
    }

    /// Replace the trigger chord. A chord held at the time is released and
    /// its `TriggerUp` queued like any other tap event.
    pub fn set_trigger(&self, trigger: Trigger) {
        let released = self.ctx.tracker.lock().set_trigger(trigger);
        if let Some(ev) = released {
            self.ctx.emit(ev);
        }
    }

    /// Enable or disable chord engagement without tearing down the tap.
    pub fn set_enabled(&self, enabled: bool) {
        let released = self.ctx.tracker.lock().set_enabled(enabled);
        if let Some(ev) = released {
            self.ctx.emit(ev);
        }
    }

    /// Tell the tap the main context has gone idle (switch completed).
    pub fn disengage(&self) {
        self.ctx.tracker.lock().disengage();
    }

    /// Stop the tap and join its thread.
    pub fn stop(&mut self) {
        self.ctrl.stop();
        if let Some(t) = self.thread.take()
            && t.join().is_err()
        {
            warn!("event_tap_thread_panicked");
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.stop();
    }
}
