//! The eframe application: owns the engine, the keyboard tap and the timers,
//! and pumps tap events and timer ticks into the engine once per frame.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use config::{PreferencesStore, StatsStore, stats_path_for};
use crossbeam_channel::{Receiver, Sender, unbounded};
use eframe::{App, Frame};
use egui::Context;
use keyswitch_engine::{ChordInput, Engine, PermissionChange, Tick, Ticker, Transition};
use mac_keytap::{Manager, TapEvent, Waker};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::{
    backend::{MacAppOps, MacFocusBackend},
    display::DisplayMetrics,
    overlay::OverlayWindow,
    permissions::PermissionsHelp,
};

/// How often permissions are rechecked.
const PERMISSIONS_INTERVAL: Duration = Duration::from_secs(2);
/// How often the preferences file is rechecked.
const PREFERENCES_INTERVAL: Duration = Duration::from_secs(2);

/// Tap events as engine inputs; `None` for tap housekeeping.
fn chord_input(ev: TapEvent) -> Option<ChordInput> {
    match ev {
        TapEvent::TriggerDown => Some(ChordInput::TriggerDown),
        TapEvent::TriggerUp => Some(ChordInput::TriggerUp),
        TapEvent::Select { index } => Some(ChordInput::Select(index)),
        TapEvent::Escape => Some(ChordInput::Escape),
        TapEvent::Reenabled => None,
    }
}

/// The running application: engine, tap, timers and windows.
pub struct KeyswitchApp {
    /// Switcher core.
    engine: Engine<OverlayWindow>,
    /// Preferences file.
    store: PreferencesStore,
    /// Keyboard tap; present only while permissions allow it.
    tap: Option<Manager>,
    /// Wakes the UI loop from the tap thread.
    waker: Waker,
    /// Timer ticks posted by [`Ticker`] tasks.
    ticks: Receiver<Tick>,
    /// Sending side, cloned into each timer.
    tick_tx: Sender<Tick>,
    /// Timers.
    ticker: Ticker,
    /// Runtime the timers run on.
    _rt: Runtime,
    /// Permission help window.
    permissions: PermissionsHelp,
    /// Poll interval the poll timer was started with.
    poll_interval_ms: u64,
}

impl KeyswitchApp {
    /// Build the app and start its timers. The tap starts once the first
    /// permission check passes.
    pub fn new(ctx: &Context, store: PreferencesStore, rt: Runtime) -> Self {
        let prefs = store.get().clone();
        let stats_path = stats_path_for(store.path());
        let stats = StatsStore::open(stats_path, StatsStore::DEFAULT_CAPACITY).unwrap_or_else(|e| {
            warn!(error = %e.pretty(), "stats_open_failed_using_memory");
            StatsStore::in_memory(StatsStore::DEFAULT_CAPACITY)
        });
        let display = DisplayMetrics::current();
        let mut engine = Engine::new(
            prefs,
            Arc::new(MacAppOps),
            Arc::new(MacFocusBackend),
            Box::new(stats),
            OverlayWindow::new(display),
        );
        engine.set_screen(display.screen_size());

        let repaint_ctx = ctx.clone();
        let waker: Waker = Arc::new(move || repaint_ctx.request_repaint());
        let (tick_tx, ticks) = unbounded();
        let poll_interval_ms = engine.prefs().poll_interval_ms;
        let mut app = Self {
            engine,
            store,
            tap: None,
            waker,
            ticks,
            tick_tx,
            ticker: Ticker::new(rt.handle().clone()),
            _rt: rt,
            permissions: PermissionsHelp::new(),
            poll_interval_ms,
        };
        app.start_timer(ctx, Tick::Permissions, Duration::ZERO, PERMISSIONS_INTERVAL);
        app.start_timer(
            ctx,
            Tick::Poll,
            Duration::ZERO,
            Duration::from_millis(poll_interval_ms),
        );
        app.start_timer(
            ctx,
            Tick::Preferences,
            PREFERENCES_INTERVAL,
            PREFERENCES_INTERVAL,
        );
        app
    }

    /// Post `tick` on every interval and wake the UI.
    fn start_timer(&self, ctx: &Context, tick: Tick, initial: Duration, interval: Duration) {
        let tx = self.tick_tx.clone();
        let ctx = ctx.clone();
        self.ticker.start(tick, initial, interval, move || {
            if tx.send(tick).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    /// Handle one timer tick.
    fn on_tick(&mut self, ctx: &Context, tick: Tick, now: Instant) {
        match tick {
            Tick::Poll => {
                let display = DisplayMetrics::current();
                self.engine.set_screen(display.screen_size());
                self.engine
                    .overlay_mut()
                    .surface_mut()
                    .set_display_metrics(display);
                self.engine.poll(now);
            }
            Tick::Permissions => self.check_permissions(),
            Tick::Preferences => self.reload_preferences(ctx, now),
        }
    }

    /// Recheck grants; start or stop the tap on a change.
    fn check_permissions(&mut self) {
        let missing = ::permissions::check_permissions().missing();
        match self.engine.permissions_checked(missing) {
            Some(PermissionChange::Granted) => {
                self.permissions.hide();
                self.start_tap();
            }
            Some(PermissionChange::Revoked { .. }) => {
                self.tap = None;
                self.permissions.show();
            }
            None => {}
        }
    }

    /// Install the tap. A failure is reported through the engine status and
    /// not retried until permissions change again.
    fn start_tap(&mut self) {
        self.tap = None;
        match Manager::start(self.engine.prefs().trigger, self.waker.clone()) {
            Ok(tap) => {
                info!(trigger = %self.engine.prefs().trigger, "event_tap_started");
                self.tap = Some(tap);
                self.engine.tap_started();
            }
            Err(e) => {
                self.engine.tap_failed(e.to_string());
                self.permissions.show();
            }
        }
    }

    /// Pick up edits to the preferences file.
    fn reload_preferences(&mut self, ctx: &Context, now: Instant) {
        match self.store.reload() {
            Ok(true) => {
                let prefs = self.store.get().clone();
                let old_trigger = self.engine.prefs().trigger;
                self.engine.preferences_changed(prefs, now);
                let prefs = self.engine.prefs();
                if prefs.trigger != old_trigger
                    && let Some(tap) = &self.tap
                {
                    info!(trigger = %prefs.trigger, "trigger_changed");
                    tap.set_trigger(prefs.trigger);
                }
                if prefs.poll_interval_ms != self.poll_interval_ms {
                    let ms = prefs.poll_interval_ms;
                    self.poll_interval_ms = ms;
                    self.start_timer(ctx, Tick::Poll, Duration::ZERO, Duration::from_millis(ms));
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e.pretty(), "preferences_reload_failed"),
        }
    }

    /// Feed queued tap events to the engine.
    fn drain_tap(&mut self, now: Instant) {
        let Some(tap) = &self.tap else {
            return;
        };
        let events: Vec<TapEvent> = tap.events().try_iter().collect();
        for ev in events {
            let Some(input) = chord_input(ev) else {
                if self.engine.tap_reenabled() {
                    tap.disengage();
                }
                continue;
            };
            let transition = self.engine.handle_input(input, now);
            debug!(?ev, ?transition, "tap_event_handled");
            if matches!(transition, Transition::Switch { .. }) {
                tap.disengage();
            }
        }
    }
}

impl App for KeyswitchApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Color32::TRANSPARENT.to_normalized_gamma_f32()
    }

    fn ui(&mut self, _ui: &mut egui::Ui, _frame: &mut Frame) {}

    fn update(&mut self, ctx: &Context, _frame: &mut Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Visible(false));
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        }

        let now = Instant::now();
        let ticks: Vec<Tick> = self.ticks.try_iter().collect();
        for tick in ticks {
            self.on_tick(ctx, tick, now);
        }
        self.drain_tap(now);
        self.engine.tick(now);

        self.engine.overlay_mut().surface_mut().draw(ctx);
        self.permissions.render(ctx);

        if let Some(at) = self.engine.next_deadline() {
            ctx.request_repaint_after(at.saturating_duration_since(Instant::now()));
        }
    }
}

impl Drop for KeyswitchApp {
    fn drop(&mut self) {
        self.ticker.clear_sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_events_map_to_chord_inputs() {
        assert_eq!(
            chord_input(TapEvent::Select { index: 4 }),
            Some(ChordInput::Select(4))
        );
        assert_eq!(
            chord_input(TapEvent::TriggerUp),
            Some(ChordInput::TriggerUp)
        );
        assert_eq!(chord_input(TapEvent::Reenabled), None);
    }
}
