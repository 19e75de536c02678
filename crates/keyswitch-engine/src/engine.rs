//! The switcher core: one [`Engine`] value, owned by the main context, that
//! ties candidate enumeration, assignment, the chord state machine, the
//! overlay and focusing together.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use config::{Preferences, SwitchRecord};
use tracing::{debug, info, warn};

use crate::{
    TrackedApp,
    assign::{assign, reorder},
    chord::{ChordInput, ChordMachine, ChordState, Transition},
    focus::{FocusOutcome, focus},
    ops::{AppOps, FocusBackend, UsageSink},
    overlay::{LATENCY_WARN_MS, OverlayCoordinator, OverlaySurface, ScreenSize},
    source::SourceProvider,
    watch::{PermissionChange, PermissionWatcher},
};

/// How long a launched application has to come up before we stop waiting to
/// activate it.
pub const LAUNCH_ACTIVATE_TIMEOUT: Duration = Duration::from_secs(10);

/// User-visible switcher status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// Switching works.
    #[default]
    Ready,
    /// Permissions are missing; the tap is off until they are granted.
    PermissionMissing {
        /// Names of the missing permissions.
        missing: Vec<&'static str>,
    },
    /// The keyboard tap could not be installed.
    TapFailed(String),
}

/// A launched application waiting to be activated.
#[derive(Debug, Clone)]
struct PendingLaunch {
    /// Application being launched.
    bundle_id: String,
    /// Give up after this.
    deadline: Instant,
}

/// Switcher core. Lives on the UI thread and is driven by tap inputs and
/// periodic ticks.
pub struct Engine<S> {
    /// Current preferences snapshot.
    prefs: Preferences,
    /// Process and window queries.
    apps: Arc<dyn AppOps>,
    /// Focus primitives.
    focus: Arc<dyn FocusBackend>,
    /// Switch statistics.
    sink: Box<dyn UsageSink>,
    /// Overlay coordinator.
    overlay: OverlayCoordinator<S>,
    /// Candidate enumeration.
    source: SourceProvider,
    /// Chord state.
    chord: ChordMachine,
    /// Assigned list; replaced wholesale on refresh.
    tracked: Vec<TrackedApp>,
    /// When candidates were last enumerated.
    last_refresh: Option<Instant>,
    /// Launch awaiting activation.
    pending_launch: Option<PendingLaunch>,
    /// Status surfaced to the UI.
    status: Status,
    /// Permission edge detection.
    permissions: PermissionWatcher,
}

impl<S: OverlaySurface> Engine<S> {
    /// Build an idle engine.
    pub fn new(
        prefs: Preferences,
        apps: Arc<dyn AppOps>,
        focus: Arc<dyn FocusBackend>,
        sink: Box<dyn UsageSink>,
        surface: S,
    ) -> Self {
        let overlay = OverlayCoordinator::new(surface, prefs.layout, prefs.overlay);
        Self {
            prefs,
            apps,
            focus,
            sink,
            overlay,
            source: SourceProvider::new(),
            chord: ChordMachine::new(),
            tracked: Vec::new(),
            last_refresh: None,
            pending_launch: None,
            status: Status::Ready,
            permissions: PermissionWatcher::new(),
        }
    }

    /// Current preferences.
    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// Current status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Current assigned list.
    pub fn tracked(&self) -> &[TrackedApp] {
        &self.tracked
    }

    /// Chord state.
    pub fn chord_state(&self) -> ChordState {
        self.chord.state()
    }

    /// Overlay coordinator.
    pub fn overlay(&self) -> &OverlayCoordinator<S> {
        &self.overlay
    }

    /// Overlay coordinator, mutably (for drawing).
    pub fn overlay_mut(&mut self) -> &mut OverlayCoordinator<S> {
        &mut self.overlay
    }

    /// Primary display size changed.
    pub fn set_screen(&mut self, screen: ScreenSize) {
        self.overlay.set_screen(screen);
    }

    /// Handle one tap input.
    pub fn handle_input(&mut self, input: ChordInput, now: Instant) -> Transition {
        let tracked = &self.tracked;
        let transition = self.chord.step(input, now, |idx| {
            tracked.iter().any(|a| a.assigned_number == Some(idx))
        });
        match transition {
            Transition::Engage => {
                self.refresh(now, false);
                self.overlay.show(&self.tracked);
                let ms = now.elapsed().as_millis() as u64;
                if ms > LATENCY_WARN_MS {
                    warn!(ms, "switcher_show_slow");
                }
                debug!(items = self.tracked.len(), ms, "chord_engaged");
            }
            Transition::Switch { index, pressed_at } => self.switch(index, pressed_at, now),
            Transition::Cancel => {
                self.overlay.hide();
                let ms = now.elapsed().as_millis() as u64;
                if ms > LATENCY_WARN_MS {
                    warn!(ms, "switcher_hide_slow");
                }
                debug!(?input, "chord_cancelled");
            }
            Transition::Ignore => {}
        }
        transition
    }

    /// Focus the application in slot `index`, record it, highlight, then hide.
    fn switch(&mut self, index: usize, pressed_at: Instant, now: Instant) {
        let Some(app) = self
            .tracked
            .iter()
            .find(|a| a.assigned_number == Some(index))
            .cloned()
        else {
            self.overlay.hide();
            return;
        };
        let response_ms = now.saturating_duration_since(pressed_at).as_millis() as u64;
        let outcome = focus(self.focus.as_ref(), &app);
        let key = app.assigned_key.unwrap_or_default();
        match &outcome {
            FocusOutcome::Failed(reason) => {
                warn!(bundle_id = %app.bundle_id, %reason, "switch_failed");
            }
            ok => {
                if *ok == FocusOutcome::Launched {
                    self.pending_launch = Some(PendingLaunch {
                        bundle_id: app.bundle_id.clone(),
                        deadline: now + LAUNCH_ACTIVATE_TIMEOUT,
                    });
                }
                self.sink.record_switch(SwitchRecord::now(
                    app.bundle_id.clone(),
                    app.name.clone(),
                    key,
                    Some(response_ms),
                ));
                info!(bundle_id = %app.bundle_id, %key, response_ms, ?outcome, "switch_completed");
            }
        }
        let hold = Duration::from_millis(self.prefs.highlight_ms);
        self.overlay.highlight(key, hold, now);
        self.overlay.hide_at(now + hold);
    }

    /// Enumerate and assign unless the last enumeration is still fresh.
    pub fn refresh(&mut self, now: Instant, force: bool) {
        let throttle = Duration::from_millis(self.prefs.refresh_throttle_ms);
        if !force
            && self
                .last_refresh
                .is_some_and(|t| now.saturating_duration_since(t) < throttle)
        {
            debug!("refresh_throttled");
            return;
        }
        let mut candidates = self.source.candidates(self.apps.as_ref(), &self.prefs);
        let frames = self.apps.window_frames();
        for c in &mut candidates {
            c.window_frame = frames.get(&c.pid).copied();
        }
        self.tracked = assign(
            &candidates,
            &self.prefs.pinned,
            self.prefs.max_apps,
            self.prefs.pin_placement.pinned_first(),
        );
        self.last_refresh = Some(now);
        debug!(
            candidates = candidates.len(),
            tracked = self.tracked.len(),
            "refreshed"
        );
    }

    /// Background poll: patch geometry, drop exited processes, activate a
    /// pending launch once its process appears.
    pub fn poll(&mut self, now: Instant) {
        let frames = self.apps.window_frames();
        let before = self.tracked.len();
        let apps = &self.apps;
        self.tracked
            .retain(|a| !(a.is_running && apps.is_terminated(a.pid)));
        for a in &mut self.tracked {
            if a.is_running {
                a.window_frame = frames.get(&a.pid).copied();
            }
        }
        if self.tracked.len() != before {
            debug!(removed = before - self.tracked.len(), "poll_removed_exited");
            self.overlay.update_positions(&self.tracked);
        }

        if let Some(p) = self.pending_launch.take() {
            match self.apps.pid_for_bundle(&p.bundle_id) {
                Some(pid) => match self.focus.activate(pid) {
                    Ok(()) => info!(bundle_id = %p.bundle_id, pid, "launched_app_activated"),
                    Err(e) => warn!(bundle_id = %p.bundle_id, error = %e, "launched_app_activate_failed"),
                },
                None if now >= p.deadline => {
                    warn!(bundle_id = %p.bundle_id, "launched_app_never_appeared");
                }
                None => self.pending_launch = Some(p),
            }
        }
    }

    /// Expire overlay highlight and pending hide.
    pub fn tick(&mut self, now: Instant) {
        self.overlay.tick(now);
    }

    /// Next time [`Self::tick`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.overlay.next_deadline()
    }

    /// Forget cached application metadata and the surface's icons. The next
    /// refresh resolves names and bundle paths from the OS again.
    pub fn clear_caches(&mut self) {
        debug!(entries = self.source.cached(), "caches_cleared");
        self.source.clear_cache();
        self.overlay.surface_mut().clear_cache();
    }

    /// Adopt new preferences and re-run enumeration and assignment.
    pub fn preferences_changed(&mut self, prefs: Preferences, now: Instant) {
        let clear_cache = prefs.source != self.prefs.source;
        self.prefs = prefs;
        if clear_cache {
            self.clear_caches();
        }
        self.overlay.set_style(self.prefs.layout, self.prefs.overlay);
        self.refresh(now, true);
        self.overlay.update_positions(&self.tracked);
        info!(max_apps = self.prefs.max_apps, "preferences_applied");
    }

    /// Apply an explicit user ordering.
    pub fn reorder(&mut self, new_order: &[String]) {
        self.tracked = reorder(&self.tracked, new_order, self.prefs.max_apps);
        self.overlay.update_positions(&self.tracked);
    }

    /// Feed a permission check. Returns the change when grant state flipped.
    pub fn permissions_checked(&mut self, missing: Vec<&'static str>) -> Option<PermissionChange> {
        let change = self.permissions.observe(missing)?;
        match &change {
            PermissionChange::Granted => info!("permissions_granted"),
            PermissionChange::Revoked { missing } => {
                warn!(?missing, "permissions_missing");
                self.disable(Status::PermissionMissing {
                    missing: missing.clone(),
                });
            }
        }
        Some(change)
    }

    /// The tap is installed and delivering events.
    pub fn tap_started(&mut self) {
        self.status = Status::Ready;
    }

    /// The tap could not be installed.
    pub fn tap_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "event_tap_failed");
        self.disable(Status::TapFailed(reason));
    }

    /// The OS disabled and re-enabled the tap; a release may have been lost,
    /// so a held chord is cancelled. Returns true when one was.
    pub fn tap_reenabled(&mut self) -> bool {
        if !self.chord.is_held() {
            return false;
        }
        self.chord.reset();
        self.overlay.hide();
        debug!("chord_cancelled_after_tap_reenable");
        true
    }

    /// Return to idle with the overlay hidden and set `status`.
    fn disable(&mut self, status: Status) {
        self.chord.reset();
        self.overlay.hide();
        self.status = status;
    }
}
