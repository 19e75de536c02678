//! Bring a chosen application forward.
//!
//! [`focus`] never fails to the caller. Each strategy that errors is logged
//! and the next one is tried; the outcome says which one took effect.
use tracing::{debug, info, warn};

use crate::{
    TrackedApp,
    error::Result,
    ops::{FocusBackend, WindowSlot},
};

/// The window strategy that succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusStep {
    /// The application's focused window.
    FocusedWindow,
    /// Its main window.
    MainWindow,
    /// The first usable window in its window list.
    FirstWindow,
}

/// Result of a focus attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// A window was raised.
    Focused(FocusStep),
    /// No window could be raised; a reopen request was sent.
    Reopened,
    /// The application was not running and is launching.
    Launched,
    /// Nothing worked.
    Failed(String),
}

impl FocusOutcome {
    /// True unless every strategy failed.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Restore the window in `slot` if minimized, then raise it.
/// `Ok(false)` when the slot holds no window.
fn raise_slot(backend: &dyn FocusBackend, pid: i32, slot: WindowSlot) -> Result<bool> {
    let Some(minimized) = backend.window_minimized(pid, slot)? else {
        return Ok(false);
    };
    if minimized {
        backend.set_minimized(pid, slot, false)?;
    }
    backend.raise(pid, slot)?;
    Ok(true)
}

/// Raise the first non-minimized window, or restore the first one when all
/// are minimized.
fn raise_first(backend: &dyn FocusBackend, pid: i32) -> Result<bool> {
    let windows = backend.windows_minimized(pid)?;
    if windows.is_empty() {
        return Ok(false);
    }
    match windows.iter().position(|m| !m) {
        Some(i) => backend.raise(pid, WindowSlot::Index(i))?,
        None => {
            backend.set_minimized(pid, WindowSlot::Index(0), false)?;
            backend.raise(pid, WindowSlot::Index(0))?;
        }
    }
    Ok(true)
}

/// Bring `app` forward, launching it when it is not running.
pub fn focus(backend: &dyn FocusBackend, app: &TrackedApp) -> FocusOutcome {
    if !app.is_running || app.pid == 0 {
        return match backend.launch(&app.bundle_id) {
            Ok(()) => {
                info!(bundle_id = %app.bundle_id, "focus_launching");
                FocusOutcome::Launched
            }
            Err(e) => {
                warn!(bundle_id = %app.bundle_id, error = %e, "focus_launch_failed");
                FocusOutcome::Failed(e.to_string())
            }
        };
    }

    let pid = app.pid;
    for step in [
        FocusStep::FocusedWindow,
        FocusStep::MainWindow,
        FocusStep::FirstWindow,
    ] {
        let attempt = match step {
            FocusStep::FocusedWindow => raise_slot(backend, pid, WindowSlot::Focused),
            FocusStep::MainWindow => raise_slot(backend, pid, WindowSlot::Main),
            FocusStep::FirstWindow => raise_first(backend, pid),
        };
        match attempt {
            Ok(true) => {
                if let Err(e) = backend.activate(pid) {
                    warn!(pid, error = %e, "focus_activate_failed");
                }
                debug!(pid, ?step, "focus_raised");
                return FocusOutcome::Focused(step);
            }
            Ok(false) => debug!(pid, ?step, "focus_step_no_window"),
            Err(e) => debug!(pid, ?step, error = %e, "focus_step_failed"),
        }
    }

    match backend.reopen(&app.bundle_id) {
        Ok(()) => {
            if let Err(e) = backend.activate(pid) {
                debug!(pid, error = %e, "focus_activate_after_reopen_failed");
            }
            debug!(pid, bundle_id = %app.bundle_id, "focus_reopened");
            FocusOutcome::Reopened
        }
        Err(e) => {
            warn!(pid, bundle_id = %app.bundle_id, error = %e, "focus_failed");
            FocusOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{MockFocusBackend, MockWindows};

    fn app(pid: i32) -> TrackedApp {
        TrackedApp::running(pid, "com.t", "T")
    }

    #[test]
    fn minimized_focused_window_is_restored_then_raised() {
        let b = MockFocusBackend::new();
        b.set_windows(
            1,
            MockWindows {
                focused: Some(0),
                main: Some(0),
                minimized: vec![true],
            },
        );
        assert_eq!(
            focus(&b, &app(1)),
            FocusOutcome::Focused(FocusStep::FocusedWindow)
        );
        let calls = b.calls();
        let restore = calls.iter().position(|c| c == "set_minimized:1:Focused:false");
        let raise = calls.iter().position(|c| c == "raise:1:Focused");
        assert!(restore.is_some() && restore < raise);
        assert!(b.calls_contains("activate:1"));
        assert_eq!(b.windows(1).map(|w| w.minimized), Some(vec![false]));
    }

    #[test]
    fn falls_back_to_main_window() {
        let b = MockFocusBackend::new();
        b.set_windows(
            2,
            MockWindows {
                focused: None,
                main: Some(1),
                minimized: vec![false, false],
            },
        );
        assert_eq!(
            focus(&b, &app(2)),
            FocusOutcome::Focused(FocusStep::MainWindow)
        );
        assert!(b.calls_contains("raise:2:Main"));
    }

    #[test]
    fn first_non_minimized_window_then_restore_first() {
        let b = MockFocusBackend::new();
        b.set_windows(
            3,
            MockWindows {
                focused: None,
                main: None,
                minimized: vec![true, false, false],
            },
        );
        assert_eq!(
            focus(&b, &app(3)),
            FocusOutcome::Focused(FocusStep::FirstWindow)
        );
        assert!(b.calls_contains("raise:3:Index(1)"));

        b.set_windows(
            4,
            MockWindows {
                focused: None,
                main: None,
                minimized: vec![true, true],
            },
        );
        assert_eq!(
            focus(&b, &app(4)),
            FocusOutcome::Focused(FocusStep::FirstWindow)
        );
        assert!(b.calls_contains("set_minimized:4:Index(0):false"));
        assert!(b.calls_contains("raise:4:Index(0)"));
    }

    #[test]
    fn windowless_app_is_reopened() {
        let b = MockFocusBackend::new();
        b.set_windows(5, MockWindows::default());
        assert_eq!(focus(&b, &app(5)), FocusOutcome::Reopened);
        assert!(b.calls_contains("reopen:com.t"));
    }

    #[test]
    fn raise_failures_fall_through_to_reopen() {
        let b = MockFocusBackend::new();
        b.set_windows(
            6,
            MockWindows {
                focused: Some(0),
                main: Some(0),
                minimized: vec![false],
            },
        );
        b.set_fail_raise(true);
        assert_eq!(focus(&b, &app(6)), FocusOutcome::Reopened);
        assert!(b.calls_contains("raise:6:Focused"));
        assert!(b.calls_contains("raise:6:Main"));
        assert!(b.calls_contains("raise:6:Index(0)"));
    }

    #[test]
    fn total_failure_is_reported_not_raised() {
        let b = MockFocusBackend::new();
        b.set_fail_reopen(true);
        assert!(matches!(focus(&b, &app(7)), FocusOutcome::Failed(_)));
    }

    #[test]
    fn not_running_launches() {
        let b = MockFocusBackend::new();
        let a = TrackedApp::launchable("com.l", "L");
        assert_eq!(focus(&b, &a), FocusOutcome::Launched);
        assert_eq!(b.calls(), vec!["launch:com.l".to_string()]);
        b.set_fail_launch(true);
        assert!(!focus(&b, &a).is_success());
    }
}
