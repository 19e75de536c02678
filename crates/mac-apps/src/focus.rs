//! Window-level focus primitives over the Accessibility API.
//!
//! Each call resolves its window afresh from the application element; no AX
//! handles outlive a call. Ordering of attempts is the caller's business.
use std::process::Command;

use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication};
use objc2_foundation::MainThreadMarker;
use tracing::{debug, warn};

use crate::{
    AXElem,
    ax::{app_element, ax_bool, ax_check, ax_element, ax_perform_action, ax_set_bool, ax_windows, cfstr},
    error::{Error, Result},
};

/// Which of an application's windows an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSlot {
    /// `AXFocusedWindow`.
    Focused,
    /// `AXMainWindow`.
    Main,
    /// Position in the application's `AXWindows` list.
    Index(usize),
}

/// Resolve `slot` against the application element.
fn resolve(app: &AXElem, slot: WindowSlot) -> Result<Option<AXElem>> {
    match slot {
        WindowSlot::Focused => ax_element(app.as_ptr(), cfstr("AXFocusedWindow")),
        WindowSlot::Main => ax_element(app.as_ptr(), cfstr("AXMainWindow")),
        WindowSlot::Index(i) => Ok(ax_windows(app.as_ptr())?.into_iter().nth(i)),
    }
}

/// Minimized state of the window in `slot`; `None` when there is no such window.
pub fn window_minimized(pid: i32, slot: WindowSlot) -> Result<Option<bool>> {
    ax_check()?;
    let app = app_element(pid)?;
    match resolve(&app, slot)? {
        Some(w) => Ok(Some(ax_bool(w.as_ptr(), cfstr("AXMinimized"))?.unwrap_or(false))),
        None => Ok(None),
    }
}

/// Minimized state of every window of `pid`, in `AXWindows` order.
///
/// Windows whose state cannot be read are reported as not minimized.
pub fn windows_minimized(pid: i32) -> Result<Vec<bool>> {
    ax_check()?;
    let app = app_element(pid)?;
    Ok(ax_windows(app.as_ptr())?
        .iter()
        .map(|w| {
            ax_bool(w.as_ptr(), cfstr("AXMinimized"))
                .ok()
                .flatten()
                .unwrap_or(false)
        })
        .collect())
}

/// Set the minimized state of the window in `slot`.
pub fn set_minimized(pid: i32, slot: WindowSlot, minimized: bool) -> Result<()> {
    ax_check()?;
    let app = app_element(pid)?;
    let w = resolve(&app, slot)?.ok_or(Error::NoWindow)?;
    ax_set_bool(w.as_ptr(), cfstr("AXMinimized"), minimized)
}

/// Raise the window in `slot` and make it the application's main window.
pub fn raise_window(pid: i32, slot: WindowSlot) -> Result<()> {
    ax_check()?;
    let app = app_element(pid)?;
    let w = resolve(&app, slot)?.ok_or(Error::NoWindow)?;
    if let Err(e) = ax_set_bool(w.as_ptr(), cfstr("AXMain"), true) {
        debug!(pid, ?slot, error = %e, "ax_set_main_failed");
    }
    ax_perform_action(w.as_ptr(), cfstr("AXRaise"))?;
    if let Err(e) = ax_set_bool(app.as_ptr(), cfstr("AXFrontmost"), true) {
        debug!(pid, error = %e, "ax_set_frontmost_failed");
    }
    Ok(())
}

/// Bring the application with `pid` to the front. Must run on the main thread.
pub fn activate(pid: i32) -> Result<()> {
    let _mtm = MainThreadMarker::new().ok_or(Error::MainThread)?;
    let app = unsafe {
        NSRunningApplication::runningApplicationWithProcessIdentifier(pid as libc::pid_t)
    }
    .ok_or(Error::NotRunning(pid))?;
    let ok = unsafe { app.activateWithOptions(NSApplicationActivationOptions::ActivateAllWindows) };
    if !ok {
        warn!(pid, "activate_with_options_returned_false");
        return Err(Error::ActivationFailed(pid));
    }
    Ok(())
}

/// Ask Launch Services to open the application with `bundle_id`.
///
/// Launches it when not running; a running application receives a reopen
/// event, which typically creates or shows a window.
pub fn open_bundle(bundle_id: &str) -> Result<()> {
    let status = Command::new("open")
        .arg("-b")
        .arg(bundle_id)
        .status()
        .map_err(|e| Error::Open {
            bundle_id: bundle_id.to_string(),
            reason: e.to_string(),
        })?;
    if !status.success() {
        return Err(Error::Open {
            bundle_id: bundle_id.to_string(),
            reason: format!("open exited with {status}"),
        });
    }
    Ok(())
}
