//! Running application enumeration via `NSWorkspace`.
use std::{path::Path, process};

use objc2_app_kit::{NSApplicationActivationPolicy, NSRunningApplication, NSWorkspace};
use objc2_foundation::NSString;
use tracing::trace;

/// A running application with a regular (Dock-visible) activation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    /// Process identifier.
    pub pid: i32,
    /// Bundle identifier.
    pub bundle_id: String,
    /// Localized display name.
    pub name: String,
    /// Filesystem path of the application bundle, when known.
    pub bundle_path: Option<String>,
    /// True for the frontmost application.
    pub is_active: bool,
}

/// Convert a running application into a [`RunningApp`], if it qualifies.
fn describe(app: &NSRunningApplication) -> Option<RunningApp> {
    unsafe {
        if app.activationPolicy() != NSApplicationActivationPolicy::Regular || app.isTerminated() {
            return None;
        }
        let bundle_id = app.bundleIdentifier()?.to_string();
        let bundle_path = app
            .bundleURL()
            .and_then(|url| url.path())
            .map(|p| p.to_string());
        let name = app
            .localizedName()
            .map(|n| n.to_string())
            .or_else(|| bundle_path.as_deref().and_then(name_from_bundle_path))
            .unwrap_or_else(|| bundle_id.clone());
        Some(RunningApp {
            pid: app.processIdentifier(),
            bundle_id,
            name,
            bundle_path,
            is_active: app.isActive(),
        })
    }
}

/// Regular applications in `NSWorkspace` order, excluding this process.
pub fn running_apps() -> Vec<RunningApp> {
    let own = process::id() as i32;
    let apps = unsafe { NSWorkspace::sharedWorkspace().runningApplications() };
    let out: Vec<RunningApp> = apps
        .iter()
        .filter_map(|app| describe(&app))
        .filter(|a| a.pid != own)
        .collect();
    trace!(count = out.len(), "running_apps");
    out
}

/// True when no live process has `pid`.
pub fn is_terminated(pid: i32) -> bool {
    match unsafe {
        NSRunningApplication::runningApplicationWithProcessIdentifier(pid as libc::pid_t)
    } {
        Some(app) => unsafe { app.isTerminated() },
        None => true,
    }
}

/// Pid of a running instance of `bundle_id`, if any.
pub fn pid_for_bundle(bundle_id: &str) -> Option<i32> {
    let ns = NSString::from_str(bundle_id);
    let apps = unsafe { NSRunningApplication::runningApplicationsWithBundleIdentifier(&ns) };
    apps.iter()
        .find(|a| unsafe { !a.isTerminated() })
        .map(|a| unsafe { a.processIdentifier() })
}

/// Installed location of the application with `bundle_id`, via Launch Services.
pub fn bundle_path_for(bundle_id: &str) -> Option<String> {
    let ns = NSString::from_str(bundle_id);
    unsafe {
        NSWorkspace::sharedWorkspace()
            .URLForApplicationWithBundleIdentifier(&ns)
            .and_then(|url| url.path())
            .map(|p| p.to_string())
    }
}

/// Display name derived from a bundle path (`/Applications/Safari.app` → `Safari`).
pub fn name_from_bundle_path(path: &str) -> Option<String> {
    let p = Path::new(path.trim_end_matches('/'));
    if p.extension().is_some_and(|e| e == "app") {
        p.file_stem().map(|s| s.to_string_lossy().into_owned())
    } else {
        None
    }
}
