//! The engine's OS traits implemented over `mac-apps`.
use std::collections::HashMap;

use keyswitch_engine::{
    AppInfo, AppOps, DockEntry, Error, FocusBackend, Rect, Result, WindowSlot,
};
use mac_apps::{Error as AppsError, focus as ax};

/// Map a `mac-apps` failure onto the engine's error vocabulary.
fn map_err(e: AppsError) -> Error {
    match e {
        AppsError::NotRunning(pid) => Error::NotRunning(pid),
        AppsError::NoWindow | AppsError::WindowGone => Error::NoWindow,
        AppsError::Open { bundle_id, reason } => Error::Launch { bundle_id, reason },
        other => Error::Backend(other.to_string()),
    }
}

/// Engine window slots map one to one onto AX slots.
fn slot(s: WindowSlot) -> ax::WindowSlot {
    match s {
        WindowSlot::Focused => ax::WindowSlot::Focused,
        WindowSlot::Main => ax::WindowSlot::Main,
        WindowSlot::Index(i) => ax::WindowSlot::Index(i),
    }
}

/// Process and window queries through `NSWorkspace` and CoreGraphics.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacAppOps;

impl AppOps for MacAppOps {
    fn running_apps(&self) -> Vec<AppInfo> {
        mac_apps::running_apps()
            .into_iter()
            .map(|a| AppInfo {
                pid: a.pid,
                bundle_id: a.bundle_id,
                name: a.name,
                bundle_path: a.bundle_path,
                is_active: a.is_active,
            })
            .collect()
    }

    fn dock_apps(&self) -> Result<Vec<DockEntry>> {
        let items = mac_apps::dock_apps().map_err(map_err)?;
        Ok(items
            .into_iter()
            .map(|d| DockEntry {
                bundle_id: d.bundle_id,
                label: Some(d.label).filter(|l| !l.is_empty()),
                path: d.path,
            })
            .collect())
    }

    fn bundle_path(&self, bundle_id: &str) -> Option<String> {
        mac_apps::bundle_path_for(bundle_id)
    }

    fn display_name(&self, bundle_path: &str) -> Option<String> {
        mac_apps::name_from_bundle_path(bundle_path)
    }

    fn window_frames(&self) -> HashMap<i32, Rect> {
        mac_apps::front_window_frames()
            .into_iter()
            .map(|(pid, f)| {
                (
                    pid,
                    Rect {
                        x: f.x,
                        y: f.y,
                        width: f.width,
                        height: f.height,
                    },
                )
            })
            .collect()
    }

    fn is_terminated(&self, pid: i32) -> bool {
        mac_apps::is_terminated(pid)
    }

    fn pid_for_bundle(&self, bundle_id: &str) -> Option<i32> {
        mac_apps::pid_for_bundle(bundle_id)
    }
}

/// Focus primitives through the Accessibility API.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacFocusBackend;

impl FocusBackend for MacFocusBackend {
    fn window_minimized(&self, pid: i32, s: WindowSlot) -> Result<Option<bool>> {
        ax::window_minimized(pid, slot(s)).map_err(map_err)
    }

    fn windows_minimized(&self, pid: i32) -> Result<Vec<bool>> {
        ax::windows_minimized(pid).map_err(map_err)
    }

    fn set_minimized(&self, pid: i32, s: WindowSlot, minimized: bool) -> Result<()> {
        ax::set_minimized(pid, slot(s), minimized).map_err(map_err)
    }

    fn raise(&self, pid: i32, s: WindowSlot) -> Result<()> {
        ax::raise_window(pid, slot(s)).map_err(map_err)
    }

    fn activate(&self, pid: i32) -> Result<()> {
        ax::activate(pid).map_err(map_err)
    }

    fn reopen(&self, bundle_id: &str) -> Result<()> {
        ax::open_bundle(bundle_id).map_err(map_err)
    }

    fn launch(&self, bundle_id: &str) -> Result<()> {
        ax::open_bundle(bundle_id).map_err(map_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_onto_engine_kinds() {
        assert_eq!(map_err(AppsError::NotRunning(4)), Error::NotRunning(4));
        assert_eq!(map_err(AppsError::WindowGone), Error::NoWindow);
        assert_eq!(
            map_err(AppsError::Open {
                bundle_id: "com.x".into(),
                reason: "nope".into()
            }),
            Error::Launch {
                bundle_id: "com.x".into(),
                reason: "nope".into()
            }
        );
        assert!(matches!(
            map_err(AppsError::AxCode(-25204)),
            Error::Backend(_)
        ));
    }
}
