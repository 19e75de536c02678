//! The tracked application record shared by every engine component.

/// Axis-aligned rectangle in screen points, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// One candidate application, with its shortcut once assigned.
///
/// Built fresh on every refresh. Only the background poll edits an existing
/// list, and then only `window_frame` (or removes the entry).
#[derive(Debug, Clone)]
pub struct TrackedApp {
    /// Process id; 0 when not running.
    pub pid: i32,
    /// Bundle identifier; the identity used for pin matching and dedup.
    pub bundle_id: String,
    /// Display name.
    pub name: String,
    /// Bundle path the overlay loads the icon from.
    pub icon: Option<String>,
    /// Slot index into the key sequence.
    pub assigned_number: Option<usize>,
    /// Character at `assigned_number`.
    pub assigned_key: Option<char>,
    /// True for the frontmost application.
    pub is_active: bool,
    /// Front window geometry, when known.
    pub window_frame: Option<Rect>,
    /// False for docked or pinned apps with no process.
    pub is_running: bool,
}

impl TrackedApp {
    /// A running application with no assignment.
    pub fn running(pid: i32, bundle_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pid,
            bundle_id: bundle_id.into(),
            name: name.into(),
            icon: None,
            assigned_number: None,
            assigned_key: None,
            is_active: false,
            window_frame: None,
            is_running: true,
        }
    }

    /// An application with no process (docked or pinned).
    pub fn launchable(bundle_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pid: 0,
            is_running: false,
            ..Self::running(0, bundle_id, name)
        }
    }

    /// Builder-style icon path.
    pub fn with_icon(mut self, icon: Option<String>) -> Self {
        self.icon = icon;
        self
    }

    /// True when the entry carries a shortcut.
    pub fn is_assigned(&self) -> bool {
        self.assigned_key.is_some()
    }

    /// Drop any assignment.
    pub(crate) fn clear_assignment(&mut self) {
        self.assigned_number = None;
        self.assigned_key = None;
    }
}

/// Equality ignores name, icon and geometry.
impl PartialEq for TrackedApp {
    fn eq(&self, other: &Self) -> bool {
        self.pid == other.pid
            && self.bundle_id == other.bundle_id
            && self.assigned_number == other.assigned_number
            && self.assigned_key == other.assigned_key
            && self.is_active == other.is_active
            && self.is_running == other.is_running
    }
}

impl Eq for TrackedApp {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_presentation_fields() {
        let a = TrackedApp::running(7, "com.a", "A");
        let mut b = a.clone().with_icon(Some("/Applications/A.app".into()));
        b.name = "Renamed".into();
        b.window_frame = Some(Rect {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        });
        assert_eq!(a, b);
        b.is_active = true;
        assert_ne!(a, b);
    }

    #[test]
    fn launchable_has_no_process() {
        let a = TrackedApp::launchable("com.a", "A");
        assert_eq!(a.pid, 0);
        assert!(!a.is_running);
        assert!(!a.is_assigned());
    }
}
