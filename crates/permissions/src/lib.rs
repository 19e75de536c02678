//! macOS permission checks for keyswitch.
//!
//! The switcher needs two grants from the user:
//! - Accessibility, to query and raise other applications' windows.
//! - Input Monitoring, to install the keyboard event tap.
//!
//! Both checks are preflight-only: they never prompt. The host re-runs
//! [`check_permissions`] on a timer and enables or disables the switching
//! feature as grants appear or disappear.
use serde::Serialize;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightListenEventAccess() -> bool;
}

/// Check the global Accessibility permission.
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check if the application has the "Input Monitoring" permission.
///
/// Returns `true` when the process is allowed to listen for keyboard events
/// (CGEvent tap), and `false` otherwise.
pub fn input_monitoring_ok() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
    /// Input Monitoring permission; `true` if granted.
    pub input_ok: bool,
}

impl PermissionsStatus {
    /// Status with every permission granted.
    pub const GRANTED: Self = Self {
        accessibility_ok: true,
        input_ok: true,
    };

    /// True when switching can run.
    pub fn all_granted(&self) -> bool {
        self.accessibility_ok && self.input_ok
    }

    /// Human-readable names of the missing permissions.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.accessibility_ok {
            out.push("Accessibility");
        }
        if !self.input_ok {
            out.push("Input Monitoring");
        }
        out
    }
}

/// Query both Accessibility and Input Monitoring permissions.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
        input_ok: input_monitoring_ok(),
    }
}
