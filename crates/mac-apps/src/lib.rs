//! mac-apps: macOS application and window introspection for keyswitch.
//!
//! A stateless query layer over AppKit, CoreGraphics and the Accessibility
//! API:
//! - [`running_apps`] lists regular foreground-capable processes, excluding
//!   this one.
//! - [`front_window_frames`] reads window geometry for every on-screen process.
//! - [`focus`] holds per-window primitives (minimized state, raise) plus
//!   activation and Launch Services open requests.
//! - [`dock_apps`] reads the Dock's persistent application tiles.
//! - [`icon_for_path`] loads an application icon as RGBA pixels.
//!
//! Accessibility-backed calls fail with [`Error::Permission`] when the grant is
//! missing; callers are expected to skip the entry and carry on.
use std::ffi::c_void;

use core_foundation::base::{CFRelease, CFTypeRef};

mod ax;
mod dock;
pub mod focus;
mod error;
mod icons;
mod running;
mod window;

pub use dock::{DockItem, dock_apps, parse_persistent_apps};
pub use error::{Error, Result};
pub use focus::WindowSlot;
pub use icons::{IconImage, decode_icon, icon_for_path};
pub use running::{
    RunningApp, bundle_path_for, is_terminated, name_from_bundle_path, pid_for_bundle,
    running_apps,
};
pub use window::{WindowFrame, front_window_frames};

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFRetain(cf: CFTypeRef) -> CFTypeRef;
}

/// RAII guard that releases a retained AX element on drop.
pub(crate) struct AXElem(*mut c_void);

impl AXElem {
    /// Take ownership of an element returned by a Create/Copy call.
    ///
    /// # Safety
    /// `ptr` must be null or a +1 retained CF object.
    pub(crate) unsafe fn from_create(ptr: *mut c_void) -> Option<Self> {
        (!ptr.is_null()).then_some(Self(ptr))
    }

    /// Retain a borrowed element (e.g. an array member) so it outlives its container.
    pub(crate) fn retain_from_borrowed(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() {
            return None;
        }
        unsafe { CFRetain(ptr as CFTypeRef) };
        Some(Self(ptr))
    }

    /// Raw element pointer.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut c_void {
        self.0
    }
}

impl Drop for AXElem {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0 as CFTypeRef) };
    }
}
