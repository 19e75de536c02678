//! On-screen window geometry via `CGWindowListCopyWindowInfo`.
//!
//! One window-list snapshot serves every tracked process, so a poll costs a
//! single WindowServer round trip regardless of how many apps are tracked.
use std::{collections::HashMap, ffi::c_void};

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFTypeRef, TCFType},
    dictionary::{CFDictionaryGetValue, CFDictionaryRef},
    number::CFNumber,
    string::CFStringRef,
};
use core_graphics::window as cgw;
use tracing::{trace, warn};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relativeToWindow: u32) -> CFTypeRef;
    fn CGRectMakeWithDictionaryRepresentation(dict: CFDictionaryRef, rect: *mut CGRectRepr)
    -> bool;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFGetTypeID(cf: CFTypeRef) -> usize;
    fn CFDictionaryGetTypeID() -> usize;
}

/// `kCGWindowListOptionOnScreenOnly`.
const K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY: u32 = 1 << 0;
/// `kCGWindowListExcludeDesktopElements`.
const K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;

/// `CGRect` memory layout for the dictionary decoder.
#[repr(C)]
#[derive(Default)]
struct CGRectRepr {
    /// Origin x.
    x: f64,
    /// Origin y.
    y: f64,
    /// Width.
    w: f64,
    /// Height.
    h: f64,
}

/// Window frame in global screen coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowFrame {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Integer value for `key` in a window-info dictionary.
fn dict_get_i64(d: CFDictionaryRef, key: CFStringRef) -> Option<i64> {
    let v = unsafe { CFDictionaryGetValue(d, key as *const c_void) };
    if v.is_null() {
        return None;
    }
    unsafe { CFNumber::wrap_under_get_rule(v as _) }.to_i64()
}

/// Bounds rectangle stored under `kCGWindowBounds`.
fn dict_get_bounds(d: CFDictionaryRef) -> Option<WindowFrame> {
    let v = unsafe { CFDictionaryGetValue(d, cgw::kCGWindowBounds as *const c_void) };
    if v.is_null() {
        return None;
    }
    let mut r = CGRectRepr::default();
    if !unsafe { CGRectMakeWithDictionaryRepresentation(v as CFDictionaryRef, &mut r) } {
        return None;
    }
    Some(WindowFrame {
        x: r.x,
        y: r.y,
        width: r.w,
        height: r.h,
    })
}

/// Frame of the frontmost normal-layer window of every on-screen process.
///
/// The window list is ordered front to back, so the first layer-0 entry per
/// pid wins.
pub fn front_window_frames() -> HashMap<i32, WindowFrame> {
    let mut out = HashMap::new();
    let arr_ref = unsafe {
        CGWindowListCopyWindowInfo(
            K_CG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY
                | K_CG_WINDOW_LIST_OPTION_EXCLUDE_DESKTOP_ELEMENTS,
            0,
        )
    };
    if arr_ref.is_null() {
        warn!("window_list_copy_returned_null");
        return out;
    }
    let arr: CFArray<*const c_void> = unsafe { CFArray::wrap_under_create_rule(arr_ref as _) };
    let (key_pid, key_layer) = unsafe { (cgw::kCGWindowOwnerPID, cgw::kCGWindowLayer) };
    for i in 0..unsafe { CFArrayGetCount(arr.as_concrete_TypeRef()) } {
        let item = unsafe { CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) } as CFTypeRef;
        if item.is_null() || unsafe { CFGetTypeID(item) != CFDictionaryGetTypeID() } {
            continue;
        }
        let d = item as CFDictionaryRef;
        if dict_get_i64(d, key_layer) != Some(0) {
            continue;
        }
        let Some(pid) = dict_get_i64(d, key_pid) else {
            continue;
        };
        if let Some(frame) = dict_get_bounds(d) {
            out.entry(pid as i32).or_insert(frame);
        }
    }
    trace!(count = out.len(), "front_window_frames");
    out
}
