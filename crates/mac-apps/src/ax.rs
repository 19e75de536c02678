use std::{cell::RefCell, collections::HashMap, ffi::c_void, ptr, thread_local};

use core_foundation::{
    array::{CFArray, CFArrayGetCount, CFArrayGetValueAtIndex},
    base::{CFRelease, CFTypeRef, TCFType},
    boolean::{kCFBooleanFalse, kCFBooleanTrue},
    string::{CFString, CFStringRef},
};

use crate::{
    AXElem,
    error::{Error, Result},
};

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXUIElementCreateApplication(pid: i32) -> *mut c_void;
    fn AXUIElementCopyAttributeValue(
        element: *mut c_void,
        attr: CFStringRef,
        value: *mut CFTypeRef,
    ) -> i32;
    fn AXUIElementSetAttributeValue(element: *mut c_void, attr: CFStringRef, value: CFTypeRef)
    -> i32;
    fn AXUIElementPerformAction(element: *mut c_void, action: CFStringRef) -> i32;
    fn AXUIElementSetMessagingTimeout(element: *mut c_void, timeout_seconds: f32) -> i32;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFBooleanGetValue(b: CFTypeRef) -> bool;
    fn CFGetTypeID(cf: CFTypeRef) -> usize;
    fn CFBooleanGetTypeID() -> usize;
}

/// `kAXErrorInvalidUIElement`: the element went away.
const K_AX_ERROR_INVALID_UI_ELEMENT: i32 = -25202;
/// `kAXErrorNoValue`: attribute exists but has no value.
const K_AX_ERROR_NO_VALUE: i32 = -25212;

thread_local! {
    static ATTR_STRINGS: RefCell<HashMap<&'static str, CFString>> = RefCell::new(HashMap::new());
}

/// Stable CFStringRef for an attribute or action name.
///
/// Cached per thread; static strings are not toll-free bridged, which trips
/// pointer authentication on recent macOS versions.
pub(crate) fn cfstr(name: &'static str) -> CFStringRef {
    ATTR_STRINGS.with(|cell| {
        let mut m = cell.borrow_mut();
        let s = m.entry(name).or_insert_with(|| CFString::new(name));
        s.as_concrete_TypeRef()
    })
}

/// Fail with [`Error::Permission`] unless Accessibility is granted.
pub(crate) fn ax_check() -> Result<()> {
    if permissions::accessibility_ok() {
        Ok(())
    } else {
        Err(Error::Permission)
    }
}

/// Map a non-zero AX status to an error.
fn ax_err(code: i32) -> Error {
    if code == K_AX_ERROR_INVALID_UI_ELEMENT {
        Error::WindowGone
    } else {
        Error::AxCode(code)
    }
}

/// Upper bound on a single AX round trip to another process.
const AX_MESSAGING_TIMEOUT_SECS: f32 = 0.25;

/// AX element for the application with `pid`.
///
/// Calls against the element time out quickly so a hung application cannot
/// stall the caller.
pub(crate) fn app_element(pid: i32) -> Result<AXElem> {
    let app =
        unsafe { AXElem::from_create(AXUIElementCreateApplication(pid)) }.ok_or(Error::AppElement)?;
    unsafe { AXUIElementSetMessagingTimeout(app.as_ptr(), AX_MESSAGING_TIMEOUT_SECS) };
    Ok(app)
}

/// Copy an attribute value; `Ok(None)` when the attribute has no value.
fn copy_attr(element: *mut c_void, attr: CFStringRef) -> Result<Option<CFTypeRef>> {
    let mut v: CFTypeRef = ptr::null_mut();
    let err = unsafe { AXUIElementCopyAttributeValue(element, attr, &mut v) };
    if err == K_AX_ERROR_NO_VALUE {
        return Ok(None);
    }
    if err != 0 {
        return Err(ax_err(err));
    }
    Ok((!v.is_null()).then_some(v))
}

/// Read an element-valued attribute such as `AXFocusedWindow` or `AXMainWindow`.
pub(crate) fn ax_element(element: *mut c_void, attr: CFStringRef) -> Result<Option<AXElem>> {
    Ok(copy_attr(element, attr)?.and_then(|v| unsafe { AXElem::from_create(v as *mut c_void) }))
}

/// Read the `AXWindows` array of an application element, retaining each window.
pub(crate) fn ax_windows(app: *mut c_void) -> Result<Vec<AXElem>> {
    let Some(arr_ref) = copy_attr(app, cfstr("AXWindows"))? else {
        return Ok(Vec::new());
    };
    let arr = unsafe { CFArray::<*const c_void>::wrap_under_create_rule(arr_ref as _) };
    let mut out = Vec::new();
    for i in 0..unsafe { CFArrayGetCount(arr.as_concrete_TypeRef()) } {
        let w = unsafe { CFArrayGetValueAtIndex(arr.as_concrete_TypeRef(), i) } as *mut c_void;
        if let Some(elem) = AXElem::retain_from_borrowed(w) {
            out.push(elem);
        }
    }
    Ok(out)
}

/// Read a boolean attribute.
pub(crate) fn ax_bool(element: *mut c_void, attr: CFStringRef) -> Result<Option<bool>> {
    let Some(v) = copy_attr(element, attr)? else {
        return Ok(None);
    };
    let out = unsafe {
        if CFGetTypeID(v) == CFBooleanGetTypeID() {
            Some(CFBooleanGetValue(v))
        } else {
            None
        }
    };
    unsafe { CFRelease(v) };
    Ok(out)
}

/// Set a boolean attribute.
pub(crate) fn ax_set_bool(element: *mut c_void, attr: CFStringRef, value: bool) -> Result<()> {
    let val = unsafe {
        (if value {
            kCFBooleanTrue
        } else {
            kCFBooleanFalse
        }) as CFTypeRef
    };
    let err = unsafe { AXUIElementSetAttributeValue(element, attr, val) };
    if err != 0 {
        return Err(ax_err(err));
    }
    Ok(())
}

/// Perform a named AX action such as `AXRaise`.
pub(crate) fn ax_perform_action(element: *mut c_void, action: CFStringRef) -> Result<()> {
    let err = unsafe { AXUIElementPerformAction(element, action) };
    if err != 0 {
        return Err(ax_err(err));
    }
    Ok(())
}
