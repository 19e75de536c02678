//! CoreGraphics event tap and its run loop.
//!
//! `CGEventTap` from `core-graphics` maps `CallbackResult::Drop` to a NULL
//! event at the C boundary, which is the only thing CoreGraphics accepts as
//! "do not deliver".
use std::{
    ffi::c_void,
    process, ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{CallbackCtx, Error, RawKey, Result, TapEvent};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

/// `kCGEventSourceUnixProcessID`.
const FIELD_EVENT_SOURCE_UNIX_PROCESS_ID: u32 = 41;
/// `kCGKeyboardEventAutorepeat`.
const FIELD_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
/// `kCGKeyboardEventKeycode`.
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;

/// Handle used to stop the tap's run loop from another thread.
pub(crate) struct SysControl {
    /// Run loop of the tap thread, once it is running.
    rl: Mutex<Option<CFRunLoop>>,
}

impl SysControl {
    /// Empty control; the run loop is recorded when the tap starts.
    pub(crate) fn new() -> Self {
        Self {
            rl: Mutex::new(None),
        }
    }

    /// Record the tap thread's run loop.
    fn set_rl(&self, rl: CFRunLoop) {
        *self.rl.lock() = Some(rl);
    }

    /// Stop the run loop if it is running.
    pub(crate) fn stop(&self) {
        if let Some(rl) = self.rl.lock().take() {
            rl.stop();
        }
    }
}

/// Map a tap callback event to a [`RawKey`], if it is one we track.
fn raw_key(etype: cge::CGEventType, event: &cge::CGEvent) -> Option<RawKey> {
    let scancode = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u16;
    match etype {
        cge::CGEventType::KeyDown => Some(RawKey::Down {
            scancode,
            is_repeat: event.get_integer_value_field(FIELD_KEYBOARD_EVENT_AUTOREPEAT) != 0,
        }),
        cge::CGEventType::KeyUp => Some(RawKey::Up { scancode }),
        cge::CGEventType::FlagsChanged => Some(RawKey::Flags(event.get_flags().bits())),
        _ => None,
    }
}

/// Create the tap, report readiness, and run the loop until stopped.
pub(crate) fn run_event_loop(
    cb_ctx: CallbackCtx,
    ready: &Sender<Result<()>>,
    ctrl: &Arc<SysControl>,
) -> Result<()> {
    if !permissions::input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        let _ignored = ready.send(Err(Error::PermissionDenied("Input Monitoring")));
        return Err(Error::PermissionDenied("Input Monitoring"));
    }

    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(ptr::null_mut()));
    let tap_port_cb = tap_port_ptr.clone();
    let own_pid = process::id();

    debug!("creating_event_tap");
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::HID,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![
            cge::CGEventType::KeyDown,
            cge::CGEventType::KeyUp,
            cge::CGEventType::FlagsChanged,
        ],
        move |_proxy, etype, event| {
            if matches!(
                etype,
                cge::CGEventType::TapDisabledByTimeout | cge::CGEventType::TapDisabledByUserInput
            ) {
                let p = tap_port_cb.load(Ordering::SeqCst) as CFMachPortRef;
                if !p.is_null() {
                    warn!("tap_disabled_by_os_reenabling");
                    unsafe { CGEventTapEnable(p, true) };
                    cb_ctx.emit(TapEvent::Reenabled);
                }
                return CallbackResult::Keep;
            }

            let src_pid = event.get_integer_value_field(FIELD_EVENT_SOURCE_UNIX_PROCESS_ID) as u32;
            if src_pid == own_pid {
                trace!(src_pid, "ignoring_own_event");
                return CallbackResult::Keep;
            }

            let Some(raw) = raw_key(etype, event) else {
                return CallbackResult::Keep;
            };
            let decision = cb_ctx.tracker.lock().classify(raw);
            trace!(?raw, ?decision, "tap_event");
            if let Some(ev) = decision.emit {
                cb_ctx.emit(ev);
            }
            if decision.swallow {
                CallbackResult::Drop
            } else {
                CallbackResult::Keep
            }
        },
    ) {
        Ok(t) => t,
        Err(()) => {
            warn!("event_tap_create_failed");
            let _ignored = ready.send(Err(Error::EventTapStart));
            return Err(Error::EventTapStart);
        }
    };

    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    let Ok(source) = tap.mach_port().create_runloop_source(0) else {
        warn!("run_loop_source_create_failed");
        let _ignored = ready.send(Err(Error::EventTapStart));
        return Err(Error::EventTapStart);
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    rl.add_source(&source, unsafe { kCFRunLoopCommonModes });
    tap.enable();

    let _ignored = ready.send(Ok(()));
    debug!("event_tap_started_run_loop");

    CFRunLoop::run_current();

    debug!("event_tap_exited");
    Ok(())
}
