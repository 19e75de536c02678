//! NSWindow tweaks for the overlay viewport.
//!
//! egui creates the window; these helpers find it by title afterwards and
//! adjust what winit does not expose. AppKit main thread only.

use std::{error::Error as StdError, fmt, result::Result as StdResult};

use objc2::rc::autoreleasepool;
use objc2_app_kit::{NSApplication, NSColor, NSWindow, NSWindowCollectionBehavior};
use objc2_foundation::MainThreadMarker;

/// Errors from NSWindow helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Called off the AppKit main thread.
    MainThread,
    /// No window has the requested title yet.
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MainThread => write!(f, "operation requires AppKit main thread"),
            Self::NotFound => write!(f, "window not found"),
        }
    }
}

impl StdError for Error {}

/// Result alias for NSWindow helpers.
pub type Result<T> = StdResult<T, Error>;

/// Run `f` on every application window titled `title`. Errors with
/// [`Error::NotFound`] when there is none.
fn with_window(title: &str, mut f: impl FnMut(&NSWindow)) -> Result<()> {
    let mtm = MainThreadMarker::new().ok_or(Error::MainThread)?;
    let app = NSApplication::sharedApplication(mtm);
    let mut found = false;
    for w in app.windows().iter() {
        let t = w.title();
        if autoreleasepool(|pool| unsafe { t.to_str(pool) == title }) {
            f(&w);
            found = true;
        }
    }
    if found { Ok(()) } else { Err(Error::NotFound) }
}

/// Clear background, no shadow, rounded corners, full alpha.
pub fn apply_transparent_rounded(title: &str, radius: f64) -> Result<()> {
    with_window(title, |window| {
        window.setOpaque(false);
        window.setHasShadow(false);
        let clear = NSColor::clearColor();
        window.setBackgroundColor(Some(&clear));
        if let Some(view) = window.contentView() {
            view.setWantsLayer(true);
            if let Some(layer) = view.layer() {
                layer.setMasksToBounds(true);
                layer.setCornerRadius(radius);
            }
        }
        if (window.alphaValue() - 1.0).abs() > 0.0001 {
            window.setAlphaValue(1.0);
        }
    })
}

/// Show the window on every Space, including over full-screen apps.
pub fn set_on_all_spaces(title: &str) -> Result<()> {
    with_window(title, |window| {
        window.setCollectionBehavior(
            NSWindowCollectionBehavior::CanJoinAllSpaces
                | NSWindowCollectionBehavior::FullScreenAuxiliary,
        );
    })
}
