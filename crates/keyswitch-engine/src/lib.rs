//! keyswitch-engine: the switcher core.
//!
//! The [`Engine`] owns all switcher state and is driven from a single thread:
//! chord inputs forwarded by the keyboard tap, a periodic poll, and
//! preference and permission notifications. OS access goes through the
//! traits in [`ops`] so the whole flow runs against mocks in tests.
//!
//! Flow: trigger down → refresh (throttled) → [`assign()`] → overlay show;
//! then a shortcut (resolve → [`focus()`] → record → highlight → hide) or a
//! release/escape (hide).

pub mod assign;
pub mod chord;
mod engine;
mod error;
pub mod focus;
pub mod ops;
pub mod overlay;
pub mod source;
pub mod ticker;
mod tracked;
pub mod watch;

pub use assign::{assign, reorder};
pub use chord::{ChordInput, ChordMachine, ChordState, Transition};
pub use engine::{Engine, LAUNCH_ACTIVATE_TIMEOUT, Status};
pub use error::{Error, Result};
pub use focus::{FocusOutcome, FocusStep, focus};
pub use ops::{
    AppInfo, AppOps, DockEntry, FocusBackend, MemorySink, MockAppOps, MockFocusBackend,
    MockWindows, NullSink, RecordingSurface, UsageSink, WindowSlot,
};
pub use overlay::{
    OverlayCoordinator, OverlayFrame, OverlayItem, OverlayLayout, OverlaySurface, ScreenSize,
    Session,
};
pub use source::SourceProvider;
pub use ticker::{Tick, Ticker};
pub use tracked::{Rect, TrackedApp};
pub use watch::{PermissionChange, PermissionWatcher};
