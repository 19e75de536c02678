//! OS capability traits used by the engine, plus in-memory mocks.
//!
//! The binary implements [`AppOps`] and [`FocusBackend`] over the macOS
//! crates. The mocks record every call so tests can assert on the exact
//! sequence the engine issued without touching the OS.
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use config::{StatsStore, SwitchRecord};
use parking_lot::Mutex;
use tracing::warn;

use crate::{
    Rect,
    error::{Error, Result},
    overlay::{OverlayFrame, OverlaySurface},
};

/// A running application as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Process id.
    pub pid: i32,
    /// Bundle identifier.
    pub bundle_id: String,
    /// Localized name.
    pub name: String,
    /// Bundle path.
    pub bundle_path: Option<String>,
    /// Frontmost application.
    pub is_active: bool,
}

/// A Dock tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockEntry {
    /// Bundle identifier.
    pub bundle_id: String,
    /// Tile label.
    pub label: Option<String>,
    /// Bundle path.
    pub path: Option<String>,
}

/// Process and window queries.
pub trait AppOps: Send + Sync {
    /// Regular-UI processes, excluding this one.
    fn running_apps(&self) -> Vec<AppInfo>;
    /// Persistent Dock applications in Dock order.
    fn dock_apps(&self) -> Result<Vec<DockEntry>>;
    /// Bundle path for an installed application.
    fn bundle_path(&self, bundle_id: &str) -> Option<String>;
    /// Display name from a bundle path.
    fn display_name(&self, bundle_path: &str) -> Option<String>;
    /// Front window frame per pid.
    fn window_frames(&self) -> HashMap<i32, Rect>;
    /// True once the process has exited.
    fn is_terminated(&self, pid: i32) -> bool;
    /// Pid of a running instance of `bundle_id`.
    fn pid_for_bundle(&self, bundle_id: &str) -> Option<i32>;
}

/// A window addressed relative to its application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSlot {
    /// The focused window.
    Focused,
    /// The main window.
    Main,
    /// Position in the window list.
    Index(usize),
}

/// Window focusing primitives.
pub trait FocusBackend: Send + Sync {
    /// Minimized state of the window in `slot`; `None` when there is none.
    fn window_minimized(&self, pid: i32, slot: WindowSlot) -> Result<Option<bool>>;
    /// Minimized state of every window, in list order.
    fn windows_minimized(&self, pid: i32) -> Result<Vec<bool>>;
    /// Minimize or restore the window in `slot`.
    fn set_minimized(&self, pid: i32, slot: WindowSlot, minimized: bool) -> Result<()>;
    /// Raise the window in `slot`.
    fn raise(&self, pid: i32, slot: WindowSlot) -> Result<()>;
    /// Bring the application forward.
    fn activate(&self, pid: i32) -> Result<()>;
    /// Ask a running application to reopen (show a window).
    fn reopen(&self, bundle_id: &str) -> Result<()>;
    /// Launch an application that is not running.
    fn launch(&self, bundle_id: &str) -> Result<()>;
}

/// Receives one record per completed switch.
pub trait UsageSink {
    /// Record a switch; failures are the sink's to log.
    fn record_switch(&mut self, rec: SwitchRecord);
}

impl UsageSink for StatsStore {
    fn record_switch(&mut self, rec: SwitchRecord) {
        if let Err(e) = self.record(rec) {
            warn!(error = %e, "stats_record_failed");
        }
    }
}

/// Discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl UsageSink for NullSink {
    fn record_switch(&mut self, _rec: SwitchRecord) {}
}

/// Shared call log.
type Calls = Arc<Mutex<Vec<String>>>;

/// In-memory [`AppOps`].
#[derive(Clone, Default)]
pub struct MockAppOps {
    /// Call log.
    calls: Calls,
    /// Running processes.
    running: Arc<Mutex<Vec<AppInfo>>>,
    /// Dock tiles.
    dock: Arc<Mutex<Vec<DockEntry>>>,
    /// Dock read fails.
    fail_dock: Arc<AtomicBool>,
    /// Installed bundle paths.
    paths: Arc<Mutex<HashMap<String, String>>>,
    /// Names by bundle path.
    names: Arc<Mutex<HashMap<String, String>>>,
    /// Window frames.
    frames: Arc<Mutex<HashMap<i32, Rect>>>,
    /// Exited pids.
    terminated: Arc<Mutex<HashSet<i32>>>,
}

impl MockAppOps {
    /// Empty system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a running process with a path under `/Applications`.
    pub fn add_running(&self, pid: i32, bundle_id: &str, name: &str) {
        self.running.lock().push(AppInfo {
            pid,
            bundle_id: bundle_id.into(),
            name: name.into(),
            bundle_path: Some(format!("/Applications/{name}.app")),
            is_active: false,
        });
    }

    /// Mark `pid` as the frontmost application.
    pub fn set_active(&self, pid: i32) {
        for a in self.running.lock().iter_mut() {
            a.is_active = a.pid == pid;
        }
    }

    /// Remove a process and mark it terminated.
    pub fn terminate(&self, pid: i32) {
        self.running.lock().retain(|a| a.pid != pid);
        self.terminated.lock().insert(pid);
    }

    /// Replace the Dock tiles.
    pub fn set_dock(&self, entries: Vec<DockEntry>) {
        *self.dock.lock() = entries;
    }

    /// Make Dock reads fail.
    pub fn set_fail_dock(&self, fail: bool) {
        self.fail_dock.store(fail, Ordering::SeqCst);
    }

    /// Register an installed (not necessarily running) application.
    pub fn install(&self, bundle_id: &str, path: &str, name: &str) {
        self.paths.lock().insert(bundle_id.into(), path.into());
        self.names.lock().insert(path.into(), name.into());
    }

    /// Set the front window frame for `pid`.
    pub fn set_frame(&self, pid: i32, frame: Rect) {
        self.frames.lock().insert(pid, frame);
    }

    /// Calls so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Number of calls whose name equals `name`.
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == name).count()
    }

    /// Log a call.
    fn note(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

impl AppOps for MockAppOps {
    fn running_apps(&self) -> Vec<AppInfo> {
        self.note("running_apps");
        self.running.lock().clone()
    }

    fn dock_apps(&self) -> Result<Vec<DockEntry>> {
        self.note("dock_apps");
        if self.fail_dock.load(Ordering::SeqCst) {
            return Err(Error::Backend("dock unavailable".into()));
        }
        Ok(self.dock.lock().clone())
    }

    fn bundle_path(&self, bundle_id: &str) -> Option<String> {
        self.note("bundle_path");
        self.paths.lock().get(bundle_id).cloned()
    }

    fn display_name(&self, bundle_path: &str) -> Option<String> {
        self.note("display_name");
        self.names.lock().get(bundle_path).cloned()
    }

    fn window_frames(&self) -> HashMap<i32, Rect> {
        self.note("window_frames");
        self.frames.lock().clone()
    }

    fn is_terminated(&self, pid: i32) -> bool {
        self.terminated.lock().contains(&pid)
    }

    fn pid_for_bundle(&self, bundle_id: &str) -> Option<i32> {
        self.note("pid_for_bundle");
        self.running
            .lock()
            .iter()
            .find(|a| a.bundle_id == bundle_id)
            .map(|a| a.pid)
    }
}

/// Windows of one mock process.
#[derive(Debug, Clone, Default)]
pub struct MockWindows {
    /// Focused window index.
    pub focused: Option<usize>,
    /// Main window index.
    pub main: Option<usize>,
    /// Minimized flag per window.
    pub minimized: Vec<bool>,
}

/// In-memory [`FocusBackend`].
#[derive(Clone, Default)]
pub struct MockFocusBackend {
    /// Call log, e.g. `raise:42:Main`.
    calls: Calls,
    /// Windows per pid; pids absent here are not running.
    procs: Arc<Mutex<HashMap<i32, MockWindows>>>,
    /// Every raise fails.
    fail_raise: Arc<AtomicBool>,
    /// Launch fails.
    fail_launch: Arc<AtomicBool>,
    /// Reopen fails.
    fail_reopen: Arc<AtomicBool>,
}

impl MockFocusBackend {
    /// No processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a process and its windows.
    pub fn set_windows(&self, pid: i32, windows: MockWindows) {
        self.procs.lock().insert(pid, windows);
    }

    /// Current windows for `pid`.
    pub fn windows(&self, pid: i32) -> Option<MockWindows> {
        self.procs.lock().get(&pid).cloned()
    }

    /// Make every raise fail.
    pub fn set_fail_raise(&self, fail: bool) {
        self.fail_raise.store(fail, Ordering::SeqCst);
    }

    /// Make launches fail.
    pub fn set_fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    /// Make reopen requests fail.
    pub fn set_fail_reopen(&self, fail: bool) {
        self.fail_reopen.store(fail, Ordering::SeqCst);
    }

    /// Calls so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// True if any logged call starts with `prefix`.
    pub fn calls_contains(&self, prefix: &str) -> bool {
        self.calls.lock().iter().any(|c| c.starts_with(prefix))
    }

    /// Log a call.
    fn note(&self, call: String) {
        self.calls.lock().push(call);
    }

    /// Resolve `slot` to a window index.
    fn index(w: &MockWindows, slot: WindowSlot) -> Option<usize> {
        match slot {
            WindowSlot::Focused => w.focused,
            WindowSlot::Main => w.main,
            WindowSlot::Index(i) => (i < w.minimized.len()).then_some(i),
        }
    }
}

impl FocusBackend for MockFocusBackend {
    fn window_minimized(&self, pid: i32, slot: WindowSlot) -> Result<Option<bool>> {
        self.note(format!("window_minimized:{pid}:{slot:?}"));
        let procs = self.procs.lock();
        let w = procs.get(&pid).ok_or(Error::NotRunning(pid))?;
        Ok(Self::index(w, slot).and_then(|i| w.minimized.get(i).copied()))
    }

    fn windows_minimized(&self, pid: i32) -> Result<Vec<bool>> {
        self.note(format!("windows_minimized:{pid}"));
        let procs = self.procs.lock();
        let w = procs.get(&pid).ok_or(Error::NotRunning(pid))?;
        Ok(w.minimized.clone())
    }

    fn set_minimized(&self, pid: i32, slot: WindowSlot, minimized: bool) -> Result<()> {
        self.note(format!("set_minimized:{pid}:{slot:?}:{minimized}"));
        let mut procs = self.procs.lock();
        let w = procs.get_mut(&pid).ok_or(Error::NotRunning(pid))?;
        let i = Self::index(w, slot).ok_or(Error::NoWindow)?;
        *w.minimized.get_mut(i).ok_or(Error::NoWindow)? = minimized;
        Ok(())
    }

    fn raise(&self, pid: i32, slot: WindowSlot) -> Result<()> {
        self.note(format!("raise:{pid}:{slot:?}"));
        if self.fail_raise.load(Ordering::SeqCst) {
            return Err(Error::Backend("raise refused".into()));
        }
        let procs = self.procs.lock();
        let w = procs.get(&pid).ok_or(Error::NotRunning(pid))?;
        Self::index(w, slot).map(|_| ()).ok_or(Error::NoWindow)
    }

    fn activate(&self, pid: i32) -> Result<()> {
        self.note(format!("activate:{pid}"));
        if self.procs.lock().contains_key(&pid) {
            Ok(())
        } else {
            Err(Error::NotRunning(pid))
        }
    }

    fn reopen(&self, bundle_id: &str) -> Result<()> {
        self.note(format!("reopen:{bundle_id}"));
        if self.fail_reopen.load(Ordering::SeqCst) {
            return Err(Error::Backend("reopen refused".into()));
        }
        Ok(())
    }

    fn launch(&self, bundle_id: &str) -> Result<()> {
        self.note(format!("launch:{bundle_id}"));
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(Error::Launch {
                bundle_id: bundle_id.into(),
                reason: "launch refused".into(),
            });
        }
        Ok(())
    }
}

/// What a [`RecordingSurface`] has seen.
#[derive(Debug, Default)]
struct SurfaceLog {
    /// Every rendered frame.
    frames: Vec<OverlayFrame>,
    /// Currently on screen.
    visible: bool,
    /// Hidden-to-visible transitions.
    appearances: usize,
    /// Hide calls.
    hides: usize,
    /// Cache clears.
    cache_clears: usize,
}

/// [`OverlaySurface`] that records frames instead of drawing.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    /// Shared log.
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    /// Hidden, nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while shown.
    pub fn is_visible(&self) -> bool {
        self.log.lock().visible
    }

    /// Number of times the surface went from hidden to visible.
    pub fn appearances(&self) -> usize {
        self.log.lock().appearances
    }

    /// Number of frames rendered.
    pub fn render_count(&self) -> usize {
        self.log.lock().frames.len()
    }

    /// Number of hide calls.
    pub fn hide_count(&self) -> usize {
        self.log.lock().hides
    }

    /// Most recent frame.
    pub fn last_frame(&self) -> Option<OverlayFrame> {
        self.log.lock().frames.last().cloned()
    }

    /// Number of cache clears.
    pub fn cache_clears(&self) -> usize {
        self.log.lock().cache_clears
    }
}

impl OverlaySurface for RecordingSurface {
    fn render(&mut self, frame: &OverlayFrame) {
        let mut log = self.log.lock();
        if !log.visible {
            log.visible = true;
            log.appearances += 1;
        }
        log.frames.push(frame.clone());
    }

    fn hide(&mut self) {
        let mut log = self.log.lock();
        log.visible = false;
        log.hides += 1;
    }

    fn clear_cache(&mut self) {
        self.log.lock().cache_clears += 1;
    }
}

/// [`UsageSink`] that keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// Records, oldest first.
    records: Arc<Mutex<Vec<SwitchRecord>>>,
}

impl MemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records so far.
    pub fn records(&self) -> Vec<SwitchRecord> {
        self.records.lock().clone()
    }
}

impl UsageSink for MemorySink {
    fn record_switch(&mut self, rec: SwitchRecord) {
        self.records.lock().push(rec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_store_is_a_usage_sink() {
        let mut store = StatsStore::in_memory(2);
        for key in ['1', '2', '3'] {
            store.record_switch(SwitchRecord::now("com.a", "A", key, None));
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mock_focus_reports_missing_process() {
        let b = MockFocusBackend::new();
        assert_eq!(
            b.window_minimized(5, WindowSlot::Focused),
            Err(Error::NotRunning(5))
        );
        b.set_windows(
            5,
            MockWindows {
                focused: None,
                main: Some(1),
                minimized: vec![false, true],
            },
        );
        assert_eq!(b.window_minimized(5, WindowSlot::Focused), Ok(None));
        assert_eq!(b.window_minimized(5, WindowSlot::Main), Ok(Some(true)));
        assert_eq!(b.raise(5, WindowSlot::Index(2)), Err(Error::NoWindow));
    }
}
