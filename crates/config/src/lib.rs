//! Preferences and usage statistics for keyswitch.
//!
//! Preferences live in a RON file (`~/.keyswitch/preferences.ron` by default)
//! and are mutated only through [`PreferencesStore`], which validates and
//! persists every edit. Switch statistics are appended to a bounded JSON log
//! through [`StatsStore`].
use std::{
    env,
    path::{Path, PathBuf},
};

mod defaults;
mod error;
mod prefs;
pub mod stats;
mod store;

pub use error::{Error, Result};
pub use prefs::{LayoutMode, OverlayStyle, PinPlacement, PinnedApp, Preferences, SourceMode};
pub use stats::{StatsStore, SwitchRecord};
pub use store::{PreferencesStore, load_from_path, load_from_str};

/// Directory holding keyswitch state (`~/.keyswitch`).
pub fn default_dir() -> PathBuf {
    let mut p = PathBuf::from(env::var_os("HOME").unwrap_or_default());
    p.push(".keyswitch");
    p
}

/// Default preferences path (`~/.keyswitch/preferences.ron`).
pub fn default_preferences_path() -> PathBuf {
    default_dir().join("preferences.ron")
}

/// Statistics file kept beside the preferences file at `prefs_path`.
pub fn stats_path_for(prefs_path: &Path) -> PathBuf {
    prefs_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(default_dir)
        .join("stats.json")
}

/// Resolve the effective preferences path: `explicit` when given, else the default.
pub fn resolve_preferences_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_preferences_path)
}
