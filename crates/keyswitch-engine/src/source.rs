//! Candidate enumeration.
//!
//! Running mode lists live regular-UI processes in OS order. Dock mode lists
//! Finder, then Dock tiles in Dock order, then running applications that are
//! not in the Dock. In both modes excluded bundle ids are dropped, each
//! bundle id appears once, and always-show pins that are not otherwise
//! present are appended as launchable entries.
use std::{
    collections::{HashMap, HashSet},
    iter,
};

use config::{Preferences, SourceMode};
use tracing::{debug, warn};

use crate::{
    TrackedApp,
    ops::{AppInfo, AppOps},
};

/// Finder's bundle id; always first in Dock mode.
pub const FINDER_BUNDLE_ID: &str = "com.apple.finder";

/// Name and path for an application that may not be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMeta {
    /// Display name.
    pub name: String,
    /// Bundle path.
    pub path: Option<String>,
}

/// Builds candidate lists and caches metadata for non-running apps.
#[derive(Debug, Default)]
pub struct SourceProvider {
    /// Metadata keyed by bundle id; entries are only added until [`Self::clear_cache`].
    meta: HashMap<String, AppMeta>,
}

impl SourceProvider {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop cached metadata.
    pub fn clear_cache(&mut self) {
        self.meta.clear();
    }

    /// Number of cached entries.
    pub fn cached(&self) -> usize {
        self.meta.len()
    }

    /// Enumerate candidates for `prefs`.
    pub fn candidates(&mut self, ops: &dyn AppOps, prefs: &Preferences) -> Vec<TrackedApp> {
        let running = ops.running_apps();
        let mut out = Vec::with_capacity(running.len());
        let mut seen: HashSet<String> = HashSet::new();
        let mut push = |app: TrackedApp, out: &mut Vec<TrackedApp>| {
            if prefs.is_excluded(&app.bundle_id) || !seen.insert(app.bundle_id.clone()) {
                return;
            }
            out.push(app);
        };

        let by_bundle: HashMap<&str, &AppInfo> =
            running.iter().map(|a| (a.bundle_id.as_str(), a)).collect();
        let live = |info: &AppInfo| {
            let mut a = TrackedApp::running(info.pid, info.bundle_id.clone(), info.name.clone())
                .with_icon(info.bundle_path.clone());
            a.is_active = info.is_active;
            a
        };

        if prefs.source == SourceMode::Dock {
            let dock = match ops.dock_apps() {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "dock_read_failed");
                    Vec::new()
                }
            };
            let docked = iter::once((FINDER_BUNDLE_ID.to_string(), None, None))
                .chain(dock.into_iter().map(|d| (d.bundle_id, d.label, d.path)));
            for (bundle_id, label, path) in docked {
                let app = match by_bundle.get(bundle_id.as_str()) {
                    Some(info) => live(info),
                    None => match self.resolve(ops, &bundle_id, label, path) {
                        Some(meta) => {
                            TrackedApp::launchable(bundle_id, meta.name).with_icon(meta.path)
                        }
                        None => {
                            debug!(%bundle_id, "dock_entry_unresolved");
                            continue;
                        }
                    },
                };
                push(app, &mut out);
            }
        }

        for info in &running {
            push(live(info), &mut out);
        }

        for pin in prefs.pinned.iter().filter(|p| p.always_show) {
            let meta = self.resolve(
                ops,
                &pin.bundle_id,
                Some(pin.name.clone()),
                pin.icon_path.clone(),
            );
            let (name, path) = meta.map_or((pin.name.clone(), None), |m| (m.name, m.path));
            push(
                TrackedApp::launchable(pin.bundle_id.clone(), name).with_icon(path),
                &mut out,
            );
        }

        debug!(
            source = ?prefs.source,
            running = running.len(),
            candidates = out.len(),
            "candidates_enumerated"
        );
        out
    }

    /// Metadata for a possibly non-running app: cache, then the hints given,
    /// then the OS.
    fn resolve(
        &mut self,
        ops: &dyn AppOps,
        bundle_id: &str,
        label: Option<String>,
        path: Option<String>,
    ) -> Option<AppMeta> {
        if let Some(m) = self.meta.get(bundle_id) {
            return Some(m.clone());
        }
        let path = path.or_else(|| ops.bundle_path(bundle_id));
        let name = label
            .filter(|l| !l.is_empty())
            .or_else(|| path.as_deref().and_then(|p| ops.display_name(p)))?;
        let meta = AppMeta { name, path };
        self.meta.insert(bundle_id.to_string(), meta.clone());
        Some(meta)
    }
}
