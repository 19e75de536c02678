//! Durable preferences: load once, persist on every mutation.
use std::{
    fs, io, mem,
    path::{Path, PathBuf},
};

use keyswitch_keys::index_of_char;
use ron::ser::PrettyConfig;
use tracing::{debug, warn};

use crate::{
    PinnedApp, Preferences,
    error::{Error, Result},
};

/// Parse preferences from RON text. Out-of-range values are clamped and logged.
pub fn load_from_str(text: &str) -> Result<Preferences> {
    let mut prefs: Preferences = ron::from_str(text).map_err(|e| Error::Parse {
        path: None,
        message: e.to_string(),
    })?;
    for note in prefs.sanitize() {
        warn!(%note, "preferences_value_clamped");
    }
    Ok(prefs)
}

/// Load preferences from `path`.
pub fn load_from_path(path: &Path) -> Result<Preferences> {
    let text = fs::read_to_string(path).map_err(|e| Error::Read {
        path: Some(path.to_path_buf()),
        message: e.to_string(),
    })?;
    load_from_str(&text).map_err(|e| e.with_path(path))
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let to_err = |e: io::Error| Error::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).map_err(to_err)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).map_err(to_err)?;
    fs::rename(&tmp, path).map_err(to_err)
}

/// Preferences bound to a file.
///
/// Every mutation is validated against the edited copy before it is
/// persisted and committed; a rejected edit leaves both memory and disk as
/// they were.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    /// Backing file.
    path: PathBuf,
    /// Current snapshot.
    prefs: Preferences,
}

impl PreferencesStore {
    /// Open the store at `path`. A missing file yields defaults; nothing is
    /// written until the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let prefs = if path.exists() {
            load_from_path(&path)?
        } else {
            debug!(path = %path.display(), "preferences_missing_using_defaults");
            Preferences::default()
        };
        Ok(Self { path, prefs })
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current preferences.
    pub fn get(&self) -> &Preferences {
        &self.prefs
    }

    /// Re-read the file; returns true when the preferences changed.
    pub fn reload(&mut self) -> Result<bool> {
        let fresh = if self.path.exists() {
            load_from_path(&self.path)?
        } else {
            Preferences::default()
        };
        let changed = fresh != self.prefs;
        self.prefs = fresh;
        Ok(changed)
    }

    /// Persist the current snapshot.
    pub fn save(&self) -> Result<()> {
        let text =
            ron::ser::to_string_pretty(&self.prefs, PrettyConfig::default()).map_err(|e| {
                Error::Write {
                    path: self.path.clone(),
                    message: e.to_string(),
                }
            })?;
        write_atomic(&self.path, &text)
    }

    /// Apply `f` to a copy, validate, persist, then commit.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut next = self.prefs.clone();
        f(&mut next);
        next.validate().map_err(|e| e.with_path(&self.path))?;
        let prev = mem::replace(&mut self.prefs, next);
        if let Err(e) = self.save() {
            self.prefs = prev;
            return Err(e);
        }
        Ok(())
    }

    /// Pin an application, replacing an existing pin with the same bundle id
    /// in place.
    pub fn pin(&mut self, app: PinnedApp) -> Result<()> {
        self.update(|p| match p.pinned.iter_mut().find(|x| x.bundle_id == app.bundle_id) {
            Some(slot) => *slot = app,
            None => p.pinned.push(app),
        })
    }

    /// Remove a pin; returns whether one existed.
    pub fn unpin(&mut self, bundle_id: &str) -> Result<bool> {
        if self.prefs.pin(bundle_id).is_none() {
            return Ok(false);
        }
        self.update(|p| p.pinned.retain(|x| x.bundle_id != bundle_id))?;
        Ok(true)
    }

    /// Set or clear a pin's custom shortcut.
    ///
    /// Rejects characters outside the key sequence and shortcuts already held
    /// by another pin.
    pub fn set_custom_shortcut(&mut self, bundle_id: &str, shortcut: Option<char>) -> Result<()> {
        if self.prefs.pin(bundle_id).is_none() {
            return Err(Error::Validation {
                path: Some(self.path.clone()),
                problems: vec![format!("{bundle_id} is not pinned")],
            });
        }
        if let Some(ch) = shortcut
            && index_of_char(ch).is_none()
        {
            return Err(Error::Validation {
                path: Some(self.path.clone()),
                problems: vec![format!("shortcut {ch:?} is not a switcher key")],
            });
        }
        self.update(|p| {
            if let Some(pin) = p.pinned.iter_mut().find(|x| x.bundle_id == bundle_id) {
                pin.custom_shortcut = shortcut;
            }
        })
    }

    /// Exclude an application from the candidate list.
    pub fn exclude(&mut self, bundle_id: &str) -> Result<()> {
        if self.prefs.is_excluded(bundle_id) {
            return Ok(());
        }
        self.update(|p| p.excluded.push(bundle_id.to_string()))
    }

    /// Remove an exclusion.
    pub fn include(&mut self, bundle_id: &str) -> Result<()> {
        if !self.prefs.is_excluded(bundle_id) {
            return Ok(());
        }
        self.update(|p| p.excluded.retain(|b| b != bundle_id))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::SourceMode;

    fn store() -> (TempDir, PreferencesStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = PreferencesStore::open(dir.path().join("nested").join("prefs.ron")).expect("open");
        (dir, s)
    }

    #[test]
    fn missing_file_yields_defaults_without_writing() {
        let (_dir, s) = store();
        assert_eq!(s.get(), &Preferences::default());
        assert!(!s.path().exists());
    }

    #[test]
    fn mutations_persist_and_reload() {
        let (_dir, mut s) = store();
        s.update(|p| {
            p.source = SourceMode::Dock;
            p.max_apps = 20;
        })
        .expect("update");
        s.pin(PinnedApp::new("com.apple.Safari", "Safari"))
            .expect("pin");
        s.set_custom_shortcut("com.apple.Safari", Some('w'))
            .expect("shortcut");
        s.exclude("com.apple.Music").expect("exclude");
        assert!(s.path().exists());

        let reopened = PreferencesStore::open(s.path()).expect("reopen");
        assert_eq!(reopened.get(), s.get());
        assert_eq!(reopened.get().source, SourceMode::Dock);
        assert_eq!(
            reopened.get().pin("com.apple.Safari").and_then(|p| p.custom_shortcut),
            Some('w')
        );
        assert!(reopened.get().is_excluded("com.apple.Music"));
    }

    #[test]
    fn duplicate_shortcut_rejected_at_edit_time() {
        let (_dir, mut s) = store();
        s.pin(PinnedApp::new("com.a", "A")).expect("pin a");
        s.pin(PinnedApp::new("com.b", "B")).expect("pin b");
        s.set_custom_shortcut("com.a", Some('q')).expect("a=q");
        let err = s
            .set_custom_shortcut("com.b", Some('q'))
            .expect_err("duplicate");
        assert!(err.to_string().contains("already used by com.a"));
        assert_eq!(s.get().pin("com.b").and_then(|p| p.custom_shortcut), None);

        let reopened = PreferencesStore::open(s.path()).expect("reopen");
        assert_eq!(reopened.get().pin("com.b").and_then(|p| p.custom_shortcut), None);
    }

    #[test]
    fn invalid_shortcut_and_unknown_pin_rejected() {
        let (_dir, mut s) = store();
        assert!(s.set_custom_shortcut("com.none", Some('q')).is_err());
        s.pin(PinnedApp::new("com.a", "A")).expect("pin");
        assert!(s.set_custom_shortcut("com.a", Some('!')).is_err());
        assert_eq!(s.get().pin("com.a").and_then(|p| p.custom_shortcut), None);
    }

    #[test]
    fn pin_replaces_in_place_and_unpin_removes() {
        let (_dir, mut s) = store();
        s.pin(PinnedApp::new("com.a", "A")).expect("pin a");
        s.pin(PinnedApp::new("com.b", "B")).expect("pin b");
        let mut a2 = PinnedApp::new("com.a", "A2");
        a2.always_show = true;
        s.pin(a2).expect("repin a");
        let ids: Vec<_> = s.get().pinned.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(ids, vec!["A2", "B"]);
        assert!(s.unpin("com.a").expect("unpin"));
        assert!(!s.unpin("com.a").expect("unpin again"));
        assert_eq!(s.get().pinned.len(), 1);
    }

    #[test]
    fn include_reverses_exclude() {
        let (_dir, mut s) = store();
        s.exclude("com.x").expect("exclude");
        s.exclude("com.x").expect("exclude twice");
        assert_eq!(s.get().excluded, vec!["com.x".to_string()]);
        s.include("com.x").expect("include");
        assert!(s.get().excluded.is_empty());
    }

    #[test]
    fn rejected_update_leaves_state() {
        let (_dir, mut s) = store();
        let err = s.update(|p| p.max_apps = 99).expect_err("too many");
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(s.get().max_apps, 10);
    }

    #[test]
    fn load_clamps_out_of_range_capacity() {
        let p = load_from_str("(max_apps: 200)").expect("parse");
        assert_eq!(p.max_apps, 47);
    }

    #[test]
    fn parse_error_carries_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.ron");
        fs::write(&path, "(max_apps: )").expect("write");
        let err = load_from_path(&path).expect_err("bad");
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(err.pretty().contains("bad.ron"));
    }

    #[test]
    fn reload_detects_external_edits() {
        let (_dir, mut s) = store();
        s.exclude("com.x").expect("exclude");
        assert!(!s.reload().expect("reload"));
        fs::write(s.path(), "(max_apps: 3)").expect("write");
        assert!(s.reload().expect("reload"));
        assert_eq!(s.get().max_apps, 3);
    }
}
