//! Preference types and their validation.
use std::collections::{HashMap, HashSet};

use keyswitch_keys::{SEQUENCE_LEN, Trigger, index_of_char};
use serde::{Deserialize, Serialize};

use crate::{
    defaults::*,
    error::{Error, Result},
};

/// Where candidate applications come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Live processes with a regular UI presence.
    #[default]
    Running,
    /// Dock tiles (Finder first), then running apps not in the Dock.
    Dock,
}

/// Whether pinned applications go before or after unpinned ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinPlacement {
    /// Pins first.
    #[default]
    Front,
    /// Pins last.
    Back,
}

impl PinPlacement {
    /// True when pins are placed ahead of unpinned applications.
    pub fn pinned_first(self) -> bool {
        matches!(self, Self::Front)
    }
}

/// Overlay grid shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Row-wrapping grid bounded by a fraction of the screen width.
    #[default]
    Dynamic,
    /// Fixed grid.
    Grid {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
}

/// Overlay sizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Preferred icon edge length.
    pub icon_size: f32,
    /// Icons never shrink below this.
    pub min_icon_size: f32,
    /// Maximum overlay width as a fraction of the screen width.
    pub max_width_fraction: f32,
    /// Gap between items and around the edge.
    pub spacing: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            icon_size: default_icon_size(),
            min_icon_size: default_min_icon_size(),
            max_width_fraction: default_max_width_fraction(),
            spacing: default_spacing(),
        }
    }
}

/// A user-pinned application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedApp {
    /// Bundle identifier; the pin's identity.
    pub bundle_id: String,
    /// Display name.
    pub name: String,
    /// Bundle path used to resolve the icon when the app is not running.
    #[serde(default)]
    pub icon_path: Option<String>,
    /// Fixed shortcut character, drawn from the key sequence.
    #[serde(default)]
    pub custom_shortcut: Option<char>,
    /// Keep a slot even beyond capacity.
    #[serde(default)]
    pub always_show: bool,
}

impl PinnedApp {
    /// A plain pin with no shortcut and no always-show flag.
    pub fn new(bundle_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            name: name.into(),
            icon_path: None,
            custom_shortcut: None,
            always_show: false,
        }
    }

    /// Sequence index of the custom shortcut, if it has a valid one.
    pub fn shortcut_index(&self) -> Option<usize> {
        self.custom_shortcut.and_then(index_of_char)
    }
}

/// Switcher preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Candidate source.
    pub source: SourceMode,
    /// Capacity: how many applications receive a shortcut.
    #[serde(default = "default_max_apps")]
    pub max_apps: usize,
    /// Pinned applications in declaration order.
    pub pinned: Vec<PinnedApp>,
    /// Bundle identifiers that never appear.
    pub excluded: Vec<String>,
    /// Pin placement relative to unpinned applications.
    pub pin_placement: PinPlacement,
    /// Overlay grid shape.
    pub layout: LayoutMode,
    /// Chord that shows the overlay.
    pub trigger: Trigger,
    /// Chord presses within this window reuse the previous enumeration.
    #[serde(default = "default_refresh_throttle_ms")]
    pub refresh_throttle_ms: u64,
    /// Window geometry and liveness poll period.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a selected item stays highlighted.
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    /// Overlay sizing.
    pub overlay: OverlayStyle,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            source: SourceMode::default(),
            max_apps: default_max_apps(),
            pinned: Vec::new(),
            excluded: Vec::new(),
            pin_placement: PinPlacement::default(),
            layout: LayoutMode::default(),
            trigger: Trigger::default(),
            refresh_throttle_ms: default_refresh_throttle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            highlight_ms: default_highlight_ms(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl Preferences {
    /// Look up a pin by bundle identifier.
    pub fn pin(&self, bundle_id: &str) -> Option<&PinnedApp> {
        self.pinned.iter().find(|p| p.bundle_id == bundle_id)
    }

    /// True when `bundle_id` is excluded.
    pub fn is_excluded(&self, bundle_id: &str) -> bool {
        self.excluded.iter().any(|b| b == bundle_id)
    }

    /// Every semantic problem, in field order. Empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.max_apps > SEQUENCE_LEN {
            out.push(format!(
                "max_apps is {} but at most {} shortcuts exist",
                self.max_apps, SEQUENCE_LEN
            ));
        }
        let mut seen_pins = HashSet::new();
        let mut shortcut_owner: HashMap<usize, &str> = HashMap::new();
        for p in &self.pinned {
            if !seen_pins.insert(p.bundle_id.as_str()) {
                out.push(format!("{} is pinned more than once", p.bundle_id));
                continue;
            }
            if let Some(ch) = p.custom_shortcut {
                match index_of_char(ch) {
                    None => out.push(format!(
                        "{}: shortcut {:?} is not a switcher key",
                        p.bundle_id, ch
                    )),
                    Some(idx) => {
                        if let Some(owner) = shortcut_owner.get(&idx) {
                            out.push(format!(
                                "{}: shortcut {:?} is already used by {}",
                                p.bundle_id, ch, owner
                            ));
                        } else {
                            shortcut_owner.insert(idx, &p.bundle_id);
                        }
                    }
                }
            }
        }
        if let LayoutMode::Grid { rows, cols } = self.layout
            && (rows == 0 || cols == 0)
        {
            out.push(format!("grid layout {rows}x{cols} has no cells"));
        }
        if self.poll_interval_ms == 0 {
            out.push("poll_interval_ms must be positive".to_string());
        }
        let o = &self.overlay;
        if !(o.min_icon_size > 0.0 && o.min_icon_size <= o.icon_size) {
            out.push(format!(
                "overlay sizes must satisfy 0 < min_icon_size ({}) <= icon_size ({})",
                o.min_icon_size, o.icon_size
            ));
        }
        if !(o.max_width_fraction > 0.0 && o.max_width_fraction <= 1.0) {
            out.push(format!(
                "overlay max_width_fraction {} must be in (0, 1]",
                o.max_width_fraction
            ));
        }
        if o.spacing < 0.0 {
            out.push(format!("overlay spacing {} is negative", o.spacing));
        }
        out
    }

    /// Fail with every problem found.
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                path: None,
                problems,
            })
        }
    }

    /// Clamp out-of-range values in place; returns a note per fix.
    ///
    /// Duplicate or unknown shortcuts are left alone: assignment tolerates them.
    pub fn sanitize(&mut self) -> Vec<String> {
        let mut notes = Vec::new();
        if self.max_apps > SEQUENCE_LEN {
            notes.push(format!("max_apps {} clamped to {}", self.max_apps, SEQUENCE_LEN));
            self.max_apps = SEQUENCE_LEN;
        }
        if self.poll_interval_ms == 0 {
            notes.push(format!("poll_interval_ms reset to {POLL_INTERVAL_MS}"));
            self.poll_interval_ms = POLL_INTERVAL_MS;
        }
        if let LayoutMode::Grid { rows, cols } = self.layout
            && (rows == 0 || cols == 0)
        {
            notes.push(format!("grid layout {rows}x{cols} replaced by dynamic"));
            self.layout = LayoutMode::Dynamic;
        }
        let o = &mut self.overlay;
        if o.icon_size.is_nan() || o.icon_size <= 0.0 {
            notes.push(format!("overlay icon_size reset to {ICON_SIZE}"));
            o.icon_size = ICON_SIZE;
        }
        if !(o.min_icon_size > 0.0 && o.min_icon_size <= o.icon_size) {
            let floor = MIN_ICON_SIZE.min(o.icon_size);
            notes.push(format!("overlay min_icon_size reset to {floor}"));
            o.min_icon_size = floor;
        }
        if !(o.max_width_fraction > 0.0 && o.max_width_fraction <= 1.0) {
            notes.push(format!(
                "overlay max_width_fraction reset to {MAX_WIDTH_FRACTION}"
            ));
            o.max_width_fraction = MAX_WIDTH_FRACTION;
        }
        if o.spacing < 0.0 {
            notes.push("overlay spacing clamped to 0".to_string());
            o.spacing = 0.0;
        }
        notes
    }
}
