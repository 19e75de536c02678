//! Overlay coordination.
//!
//! [`OverlayCoordinator`] owns the single [`OverlaySurface`] and the session
//! state around it. The surface only draws what it is handed: every frame it
//! receives is complete (items, geometry, highlight), so `show` can be
//! repeated without ever producing a second surface or duplicated items.
use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use config::{LayoutMode, OverlayStyle};
use tracing::{debug, trace, warn};

use crate::TrackedApp;

/// Show or hide slower than this is logged as a latency breach.
pub const LATENCY_WARN_MS: u64 = 50;

/// Screen dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1440.0,
            height: 900.0,
        }
    }
}

/// One icon plus badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayItem {
    /// Application identity.
    pub bundle_id: String,
    /// Display name.
    pub name: String,
    /// Badge character.
    pub key: char,
    /// Bundle path for the icon.
    pub icon: Option<String>,
}

/// Computed overlay geometry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayLayout {
    /// Top-left corner on screen.
    pub origin: (f32, f32),
    /// Overlay width.
    pub width: f32,
    /// Overlay height.
    pub height: f32,
    /// Icon edge length.
    pub icon_size: f32,
    /// Grid rows in use.
    pub rows: usize,
    /// Grid columns in use.
    pub cols: usize,
    /// Top-left of each item, relative to `origin`, in item order.
    pub cells: Vec<(f32, f32)>,
}

/// Everything the surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayFrame {
    /// Items in display order.
    pub items: Vec<OverlayItem>,
    /// Geometry.
    pub layout: OverlayLayout,
    /// Item drawn highlighted.
    pub highlighted: Option<char>,
}

/// The drawing side of the overlay.
pub trait OverlaySurface {
    /// Make the surface visible (if hidden) and draw `frame`.
    fn render(&mut self, frame: &OverlayFrame);
    /// Hide the surface.
    fn hide(&mut self);
    /// Drop anything cached per application, such as icon textures.
    fn clear_cache(&mut self) {}
}

/// Overlay session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Surface is on screen.
    pub visible: bool,
    /// Shown for a held chord (false once a switch is winding down).
    pub chord_held: bool,
    /// Highlighted badge.
    pub highlighted: Option<char>,
    /// Items currently drawn.
    pub snapshot: Vec<OverlayItem>,
}

/// Lay out `count` items.
///
/// Dynamic mode puts everything on one row, shrinking icons toward
/// `min_icon_size` to stay within `max_width_fraction` of the screen, and
/// wraps into more rows once the floor is reached. Grid mode uses the given
/// columns and adds rows when there are more items than cells.
pub fn layout(
    count: usize,
    mode: LayoutMode,
    style: &OverlayStyle,
    screen: ScreenSize,
) -> OverlayLayout {
    let sp = style.spacing;
    let max_w = screen.width * style.max_width_fraction;
    // Largest icon that fits `cols` columns in the width bound.
    let fit = |cols: usize| (max_w - sp) / cols as f32 - sp;

    let (rows, cols, icon) = if count == 0 {
        (0, 0, style.icon_size)
    } else {
        match mode {
            LayoutMode::Dynamic => {
                let one_row = fit(count);
                if one_row >= style.icon_size {
                    (1, count, style.icon_size)
                } else if one_row >= style.min_icon_size {
                    (1, count, one_row)
                } else {
                    let per_row = ((max_w - sp) / (style.min_icon_size + sp)).floor();
                    let cols = (per_row as usize).clamp(1, count);
                    (count.div_ceil(cols), cols, style.min_icon_size)
                }
            }
            LayoutMode::Grid { rows, cols } => {
                let cols = cols.max(1);
                let rows = rows.max(count.div_ceil(cols));
                let icon = fit(cols).min(style.icon_size).max(style.min_icon_size);
                (rows, cols, icon)
            }
        }
    };

    let width = cols as f32 * (icon + sp) + sp;
    let height = rows as f32 * (icon + sp) + sp;
    let cells = (0..count)
        .map(|i| {
            let (r, c) = (i / cols.max(1), i % cols.max(1));
            (
                sp + c as f32 * (icon + sp),
                sp + r as f32 * (icon + sp),
            )
        })
        .collect();
    OverlayLayout {
        origin: (
            ((screen.width - width) / 2.0).max(0.0),
            ((screen.height - height) / 2.0).max(0.0),
        ),
        width,
        height,
        icon_size: icon,
        rows,
        cols,
        cells,
    }
}

/// One item per assigned application identity, in list order.
pub fn items_for(apps: &[TrackedApp]) -> Vec<OverlayItem> {
    let mut seen = HashSet::new();
    apps.iter()
        .filter_map(|a| {
            let key = a.assigned_key?;
            seen.insert(a.bundle_id.as_str()).then(|| OverlayItem {
                bundle_id: a.bundle_id.clone(),
                name: a.name.clone(),
                key,
                icon: a.icon.clone(),
            })
        })
        .collect()
}

/// Owns the overlay surface and its session.
pub struct OverlayCoordinator<S> {
    /// The single surface.
    surface: S,
    /// Session state.
    session: Session,
    /// Layout mode.
    mode: LayoutMode,
    /// Sizing.
    style: OverlayStyle,
    /// Primary display size.
    screen: ScreenSize,
    /// Last computed geometry.
    layout: OverlayLayout,
    /// When the highlight reverts.
    highlight_until: Option<Instant>,
    /// Pending hide after a switch highlight.
    hide_at: Option<Instant>,
}

impl<S: OverlaySurface> OverlayCoordinator<S> {
    /// Wrap `surface`; nothing is shown.
    pub fn new(surface: S, mode: LayoutMode, style: OverlayStyle) -> Self {
        Self {
            surface,
            session: Session::default(),
            mode,
            style,
            screen: ScreenSize::default(),
            layout: OverlayLayout::default(),
            highlight_until: None,
            hide_at: None,
        }
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The surface, mutably (for drawing).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Current geometry.
    pub fn current_layout(&self) -> &OverlayLayout {
        &self.layout
    }

    /// Apply new layout preferences; re-renders when visible.
    pub fn set_style(&mut self, mode: LayoutMode, style: OverlayStyle) {
        self.mode = mode;
        self.style = style;
        self.relayout();
    }

    /// Update the primary display size; re-renders when visible.
    pub fn set_screen(&mut self, screen: ScreenSize) {
        if screen != self.screen {
            self.screen = screen;
            self.relayout();
        }
    }

    /// Show `apps`, or replace the content when already visible.
    pub fn show(&mut self, apps: &[TrackedApp]) {
        let start = Instant::now();
        self.hide_at = None;
        self.highlight_until = None;
        self.session.highlighted = None;
        self.session.chord_held = true;
        self.session.snapshot = items_for(apps);
        let was_visible = self.session.visible;
        self.session.visible = true;
        self.render();
        let ms = start.elapsed().as_millis() as u64;
        if ms > LATENCY_WARN_MS {
            warn!(ms, items = self.session.snapshot.len(), "overlay_show_slow");
        }
        debug!(
            items = self.session.snapshot.len(),
            was_visible, "overlay_shown"
        );
    }

    /// Re-lay-out visible content without a hide/show cycle.
    pub fn update_positions(&mut self, apps: &[TrackedApp]) {
        if !self.session.visible {
            return;
        }
        let items = items_for(apps);
        if items == self.session.snapshot {
            return;
        }
        self.session.snapshot = items;
        self.render();
        trace!(items = self.session.snapshot.len(), "overlay_positions_updated");
    }

    /// Highlight `key` until `duration` from `now`. Visibility is unchanged.
    pub fn highlight(&mut self, key: char, duration: Duration, now: Instant) {
        if !self.session.visible {
            return;
        }
        self.session.highlighted = Some(key);
        self.highlight_until = Some(now + duration);
        self.render();
    }

    /// Hide once `at` passes, unless shown again first.
    pub fn hide_at(&mut self, at: Instant) {
        self.session.chord_held = false;
        if self.session.visible {
            self.hide_at = Some(at);
        }
    }

    /// Hide now and reset the session.
    pub fn hide(&mut self) {
        let start = Instant::now();
        if self.session.visible {
            self.surface.hide();
        }
        self.session = Session::default();
        self.highlight_until = None;
        self.hide_at = None;
        let ms = start.elapsed().as_millis() as u64;
        if ms > LATENCY_WARN_MS {
            warn!(ms, "overlay_hide_slow");
        }
    }

    /// Expire the highlight and any pending hide.
    pub fn tick(&mut self, now: Instant) {
        if self.hide_at.is_some_and(|t| now >= t) {
            self.hide();
            return;
        }
        if self.highlight_until.is_some_and(|t| now >= t) {
            self.highlight_until = None;
            self.session.highlighted = None;
            if self.session.visible {
                self.render();
            }
        }
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.highlight_until, self.hide_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Recompute geometry and redraw if visible.
    fn relayout(&mut self) {
        if self.session.visible {
            self.render();
        }
    }

    /// Lay out the snapshot and hand a frame to the surface.
    fn render(&mut self) {
        self.layout = layout(
            self.session.snapshot.len(),
            self.mode,
            &self.style,
            self.screen,
        );
        let frame = OverlayFrame {
            items: self.session.snapshot.clone(),
            layout: self.layout.clone(),
            highlighted: self.session.highlighted,
        };
        self.surface.render(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::RecordingSurface;

    fn style() -> OverlayStyle {
        OverlayStyle {
            icon_size: 64.0,
            min_icon_size: 32.0,
            max_width_fraction: 0.5,
            spacing: 10.0,
        }
    }

    fn screen() -> ScreenSize {
        ScreenSize {
            width: 1000.0,
            height: 800.0,
        }
    }

    fn assigned(ids: &[&str]) -> Vec<TrackedApp> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let mut a = TrackedApp::running(i as i32 + 1, *id, *id);
                a.assigned_number = Some(i);
                a.assigned_key = keyswitch_keys::char_at(i);
                a
            })
            .collect()
    }

    #[test]
    fn dynamic_single_row_at_full_size() {
        let l = layout(3, LayoutMode::Dynamic, &style(), screen());
        assert_eq!((l.rows, l.cols), (1, 3));
        assert_eq!(l.icon_size, 64.0);
        assert_eq!(l.width, 3.0 * 74.0 + 10.0);
        assert_eq!(l.origin.0, (1000.0 - l.width) / 2.0);
        assert_eq!(l.cells[2], (10.0 + 2.0 * 74.0, 10.0));
    }

    #[test]
    fn dynamic_shrinks_then_wraps() {
        // 500pt budget: 8 items fit one row at 51.25pt.
        let l = layout(8, LayoutMode::Dynamic, &style(), screen());
        assert_eq!((l.rows, l.cols), (1, 8));
        assert!(l.icon_size < 64.0 && l.icon_size >= 32.0);
        assert!(l.width <= 500.0 + 0.01);

        // 20 items would need icons under the floor: wrap at 11 per row.
        let l = layout(20, LayoutMode::Dynamic, &style(), screen());
        assert_eq!(l.icon_size, 32.0);
        assert_eq!((l.rows, l.cols), (2, 11));
        assert_eq!(l.cells.len(), 20);
        assert_eq!(l.cells[11], (10.0, 52.0));
    }

    #[test]
    fn grid_grows_rows_for_overflow() {
        let l = layout(7, LayoutMode::Grid { rows: 1, cols: 3 }, &style(), screen());
        assert_eq!((l.rows, l.cols), (3, 3));
        let l = layout(2, LayoutMode::Grid { rows: 2, cols: 4 }, &style(), screen());
        assert_eq!((l.rows, l.cols), (2, 4));
        assert_eq!(l.cells.len(), 2);
    }

    #[test]
    fn empty_layout_is_a_small_box() {
        let l = layout(0, LayoutMode::Dynamic, &style(), screen());
        assert_eq!((l.rows, l.cols), (0, 0));
        assert!(l.cells.is_empty());
        assert_eq!(l.width, 10.0);
    }

    #[test]
    fn items_skip_unassigned_and_duplicates() {
        let mut apps = assigned(&["a", "b"]);
        apps.push(TrackedApp::running(9, "c", "c"));
        let mut dup = apps[0].clone();
        dup.pid = 99;
        apps.push(dup);
        let items = items_for(&apps);
        let ids: Vec<_> = items.iter().map(|i| i.bundle_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn show_is_idempotent() {
        let surface = RecordingSurface::new();
        let mut c = OverlayCoordinator::new(surface.clone(), LayoutMode::Dynamic, style());
        let apps = assigned(&["a", "b", "c"]);
        c.show(&apps);
        c.show(&apps);
        c.show(&apps);
        assert_eq!(surface.appearances(), 1);
        assert_eq!(surface.last_frame().map(|f| f.items.len()), Some(3));
        c.hide();
        assert!(!surface.is_visible());
        assert_eq!(c.session(), &Session::default());
    }

    #[test]
    fn highlight_reverts_and_pending_hide_fires() {
        let surface = RecordingSurface::new();
        let mut c = OverlayCoordinator::new(surface.clone(), LayoutMode::Dynamic, style());
        let t0 = Instant::now();
        c.show(&assigned(&["a", "b"]));
        c.highlight('2', Duration::from_millis(200), t0);
        assert_eq!(surface.last_frame().and_then(|f| f.highlighted), Some('2'));
        c.tick(t0 + Duration::from_millis(100));
        assert_eq!(c.session().highlighted, Some('2'));
        c.tick(t0 + Duration::from_millis(200));
        assert_eq!(c.session().highlighted, None);
        assert!(c.session().visible);

        c.highlight('1', Duration::from_millis(200), t0);
        c.hide_at(t0 + Duration::from_millis(200));
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(200)));
        c.tick(t0 + Duration::from_millis(250));
        assert!(!c.session().visible);
        assert!(!surface.is_visible());
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn show_cancels_pending_hide() {
        let surface = RecordingSurface::new();
        let mut c = OverlayCoordinator::new(surface.clone(), LayoutMode::Dynamic, style());
        let t0 = Instant::now();
        c.show(&assigned(&["a"]));
        c.hide_at(t0);
        c.show(&assigned(&["a"]));
        c.tick(t0 + Duration::from_secs(1));
        assert!(surface.is_visible());
    }

    #[test]
    fn update_positions_only_when_visible() {
        let surface = RecordingSurface::new();
        let mut c = OverlayCoordinator::new(surface.clone(), LayoutMode::Dynamic, style());
        c.update_positions(&assigned(&["a"]));
        assert_eq!(surface.render_count(), 0);
        c.show(&assigned(&["a"]));
        c.update_positions(&assigned(&["a", "b"]));
        assert_eq!(surface.render_count(), 2);
        assert_eq!(surface.appearances(), 1);
        c.update_positions(&assigned(&["a", "b"]));
        assert_eq!(surface.render_count(), 2);
    }
}
