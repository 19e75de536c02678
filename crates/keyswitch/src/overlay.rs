//! The overlay window: an egui viewport drawing the engine's latest frame.
//!
//! The engine calls [`OverlaySurface::render`] and [`OverlaySurface::hide`]
//! synchronously; those only record state. The window itself is created,
//! moved and painted in [`OverlayWindow::draw`], once per egui pass.
use std::collections::HashMap;

use egui::{
    Align2, CentralPanel, Color32, ColorImage, Context, CornerRadius, FontId, Frame, Pos2, Rect,
    Stroke, StrokeKind, TextureHandle, TextureOptions, Vec2, ViewportBuilder, ViewportCommand,
    ViewportId, pos2, vec2,
};
use keyswitch_engine::{OverlayFrame, OverlayItem, OverlaySurface};
use tracing::{debug, error};

use crate::{
    display::DisplayMetrics,
    nswindow::{apply_transparent_rounded, set_on_all_spaces},
};

/// Window title; also how the NSWindow helpers find it.
const OVERLAY_TITLE: &str = "keyswitch overlay";
/// Icon raster size requested from AppKit, in pixels.
const ICON_PX: u32 = 128;
/// Corner radius of the overlay panel.
const PANEL_RADIUS: f32 = 14.0;
/// Panel background.
const PANEL_BG: Color32 = Color32::from_rgba_premultiplied(24, 24, 28, 230);
/// Highlight ring and badge accent.
const ACCENT: Color32 = Color32::from_rgb(64, 156, 255);
/// Badge diameter as a fraction of the icon size.
const BADGE_FRACTION: f32 = 0.38;

/// Icon textures keyed by bundle id; failed loads are remembered as `None`.
#[derive(Default)]
struct IconCache {
    /// Loaded textures.
    textures: HashMap<String, Option<TextureHandle>>,
}

impl IconCache {
    /// Texture for `item`, loading it on first use.
    fn get(&mut self, ctx: &Context, item: &OverlayItem) -> Option<&TextureHandle> {
        self.textures
            .entry(item.bundle_id.clone())
            .or_insert_with(|| {
                let path = item.icon.as_deref()?;
                match mac_apps::icon_for_path(path, ICON_PX) {
                    Ok(img) => {
                        let size = [img.width as usize, img.height as usize];
                        let color = ColorImage::from_rgba_unmultiplied(size, &img.rgba);
                        Some(ctx.load_texture(
                            format!("icon:{}", item.bundle_id),
                            color,
                            TextureOptions::LINEAR,
                        ))
                    }
                    Err(e) => {
                        debug!(bundle_id = %item.bundle_id, error = %e, "icon_load_failed");
                        None
                    }
                }
            })
            .as_ref()
    }
}

/// egui-backed [`OverlaySurface`].
pub struct OverlayWindow {
    /// Stable viewport id.
    id: ViewportId,
    /// Last frame handed over by the engine.
    frame: Option<OverlayFrame>,
    /// The engine wants the overlay on screen.
    visible: bool,
    /// The viewport is currently shown.
    shown: bool,
    /// Last commanded position.
    last_pos: Option<Pos2>,
    /// Last commanded size.
    last_size: Option<Vec2>,
    /// Display geometry for placement.
    display: DisplayMetrics,
    /// Icon textures.
    icons: IconCache,
}

impl OverlayWindow {
    /// Hidden window; nothing is created until the first render.
    pub fn new(display: DisplayMetrics) -> Self {
        Self {
            id: ViewportId::from_hash_of("keyswitch_overlay"),
            frame: None,
            visible: false,
            shown: false,
            last_pos: None,
            last_size: None,
            display,
            icons: IconCache::default(),
        }
    }

    /// Replace display geometry; placement is recomputed on the next draw.
    pub fn set_display_metrics(&mut self, display: DisplayMetrics) {
        if self.display != display {
            self.display = display;
            self.last_pos = None;
        }
    }

    /// Create, move, paint or hide the viewport to match the recorded state.
    pub fn draw(&mut self, ctx: &Context) {
        let Some(frame) = self.frame.as_ref().filter(|_| self.visible) else {
            if self.shown {
                ctx.send_viewport_cmd_to(self.id, ViewportCommand::Visible(false));
                self.shown = false;
                self.last_pos = None;
            }
            return;
        };
        let layout = &frame.layout;
        let size = vec2(layout.width.max(1.0), layout.height.max(1.0));
        let pos = self.display.to_global(layout.origin);

        if self.last_pos.is_some_and(|p| p != pos) {
            ctx.send_viewport_cmd_to(self.id, ViewportCommand::OuterPosition(pos));
        }
        if self.last_size.is_some_and(|s| s != size) {
            ctx.send_viewport_cmd_to(self.id, ViewportCommand::InnerSize(size));
        }
        if !self.shown {
            ctx.send_viewport_cmd_to(self.id, ViewportCommand::Visible(true));
        }

        let mut builder = ViewportBuilder::default()
            .with_title(OVERLAY_TITLE)
            .with_decorations(false)
            .with_always_on_top()
            .with_transparent(true)
            .with_has_shadow(false)
            .with_mouse_passthrough(true)
            .with_active(false)
            .with_visible(true)
            .with_inner_size(size);
        if self.last_pos.is_none() {
            builder = builder.with_position(pos);
        }

        let icons = &mut self.icons;
        ctx.show_viewport_immediate(self.id, builder, |octx, _| {
            if let Err(e) = apply_transparent_rounded(OVERLAY_TITLE, f64::from(PANEL_RADIUS)) {
                error!(error = %e, "overlay_window_style_failed");
            }
            if let Err(e) = set_on_all_spaces(OVERLAY_TITLE) {
                error!(error = %e, "overlay_window_spaces_failed");
            }
            let panel = Frame::default()
                .fill(PANEL_BG)
                .corner_radius(CornerRadius::same(PANEL_RADIUS as u8));
            CentralPanel::default().frame(panel).show(octx, |ui| {
                let base = ui.max_rect().min;
                for (item, cell) in frame.items.iter().zip(&layout.cells) {
                    let rect = Rect::from_min_size(
                        base + vec2(cell.0, cell.1),
                        Vec2::splat(layout.icon_size),
                    );
                    let texture = icons.get(octx, item);
                    paint_item(
                        ui,
                        rect,
                        item,
                        texture,
                        frame.highlighted == Some(item.key),
                    );
                }
            });
        });

        self.shown = true;
        self.last_pos = Some(pos);
        self.last_size = Some(size);
    }
}

/// Paint one icon with its badge.
fn paint_item(
    ui: &egui::Ui,
    rect: Rect,
    item: &OverlayItem,
    texture: Option<&TextureHandle>,
    highlighted: bool,
) {
    let painter = ui.painter();
    let icon = rect.size().x;
    match texture {
        Some(tex) => {
            painter.image(
                tex.id(),
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        None => {
            painter.rect_filled(rect, CornerRadius::same(8), Color32::from_gray(70));
            let initial = item.name.chars().next().unwrap_or('?').to_string();
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                initial,
                FontId::proportional(icon * 0.5),
                Color32::WHITE,
            );
        }
    }
    if highlighted {
        painter.rect_stroke(
            rect.expand(3.0),
            CornerRadius::same(10),
            Stroke::new(3.0, ACCENT),
            StrokeKind::Outside,
        );
    }
    let r = icon * BADGE_FRACTION / 2.0;
    let center = rect.right_bottom() - vec2(r * 0.8, r * 0.8);
    painter.circle_filled(
        center,
        r,
        if highlighted {
            ACCENT
        } else {
            Color32::from_black_alpha(200)
        },
    );
    painter.text(
        center,
        Align2::CENTER_CENTER,
        item.key.to_string(),
        FontId::monospace(r * 1.2),
        Color32::WHITE,
    );
}

impl OverlaySurface for OverlayWindow {
    fn render(&mut self, frame: &OverlayFrame) {
        self.frame = Some(frame.clone());
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn clear_cache(&mut self) {
        self.icons.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_records_state_without_drawing() {
        let mut w = OverlayWindow::new(DisplayMetrics::default());
        w.render(&OverlayFrame::default());
        assert!(w.visible);
        assert!(w.frame.is_some());
        w.hide();
        assert!(!w.visible);
        assert!(!w.shown);
        w.icons.textures.insert("com.a".into(), None);
        w.clear_cache();
        assert!(w.icons.textures.is_empty());
    }
}
