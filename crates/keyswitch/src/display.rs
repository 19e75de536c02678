//! Primary display geometry for overlay placement.

use egui::{Pos2, pos2};
use keyswitch_engine::ScreenSize;
use objc2_app_kit::NSScreen;
use objc2_foundation::MainThreadMarker;

/// Fallback used before AppKit reports any screen.
const DEFAULT_FRAME: DisplayFrame = DisplayFrame {
    x: 0.0,
    y: 0.0,
    width: 1440.0,
    height: 900.0,
};

/// A screen rectangle in AppKit points (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// Geometry of the primary display (the one holding the menu bar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    /// Primary display frame.
    primary: DisplayFrame,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            primary: DEFAULT_FRAME,
        }
    }
}

impl DisplayMetrics {
    /// Query AppKit. Falls back to defaults off the main thread or when no
    /// screen is attached.
    #[must_use]
    pub fn current() -> Self {
        let Some(mtm) = MainThreadMarker::new() else {
            return Self::default();
        };
        let screens = NSScreen::screens(mtm);
        let Some(screen) = screens.iter().next() else {
            return Self::default();
        };
        let fr = screen.frame();
        Self {
            primary: DisplayFrame {
                x: fr.origin.x as f32,
                y: fr.origin.y as f32,
                width: fr.size.width as f32,
                height: fr.size.height as f32,
            },
        }
    }

    /// Size handed to the overlay layout.
    #[must_use]
    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize {
            width: self.primary.width,
            height: self.primary.height,
        }
    }

    /// Convert a point relative to the primary display's top-left corner into
    /// the global top-left coordinates egui uses for window placement.
    #[must_use]
    pub fn to_global(&self, (x, y): (f32, f32)) -> Pos2 {
        // The primary display's top edge is y = 0 in top-left space.
        pos2(self.primary.x + x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_conversion() {
        let m = DisplayMetrics::default();
        assert_eq!(m.screen_size(), ScreenSize::default());
        assert_eq!(m.to_global((100.0, 50.0)), pos2(100.0, 50.0));
    }
}
