// Defaults for preferences fields

// Capacity: the number row
pub(crate) const MAX_APPS: usize = 10;

// Timing
pub(crate) const REFRESH_THROTTLE_MS: u64 = 2000;
pub(crate) const POLL_INTERVAL_MS: u64 = 500;
pub(crate) const HIGHLIGHT_MS: u64 = 200;

// Overlay sizing, in points
pub(crate) const ICON_SIZE: f32 = 64.0;
pub(crate) const MIN_ICON_SIZE: f32 = 32.0;
pub(crate) const MAX_WIDTH_FRACTION: f32 = 0.8;
pub(crate) const SPACING: f32 = 12.0;

// Serde default functions
pub(crate) const fn default_max_apps() -> usize {
    MAX_APPS
}
pub(crate) const fn default_refresh_throttle_ms() -> u64 {
    REFRESH_THROTTLE_MS
}
pub(crate) const fn default_poll_interval_ms() -> u64 {
    POLL_INTERVAL_MS
}
pub(crate) const fn default_highlight_ms() -> u64 {
    HIGHLIGHT_MS
}
pub(crate) const fn default_icon_size() -> f32 {
    ICON_SIZE
}
pub(crate) const fn default_min_icon_size() -> f32 {
    MIN_ICON_SIZE
}
pub(crate) const fn default_max_width_fraction() -> f32 {
    MAX_WIDTH_FRACTION
}
pub(crate) const fn default_spacing() -> f32 {
    SPACING
}
