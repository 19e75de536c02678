//! Application icons as RGBA pixel buffers.
use image::imageops::FilterType;
use objc2_app_kit::NSWorkspace;
use objc2_foundation::NSString;

use crate::error::{Error, Result};

/// Decoded icon pixels, row-major RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Decode encoded image bytes and scale to fit within `size`×`size`.
pub fn decode_icon(bytes: &[u8], size: u32) -> Result<IconImage> {
    let im = image::load_from_memory(bytes).map_err(|e| Error::Icon(e.to_string()))?;
    let im = if im.width() > size || im.height() > size {
        im.resize(size, size, FilterType::Triangle)
    } else {
        im
    };
    let rgba = im.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(IconImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

/// Icon for the bundle at `path`, as shown in Finder, scaled to `size`.
pub fn icon_for_path(path: &str, size: u32) -> Result<IconImage> {
    let tiff = unsafe {
        let ns = NSString::from_str(path);
        let img = NSWorkspace::sharedWorkspace().iconForFile(&ns);
        img.TIFFRepresentation()
    }
    .ok_or_else(|| Error::Icon(format!("no TIFF representation for {path}")))?;
    decode_icon(&tiff.to_vec(), size)
}
