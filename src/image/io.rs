//! I/O helpers for PIV recordings, masks and JSON.
//!
//! - `load_grayscale_image`: read a TIFF/PNG/etc. into an `ImageF32` in `[0, 1]`.
//! - `load_mask_image`: read a mask image; dark pixels are excluded.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageF32, Mask};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert to normalized grayscale.
///
/// Decoding goes through 16-bit luma so 12/16-bit camera frames keep their
/// dynamic range.
pub fn load_grayscale_image(path: &Path) -> Result<ImageF32, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma16();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img
        .into_raw()
        .into_iter()
        .map(|px| px as f32 / u16::MAX as f32)
        .collect();
    ImageF32::from_vec(width, height, data)
        .map_err(|e| format!("Failed to decode {}: {e}", path.display()))
}

/// Load a mask image; pixels darker than mid-gray mark excluded regions.
pub fn load_mask_image(path: &Path) -> Result<Mask, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open mask {}: {e}", path.display()))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img.into_raw().into_iter().map(|px| px < 128).collect();
    Mask::from_vec(width, height, data)
        .map_err(|e| format!("Failed to decode mask {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
