use serde::Deserialize;
use std::path::PathBuf;

use crate::error::UpscaleError;

/// Smallest accepted `output_factor`.
pub const MIN_OUTPUT_FACTOR: f64 = 0.05;
/// Largest accepted `output_factor`.
pub const MAX_OUTPUT_FACTOR: f64 = 8.0;

/// Rectangular selection in image pixel coordinates.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Selection {
    /// Intersects the selection with a `width`×`height` image.
    ///
    /// Returns `None` when nothing of the selection lies inside the image.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Selection> {
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        if self.x >= x1 || self.y >= y1 {
            return None;
        }
        Some(Selection {
            x: self.x,
            y: self.y,
            width: x1 - self.x,
            height: y1 - self.y,
        })
    }
}

/// Upscale command parameters, decoded from the JSON string the host passes.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    /// Model stem handed to the tool as `-n`
    pub model: Option<String>,
    /// Final canvas size relative to the original (layer scope)
    pub output_factor: f64,
    /// Only upscale the selected rectangle
    pub selection_only: bool,
    /// Selection bounds, injected by the host
    pub selection: Option<Selection>,
    /// Tile edge in source pixels; `None` disables tiling
    pub tile_size: Option<u32>,
    /// Context pixels added around every tile
    pub tile_padding: u32,
    /// Directory holding the executable and `models/`
    pub resrgan_dir: Option<PathBuf>,
    /// Directory the plugin library was loaded from, injected by the host
    pub plugin_dir: Option<PathBuf>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            model: None,
            output_factor: 1.0,
            selection_only: false,
            selection: None,
            tile_size: None,
            tile_padding: 0,
            resrgan_dir: None,
            plugin_dir: None,
        }
    }
}

impl Params {
    /// Parses params; blank input yields the defaults.
    pub fn from_json(text: &str) -> Result<Self, UpscaleError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let params: Params = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), UpscaleError> {
        if !self.output_factor.is_finite()
            || !(MIN_OUTPUT_FACTOR..=MAX_OUTPUT_FACTOR).contains(&self.output_factor)
        {
            return Err(UpscaleError::InvalidParameter(format!(
                "output_factor must be within {MIN_OUTPUT_FACTOR}..={MAX_OUTPUT_FACTOR}, got {}",
                self.output_factor
            )));
        }
        if self.tile_size == Some(0) {
            return Err(UpscaleError::InvalidParameter(
                "tile_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding `realesrgan-ncnn-vulkan` and its `models/` folder.
    pub fn tool_dir(&self) -> Result<PathBuf, UpscaleError> {
        match (&self.resrgan_dir, &self.plugin_dir) {
            (Some(dir), _) => Ok(dir.clone()),
            (None, Some(plugin_dir)) => Ok(plugin_dir.join("resrgan")),
            (None, None) => Err(UpscaleError::ToolDirUnknown),
        }
    }
}
