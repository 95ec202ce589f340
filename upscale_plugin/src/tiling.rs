//! Splitting large images into fixed-size tiles so the external tool only
//! ever sees inputs it can hold in GPU memory.

use image::{RgbaImage, imageops};

use crate::error::UpscaleError;
use crate::upscaler::Upscaler;

/// Tiling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingConfig {
    /// Tile edge in source pixels
    pub tile: u32,
    /// Context pixels added on each side of a tile and cropped after upscaling
    pub pad: u32,
}

/// A rectangle of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Row-major tiles covering a `width`×`height` image.
///
/// Right and bottom edge tiles are truncated to the image.
pub fn plan_tiles(width: u32, height: u32, tile: u32) -> Vec<Tile> {
    if tile == 0 {
        return Vec::new();
    }
    let mut tiles = Vec::new();
    for y in (0..height).step_by(tile as usize) {
        for x in (0..width).step_by(tile as usize) {
            tiles.push(Tile {
                x,
                y,
                width: tile.min(width - x),
                height: tile.min(height - y),
            });
        }
    }
    tiles
}

/// Upscales `image` whole, or tile by tile when it exceeds one tile.
pub fn upscale_image(
    image: &RgbaImage,
    tiling: Option<TilingConfig>,
    upscaler: &dyn Upscaler,
) -> Result<RgbaImage, UpscaleError> {
    match tiling {
        Some(cfg) if image.width() > cfg.tile || image.height() > cfg.tile => {
            upscale_tiled(image, cfg, upscaler)
        }
        _ => upscaler.upscale(image),
    }
}

/// Upscales every tile independently and stitches them at scaled offsets.
///
/// The integer scale is taken from the first tile. Tiles that come back at
/// a different size are resized to fit before stitching.
pub fn upscale_tiled(
    image: &RgbaImage,
    cfg: TilingConfig,
    upscaler: &dyn Upscaler,
) -> Result<RgbaImage, UpscaleError> {
    let (w, h) = image.dimensions();
    let tiles = plan_tiles(w, h, cfg.tile);
    if tiles.is_empty() {
        return Err(UpscaleError::InvalidInput(format!(
            "cannot tile a {w}x{h} image with tile size {}",
            cfg.tile
        )));
    }
    log::info!("Upscaling {w}x{h} in {} tiles of {}px", tiles.len(), cfg.tile);

    let mut scale: Option<u32> = None;
    let mut canvas: Option<RgbaImage> = None;

    for (index, tile) in tiles.iter().enumerate() {
        let x0p = tile.x.saturating_sub(cfg.pad);
        let y0p = tile.y.saturating_sub(cfg.pad);
        let x1p = (tile.x + tile.width).saturating_add(cfg.pad).min(w);
        let y1p = (tile.y + tile.height).saturating_add(cfg.pad).min(h);
        let (pw, ph) = (x1p - x0p, y1p - y0p);

        log::debug!("Tile {}/{} at ({}, {})", index + 1, tiles.len(), tile.x, tile.y);
        let padded = imageops::crop_imm(image, x0p, y0p, pw, ph).to_image();
        let mut out = upscaler.upscale(&padded)?;

        let s = *scale.get_or_insert_with(|| {
            let ratio = f64::from(out.width()) / f64::from(pw);
            (ratio.round() as u32).max(1)
        });

        if out.dimensions() != (pw * s, ph * s) {
            log::warn!(
                "Tile came back {}x{}, expected {}x{}; resizing",
                out.width(),
                out.height(),
                pw * s,
                ph * s
            );
            out = imageops::resize(&out, pw * s, ph * s, imageops::FilterType::Lanczos3);
        }

        let inner = imageops::crop_imm(
            &out,
            (tile.x - x0p) * s,
            (tile.y - y0p) * s,
            tile.width * s,
            tile.height * s,
        )
        .to_image();

        let target = canvas.get_or_insert_with(|| RgbaImage::new(w * s, h * s));
        imageops::replace(target, &inner, i64::from(tile.x * s), i64::from(tile.y * s));
    }

    canvas.ok_or_else(|| UpscaleError::InvalidInput("no tiles were upscaled".to_string()))
}
