use image::{RgbaImage, imageops};

use crate::params::Selection;

/// Final canvas size for `output_factor`, rounded and never zero.
pub fn output_size(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |v: u32| ((f64::from(v) * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

fn fit(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        image.clone()
    } else {
        imageops::resize(image, width, height, imageops::FilterType::Lanczos3)
    }
}

/// Resizes the canvas by `factor` and lays the upscaled result over it.
///
/// The canvas grows or shrinks from the top-left corner, so the original
/// pixels keep their position underneath the new layer.
pub fn compose_layer(original: &RgbaImage, upscaled: &RgbaImage, factor: f64) -> RgbaImage {
    let (w, h) = output_size(original.width(), original.height(), factor);
    log::info!("Compositing result at {w}x{h}");

    let mut canvas = RgbaImage::new(w, h);
    imageops::replace(&mut canvas, original, 0, 0);
    let layer = fit(upscaled, w, h);
    imageops::overlay(&mut canvas, &layer, 0, 0);
    canvas
}

/// Scales the upscaled selection back to its bounds and lays it over
/// `original` at the selection offset.
pub fn compose_selection(
    original: &RgbaImage,
    upscaled: &RgbaImage,
    selection: Selection,
) -> RgbaImage {
    log::info!(
        "Compositing into selection {}x{} at ({}, {})",
        selection.width,
        selection.height,
        selection.x,
        selection.y
    );
    let layer = fit(upscaled, selection.width, selection.height);
    let mut canvas = original.clone();
    imageops::overlay(
        &mut canvas,
        &layer,
        i64::from(selection.x),
        i64::from(selection.y),
    );
    canvas
}
