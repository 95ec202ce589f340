use image::{RgbaImage, imageops};

use crate::compose::{compose_layer, compose_selection};
use crate::error::UpscaleError;
use crate::params::Params;
use crate::resrgan::RealEsrgan;
use crate::tiling::{TilingConfig, upscale_image};
use crate::upscaler::Upscaler;

/// Runs the whole command with the Real-ESRGAN binary found via `params`.
pub fn run(image: &RgbaImage, params: &Params) -> Result<RgbaImage, UpscaleError> {
    params.validate()?;
    let tool_dir = params.tool_dir()?;
    let esrgan = RealEsrgan::locate(&tool_dir, params.model.as_deref())?;
    let result = upscale(image, params, &esrgan)?;
    log::info!("AI upscaling complete");
    Ok(result)
}

/// Upscales the image or its selection and composites the result.
pub fn upscale(
    image: &RgbaImage,
    params: &Params,
    upscaler: &dyn Upscaler,
) -> Result<RgbaImage, UpscaleError> {
    let tiling = params.tile_size.map(|tile| TilingConfig {
        tile,
        pad: params.tile_padding,
    });

    if params.selection_only {
        let selection = params
            .selection
            .and_then(|s| s.clamp_to(image.width(), image.height()))
            .ok_or(UpscaleError::EmptySelection)?;

        log::info!("Exporting selection");
        let region = imageops::crop_imm(
            image,
            selection.x,
            selection.y,
            selection.width,
            selection.height,
        )
        .to_image();
        let upscaled = upscale_image(&region, tiling, upscaler)?;
        Ok(compose_selection(image, &upscaled, selection))
    } else {
        log::info!("Exporting layer");
        let upscaled = upscale_image(image, tiling, upscaler)?;
        Ok(compose_layer(image, &upscaled, params.output_factor))
    }
}
