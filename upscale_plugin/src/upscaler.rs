use image::RgbaImage;

use crate::error::UpscaleError;

/// Anything that turns an image into a larger one.
pub trait Upscaler {
    /// Upscales `input` by the implementation's native factor.
    fn upscale(&self, input: &RgbaImage) -> Result<RgbaImage, UpscaleError>;
}
