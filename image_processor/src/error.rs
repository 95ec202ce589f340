use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Input image not found: {0}")]
    InputImageNotFound(PathBuf),

    #[error("Params file not found: {0}")]
    ParamsFileNotFound(PathBuf),

    #[error("Plugin not found: {0}")]
    PluginNotFound(PathBuf),

    #[error("Plugin {plugin} failed: {message}")]
    PluginFailed { plugin: String, message: String },

    #[error("Plugin {0} returned a buffer that does not match its dimensions")]
    InvalidPluginOutput(String),

    #[error("Params must be a JSON object")]
    ParamsNotObject,

    #[error("Invalid selection {0:?}: expected X,Y,WIDTH,HEIGHT")]
    InvalidSelection(String),

    #[error("Failed to load image: {0}")]
    ImageLoadError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library load error: {0}")]
    LibraryLoad(#[from] libloading::Error),

    #[error("Invalid params JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Params contain an interior NUL byte")]
    InteriorNul(#[from] std::ffi::NulError),
}
