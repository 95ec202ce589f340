use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while preparing, running or compositing an upscale.
#[derive(Error, Debug)]
pub enum UpscaleError {
    /// No `.bin`/`.param` model pair was found
    #[error(
        "No valid models found. A valid model requires a matching .bin/.param pair with the same filename stem. Expected in: {}",
        .0.display()
    )]
    NoModels(PathBuf),

    /// The Real-ESRGAN binary is missing from the tool directory
    #[error(
        "Could not find Real-ESRGAN executable in: {}. Expected one of: realesrgan-ncnn-vulkan(.exe)",
        .0.display()
    )]
    ExecutableNotFound(PathBuf),

    /// Neither `resrgan_dir` nor `plugin_dir` was supplied
    #[error("Real-ESRGAN directory is unknown: set `resrgan_dir` or `plugin_dir`")]
    ToolDirUnknown,

    /// The external process exited unsuccessfully
    #[error("Real-ESRGAN failed ({status}).\nCommand: {command}\nstdout:\n{stdout}\n\nstderr:\n{stderr}")]
    ToolFailed {
        /// Full command line that was run
        command: String,
        /// Exit status as reported by the OS
        status: String,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The external process succeeded but wrote no image
    #[error("Real-ESRGAN produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    /// Selection scope was requested without a usable selection
    #[error("Please make a selection first.")]
    EmptySelection,

    /// A parameter is outside its accepted range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The FFI caller handed over unusable arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Params string is not valid JSON for [`crate::params::Params`]
    #[error("Invalid params: {0}")]
    Params(#[from] serde_json::Error),

    /// Encoding or decoding a temporary image failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
