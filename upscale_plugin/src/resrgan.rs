use image::RgbaImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use crate::error::UpscaleError;
use crate::models::{discover_models, select_model};
use crate::upscaler::Upscaler;

/// Executable names tried in order inside the tool directory.
pub const EXECUTABLE_NAMES: [&str; 2] = ["realesrgan-ncnn-vulkan.exe", "realesrgan-ncnn-vulkan"];

/// Finds the Real-ESRGAN binary inside `dir`.
pub fn resolve_executable(dir: &Path) -> Result<PathBuf, UpscaleError> {
    EXECUTABLE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| UpscaleError::ExecutableNotFound(dir.to_path_buf()))
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), UpscaleError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    if mode & 0o100 == 0 {
        log::debug!("Marking {} as executable", path.display());
        perms.set_mode(mode | 0o100);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), UpscaleError> {
    Ok(())
}

/// `realesrgan-ncnn-vulkan` driven through temporary PNG files.
#[derive(Debug, Clone)]
pub struct RealEsrgan {
    executable: PathBuf,
    working_dir: PathBuf,
    model: String,
}

impl RealEsrgan {
    /// Locates the executable and a model inside `dir`.
    ///
    /// Models are looked up in `dir/models`; an unknown `requested` model
    /// falls back to the first one discovered. A relative `dir` is resolved
    /// against the current directory, since the tool is spawned inside it.
    pub fn locate(dir: &Path, requested: Option<&str>) -> Result<Self, UpscaleError> {
        let dir = std::path::absolute(dir)?;
        let dir = dir.as_path();
        let models_dir = dir.join("models");
        let models = discover_models(&models_dir);
        log::debug!("Discovered models in {}: {models:?}", models_dir.display());
        let model = select_model(&models, requested)
            .ok_or(UpscaleError::NoModels(models_dir.clone()))?
            .to_string();
        let executable = resolve_executable(dir)?;
        Ok(Self {
            executable,
            working_dir: dir.to_path_buf(),
            model,
        })
    }

    /// Model stem passed to the tool.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn command_line(&self, input: &Path, output: &Path) -> String {
        format!(
            "{} -i \"{}\" -o \"{}\" -n \"{}\"",
            self.executable.display(),
            input.display(),
            output.display(),
            self.model
        )
    }

    /// Runs the tool on files, waiting for it to exit.
    pub fn run_files(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        ensure_executable(&self.executable)?;

        log::info!("Upscaling with {}", self.model);
        let start = Instant::now();
        let result = Command::new(&self.executable)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("-n")
            .arg(&self.model)
            .current_dir(&self.working_dir)
            .output()?;

        if !result.status.success() {
            return Err(UpscaleError::ToolFailed {
                command: self.command_line(input, output),
                status: result.status.to_string(),
                stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }
        log::debug!("Real-ESRGAN finished in {:.2?}", start.elapsed());

        if !output.is_file() {
            return Err(UpscaleError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}

impl Upscaler for RealEsrgan {
    fn upscale(&self, input: &RgbaImage) -> Result<RgbaImage, UpscaleError> {
        let temp = tempfile::Builder::new().prefix("ai-upscale-").tempdir()?;
        let input_path = temp.path().join("input.png");
        let output_path = temp.path().join("output.png");

        log::debug!("Exporting {}x{} to {}", input.width(), input.height(), input_path.display());
        input.save(&input_path)?;
        self.run_files(&input_path, &output_path)?;

        log::debug!("Loading upscaled image from {}", output_path.display());
        let upscaled = image::open(&output_path)?.to_rgba8();
        Ok(upscaled)
    }
}
