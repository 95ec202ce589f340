use image::RgbaImage;
use libloading::Library;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;

use crate::error::AppError;

/// Output buffer filled in by a plugin; layout shared with the plugin crate.
#[repr(C)]
pub struct PluginImage {
    pub width: u32,
    pub height: u32,
    pub data: *mut u8,
    pub len: usize,
}

pub type ProcessImageFn = unsafe extern "C" fn(
    width: u32,
    height: u32,
    rgba_data: *const u8,
    params: *const c_char,
    out: *mut PluginImage,
) -> i32;

pub type FreeImageFn = unsafe extern "C" fn(image: PluginImage);

pub type LastErrorFn = unsafe extern "C" fn() -> *const c_char;

pub struct Plugin {
    _lib: Library,
    name: String,
    process_image: ProcessImageFn,
    free_image: FreeImageFn,
    last_error: LastErrorFn,
}

pub fn platform_library_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.dll")
    } else if cfg!(target_os = "macos") {
        format!("lib{name}.dylib")
    } else {
        format!("lib{name}.so")
    }
}

impl Plugin {
    /// Loads a plugin from the specified directory and name
    pub fn load(plugin_dir: &Path, plugin_name: &str) -> Result<Self, AppError> {
        let lib_path = plugin_dir.join(platform_library_name(plugin_name));

        if !lib_path.exists() {
            return Err(AppError::PluginNotFound(lib_path));
        }

        log::debug!("Loading plugin from {}", lib_path.display());
        let lib = unsafe { Library::new(&lib_path)? };

        let (process_image, free_image, last_error) = unsafe {
            let process: libloading::Symbol<ProcessImageFn> = lib.get(b"process_image\0")?;
            let free: libloading::Symbol<FreeImageFn> = lib.get(b"free_image\0")?;
            let last_error: libloading::Symbol<LastErrorFn> = lib.get(b"last_error\0")?;
            (*process, *free, *last_error)
        };

        Ok(Self {
            _lib: lib,
            name: plugin_name.to_string(),
            process_image,
            free_image,
            last_error,
        })
    }

    /// Runs the plugin on `image` and returns the image it produced.
    pub fn run(&self, image: &RgbaImage, params: &CStr) -> Result<RgbaImage, AppError> {
        unsafe {
            invoke(
                &self.name,
                self.process_image,
                self.free_image,
                self.last_error,
                image,
                params,
            )
        }
    }
}

/// Byte length an RGBA8 buffer of `width`×`height` must have.
fn expected_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(4)
}

/// Calls `process_image`, copies the returned buffer and hands it back
/// through `free_image`.
///
/// # Safety
///
/// The three functions must follow the plugin ABI: on status `0` `out`
/// holds `len` readable bytes at `data` (or a null `data`), and
/// `last_error` returns null or a valid C string.
unsafe fn invoke(
    name: &str,
    process_image: ProcessImageFn,
    free_image: FreeImageFn,
    last_error: LastErrorFn,
    image: &RgbaImage,
    params: &CStr,
) -> Result<RgbaImage, AppError> {
    let (width, height) = image.dimensions();
    let mut out = PluginImage {
        width: 0,
        height: 0,
        data: std::ptr::null_mut(),
        len: 0,
    };

    let status =
        unsafe { process_image(width, height, image.as_ptr(), params.as_ptr(), &mut out) };

    if status != 0 {
        let message = unsafe {
            let ptr = last_error();
            if ptr.is_null() {
                format!("exit code {status}")
            } else {
                CStr::from_ptr(ptr).to_string_lossy().into_owned()
            }
        };
        return Err(AppError::PluginFailed {
            plugin: name.to_string(),
            message,
        });
    }

    let (out_width, out_height) = (out.width, out.height);
    let bytes = match expected_len(out_width, out_height) {
        Some(len) if len == out.len && !out.data.is_null() => {
            Some(unsafe { std::slice::from_raw_parts(out.data, out.len) }.to_vec())
        }
        _ => None,
    };
    unsafe { free_image(out) };

    let bytes = bytes.ok_or_else(|| AppError::InvalidPluginOutput(name.to_string()))?;
    RgbaImage::from_raw(out_width, out_height, bytes)
        .ok_or_else(|| AppError::InvalidPluginOutput(name.to_string()))
}
