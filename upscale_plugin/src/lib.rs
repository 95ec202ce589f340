//! Real-ESRGAN upscale plugin for image processing application

#![warn(missing_docs)]

pub mod compose;
pub mod error;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod resrgan;
pub mod tiling;
pub mod upscaler;

use error::UpscaleError;
use image::RgbaImage;
use params::Params;
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

/// Image buffer handed back to the host.
///
/// `data` points to `len` bytes of RGBA8 pixels owned by the plugin; the
/// host must return it through [`free_image`].
#[repr(C)]
#[derive(Debug)]
pub struct PluginImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data, RGBA8
    pub data: *mut u8,
    /// Length of `data` in bytes
    pub len: usize,
}

impl PluginImage {
    /// An image with no pixels.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: std::ptr::null_mut(),
            len: 0,
        }
    }

    fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let boxed = image.into_raw().into_boxed_slice();
        let len = boxed.len();
        let data = Box::into_raw(boxed) as *mut u8;
        Self {
            width,
            height,
            data,
            len,
        }
    }
}

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

fn set_last_error(message: &str) {
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Message describing the last failure of [`process_image`] on this thread.
///
/// The pointer stays valid until the next call to [`process_image`] on the
/// same thread.
#[unsafe(no_mangle)]
pub extern "C" fn last_error() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}

/// Upscales an image with Real-ESRGAN and writes the composited result to `out`.
///
/// Returns `0` on success and `-1` on failure, in which case [`last_error`]
/// explains what went wrong.
///
/// # Safety
///
/// - `data` must point to at least `width * height * 4` readable bytes
///   (RGBA8) for the duration of the call; it may be null only if the
///   image is empty.
/// - `params` must be either a null pointer or a valid null-terminated
///   C string holding JSON.
/// - `out` must be a valid, writable pointer. On success it receives a
///   buffer that must be released with [`free_image`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn process_image(
    width: u32,
    height: u32,
    data: *const u8,
    params: *const c_char,
    out: *mut PluginImage,
) -> i32 {
    let _ = env_logger::try_init();

    if out.is_null() {
        set_last_error("output pointer is null");
        return -1;
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        process(width, height, data, params)
    }));

    match result {
        Ok(Ok(image)) => {
            unsafe { out.write(PluginImage::from_rgba(image)) };
            set_last_error("");
            0
        }
        Ok(Err(err)) => {
            log::error!("Upscaling failed: {err}");
            set_last_error(&format!("Upscaling failed: {err}"));
            -1
        }
        Err(_) => {
            set_last_error("Upscaling failed: plugin panicked");
            -1
        }
    }
}

/// Byte length of a `width`×`height` RGBA8 buffer, if it fits in `usize`.
fn rgba_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(4)
}

unsafe fn process(
    width: u32,
    height: u32,
    data: *const u8,
    params: *const c_char,
) -> Result<RgbaImage, UpscaleError> {
    let len = rgba_len(width, height)
        .ok_or_else(|| UpscaleError::InvalidInput(format!("image {width}x{height} is too large")))?;
    if len == 0 {
        return Err(UpscaleError::InvalidInput("image is empty".to_string()));
    }
    if data.is_null() {
        return Err(UpscaleError::InvalidInput("pixel pointer is null".to_string()));
    }

    let params_str = if params.is_null() {
        ""
    } else {
        unsafe { CStr::from_ptr(params) }
            .to_str()
            .map_err(|_| UpscaleError::InvalidInput("params are not valid UTF-8".to_string()))?
    };
    let params = Params::from_json(params_str)?;

    let pixels = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();
    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| UpscaleError::InvalidInput("pixel buffer size mismatch".to_string()))?;

    pipeline::run(&image, &params)
}

/// Releases a buffer produced by [`process_image`].
///
/// # Safety
///
/// `image` must come from a successful [`process_image`] call and must not
/// be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_image(image: PluginImage) {
    if image.data.is_null() {
        return;
    }
    unsafe {
        let slice = std::ptr::slice_from_raw_parts_mut(image.data, image.len);
        drop(Box::from_raw(slice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Вызывает FFI-функцию, передавая параметры как JSON-строку
    unsafe fn call_process_image(
        width: u32,
        height: u32,
        data: &[u8],
        params_json: Option<&str>,
        out: &mut PluginImage,
    ) -> i32 {
        let params = params_json.map(|json| CString::new(json).unwrap());
        let params_ptr = params.as_ref().map_or(std::ptr::null(), |p| p.as_ptr());
        unsafe { process_image(width, height, data.as_ptr(), params_ptr, out) }
    }

    fn last_error_string() -> String {
        unsafe { CStr::from_ptr(last_error()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_overflow_prevention() {
        let dummy = [0u8; 4];
        let mut out = PluginImage::empty();
        let result = unsafe { call_process_image(u32::MAX, u32::MAX, &dummy, None, &mut out) };
        assert_eq!(result, -1);
        assert!(last_error_string().contains("too large"));
        assert!(out.data.is_null());
    }

    #[test]
    fn test_rgba_len_uses_pointer_width() {
        assert_eq!(rgba_len(3, 2), Some(24));
        assert_eq!(rgba_len(0, 7), Some(0));
        // 32768 x 32768 RGBA is exactly 4 GiB: past u32, fine for a 64-bit usize.
        #[cfg(target_pointer_width = "64")]
        assert_eq!(rgba_len(32_768, 32_768), Some(1usize << 32));
        #[cfg(not(target_pointer_width = "64"))]
        assert_eq!(rgba_len(32_768, 32_768), None);
        assert_eq!(rgba_len(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_zero_size_image() {
        let mut out = PluginImage::empty();
        let result = unsafe { call_process_image(0, 0, &[], None, &mut out) };
        assert_eq!(result, -1);
        assert!(last_error_string().contains("empty"));
    }

    #[test]
    fn test_null_output_pointer() {
        let data = [0u8; 4];
        let result = unsafe {
            process_image(1, 1, data.as_ptr(), std::ptr::null(), std::ptr::null_mut())
        };
        assert_eq!(result, -1);
        assert_eq!(last_error_string(), "output pointer is null");
    }

    #[test]
    fn test_malformed_params() {
        let data = [0u8; 4];
        let mut out = PluginImage::empty();
        let result = unsafe { call_process_image(1, 1, &data, Some("{not json"), &mut out) };
        assert_eq!(result, -1);
        assert!(last_error_string().starts_with("Upscaling failed: Invalid params"));
    }

    #[test]
    fn test_missing_tool_reported() {
        let dir = tempfile::tempdir().unwrap();
        let params = format!(
            r#"{{"resrgan_dir": {}}}"#,
            serde_json::to_string(dir.path()).unwrap()
        );
        let data = [0u8; 16];
        let mut out = PluginImage::empty();
        let result = unsafe { call_process_image(2, 2, &data, Some(&params), &mut out) };
        assert_eq!(result, -1);
        assert!(last_error_string().contains("No valid models found"));
    }

    #[test]
    fn test_free_round_trip() {
        let image = PluginImage::from_rgba(RgbaImage::new(3, 2));
        assert_eq!(image.len, 24);
        assert_eq!((image.width, image.height), (3, 2));
        unsafe { free_image(image) };
        unsafe { free_image(PluginImage::empty()) };
    }
}
