//! Drives the real process-spawning path with a shell script standing in
//! for `realesrgan-ncnn-vulkan`.
//!
//! Everything runs inside one test so no other test thread forks while a
//! freshly written script is still open.

#![cfg(unix)]

use image::{Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use upscale_plugin::error::UpscaleError;
use upscale_plugin::params::{Params, Selection};
use upscale_plugin::pipeline;

/// Copies `-i` to `-o` unchanged and records the model and working directory.
const COPY_TOOL: &str = r#"#!/bin/sh
echo "$6" > "$PWD/last_model.txt"
cp "$2" "$4"
"#;

const FAILING_TOOL: &str = r#"#!/bin/sh
echo "vkCreateInstance failed" >&2
exit 3
"#;

const SILENT_TOOL: &str = "#!/bin/sh\nexit 0\n";

fn populate(dir: &Path, script: &str, models: &[&str]) {
    let models_dir = dir.join("models");
    fs::create_dir_all(&models_dir).unwrap();
    for model in models {
        fs::write(models_dir.join(format!("{model}.bin")), b"").unwrap();
        fs::write(models_dir.join(format!("{model}.param")), b"").unwrap();
    }
    // Written without the execute bit: the runner has to add it.
    fs::write(dir.join("realesrgan-ncnn-vulkan"), script).unwrap();
}

fn tool_dir(script: &str, models: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path(), script, models);
    dir
}

fn params_for(dir: &Path) -> Params {
    Params {
        resrgan_dir: Some(dir.to_path_buf()),
        ..Params::default()
    }
}

fn checker(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    })
}

#[test]
fn test_external_tool_round_trip() {
    // Identity tool: the layer comes back unchanged at factor 1.
    let dir = tool_dir(COPY_TOOL, &["realesr-animevideov3-x4", "realesrgan-x4plus"]);
    let image = checker(6, 4);
    let mut params = params_for(dir.path());
    params.model = Some("realesrgan-x4plus".to_string());

    let out = pipeline::run(&image, &params).unwrap();
    assert_eq!(out, image);
    let model = fs::read_to_string(dir.path().join("last_model.txt")).unwrap();
    assert_eq!(model.trim(), "realesrgan-x4plus");

    // Relative plugin_dir, as the host passes by default.
    let plugin_dir = tempfile::Builder::new()
        .prefix("plugin-rel-")
        .tempdir_in(".")
        .unwrap();
    populate(&plugin_dir.path().join("resrgan"), COPY_TOOL, &["realesrgan-x4plus"]);
    let rel_params = Params {
        plugin_dir: Some(Path::new(plugin_dir.path().file_name().unwrap()).to_path_buf()),
        ..Params::default()
    };
    let out = pipeline::run(&image, &rel_params).unwrap();
    assert_eq!(out, image);

    // Unknown model falls back to the first discovered one.
    params.model = Some("not-installed".to_string());
    pipeline::run(&image, &params).unwrap();
    let model = fs::read_to_string(dir.path().join("last_model.txt")).unwrap();
    assert_eq!(model.trim(), "realesr-animevideov3-x4");

    // Tiled run through the real tool stitches back the same pixels.
    params.tile_size = Some(4);
    params.tile_padding = 1;
    let out = pipeline::run(&image, &params).unwrap();
    assert_eq!(out, image);

    // Selection scope only touches the selected rectangle.
    let mut sel_params = params_for(dir.path());
    sel_params.selection_only = true;
    sel_params.selection = Some(Selection { x: 1, y: 1, width: 3, height: 2 });
    let out = pipeline::run(&image, &sel_params).unwrap();
    assert_eq!(out, image);

    // Growing the canvas.
    params.tile_size = None;
    params.output_factor = 2.0;
    let out = pipeline::run(&image, &params).unwrap();
    assert_eq!(out.dimensions(), (12, 8));

    // No temporary files are left in the tool directory.
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");

    // Non-zero exit surfaces the command and stderr.
    let dir = tool_dir(FAILING_TOOL, &["realesrgan-x4plus"]);
    let err = pipeline::run(&image, &params_for(dir.path())).unwrap_err();
    match &err {
        UpscaleError::ToolFailed { command, stderr, .. } => {
            assert!(command.contains("-n \"realesrgan-x4plus\""));
            assert!(stderr.contains("vkCreateInstance failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("Real-ESRGAN failed"));

    // Success without an output file is still an error.
    let dir = tool_dir(SILENT_TOOL, &["realesrgan-x4plus"]);
    let err = pipeline::run(&image, &params_for(dir.path())).unwrap_err();
    assert!(matches!(err, UpscaleError::MissingOutput(_)));

    // Models present but no executable.
    let dir = tool_dir(SILENT_TOOL, &["realesrgan-x4plus"]);
    fs::remove_file(dir.path().join("realesrgan-ncnn-vulkan")).unwrap();
    let err = pipeline::run(&image, &params_for(dir.path())).unwrap_err();
    assert!(matches!(err, UpscaleError::ExecutableNotFound(_)));
}
