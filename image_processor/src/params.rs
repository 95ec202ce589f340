use serde_json::{Map, Value, json};
use std::ffi::CString;
use std::path::Path;
use std::str::FromStr;

use crate::error::AppError;

/// Selection rectangle given on the command line as `X,Y,WIDTH,HEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for Selection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidSelection(s.to_string());
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        match parts.as_slice() {
            [x, y, width, height] => Ok(Self {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            }),
            _ => Err(invalid()),
        }
    }
}

/// Builds the params string handed to the plugin.
///
/// The file must hold a JSON object (blank means `{}`). The host adds
/// `plugin_dir` unless the file sets it, and `selection` when one is given.
pub fn prepare(
    text: &str,
    selection: Option<Selection>,
    plugin_dir: &Path,
) -> Result<CString, AppError> {
    let mut params = if text.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => map,
            _ => return Err(AppError::ParamsNotObject),
        }
    };

    params
        .entry("plugin_dir")
        .or_insert_with(|| json!(plugin_dir.to_string_lossy()));

    if let Some(sel) = selection {
        params.insert(
            "selection".to_string(),
            json!({
                "x": sel.x,
                "y": sel.y,
                "width": sel.width,
                "height": sel.height,
            }),
        );
    }

    Ok(CString::new(Value::Object(params).to_string())?)
}
