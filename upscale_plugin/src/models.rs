use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Sorted model stems that have both a `.bin` and a `.param` file in `dir`.
///
/// Extensions match case-insensitively. A missing directory has no models.
pub fn discover_models(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut bins = BTreeSet::new();
    let mut params = BTreeSet::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
            continue;
        };
        let stem = stem.to_string_lossy().into_owned();
        match ext.to_string_lossy().to_ascii_lowercase().as_str() {
            "bin" => {
                bins.insert(stem);
            }
            "param" => {
                params.insert(stem);
            }
            _ => {}
        }
    }

    bins.intersection(&params).cloned().collect()
}

/// Picks `requested` when it is available, otherwise the first model.
pub fn select_model<'a>(available: &'a [String], requested: Option<&str>) -> Option<&'a str> {
    if let Some(name) = requested {
        if let Some(found) = available.iter().find(|m| m.as_str() == name) {
            return Some(found);
        }
        if let Some(first) = available.first() {
            log::warn!("Model {name:?} not found, falling back to {first:?}");
        }
    }
    available.first().map(String::as_str)
}
