use crate::errors::AutomationError;
use std::path::Path;
use tracing::{debug, info, warn};

/// List the files of `directory` whose name ends in `.extension` `extension` (case-insensitive).
///
/// Names come back in directory-listing order. An empty directory is a valid,
/// empty batch.
pub fn discover_files(directory: &Path, extension: &str) -> Result<Vec<String>, AutomationError> {
    let metadata = std::fs::metadata(directory).map_err(|e| {
        AutomationError::InvalidInput(format!(
            "Source directory {} is not accessible: {e}",
            directory.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(AutomationError::InvalidInput(format!(
            "Source path {} is not a directory",
            directory.display()
        )));
    }

    let entries = std::fs::read_dir(directory).map_err(|e| {
        AutomationError::InvalidInput(format!(
            "Failed to list {}: {e}",
            directory.display()
        ))
    })?;

    let extension = extension.trim_start_matches('.');
    let suffix = format!(".{}", extension.to_ascii_lowercase());
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AutomationError::InvalidInput(format!(
                "Failed to read an entry of {}: {e}",
                directory.display()
            ))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Skipping file with a non UTF-8 name: {:?}", raw);
                continue;
            }
        };
        // A bare `.pdf` is kept so that it is reported as a bad name, not dropped
        if !name.to_ascii_lowercase().ends_with(&suffix) {
            debug!("Skipping {}", path.display());
            continue;
        }
        files.push(name);
    }

    info!(
        count = files.len(),
        "Found {} .{} file(s) in {}",
        files.len(),
        extension,
        directory.display()
    );
    Ok(files)
}
