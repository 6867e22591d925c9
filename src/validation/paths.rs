//! Path validation for the configured target directory.

use std::collections::HashMap;
use std::path::Path;

use super::{ValidationIssue, ValidationResult};

/// Validates that a configured `DIR_PATH` exists and is usable.
pub fn validate(values: &HashMap<String, String>) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(dir) = values.get("DIR_PATH").map(|d| d.trim()).filter(|d| !d.is_empty()) {
        let path = Path::new(dir);
        validate_directory_readable(path, "DIR_PATH", &mut result);
        if result.is_valid() {
            validate_directory_writable(path, "DIR_PATH", &mut result);
        }
    }

    result
}

/// Checks that `path` is an existing directory, as the interactive prompt does.
pub fn is_valid_directory(path: &Path) -> bool {
    let mut result = ValidationResult::new();
    validate_directory_readable(path, "directory", &mut result);
    result.is_valid()
}

/// Validates that a directory exists and is readable.
fn validate_directory_readable(path: &Path, config_path: &str, result: &mut ValidationResult) {
    if !path.exists() {
        result.add(
            ValidationIssue::error(
                config_path,
                format!("Directory does not exist: '{}'", path.display()),
            )
            .with_suggestion("Create the directory or update the path"),
        );
        return;
    }

    if !path.is_dir() {
        result.add(ValidationIssue::error(
            config_path,
            format!("Path is not a directory: '{}'", path.display()),
        ));
        return;
    }

    // Try to read the directory to check permissions
    if std::fs::read_dir(path).is_err() {
        result.add(
            ValidationIssue::error(
                config_path,
                format!("Directory is not readable: '{}'", path.display()),
            )
            .with_suggestion("Check directory permissions"),
        );
    }
}

/// Validates that files can be written next to the videos.
fn validate_directory_writable(path: &Path, config_path: &str, result: &mut ValidationResult) {
    match tempfile::tempfile_in(path) {
        Ok(_) => {}
        Err(e) => {
            result.add(
                ValidationIssue::error(
                    config_path,
                    format!("Directory is not writable '{}': {}", path.display(), e),
                )
                .with_suggestion("Check directory permissions"),
            );
        }
    }
}
