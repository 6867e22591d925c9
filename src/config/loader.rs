//! Configuration file loading and parsing.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::model::{AppConfig, KNOWN_KEYS};
use crate::error::ConfigError;
use crate::validation::report::format_report;
use crate::validation::validate_config;

/// Contents written when no config file exists yet.
const PLACEHOLDER_CONTENT: &str = r#"# tagsweep configuration
# Comma-separated keywords to strip from track names, titles and attachments.
KEYWORDS=" Word1, Word2, Word3, Word4"

# Default operation: 1 (rewrite metadata) or 2 (attach subtitles).
#OPTION=1
# Default directory holding the episodes.
#DIR_PATH=/path/to/episodes
# Delete subtitle files after they were muxed (yes/no).
#DELETE_SUBS=yes
# Text that replaces matched keywords (empty deletes them).
#REPLACEMENT=
# Subtitle language that becomes the default track.
#DEFAULT_SUB_LANGUAGE=es
#SUB_LANGUAGES=en,es
"#;

/// Writes the placeholder config if `path` does not exist.
///
/// Returns true if a new file was created.
pub fn ensure_config_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    std::fs::write(path, PLACEHOLDER_CONTENT).map_err(|e| ConfigError::CreateFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(path = %path.display(), "Created placeholder configuration file");
    Ok(true)
}

/// Reads raw key-value pairs from the config file.
pub fn load_from_path(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let iter = dotenvy::from_path_iter(path).map_err(|e| match e {
        dotenvy::Error::Io(source) => ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        },
        other => ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    })?;

    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        values.insert(key, value);
    }

    Ok(values)
}

/// Overlays process environment values for every known key.
pub fn apply_env_overrides<F>(values: &mut HashMap<String, String>, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for &key in KNOWN_KEYS {
        if let Some(value) = lookup(key) {
            debug!(key, "Config value taken from environment");
            values.insert(key.to_string(), value);
        }
    }
}

/// Reads the config file, creating it first if needed, and overlays the environment.
pub fn load_values(path: &Path) -> Result<HashMap<String, String>> {
    ensure_config_file(path)?;
    let mut values = load_from_path(path).context("Failed to load configuration")?;
    apply_env_overrides(&mut values, |key| std::env::var(key).ok());
    Ok(values)
}

/// Loads, overlays the environment, and fully validates the configuration.
pub fn load_and_validate(path: &Path) -> Result<AppConfig> {
    let values = load_values(path)?;
    let result = validate_config(&values);

    for issue in result.warnings() {
        tracing::warn!(
            path = %issue.path,
            message = %issue.message,
            suggestion = ?issue.suggestion,
            "Config validation warning"
        );
    }

    if !result.is_valid() {
        let report = format_report(&result);
        tracing::error!("{}", report);
        eprintln!("{}", report);
        anyhow::bail!(ConfigError::ValidationFailed {
            error_count: result.error_count()
        });
    }

    Ok(AppConfig::from_values(&values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_placeholders() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");

        assert!(ensure_config_file(&path).unwrap());
        assert!(!ensure_config_file(&path).unwrap());

        let values = load_from_path(&path).unwrap();
        assert_eq!(values["KEYWORDS"], " Word1, Word2, Word3, Word4");
        assert!(!values.contains_key("OPTION"));
    }

    #[test]
    fn placeholder_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");

        let err = load_and_validate(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn quoted_values_and_spacing_are_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "KEYWORDS=\" GDR, Team\"\nDELETE_SUBS=no\n").unwrap();

        let values = load_from_path(&path).unwrap();
        assert_eq!(values["KEYWORDS"], " GDR, Team");
        assert_eq!(values["DELETE_SUBS"], "no");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut values = HashMap::new();
        values.insert("OPTION".to_string(), "1".to_string());
        values.insert("DIR_PATH".to_string(), "/from/file".to_string());

        apply_env_overrides(&mut values, |key| match key {
            "OPTION" => Some("2".to_string()),
            _ => None,
        });

        assert_eq!(values["OPTION"], "2");
        assert_eq!(values["DIR_PATH"], "/from/file");
    }
}
