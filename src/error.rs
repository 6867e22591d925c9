//! Error types for tagsweep.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Subtitle attach error: {0}")]
    Attach(#[from] AttachError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration loading and parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("Failed to create config file '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for '{key}': {message}")]
    Invalid { key: String, message: String },

    #[error("No value for '{key}' and prompting is disabled")]
    MissingValue { key: String },

    #[error("Config validation failed with {error_count} error(s)")]
    ValidationFailed { error_count: usize },
}

/// Errors from the external mkvtoolnix programs.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{tool}' could not be run: {message}")]
    Unavailable { tool: String, message: String },

    #[error("'{tool}' failed with exit code {code}: {stderr}")]
    Failed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("'{tool}' reported an error: {line}")]
    Reported { tool: String, line: String },

    #[error("'{tool}' timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },

    #[error("'{tool}' was cancelled")]
    Cancelled { tool: String },

    #[error("IO error while talking to '{tool}': {source}")]
    Io {
        tool: String,
        source: std::io::Error,
    },
}

impl ToolError {
    /// Returns true if the tool could not be started at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ToolError::Unavailable { .. })
    }
}

/// Errors that abort a single subtitle group.
#[derive(Error, Debug)]
pub enum AttachError {
    #[error("Mux failed: {0}")]
    MuxFailed(#[from] ToolError),

    #[error("Failed to replace '{path}': {source}")]
    ReplaceFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to scan '{path}': {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
}
