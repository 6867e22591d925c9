//! Configuration validation and tool availability checks.

pub mod paths;
pub mod report;
pub mod schema;
pub mod semantic;

use std::collections::{BTreeMap, HashMap};

use crate::config::model::ToolConfig;
use crate::error::ToolError;
use crate::tools::MkvTool;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Blocks the run.
    Error,
    /// Logged but allows the run.
    Warning,
}

/// A validation issue found during configuration checking.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: ValidationSeverity,
    /// Config key the issue refers to (e.g., "KEYWORDS").
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Optional suggestion for fixing the issue.
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Creates a new error-level validation issue.
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Error,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Creates a new warning-level validation issue.
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ValidationSeverity::Warning,
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Adds a suggestion to this validation issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Result of validating a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates an empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the result.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Extends the result with issues from another result.
    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
    }

    /// Returns an iterator over warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Returns the number of errors.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

/// mkvtoolnix programs found at startup.
#[derive(Debug, Clone, Default)]
pub struct ToolCapabilities {
    /// First line of `--version` output per tool.
    pub versions: BTreeMap<MkvTool, String>,
}

impl ToolCapabilities {
    /// Checks that every required tool can be started.
    ///
    /// Fails on the first tool that cannot be run, before any file is touched.
    pub fn detect(config: &ToolConfig, required: &[MkvTool]) -> Result<Self, ToolError> {
        let mut versions = BTreeMap::new();

        for &tool in required {
            let program = tool.program(config);
            let output = std::process::Command::new(program)
                .arg("--version")
                .output()
                .map_err(|e| ToolError::Unavailable {
                    tool: tool.to_string(),
                    message: format!("{} ({})", e, program.display()),
                })?;

            if !output.status.success() {
                return Err(ToolError::Unavailable {
                    tool: tool.to_string(),
                    message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or_default().trim().to_string();
            versions.insert(tool, version);
        }

        Ok(Self { versions })
    }
}

/// Validates raw configuration values.
pub fn validate_config(values: &HashMap<String, String>) -> ValidationResult {
    let mut result = ValidationResult::new();

    result.extend(schema::validate(values));
    result.extend(semantic::validate(values));
    result.extend(paths::validate(values));

    result
}
