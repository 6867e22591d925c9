//! Validation report formatting.

use super::{ValidationIssue, ValidationResult, ValidationSeverity};

/// Formats a validation result into a human-readable report.
///
/// Errors are listed before warnings, each with its config key.
pub fn format_report(result: &ValidationResult) -> String {
    let error_count = result.error_count();
    let warning_count = result.warnings().count();

    if error_count == 0 && warning_count == 0 {
        return "Configuration is valid.".to_string();
    }

    let mut lines = Vec::new();

    if error_count > 0 {
        lines.push("Configuration problems".to_string());
        lines.push("======================".to_string());
    }

    lines.extend(result.errors().map(format_issue));
    lines.extend(result.warnings().map(format_issue));

    lines.push(format!("{} warning(s), {} error(s)", warning_count, error_count));
    if error_count > 0 {
        lines.push("Config rejected. No files were touched.".to_string());
    }

    lines.join("\n")
}

/// Formats a single validation issue.
fn format_issue(issue: &ValidationIssue) -> String {
    let tag = match issue.severity {
        ValidationSeverity::Error => "ERROR",
        ValidationSeverity::Warning => "WARNING",
    };

    match &issue.suggestion {
        Some(hint) => format!("{} {}: {}\n    hint: {}", tag, issue.path, issue.message, hint),
        None => format!("{} {}: {}", tag, issue.path, issue.message),
    }
}
