//! Schema validation for configuration keys and value syntax.

use std::collections::HashMap;

use crate::config::model::{parse_bool, Operation, KNOWN_KEYS};

use super::{ValidationIssue, ValidationResult};

/// Keys holding yes/no values.
const BOOLEAN_KEYS: &[&str] = &["DELETE_SUBS", "REMOVE_ATTACHMENTS", "STRIP_EMPTY_BRACKETS"];

/// Validates the configuration schema (required keys, value syntax).
pub fn validate(values: &HashMap<String, String>) -> ValidationResult {
    let mut result = ValidationResult::new();

    // Unknown keys are usually typos of known ones
    let mut keys: Vec<&String> = values.keys().collect();
    keys.sort();
    for key in keys {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            result.add(
                ValidationIssue::warning(key.as_str(), format!("Unknown config key '{}'", key))
                    .with_suggestion(format!("Did you mean '{}'?", find_similar_key(key))),
            );
        }
    }

    match values.get("KEYWORDS") {
        None => result.add(
            ValidationIssue::error("KEYWORDS", "KEYWORDS is required")
                .with_suggestion("Add KEYWORDS=\"Tag1, Tag2\" to the config file"),
        ),
        Some(list) if list.trim().is_empty() => {
            result.add(ValidationIssue::error("KEYWORDS", "KEYWORDS cannot be empty"))
        }
        Some(_) => {}
    }

    for &key in BOOLEAN_KEYS {
        if let Some(value) = non_empty(values, key) {
            if parse_bool(key, value).is_err() {
                result.add(
                    ValidationIssue::error(key, format!("'{}' is not a yes/no value", value))
                        .with_suggestion("Use yes, no, true, false, 1 or 0"),
                );
            }
        }
    }

    if let Some(value) = non_empty(values, "OPTION") {
        if let Err(message) = value.parse::<Operation>() {
            result.add(ValidationIssue::error("OPTION", message));
        }
    }

    if let Some(value) = non_empty(values, "TOOL_TIMEOUT_SECS") {
        if value.parse::<u64>().is_err() {
            result.add(ValidationIssue::error(
                "TOOL_TIMEOUT_SECS",
                format!("'{}' is not a whole number of seconds", value),
            ));
        }
    }

    result
}

fn non_empty<'a>(values: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    values
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Finds the most similar known key using Levenshtein distance.
fn find_similar_key(input: &str) -> &'static str {
    let input = input.to_uppercase();
    KNOWN_KEYS
        .iter()
        .min_by_key(|k| strsim::levenshtein(&input, k))
        .copied()
        .unwrap_or("KEYWORDS")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_keywords_is_an_error() {
        let result = validate(&values(&[("OPTION", "1")]));
        assert!(!result.is_valid());
        assert_eq!(result.errors().next().unwrap().path, "KEYWORDS");
    }

    #[test]
    fn unknown_key_gets_a_suggestion() {
        let result = validate(&values(&[("KEYWORDS", "GDR"), ("DELETE_SUB", "yes")]));
        assert!(result.is_valid());

        let warning = result.warnings().next().unwrap();
        assert_eq!(warning.path, "DELETE_SUB");
        assert_eq!(warning.suggestion.as_deref(), Some("Did you mean 'DELETE_SUBS'?"));
    }

    #[test]
    fn malformed_values_are_errors() {
        let result = validate(&values(&[
            ("KEYWORDS", "GDR"),
            ("DELETE_SUBS", "sometimes"),
            ("OPTION", "9"),
            ("TOOL_TIMEOUT_SECS", "-1"),
        ]));
        assert_eq!(result.error_count(), 3);
    }
}
