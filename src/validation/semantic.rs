//! Semantic validation for configuration values.

use std::collections::HashMap;

use isolang::Language;

use crate::config::model::{split_list, PLACEHOLDER_KEYWORDS};

use super::{ValidationIssue, ValidationResult};

/// Validates semantic correctness of configuration values.
pub fn validate(values: &HashMap<String, String>) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(list) = values.get("KEYWORDS") {
        validate_keywords(list, &mut result);
    }

    let languages = values
        .get("SUB_LANGUAGES")
        .map(|l| split_list(l))
        .filter(|l| !l.is_empty());

    if let Some(languages) = &languages {
        for code in languages {
            if Language::from_639_1(&code.to_lowercase()).is_none() {
                result.add(
                    ValidationIssue::error(
                        "SUB_LANGUAGES",
                        format!("'{}' is not an ISO 639-1 language code", code),
                    )
                    .with_suggestion("Use two-letter codes such as en, es, fr"),
                );
            }
        }
    }

    if let Some(code) = values
        .get("DEFAULT_SUB_LANGUAGE")
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
    {
        if Language::from_639_1(&code).is_none() {
            result.add(ValidationIssue::error(
                "DEFAULT_SUB_LANGUAGE",
                format!("'{}' is not an ISO 639-1 language code", code),
            ));
        } else if let Some(languages) = &languages {
            if !languages.iter().any(|l| l.eq_ignore_ascii_case(&code)) {
                result.add(
                    ValidationIssue::warning(
                        "DEFAULT_SUB_LANGUAGE",
                        format!(
                            "'{}' is not listed in SUB_LANGUAGES, no track will be default",
                            code
                        ),
                    )
                    .with_suggestion(format!("Add '{}' to SUB_LANGUAGES", code)),
                );
            }
        }
    }

    result
}

/// Rejects the placeholder keywords and flags blank entries.
fn validate_keywords(list: &str, result: &mut ValidationResult) {
    let entries: Vec<&str> = list.split(',').collect();

    if entries
        .iter()
        .any(|k| PLACEHOLDER_KEYWORDS.contains(&k.trim()))
    {
        result.add(
            ValidationIssue::error("KEYWORDS", "KEYWORDS still holds the placeholder values")
                .with_suggestion("Replace Word1, Word2, ... with the tags you want removed"),
        );
    }

    let blanks = entries.iter().filter(|k| k.trim().is_empty()).count();
    if blanks == entries.len() && !list.trim().is_empty() {
        result.add(ValidationIssue::error("KEYWORDS", "KEYWORDS has no usable entries"));
    } else if blanks > 0 && blanks < entries.len() {
        result.add(ValidationIssue::warning(
            "KEYWORDS",
            format!("{} blank keyword entr(y/ies) will be ignored", blanks),
        ));
    }
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
    fn placeholder_keywords_are_rejected() {
        let result = validate(&values(&[("KEYWORDS", " Word1, Word2, Word3, Word4")]));
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn real_keywords_pass() {
        let result = validate(&values(&[("KEYWORDS", " GDR, Team")]));
        assert!(result.is_valid());
        assert_eq!(result.warnings().count(), 0);
    }

    #[test]
    fn blank_entries_warn() {
        let result = validate(&values(&[("KEYWORDS", "GDR,,Team")]));
        assert!(result.is_valid());
        assert_eq!(result.warnings().count(), 1);
    }

    #[test]
    fn only_commas_is_an_error() {
        let result = validate(&values(&[("KEYWORDS", " , ,")]));
        assert_eq!(result.error_count(), 1);
    }

    #[test]
    fn language_codes_are_checked() {
        let result = validate(&values(&[
            ("KEYWORDS", "GDR"),
            ("SUB_LANGUAGES", "en,xx"),
            ("DEFAULT_SUB_LANGUAGE", "fr"),
        ]));
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.warnings().count(), 1);
    }
}
