//! Keyword normalization and matching for free-text labels.
//!
//! Labels coming from release conventions vary in casing and spacing, so a
//! keyword is compared on a canonical key (lower-cased, whitespace removed)
//! and removed with a pattern that also accepts whitespace between each of
//! its characters (`G D R` for `GDR`).

use std::sync::OnceLock;

use regex::{NoExpand, Regex, RegexBuilder};

use crate::error::ConfigError;

/// Lower-cases `text` and strips all whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns true if the normalized form of any keyword occurs in `text`.
///
/// Blank keywords never match.
pub fn matches<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let haystack = normalize(text);
    keywords.iter().any(|k| {
        let needle = normalize(k.as_ref());
        !needle.is_empty() && haystack.contains(&needle)
    })
}

/// Removes every occurrence of `keyword` from `text`, literal or spaced out.
///
/// Enclosing punctuation is left alone: `"Summer Hit [GDR]"` becomes
/// `"Summer Hit []"`. See [`strip_empty_brackets`] for the cleanup step.
pub fn remove_keyword(text: &str, keyword: &str) -> String {
    match keyword_pattern(keyword) {
        Ok(Some(pattern)) => substitute(&pattern, text, ""),
        _ => collapse_whitespace(text),
    }
}

/// Removes bracket pairs that only contain whitespace, then tidies spacing.
pub fn strip_empty_brackets(text: &str) -> String {
    static EMPTY_BRACKETS: OnceLock<Regex> = OnceLock::new();
    let re = EMPTY_BRACKETS.get_or_init(|| {
        Regex::new(r"\[\s*\]|\(\s*\)|\{\s*\}").expect("static pattern is valid")
    });
    collapse_whitespace(&re.replace_all(text, ""))
}

/// Collapses runs of whitespace into single spaces and trims both ends.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn substitute(pattern: &Regex, text: &str, replacement: &str) -> String {
    collapse_whitespace(&pattern.replace_all(text, NoExpand(replacement)))
}

/// Builds the two-alternative removal pattern for a keyword.
///
/// Returns `Ok(None)` for a keyword with no visible characters.
fn keyword_pattern(keyword: &str) -> Result<Option<Regex>, regex::Error> {
    let letters: Vec<String> = keyword
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| regex::escape(&c.to_string()))
        .collect();

    if letters.is_empty() {
        return Ok(None);
    }

    let literal = regex::escape(keyword);
    let spaced = letters.join(r"\s*");

    RegexBuilder::new(&format!("(?:{}|{})", literal, spaced))
        .case_insensitive(true)
        .build()
        .map(Some)
}

/// A single user-supplied keyword with its precompiled removal pattern.
#[derive(Debug, Clone)]
pub struct Keyword {
    raw: String,
    normalized: String,
    pattern: Regex,
}

impl Keyword {
    /// The keyword exactly as configured, surrounding whitespace included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The keyword without surrounding whitespace.
    pub fn trimmed(&self) -> &str {
        self.raw.trim()
    }

    /// Returns true if this keyword occurs in `text` after normalization.
    pub fn is_in(&self, text: &str) -> bool {
        normalize(text).contains(&self.normalized)
    }

    /// Replaces every occurrence of this keyword in `text`.
    ///
    /// An empty `replacement` deletes the keyword.
    pub fn replace_in(&self, text: &str, replacement: &str) -> String {
        substitute(&self.pattern, text, replacement)
    }
}

/// Ordered, immutable set of keywords for one run.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Builds a keyword set, skipping entries with no visible characters.
    pub fn new<I, S>(keywords: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut built = Vec::new();

        for raw in keywords {
            let raw = raw.into();
            let pattern = keyword_pattern(&raw).map_err(|e| ConfigError::Invalid {
                key: "KEYWORDS".to_string(),
                message: format!("keyword '{}' cannot be compiled: {}", raw, e),
            })?;

            if let Some(pattern) = pattern {
                built.push(Keyword {
                    normalized: normalize(&raw),
                    raw,
                    pattern,
                });
            }
        }

        Ok(Self { keywords: built })
    }

    /// Splits a comma-separated list, keeping each entry's own spacing.
    pub fn from_list(list: &str) -> Result<Self, ConfigError> {
        Self::new(list.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    /// Returns true if any keyword occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// Returns the first keyword, in configured order, that occurs in `text`.
    pub fn first_match(&self, text: &str) -> Option<&Keyword> {
        let haystack = normalize(text);
        self.keywords
            .iter()
            .find(|k| haystack.contains(&k.normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        for input in ["  G D R ", "Sub [GDR]", "ÀÉÎ\tõ\nü", "", "İstanbul"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn normalize_lowercases_and_strips_whitespace() {
        assert_eq!(normalize("GDR "), "gdr");
        assert_eq!(normalize(" G D\tR"), "gdr");
    }

    #[test]
    fn matching_ignores_case_and_spacing() {
        assert!(matches("Sub [GDR]", &["gdr"]));
        assert!(matches("Sub [G D R]", &["gdr"]));
        assert!(matches("Sub [gdr]", &[" GDR "]));
        assert!(!matches("Sub [G.D.R.]", &["gdr"]));
        assert!(!matches("Subtitles", &["gdr"]));
    }

    #[test]
    fn blank_keywords_never_match() {
        assert!(!matches("anything", &["", "   "]));
        let set = KeywordSet::from_list(" , ,").unwrap();
        assert!(set.is_empty());
        assert!(!set.matches("anything"));
    }

    #[test]
    fn remove_keyword_leaves_bracket_residue() {
        assert_eq!(remove_keyword("Summer Hit [GDR]", "GDR"), "Summer Hit []");
    }

    #[test]
    fn remove_keyword_handles_spaced_and_cased_variants() {
        assert_eq!(remove_keyword("Audio G D R Stereo", "gdr"), "Audio Stereo");
        assert_eq!(remove_keyword("gdr Audio GDR", "GDR"), "Audio");
        assert_eq!(remove_keyword("Audio", "GDR"), "Audio");
    }

    #[test]
    fn remove_keyword_escapes_metacharacters() {
        assert_eq!(remove_keyword("Show (x.y) 01", "(x.y)"), "Show 01");
        assert_eq!(remove_keyword("Show xzy 01", "x.y"), "Show xzy 01");
    }

    #[test]
    fn strip_empty_brackets_only_touches_empty_pairs() {
        assert_eq!(strip_empty_brackets("Summer Hit []"), "Summer Hit");
        assert_eq!(strip_empty_brackets("A ( ) B {} [x]"), "A B [x]");
    }

    #[test]
    fn first_match_follows_configured_order() {
        let set = KeywordSet::new(["Team", "GDR"]).unwrap();
        let hit = set.first_match("Audio [GDR] Team").unwrap();
        assert_eq!(hit.raw(), "Team");

        let set = KeywordSet::new(["GDR", "Team"]).unwrap();
        assert_eq!(set.first_match("Audio [GDR] Team").unwrap().raw(), "GDR");
    }

    #[test]
    fn replace_in_keeps_raw_and_trimmed_forms() {
        let set = KeywordSet::from_list(" Word1, GDR").unwrap();
        assert_eq!(set.len(), 2);

        let kw = set.first_match("Title [GDR]").unwrap();
        assert_eq!(kw.trimmed(), "GDR");
        assert_eq!(kw.replace_in("Title [GDR]", "Team"), "Title [Team]");
        assert_eq!(kw.replace_in("Title [g d r]", ""), "Title []");
    }

    #[test]
    fn replacement_text_is_not_expanded() {
        let set = KeywordSet::new(["GDR"]).unwrap();
        let kw = set.first_match("Audio GDR").unwrap();
        assert_eq!(kw.replace_in("Audio GDR", "$1"), "Audio $1");
    }
}
