//! Subtitle language detection.

use std::io;
use std::path::Path;
use std::sync::OnceLock;

use isolang::Language;
use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

/// Number of leading lines sampled from each subtitle file.
pub const SAMPLE_LINES: usize = 30;

/// Language classification of one subtitle file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleLanguage {
    /// Detected and accepted.
    Known(Language),
    /// Detected, but not one of the accepted languages.
    Unsupported(Language),
    /// Detection produced nothing usable.
    Unknown,
}

impl SubtitleLanguage {
    /// Returns the language if it can be muxed.
    pub fn known(&self) -> Option<Language> {
        match self {
            SubtitleLanguage::Known(lang) => Some(*lang),
            _ => None,
        }
    }
}

/// Short code for display: ISO 639-1 when it exists, else ISO 639-3.
pub fn display_code(lang: Language) -> &'static str {
    lang.to_639_1().unwrap_or_else(|| lang.to_639_3())
}

/// Parses an ISO 639-1 code such as `es`.
pub fn from_code(code: &str) -> Option<Language> {
    Language::from_639_1(&code.trim().to_lowercase())
}

/// Name shown for a default track when none is configured.
pub fn track_display_name(lang: Language) -> String {
    let name = lang.to_autonym().unwrap_or_else(|| lang.to_name());
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Decides which detected languages may be muxed.
#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    accepted: Vec<Language>,
}

impl LanguagePolicy {
    pub fn new(accepted: Vec<Language>) -> Self {
        Self { accepted }
    }

    /// Builds the policy from ISO 639-1 codes, ignoring unknown ones.
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        Self::new(codes.iter().filter_map(|c| from_code(c.as_ref())).collect())
    }

    pub fn classify(&self, detected: Option<Language>) -> SubtitleLanguage {
        match detected {
            Some(lang) if self.accepted.contains(&lang) => SubtitleLanguage::Known(lang),
            Some(lang) => SubtitleLanguage::Unsupported(lang),
            None => SubtitleLanguage::Unknown,
        }
    }
}

/// Reads the head of a subtitle file and detects its language.
///
/// Text subtitles are sampled from their first [`SAMPLE_LINES`] lines. A
/// VobSub index is read only until its `id:` header.
pub async fn detect_file(path: &Path) -> io::Result<Option<Language>> {
    let mut reader = BufReader::new(File::open(path).await?);

    let is_idx = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("idx"))
        .unwrap_or(false);

    if is_idx {
        // VobSub images carry no text, only the declared language
        while let Some(line) = next_line(&mut reader).await? {
            if let Some(lang) = idx_language(&line) {
                return Ok(Some(lang));
            }
        }
        return Ok(None);
    }

    let sample = head_lines(&mut reader, SAMPLE_LINES).await?;
    let sample: Vec<&str> = sample.iter().map(String::as_str).collect();
    Ok(detect_text(&cue_text(&sample)))
}

/// Reads at most `limit` lines, stopping early at end of input.
pub async fn head_lines<R>(reader: &mut R, limit: usize) -> io::Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::with_capacity(limit);
    while lines.len() < limit {
        match next_line(reader).await? {
            Some(line) => lines.push(line),
            None => break,
        }
    }

    if let Some(first) = lines.first_mut() {
        if first.starts_with('\u{feff}') {
            first.replace_range(..'\u{feff}'.len_utf8(), "");
        }
    }
    Ok(lines)
}

/// Reads one line, decoding invalid UTF-8 lossily.
async fn next_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string()))
}

/// Keeps only the spoken text of SRT/WebVTT lines.
pub fn cue_text(lines: &[&str]) -> String {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    let markup = MARKUP
        .get_or_init(|| Regex::new(r"<[^>]*>|\{[^}]*\}").expect("static pattern is valid"));

    lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter(|line| !line.chars().all(|c| c.is_ascii_digit()))
        .filter(|line| !line.contains("-->"))
        .filter(|line| !line.starts_with("WEBVTT") && !line.starts_with("NOTE"))
        .map(|line| markup.replace_all(line, "").into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Detects the language of free text.
pub fn detect_text(text: &str) -> Option<Language> {
    let info = whatlang::detect(text)?;
    let lang = Language::from_639_3(info.lang().code());
    debug!(
        detected = info.lang().code(),
        confidence = info.confidence(),
        "Language detection"
    );
    lang
}

/// Reads the `id: xx, index: N` header of a VobSub index.
pub fn idx_language(content: &str) -> Option<Language> {
    content.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("id:")?;
        let code = rest.split(',').next()?.trim();
        from_code(code).or_else(|| Language::from_639_3(code))
    })
}
