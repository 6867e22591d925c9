//! Configuration data structures.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ConfigError;

/// Every key the configuration file understands.
pub const KNOWN_KEYS: &[&str] = &[
    "KEYWORDS",
    "OPTION",
    "DIR_PATH",
    "DELETE_SUBS",
    "REPLACEMENT",
    "DEFAULT_SUB_LANGUAGE",
    "DEFAULT_SUB_NAME",
    "SUB_LANGUAGES",
    "REMOVE_ATTACHMENTS",
    "STRIP_EMPTY_BRACKETS",
    "TOOL_TIMEOUT_SECS",
    "MKVMERGE",
    "MKVINFO",
    "MKVPROPEDIT",
    "LABELS_TRACK_NUMBER",
    "LABELS_NAME",
    "LABELS_TITLE",
    "LABELS_ATTACHMENT_ID",
    "LABELS_FILE_NAME",
    "LABELS_ERROR",
    "LABELS_PROGRESS",
];

/// Keywords written into a freshly created config file.
pub const PLACEHOLDER_KEYWORDS: &[&str] = &["Word1", "Word2", "Word3", "Word4"];

/// Fully resolved configuration for one run.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Keywords as configured, surrounding whitespace preserved.
    pub keywords: Vec<String>,

    /// Default operation when none is given on the command line.
    pub option: Option<Operation>,

    /// Default target directory.
    pub dir_path: Option<PathBuf>,

    /// Whether subtitles are deleted after a successful mux.
    pub delete_subs: Option<bool>,

    /// Replacement text for matched keywords.
    pub replacement: Option<String>,

    /// Subtitle settings for the attacher.
    pub subtitles: SubtitleConfig,

    /// Rewriter settings.
    pub rewrite: RewriteConfig,

    /// External tool settings.
    pub tools: ToolConfig,

    /// Label synonyms used to read tool output.
    pub labels: LabelTable,
}

/// Subtitle attach settings.
#[derive(Debug, Clone, Serialize)]
pub struct SubtitleConfig {
    /// ISO 639-1 code of the language whose track becomes default.
    pub default_language: String,

    /// Display name for the default track, if overridden.
    pub default_track_name: Option<String>,

    /// Languages accepted from detection (ISO 639-1).
    pub languages: Vec<String>,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            default_language: "es".to_string(),
            default_track_name: None,
            languages: vec!["en".to_string(), "es".to_string()],
        }
    }
}

/// Metadata rewrite settings.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteConfig {
    /// Delete attachments whose file name matches a keyword.
    pub remove_attachments: bool,

    /// Drop bracket pairs left empty after keyword removal.
    pub strip_empty_brackets: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            remove_attachments: true,
            strip_empty_brackets: true,
        }
    }
}

/// External tool locations and limits.
#[derive(Debug, Clone, Serialize)]
pub struct ToolConfig {
    pub mkvmerge: PathBuf,
    pub mkvinfo: PathBuf,
    pub mkvpropedit: PathBuf,

    /// Seconds to wait for a single tool call; 0 waits forever.
    pub timeout_secs: u64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            mkvmerge: PathBuf::from("mkvmerge"),
            mkvinfo: PathBuf::from("mkvinfo"),
            mkvpropedit: PathBuf::from("mkvpropedit"),
            timeout_secs: 0,
        }
    }
}

/// The two batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Rewrite track names, title and attachments.
    Rewrite,
    /// Mux external subtitles into their videos.
    Attach,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "rewrite" | "metadata" => Ok(Operation::Rewrite),
            "2" | "attach" | "subs" | "subtitles" => Ok(Operation::Attach),
            other => Err(format!(
                "unknown operation '{}', expected 1/rewrite or 2/attach",
                other
            )),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Rewrite => write!(f, "rewrite"),
            Operation::Attach => write!(f, "attach"),
        }
    }
}

/// Logical fields read from tool output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelField {
    TrackNumber,
    Name,
    Title,
    AttachmentId,
    FileName,
    Error,
    Progress,
}

impl LabelField {
    pub const ALL: [LabelField; 7] = [
        LabelField::TrackNumber,
        LabelField::Name,
        LabelField::Title,
        LabelField::AttachmentId,
        LabelField::FileName,
        LabelField::Error,
        LabelField::Progress,
    ];

    /// Config key that overrides this field's labels.
    pub fn config_key(self) -> &'static str {
        match self {
            LabelField::TrackNumber => "LABELS_TRACK_NUMBER",
            LabelField::Name => "LABELS_NAME",
            LabelField::Title => "LABELS_TITLE",
            LabelField::AttachmentId => "LABELS_ATTACHMENT_ID",
            LabelField::FileName => "LABELS_FILE_NAME",
            LabelField::Error => "LABELS_ERROR",
            LabelField::Progress => "LABELS_PROGRESS",
        }
    }

    /// English and Spanish labels as printed by mkvtoolnix.
    fn default_labels(self) -> &'static [&'static str] {
        match self {
            LabelField::TrackNumber => &["Track number", "Número de pista"],
            LabelField::Name => &["Name", "Nombre"],
            LabelField::Title => &["Title", "Título"],
            LabelField::AttachmentId => &["Attachment ID", "ID del archivo adjunto"],
            LabelField::FileName => &["file name", "nombre de archivo"],
            LabelField::Error => &["Error", "Fatal"],
            LabelField::Progress => &["Progress", "Progreso"],
        }
    }
}

/// Maps each logical field to the literal labels that identify it.
#[derive(Debug, Clone, Serialize)]
pub struct LabelTable {
    labels: BTreeMap<LabelField, Vec<String>>,
}

impl Default for LabelTable {
    fn default() -> Self {
        let labels = LabelField::ALL
            .iter()
            .map(|field| {
                let defaults: Vec<String> =
                    field.default_labels().iter().map(|s| s.to_string()).collect();
                (*field, defaults)
            })
            .collect();

        Self { labels }
    }
}

impl LabelTable {
    /// Returns the labels recognized for a field.
    pub fn labels(&self, field: LabelField) -> &[String] {
        self.labels.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the labels for a field.
    pub fn set(&mut self, field: LabelField, labels: Vec<String>) {
        self.labels.insert(field, labels);
    }

    /// Returns true if `label` is one of the field's labels, ignoring case.
    pub fn is(&self, field: LabelField, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.labels(field).iter().any(|l| l.to_lowercase() == label)
    }
}

impl AppConfig {
    /// Builds the typed configuration from raw key-value pairs.
    ///
    /// Values are expected to have passed schema validation already.
    pub fn from_values(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| value(values, key);
        let non_empty = |key: &str| non_empty_value(values, key);

        let keywords = get("KEYWORDS")
            .map(|list| list.split(',').map(String::from).collect())
            .unwrap_or_default();

        let option = non_empty("OPTION")
            .map(|v| v.parse::<Operation>().map_err(|message| invalid("OPTION", message)))
            .transpose()?;

        let delete_subs = non_empty("DELETE_SUBS")
            .map(|v| parse_bool("DELETE_SUBS", v))
            .transpose()?;

        let mut subtitles = SubtitleConfig::default();
        if let Some(lang) = non_empty("DEFAULT_SUB_LANGUAGE") {
            subtitles.default_language = lang.to_lowercase();
        }
        subtitles.default_track_name = non_empty("DEFAULT_SUB_NAME").map(String::from);
        if let Some(list) = non_empty("SUB_LANGUAGES") {
            subtitles.languages = split_list(list).into_iter().map(|l| l.to_lowercase()).collect();
        }

        let mut rewrite = RewriteConfig::default();
        if let Some(v) = non_empty("REMOVE_ATTACHMENTS") {
            rewrite.remove_attachments = parse_bool("REMOVE_ATTACHMENTS", v)?;
        }
        if let Some(v) = non_empty("STRIP_EMPTY_BRACKETS") {
            rewrite.strip_empty_brackets = parse_bool("STRIP_EMPTY_BRACKETS", v)?;
        }

        let mut tools = ToolConfig::default();
        if let Some(v) = non_empty("MKVMERGE") {
            tools.mkvmerge = PathBuf::from(v);
        }
        if let Some(v) = non_empty("MKVINFO") {
            tools.mkvinfo = PathBuf::from(v);
        }
        if let Some(v) = non_empty("MKVPROPEDIT") {
            tools.mkvpropedit = PathBuf::from(v);
        }
        if let Some(v) = non_empty("TOOL_TIMEOUT_SECS") {
            tools.timeout_secs = v.parse().map_err(|_| {
                invalid("TOOL_TIMEOUT_SECS", format!("'{}' is not a number of seconds", v))
            })?;
        }

        let mut labels = LabelTable::default();
        for field in LabelField::ALL {
            if let Some(list) = non_empty(field.config_key()) {
                labels.set(field, split_list(list));
            }
        }

        Ok(Self {
            keywords,
            option,
            dir_path: non_empty("DIR_PATH").map(PathBuf::from),
            delete_subs,
            replacement: get("REPLACEMENT").map(String::from),
            subtitles,
            rewrite,
            tools,
            labels,
        })
    }
}

/// Parses the yes/no spellings accepted in the config file and prompts.
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "on" => Ok(true),
        "n" | "no" | "false" | "0" | "off" => Ok(false),
        other => Err(invalid(key, format!("'{}' is not yes or no", other))),
    }
}

/// Splits a comma-separated list, trimming entries and dropping blanks.
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn value<'a>(values: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    values.get(key).map(String::as_str)
}

fn non_empty_value<'a>(values: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    value(values, key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.into(),
    }
}
