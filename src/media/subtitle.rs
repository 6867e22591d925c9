//! Subtitle file grouping, video resolution and mux planning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use isolang::Language;

use super::language::SubtitleLanguage;

/// Subtitle extensions picked up from the scan location.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "vtt", "idx"];

/// Video extensions in probing priority order.
pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi"];

/// Subdirectory that holds subtitles when present.
pub const SUBS_DIR: &str = "subs";

/// A subtitle file waiting to be muxed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCandidate {
    pub path: PathBuf,
    pub file_name: String,
    /// File name without its extension.
    pub stem: String,
    /// Stem of the video this subtitle belongs to.
    pub base_name: String,
    pub language: SubtitleLanguage,
}

impl SubtitleCandidate {
    pub fn new(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            stem: file_stem(&file_name).to_string(),
            base_name: base_name(&file_name),
            file_name,
            path,
            language: SubtitleLanguage::Unknown,
        })
    }

    /// Falls back to the full stem when only that names a video in `dir`.
    ///
    /// `Doctor.Who.srt` next to `Doctor.Who.mkv` belongs to `Doctor.Who`,
    /// even though `Who` looks like a language code.
    pub fn anchor_to(mut self, dir: &Path) -> Self {
        if self.stem != self.base_name
            && VideoTarget::resolve(dir, &self.base_name).is_none()
            && VideoTarget::resolve(dir, &self.stem).is_some()
        {
            self.base_name = self.stem.clone();
        }
        self
    }
}

/// All subtitles sharing one base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleGroup {
    pub base_name: String,
    pub candidates: Vec<SubtitleCandidate>,
}

/// The video file a group is muxed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTarget {
    pub stem: String,
    pub extension: String,
    pub path: PathBuf,
}

impl VideoTarget {
    /// Probes `dir` for `<stem>.<ext>` in [`VIDEO_EXTENSIONS`] order.
    ///
    /// The first existing file wins.
    pub fn resolve(dir: &Path, stem: &str) -> Option<Self> {
        VIDEO_EXTENSIONS.iter().find_map(|ext| {
            [ext.to_string(), ext.to_uppercase()]
                .into_iter()
                .map(|e| dir.join(format!("{}.{}", stem, e)))
                .find(|p| p.is_file())
                .map(|path| Self {
                    stem: stem.to_string(),
                    extension: ext.to_string(),
                    path,
                })
        })
    }

    /// Where the muxed result ends up; mkvmerge always writes Matroska.
    pub fn output_path(&self) -> PathBuf {
        if self.extension == "mkv" {
            self.path.clone()
        } else {
            self.path.with_file_name(format!("{}.mkv", self.stem))
        }
    }
}

/// One subtitle input of a mux invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleSpec {
    pub path: PathBuf,
    /// ISO 639-2 tag handed to mkvmerge.
    pub language: String,
    pub is_default: bool,
    pub track_name: Option<String>,
}

/// Returns true if `path` has a supported subtitle extension.
pub fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUBTITLE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Strips the extension and a trailing language code from a subtitle name.
///
/// `show.s01e01.en.srt` and `show.s01e01.spa.srt` both give `show.s01e01`.
/// Only a final segment of two or three letters counts as a language code;
/// [`SubtitleCandidate::anchor_to`] corrects the guess for names like
/// `Doctor.Who.srt`.
pub fn base_name(file_name: &str) -> String {
    let stem = file_stem(file_name);
    match stem.rsplit_once('.') {
        Some((video, code))
            if !video.is_empty()
                && (2..=3).contains(&code.len())
                && code.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            video.to_string()
        }
        _ => stem.to_string(),
    }
}

fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Groups candidates by base name, keeping first-seen order.
pub fn group_candidates<I>(candidates: I) -> Vec<SubtitleGroup>
where
    I: IntoIterator<Item = SubtitleCandidate>,
{
    let mut groups: Vec<SubtitleGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        match index.get(&candidate.base_name) {
            Some(&i) => groups[i].candidates.push(candidate),
            None => {
                index.insert(candidate.base_name.clone(), groups.len());
                groups.push(SubtitleGroup {
                    base_name: candidate.base_name.clone(),
                    candidates: vec![candidate],
                });
            }
        }
    }

    groups
}

/// Builds the subtitle inputs for one mux invocation.
///
/// Candidates without a known language are left out. Only the first
/// candidate in `default_language` is flagged default and named, so at most
/// one track per invocation is default.
pub fn plan_mux(
    candidates: &[SubtitleCandidate],
    default_language: Language,
    default_track_name: &str,
) -> Vec<SubtitleSpec> {
    let mut default_taken = false;

    candidates
        .iter()
        .filter_map(|c| c.language.known().map(|lang| (c, lang)))
        .map(|(candidate, lang)| {
            let is_default = !default_taken && lang == default_language;
            default_taken |= is_default;

            SubtitleSpec {
                path: candidate.path.clone(),
                language: lang.to_639_3().to_string(),
                is_default,
                track_name: is_default.then(|| default_track_name.to_string()),
            }
        })
        .collect()
}
