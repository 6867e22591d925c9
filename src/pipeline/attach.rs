//! Subtitle attacher: muxes grouped subtitle files into their videos.

use std::io;
use std::path::{Path, PathBuf};

use isolang::Language;
use tracing::{debug, error, info, warn};

use super::{display_name, list_files, ItemStatus, RunSummary};
use crate::error::{AppError, AttachError, ToolError};
use crate::media::language::{self, display_code, LanguagePolicy, SubtitleLanguage};
use crate::media::subtitle::{
    self, SubtitleCandidate, SubtitleGroup, SubtitleSpec, VideoTarget, SUBS_DIR,
};
use crate::tools::Muxer;

/// Settings for one attach run.
#[derive(Debug, Clone)]
pub struct AttachOptions {
    /// Delete the group's subtitle files after a successful mux.
    pub delete_subs: bool,
    /// Languages that may be muxed.
    pub policy: LanguagePolicy,
    /// Language whose first track is flagged default.
    pub default_language: Language,
    /// Name given to the default track.
    pub default_track_name: String,
}

/// Result of processing one subtitle group.
#[derive(Debug)]
pub enum GroupOutcome {
    /// Subtitles were muxed and the video replaced.
    Muxed {
        output: PathBuf,
        tracks: usize,
        deleted: usize,
    },
    /// No video with the group's base name exists.
    UnresolvedVideo,
    /// No subtitle in the group had an accepted language.
    NothingToMux,
    Failed(AttachError),
}

impl GroupOutcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            GroupOutcome::Muxed { .. } => ItemStatus::Changed,
            GroupOutcome::UnresolvedVideo | GroupOutcome::NothingToMux => ItemStatus::Skipped,
            GroupOutcome::Failed(_) => ItemStatus::Failed,
        }
    }

    fn is_cancelled(&self) -> bool {
        matches!(
            self,
            GroupOutcome::Failed(AttachError::MuxFailed(ToolError::Cancelled { .. }))
        )
    }
}

/// Returns the `subs` subdirectory if present, else `dir` itself.
pub fn scan_location(dir: &Path) -> PathBuf {
    let subs = dir.join(SUBS_DIR);
    if subs.is_dir() {
        subs
    } else {
        dir.to_path_buf()
    }
}

/// Attaches every subtitle group found under `dir` to its video.
///
/// Groups are processed one at a time in first-seen order. A failed group
/// leaves its video and subtitles untouched and the run moves on.
pub async fn attach_directory(
    muxer: &dyn Muxer,
    dir: &Path,
    options: &AttachOptions,
) -> Result<RunSummary, AppError> {
    let scan_dir = scan_location(dir);
    let files = list_files(&scan_dir, subtitle::is_subtitle).map_err(|source| AttachError::Scan {
        path: scan_dir.clone(),
        source,
    })?;

    let mut summary = RunSummary::default();

    if files.is_empty() {
        println!("No subtitle files found in {}", scan_dir.display());
        return Ok(summary);
    }

    let candidates = files
        .into_iter()
        .filter_map(SubtitleCandidate::new)
        .map(|candidate| candidate.anchor_to(dir));
    let groups = subtitle::group_candidates(candidates);
    info!(
        dir = %dir.display(),
        scan_dir = %scan_dir.display(),
        groups = groups.len(),
        "Attaching subtitles"
    );

    let mut deleted_any = false;

    for (index, group) in groups.into_iter().enumerate() {
        println!("[{}] {}", index + 1, group.base_name);

        let outcome = attach_group(muxer, dir, group, options).await;
        match &outcome {
            GroupOutcome::Muxed { output, tracks, deleted } => {
                deleted_any |= *deleted > 0;
                println!(
                    "  Muxed {} subtitle track(s) into {}",
                    tracks,
                    display_name(output)
                );
            }
            GroupOutcome::UnresolvedVideo => {}
            GroupOutcome::NothingToMux => {
                println!("  No subtitle with an accepted language, skipped")
            }
            GroupOutcome::Failed(e) => println!("  Failed: {}", e),
        }

        summary.record(outcome.status());

        if outcome.is_cancelled() {
            warn!("Run cancelled, remaining groups were not processed");
            println!("Cancelled.");
            break;
        }
    }

    if deleted_any && scan_dir != dir {
        remove_dir_if_empty(&scan_dir);
    }

    Ok(summary)
}

/// Detects languages, muxes and cleans up one group.
pub async fn attach_group(
    muxer: &dyn Muxer,
    dir: &Path,
    mut group: SubtitleGroup,
    options: &AttachOptions,
) -> GroupOutcome {
    let Some(target) = VideoTarget::resolve(dir, &group.base_name) else {
        warn!(
            base_name = %group.base_name,
            subtitles = group.candidates.len(),
            "No video found for subtitle group"
        );
        println!(
            "  No video found for '{}', {} subtitle file(s) left in place",
            group.base_name,
            group.candidates.len()
        );
        return GroupOutcome::UnresolvedVideo;
    };

    for candidate in &mut group.candidates {
        let detected = match language::detect_file(&candidate.path).await {
            Ok(detected) => detected,
            Err(e) => {
                warn!(file = %candidate.path.display(), error = %e, "Could not read subtitle");
                None
            }
        };

        candidate.language = options.policy.classify(detected);
        match candidate.language {
            SubtitleLanguage::Known(lang) => {
                debug!(
                    file = %candidate.file_name,
                    language = display_code(lang),
                    "Detected language"
                );
            }
            SubtitleLanguage::Unsupported(lang) => {
                warn!(
                    file = %candidate.file_name,
                    language = display_code(lang),
                    "Language not accepted"
                );
                println!(
                    "  Skipping '{}': language '{}' is not accepted",
                    candidate.file_name,
                    display_code(lang)
                );
            }
            SubtitleLanguage::Unknown => {
                warn!(file = %candidate.file_name, "Language could not be detected");
                println!(
                    "  Skipping '{}': language could not be detected",
                    candidate.file_name
                );
            }
        }
    }

    let plan = subtitle::plan_mux(
        &group.candidates,
        options.default_language,
        &options.default_track_name,
    );
    if plan.is_empty() {
        return GroupOutcome::NothingToMux;
    }

    let output = match mux_and_replace(muxer, &target, &plan).await {
        Ok(output) => output,
        Err(e) => {
            error!(video = %target.path.display(), error = %e, "Attach failed");
            return GroupOutcome::Failed(e);
        }
    };

    let deleted = if options.delete_subs {
        delete_subtitles(&group.candidates)
    } else {
        0
    };

    GroupOutcome::Muxed {
        output,
        tracks: plan.len(),
        deleted,
    }
}

/// Muxes into a temporary file next to the video, then moves it into place.
///
/// The temporary file is removed on any failure, so the original video is
/// only replaced after mkvmerge succeeded.
async fn mux_and_replace(
    muxer: &dyn Muxer,
    target: &VideoTarget,
    plan: &[SubtitleSpec],
) -> Result<PathBuf, AttachError> {
    let dir = target.path.parent().unwrap_or_else(|| Path::new("."));
    let output = target.output_path();

    let temp = tempfile::Builder::new()
        .prefix(".tagsweep-")
        .suffix(".mkv")
        .tempfile_in(dir)
        .map_err(|source| AttachError::ReplaceFailed {
            path: output.clone(),
            source,
        })?
        .into_temp_path();

    muxer.mux(&target.path, plan, &temp).await?;

    temp.persist(&output).map_err(|e| AttachError::ReplaceFailed {
        path: output.clone(),
        source: e.error,
    })?;

    if output != target.path {
        // The source was .mp4/.avi and now lives on as <stem>.mkv
        if let Err(e) = std::fs::remove_file(&target.path) {
            warn!(file = %target.path.display(), error = %e, "Could not remove original video");
        }
    }

    info!(output = %output.display(), "Video replaced");
    Ok(output)
}

/// Deletes every subtitle file of a muxed group.
///
/// Files left out of the mux for their language go too, as does the `.sub`
/// next to an `.idx`.
fn delete_subtitles(candidates: &[SubtitleCandidate]) -> usize {
    let mut deleted = 0;

    for candidate in candidates {
        let mut paths = vec![candidate.path.clone()];
        if super::has_extension(&candidate.path, "idx") {
            let companion = candidate.path.with_extension("sub");
            if companion.is_file() {
                paths.push(companion);
            }
        }

        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    debug!(file = %path.display(), "Deleted subtitle");
                }
                Err(e) => warn!(file = %path.display(), error = %e, "Could not delete subtitle"),
            }
        }
    }

    deleted
}

/// Removes `dir` only when nothing is left in it.
fn remove_dir_if_empty(dir: &Path) {
    let empty = match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Could not inspect subtitle directory");
            return;
        }
    };

    if !empty {
        return;
    }

    match std::fs::remove_dir(dir) {
        Ok(()) => info!(dir = %dir.display(), "Removed empty subtitle directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "Could not remove subtitle directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockMuxer;
    use tempfile::TempDir;

    const ENGLISH: &str = "1\n00:00:01,000 --> 00:00:04,000\nI told you we should have left the city before the storm arrived.\n\n2\n00:00:04,500 --> 00:00:08,000\nNobody listens to me when I am right, and now we are trapped here.\n";
    const SPANISH: &str = "1\n00:00:01,000 --> 00:00:04,000\nTe dije que deberíamos haber salido de la ciudad antes de la tormenta.\n\n2\n00:00:04,500 --> 00:00:08,000\nNadie me escucha cuando tengo razón, y ahora estamos atrapados aquí.\n";

    fn options(delete_subs: bool) -> AttachOptions {
        AttachOptions {
            delete_subs,
            policy: LanguagePolicy::new(vec![Language::Eng, Language::Spa]),
            default_language: Language::Spa,
            default_track_name: "Español".to_string(),
        }
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn groups_both_languages_into_one_mux() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "show.s01e01.mkv", "video");
        write(dir.path(), "show.s01e01.en.srt", ENGLISH);
        write(dir.path(), "show.s01e01.es.srt", SPANISH);

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .withf(|video, subs, _| {
                video.ends_with("show.s01e01.mkv")
                    && subs.len() == 2
                    && subs.iter().filter(|s| s.is_default).count() == 1
                    && subs.iter().any(|s| s.language == "spa" && s.is_default)
                    && subs.iter().any(|s| s.language == "eng" && !s.is_default)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.changed, 1);
        assert!(dir.path().join("show.s01e01.mkv").is_file());
        assert!(!dir.path().join("show.s01e01.en.srt").exists());
        assert!(!dir.path().join("show.s01e01.es.srt").exists());
    }

    #[tokio::test]
    async fn unmatched_group_is_reported_and_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "other.mkv", "video");
        write(dir.path(), "orphan.en.srt", ENGLISH);

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().never();

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(dir.path().join("orphan.en.srt").is_file());
    }

    #[tokio::test]
    async fn failed_mux_leaves_files_and_continues() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.mkv", "original a");
        write(dir.path(), "a.es.srt", SPANISH);
        write(dir.path(), "b.mkv", "original b");
        write(dir.path(), "b.es.srt", SPANISH);

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().times(2).returning(|video, _, _| {
            if video.ends_with("a.mkv") {
                Err(ToolError::Reported {
                    tool: "mkvmerge".to_string(),
                    line: "Error: bad input".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.changed, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.mkv")).unwrap(), "original a");
        assert!(dir.path().join("a.es.srt").is_file());
        assert!(!dir.path().join("b.es.srt").exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tagsweep-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn subs_directory_is_removed_once_empty() {
        let dir = TempDir::new().unwrap();
        let subs = dir.path().join(SUBS_DIR);
        std::fs::create_dir(&subs).unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(&subs, "ep.es.srt", SPANISH);

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().times(1).returning(|_, _, _| Ok(()));

        attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert!(!subs.exists());
    }

    #[tokio::test]
    async fn subs_directory_with_leftovers_stays() {
        let dir = TempDir::new().unwrap();
        let subs = dir.path().join(SUBS_DIR);
        std::fs::create_dir(&subs).unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(&subs, "ep.es.srt", SPANISH);
        write(&subs, "lonely.en.srt", ENGLISH);

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().times(1).returning(|_, _, _| Ok(()));

        attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert!(subs.is_dir());
        assert!(subs.join("lonely.en.srt").is_file());
        assert!(!subs.join("ep.es.srt").exists());
    }

    #[tokio::test]
    async fn keep_policy_leaves_subtitles() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(dir.path(), "ep.en.srt", ENGLISH);

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().times(1).returning(|_, _, _| Ok(()));

        attach_directory(&muxer, dir.path(), &options(false)).await.unwrap();

        assert!(dir.path().join("ep.en.srt").is_file());
    }

    #[tokio::test]
    async fn undetectable_subtitle_is_not_muxed_but_deleted_with_its_group() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(dir.path(), "ep.es.srt", SPANISH);
        write(dir.path(), "ep.xx.srt", "1\n00:00:01,000 --> 00:00:02,000\n♪\n");

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .withf(|_, subs, _| subs.len() == 1 && subs[0].language == "spa")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.changed, 1);
        assert!(!dir.path().join("ep.es.srt").exists());
        assert!(!dir.path().join("ep.xx.srt").exists());
    }

    #[tokio::test]
    async fn excluded_subtitle_stays_when_nothing_was_muxed() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(dir.path(), "ep.xx.srt", "1\n00:00:01,000 --> 00:00:02,000\n♪\n");

        let mut muxer = MockMuxer::new();
        muxer.expect_mux().never();

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(dir.path().join("ep.xx.srt").is_file());
    }

    #[tokio::test]
    async fn idx_companion_is_deleted_with_the_group() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ep.mkv", "video");
        write(dir.path(), "ep.idx", "# VobSub index file, v7\nid: es, index: 0\n");
        write(dir.path(), "ep.sub", "binary");

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .withf(|_, subs, _| subs.len() == 1 && subs[0].language == "spa")
            .times(1)
            .returning(|_, _, _| Ok(()));

        attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert!(!dir.path().join("ep.idx").exists());
        assert!(!dir.path().join("ep.sub").exists());
    }

    #[tokio::test]
    async fn video_stem_ending_in_a_short_word_is_matched() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Doctor.Who.mkv", "video");
        write(dir.path(), "Doctor.Who.srt", SPANISH);

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .withf(|video, subs, _| video.ends_with("Doctor.Who.mkv") && subs.len() == 1)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let summary = attach_directory(&muxer, dir.path(), &options(true)).await.unwrap();

        assert_eq!(summary.changed, 1);
        assert_eq!(summary.skipped, 0);
        assert!(!dir.path().join("Doctor.Who.srt").exists());
    }

    #[tokio::test]
    async fn mp4_target_becomes_mkv() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ep.mp4", "video");
        write(dir.path(), "ep.es.srt", SPANISH);

        let mut muxer = MockMuxer::new();
        muxer
            .expect_mux()
            .withf(|video, _, _| video.ends_with("ep.mp4"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        attach_directory(&muxer, dir.path(), &options(false)).await.unwrap();

        assert!(dir.path().join("ep.mkv").is_file());
        assert!(!dir.path().join("ep.mp4").exists());
    }

    #[test]
    fn scan_location_prefers_subs() {
        let dir = TempDir::new().unwrap();
        assert_eq!(scan_location(dir.path()), dir.path());

        std::fs::create_dir(dir.path().join(SUBS_DIR)).unwrap();
        assert_eq!(scan_location(dir.path()), dir.path().join(SUBS_DIR));
    }
}
