//! Metadata rewriter: strips keywords from track names, the title and attachments.

use std::path::Path;

use tracing::{debug, error, info, warn};

use super::{display_name, has_extension, list_files, ItemStatus, RunSummary};
use crate::error::{AppError, ToolError};
use crate::matcher::{self, Keyword, KeywordSet};
use crate::media::probe::{DescriptorKind, TrackDescriptor, TrackListing};
use crate::tools::MediaTool;

/// Settings for one rewrite run.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Text put in place of a matched keyword; empty deletes it.
    pub replacement: String,
    pub remove_attachments: bool,
    pub strip_empty_brackets: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            replacement: String::new(),
            remove_attachments: true,
            strip_empty_brackets: true,
        }
    }
}

/// An edit decided for one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDecision {
    pub track: TrackDescriptor,
    pub matched_keyword: String,
    pub replacement_text: String,
}

/// What happened to the edits of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReport {
    pub attachments_removed: usize,
    pub edits_applied: usize,
    pub edits_failed: usize,
}

/// Result of rewriting one file.
#[derive(Debug)]
pub enum RewriteOutcome {
    /// Nothing matched; no edit was issued.
    NoChanges,
    /// At least one edit was attempted.
    Rewritten(FileReport),
    /// The file could not be read.
    Aborted(ToolError),
}

impl RewriteOutcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            RewriteOutcome::NoChanges => ItemStatus::Unchanged,
            RewriteOutcome::Rewritten(report) if report.edits_failed > 0 => ItemStatus::Failed,
            RewriteOutcome::Rewritten(_) => ItemStatus::Changed,
            RewriteOutcome::Aborted(_) => ItemStatus::Failed,
        }
    }
}

/// Computes the new text for `text` with `keyword` replaced.
pub fn rewrite_text(text: &str, keyword: &Keyword, options: &RewriteOptions) -> String {
    let rewritten = keyword.replace_in(text, &options.replacement);
    if options.strip_empty_brackets {
        matcher::strip_empty_brackets(&rewritten)
    } else {
        rewritten
    }
}

/// Decides the edits for one file, title first.
///
/// Each descriptor is rewritten with its first matching keyword only.
/// Descriptors whose text would not change are left out.
pub fn plan_edits(
    listing: &TrackListing,
    keywords: &KeywordSet,
    options: &RewriteOptions,
) -> Vec<MatchDecision> {
    let title = listing.title.as_deref().map(TrackDescriptor::title);

    title
        .iter()
        .chain(listing.tracks.iter())
        .filter_map(|descriptor| {
            let keyword = keywords.first_match(&descriptor.text)?;
            let replacement_text = rewrite_text(&descriptor.text, keyword, options);

            if replacement_text == descriptor.text {
                debug!(
                    text = %descriptor.text,
                    keyword = keyword.trimmed(),
                    "Rewrite leaves text unchanged"
                );
                return None;
            }

            Some(MatchDecision {
                track: descriptor.clone(),
                matched_keyword: keyword.trimmed().to_string(),
                replacement_text,
            })
        })
        .collect()
}

/// Rewrites the metadata of one file in place.
pub async fn rewrite_file(
    tool: &dyn MediaTool,
    file: &Path,
    keywords: &KeywordSet,
    options: &RewriteOptions,
) -> RewriteOutcome {
    let listing = match tool.list_tracks(file).await {
        Ok(listing) => listing,
        Err(e) => {
            error!(file = %file.display(), error = %e, "Could not read track listing");
            return RewriteOutcome::Aborted(e);
        }
    };

    let mut report = FileReport::default();

    if options.remove_attachments {
        remove_attachments(tool, file, keywords, &mut report).await;
    }

    let decisions = plan_edits(&listing, keywords, options);

    for decision in &decisions {
        let track = &decision.track;
        let result = match track.kind {
            DescriptorKind::Title => tool.set_title(file, &decision.replacement_text).await,
            DescriptorKind::Name => {
                tool.set_track_name(file, track.id, &decision.replacement_text)
                    .await
            }
        };

        match result {
            Ok(()) => {
                report.edits_applied += 1;
                info!(
                    file = %file.display(),
                    track_id = track.id,
                    keyword = %decision.matched_keyword,
                    from = %track.text,
                    to = %decision.replacement_text,
                    "Rewrote {:?}",
                    track.kind
                );
                println!("  '{}' -> '{}'", track.text, decision.replacement_text);
            }
            Err(e) => {
                report.edits_failed += 1;
                warn!(file = %file.display(), track_id = track.id, error = %e, "Edit failed");
                println!("  Failed to rewrite '{}': {}", track.text, e);
            }
        }
    }

    if report == FileReport::default() {
        RewriteOutcome::NoChanges
    } else {
        RewriteOutcome::Rewritten(report)
    }
}

/// Deletes attachments whose file name contains a keyword.
///
/// Highest IDs go first so the remaining IDs stay valid.
async fn remove_attachments(
    tool: &dyn MediaTool,
    file: &Path,
    keywords: &KeywordSet,
    report: &mut FileReport,
) {
    let mut attachments = match tool.list_attachments(file).await {
        Ok(attachments) => attachments,
        Err(e) => {
            warn!(file = %file.display(), error = %e, "Could not list attachments");
            report.edits_failed += 1;
            return;
        }
    };

    attachments.retain(|a| keywords.matches(&a.file_name));
    attachments.sort_by(|a, b| b.id.cmp(&a.id));

    for attachment in attachments {
        match tool.delete_attachment(file, attachment.id).await {
            Ok(()) => {
                report.attachments_removed += 1;
                info!(
                    file = %file.display(),
                    id = attachment.id,
                    name = %attachment.file_name,
                    "Removed attachment"
                );
                println!("  Removed attachment '{}'", attachment.file_name);
            }
            Err(e) => {
                report.edits_failed += 1;
                warn!(
                    file = %file.display(),
                    id = attachment.id,
                    error = %e,
                    "Attachment delete failed"
                );
                println!("  Failed to remove attachment '{}': {}", attachment.file_name, e);
            }
        }
    }
}

/// Rewrites every `.mkv` file directly inside `dir`.
pub async fn rewrite_directory(
    tool: &dyn MediaTool,
    dir: &Path,
    keywords: &KeywordSet,
    options: &RewriteOptions,
) -> Result<RunSummary, AppError> {
    let files = list_files(dir, |p| has_extension(p, "mkv"))?;
    let mut summary = RunSummary::default();

    if files.is_empty() {
        println!("No MKV files found in {}", dir.display());
        return Ok(summary);
    }

    info!(dir = %dir.display(), files = files.len(), "Rewriting metadata");

    for (index, file) in files.iter().enumerate() {
        println!("[{}/{}] {}", index + 1, files.len(), display_name(file));

        let outcome = rewrite_file(tool, file, keywords, options).await;
        match &outcome {
            RewriteOutcome::NoChanges => println!("  No changes needed"),
            RewriteOutcome::Rewritten(report) => debug!(?report, "File rewritten"),
            RewriteOutcome::Aborted(e) => println!("  Skipped: {}", e),
        }

        summary.record(outcome.status());
    }

    Ok(summary)
}
