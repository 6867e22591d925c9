//! mkvtoolnix adapter.
//!
//! The pipelines only see the [`MediaTool`] and [`Muxer`] traits; the
//! [`MkvToolnix`] implementation runs the real programs.

pub mod mkvinfo;
pub mod mkvmerge;
pub mod mkvpropedit;
pub mod process;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::config::model::{LabelTable, ToolConfig};
use crate::error::ToolError;
use crate::media::probe::{Attachment, TrackListing};
use crate::media::subtitle::SubtitleSpec;

/// The external programs used by tagsweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MkvTool {
    Mkvinfo,
    Mkvmerge,
    Mkvpropedit,
}

impl MkvTool {
    /// Configured executable for this tool.
    pub fn program(self, config: &ToolConfig) -> &Path {
        match self {
            MkvTool::Mkvinfo => &config.mkvinfo,
            MkvTool::Mkvmerge => &config.mkvmerge,
            MkvTool::Mkvpropedit => &config.mkvpropedit,
        }
    }
}

impl fmt::Display for MkvTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MkvTool::Mkvinfo => write!(f, "mkvinfo"),
            MkvTool::Mkvmerge => write!(f, "mkvmerge"),
            MkvTool::Mkvpropedit => write!(f, "mkvpropedit"),
        }
    }
}

/// Reads and edits container metadata in place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Lists named tracks and the title of a file.
    async fn list_tracks(&self, file: &Path) -> Result<TrackListing, ToolError>;

    /// Lists the attachments of a file.
    async fn list_attachments(&self, file: &Path) -> Result<Vec<Attachment>, ToolError>;

    async fn set_track_name(&self, file: &Path, track: u64, name: &str) -> Result<(), ToolError>;

    async fn set_title(&self, file: &Path, title: &str) -> Result<(), ToolError>;

    async fn delete_attachment(&self, file: &Path, id: u64) -> Result<(), ToolError>;
}

/// Merges subtitle files into a video.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Writes `video` plus `subtitles` to `output`.
    ///
    /// Succeeds only if the tool exited cleanly and printed no error line.
    async fn mux(
        &self,
        video: &Path,
        subtitles: &[SubtitleSpec],
        output: &Path,
    ) -> Result<(), ToolError>;
}

/// Runs the installed mkvtoolnix programs.
#[derive(Debug, Clone)]
pub struct MkvToolnix {
    config: ToolConfig,
    labels: LabelTable,
}

impl MkvToolnix {
    pub fn new(config: ToolConfig, labels: LabelTable) -> Self {
        Self { config, labels }
    }
}

#[async_trait]
impl MediaTool for MkvToolnix {
    async fn list_tracks(&self, file: &Path) -> Result<TrackListing, ToolError> {
        mkvinfo::list_tracks(&self.config, &self.labels, file).await
    }

    async fn list_attachments(&self, file: &Path) -> Result<Vec<Attachment>, ToolError> {
        mkvmerge::list_attachments(&self.config, &self.labels, file).await
    }

    async fn set_track_name(&self, file: &Path, track: u64, name: &str) -> Result<(), ToolError> {
        mkvpropedit::set_track_name(&self.config, file, track, name).await
    }

    async fn set_title(&self, file: &Path, title: &str) -> Result<(), ToolError> {
        mkvpropedit::set_title(&self.config, file, title).await
    }

    async fn delete_attachment(&self, file: &Path, id: u64) -> Result<(), ToolError> {
        mkvpropedit::delete_attachment(&self.config, file, id).await
    }
}

#[async_trait]
impl Muxer for MkvToolnix {
    async fn mux(
        &self,
        video: &Path,
        subtitles: &[SubtitleSpec],
        output: &Path,
    ) -> Result<(), ToolError> {
        mkvmerge::mux(&self.config, &self.labels, video, subtitles, output).await
    }
}
