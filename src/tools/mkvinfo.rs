//! mkvinfo wrapper for reading track names and the title.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use super::{process, MkvTool};
use crate::config::model::{LabelTable, ToolConfig};
use crate::error::ToolError;
use crate::media::probe::{self, TrackListing};

/// Lists the named tracks and title of `file`.
pub async fn list_tracks(
    config: &ToolConfig,
    labels: &LabelTable,
    file: &Path,
) -> Result<TrackListing, ToolError> {
    let mut cmd = Command::new(MkvTool::Mkvinfo.program(config));
    cmd.arg(file);

    let output = process::run(MkvTool::Mkvinfo, cmd, config.timeout_secs)
        .await?
        .check(MkvTool::Mkvinfo)?;

    let listing = probe::parse_mkvinfo(&output.stdout, labels);
    debug!(
        file = %file.display(),
        tracks = listing.tracks.len(),
        has_title = listing.title.is_some(),
        "Parsed mkvinfo listing"
    );

    Ok(listing)
}
