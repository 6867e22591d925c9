//! mkvpropedit wrapper for in-place metadata edits.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use super::{process, MkvTool};
use crate::config::model::ToolConfig;
use crate::error::ToolError;

/// Sets the name of track `track` (1-based, as listed by mkvinfo).
///
/// An empty name removes the property instead of storing "".
pub async fn set_track_name(
    config: &ToolConfig,
    file: &Path,
    track: u64,
    name: &str,
) -> Result<(), ToolError> {
    let mut cmd = Command::new(MkvTool::Mkvpropedit.program(config));
    cmd.arg(file).arg("--edit").arg(format!("track:{}", track));
    set_or_delete(&mut cmd, "name", name);

    edit(config, cmd).await
}

/// Sets the segment title.
pub async fn set_title(config: &ToolConfig, file: &Path, title: &str) -> Result<(), ToolError> {
    let mut cmd = Command::new(MkvTool::Mkvpropedit.program(config));
    cmd.arg(file).arg("--edit").arg("info");
    set_or_delete(&mut cmd, "title", title);

    edit(config, cmd).await
}

/// Deletes the attachment with the given ID.
pub async fn delete_attachment(config: &ToolConfig, file: &Path, id: u64) -> Result<(), ToolError> {
    let mut cmd = Command::new(MkvTool::Mkvpropedit.program(config));
    cmd.arg(file).arg("--delete-attachment").arg(id.to_string());

    edit(config, cmd).await
}

fn set_or_delete(cmd: &mut Command, property: &str, value: &str) {
    if value.is_empty() {
        cmd.arg("--delete").arg(property);
    } else {
        cmd.arg("--set").arg(format!("{}={}", property, value));
    }
}

async fn edit(config: &ToolConfig, cmd: Command) -> Result<(), ToolError> {
    let output = process::run(MkvTool::Mkvpropedit, cmd, config.timeout_secs)
        .await?
        .check(MkvTool::Mkvpropedit)?;

    debug!(code = output.code, "mkvpropedit finished");
    Ok(())
}
