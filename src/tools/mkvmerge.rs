//! mkvmerge wrapper for attachment listing and subtitle muxing.

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::ExitStatus;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info, warn};

use super::{process, MkvTool};
use crate::config::model::{LabelField, LabelTable, ToolConfig};
use crate::error::ToolError;
use crate::media::probe::{self, Attachment};
use crate::media::subtitle::SubtitleSpec;

/// A classified line of mkvmerge output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxLine {
    /// `Progress: NN%`
    Progress(u8),
    /// A line starting with an error label.
    Error(String),
    Other,
}

/// Lists the attachments of `file` via `mkvmerge --identify`.
pub async fn list_attachments(
    config: &ToolConfig,
    labels: &LabelTable,
    file: &Path,
) -> Result<Vec<Attachment>, ToolError> {
    let mut cmd = Command::new(MkvTool::Mkvmerge.program(config));
    cmd.arg("--identify").arg(file);

    let output = process::run(MkvTool::Mkvmerge, cmd, config.timeout_secs)
        .await?
        .check(MkvTool::Mkvmerge)?;

    Ok(probe::parse_attachments(&output.stdout, labels))
}

/// Builds the mkvmerge argument list for one mux.
pub fn mux_args(video: &Path, subtitles: &[SubtitleSpec], output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-o".into(), output.into(), video.into()];

    for sub in subtitles {
        args.push("--language".into());
        args.push(format!("0:{}", sub.language).into());

        args.push("--default-track-flag".into());
        let flag = if sub.is_default { "0:yes" } else { "0:no" };
        args.push(flag.into());

        if let Some(name) = &sub.track_name {
            args.push("--track-name".into());
            args.push(format!("0:{}", name).into());
        }

        args.push(sub.path.as_os_str().into());
    }

    args
}

/// Muxes `subtitles` into `video`, writing the result to `output`.
///
/// Progress is printed as it arrives. Ctrl-C or an expired timeout kills
/// mkvmerge; the caller owns `output` and discards it on error.
pub async fn mux(
    config: &ToolConfig,
    labels: &LabelTable,
    video: &Path,
    subtitles: &[SubtitleSpec],
    output: &Path,
) -> Result<(), ToolError> {
    let tool = MkvTool::Mkvmerge;
    let mut cmd = Command::new(tool.program(config));
    cmd.args(mux_args(video, subtitles, output));
    process::prepare(&mut cmd);

    info!(
        video = %video.display(),
        output = %output.display(),
        subtitles = subtitles.len(),
        "Starting mkvmerge"
    );
    debug!(cmd = ?cmd, "Running mkvmerge");

    let mut child = cmd.spawn().map_err(|e| ToolError::Unavailable {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    // Drain stderr in the background so a chatty tool cannot block on a full pipe
    let stderr_task = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut text = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut text).await;
            text
        })
    });

    let stdout = child.stdout.take().ok_or_else(|| ToolError::Io {
        tool: tool.to_string(),
        source: io::Error::new(io::ErrorKind::Other, "stdout was not captured"),
    })?;

    let watched = process::with_timeout(
        tool,
        config.timeout_secs,
        watch(&mut child, stdout, labels),
    );
    let outcome = tokio::select! {
        result = watched => result,
        _ = tokio::signal::ctrl_c() => Err(ToolError::Cancelled { tool: tool.to_string() }),
    };

    let (reported, status) = match outcome {
        Ok(done) => done,
        Err(e) => {
            if let Err(kill_err) = child.kill().await {
                debug!(error = %kill_err, "mkvmerge already exited");
            }
            return Err(e);
        }
    };

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    settle(reported, status.code().unwrap_or(-1), stderr)?;

    info!(output = %output.display(), "mkvmerge completed");
    Ok(())
}

/// Turns what mkvmerge printed and returned into the mux result.
///
/// An error line fails the mux even when the exit code says success.
fn settle(reported: Option<String>, code: i32, stderr: String) -> Result<(), ToolError> {
    let tool = MkvTool::Mkvmerge;
    if let Some(line) = reported {
        return Err(ToolError::Reported {
            tool: tool.to_string(),
            line,
        });
    }

    process::ToolOutput {
        code,
        stdout: String::new(),
        stderr,
    }
    .check(tool)?;
    Ok(())
}

/// Streams stdout until mkvmerge exits.
///
/// Returns the first error line, if any, and the exit status.
async fn watch(
    child: &mut Child,
    stdout: ChildStdout,
    labels: &LabelTable,
) -> Result<(Option<String>, ExitStatus), ToolError> {
    let io_err = |source| ToolError::Io {
        tool: MkvTool::Mkvmerge.to_string(),
        source,
    };

    let reported = scan_output(BufReader::new(stdout), labels)
        .await
        .map_err(io_err)?;
    let status = child.wait().await.map_err(io_err)?;
    Ok((reported, status))
}

/// Prints progress from mkvmerge output and returns its first error line.
async fn scan_output<R>(mut reader: R, labels: &LabelTable) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut reported = None;
    let mut last_progress = None;

    while next_segment(&mut reader, &mut buf).await? {
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        match classify_line(&line, labels) {
            MuxLine::Progress(percent) => {
                if last_progress != Some(percent) {
                    last_progress = Some(percent);
                    println!("  Progress: {}%", percent);
                    debug!(percent, "mkvmerge progress");
                }
            }
            MuxLine::Error(message) => {
                warn!(line = %message, "mkvmerge reported an error");
                reported.get_or_insert(message);
            }
            MuxLine::Other => debug!(line = %line.trim(), "mkvmerge output"),
        }
    }

    Ok(reported)
}

/// Reads the next `\n`- or `\r`-terminated segment into `buf`.
///
/// mkvmerge redraws its progress with carriage returns, so both count as
/// line ends. Returns false at end of input.
async fn next_segment<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(!buf.is_empty());
        }

        match available.iter().position(|&b| b == b'\n' || b == b'\r') {
            Some(end) => {
                buf.extend_from_slice(&available[..end]);
                reader.consume(end + 1);
                return Ok(true);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

/// Classifies one line of mkvmerge output using the label table.
pub fn classify_line(line: &str, labels: &LabelTable) -> MuxLine {
    let line = line.trim();

    if let Some(rest) = after_label(line, labels.labels(LabelField::Progress)) {
        if let Some(percent) = rest
            .trim()
            .strip_suffix('%')
            .and_then(|n| n.trim().parse::<u8>().ok())
        {
            return MuxLine::Progress(percent);
        }
    }

    if after_label(line, labels.labels(LabelField::Error)).is_some() {
        return MuxLine::Error(line.to_string());
    }

    MuxLine::Other
}

/// Returns the text after `<label>:` if `line` starts with one of `labels`.
fn after_label<'a>(line: &'a str, labels: &[String]) -> Option<&'a str> {
    labels.iter().find_map(|label| {
        let head = line.get(..label.len())?;
        if head.to_lowercase() != label.to_lowercase() {
            return None;
        }
        line[label.len()..].trim_start().strip_prefix(':')
    })
}
