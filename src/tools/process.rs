//! Subprocess plumbing shared by the mkvtoolnix wrappers.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use super::MkvTool;
use crate::error::ToolError;

/// Captured result of a finished tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turns exit codes of 2 and above into errors.
    ///
    /// mkvtoolnix returns 0 for success, 1 for warnings, 2 for errors.
    pub fn check(self, tool: MkvTool) -> Result<Self, ToolError> {
        if self.code >= 2 || self.code < 0 {
            // mkvtoolnix prints its errors on stdout
            let message = if self.stderr.trim().is_empty() {
                self.stdout.trim()
            } else {
                self.stderr.trim()
            };
            return Err(ToolError::Failed {
                tool: tool.to_string(),
                code: self.code,
                stderr: message.to_string(),
            });
        }

        if self.code == 1 {
            debug!(tool = %tool, stdout = %self.stdout.trim(), "Tool finished with warnings");
        }

        Ok(self)
    }
}

/// Configures a command for captured, non-interactive use.
pub fn prepare(cmd: &mut Command) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
}

/// Runs a command to completion and captures its output.
pub async fn run(
    tool: MkvTool,
    mut cmd: Command,
    timeout_secs: u64,
) -> Result<ToolOutput, ToolError> {
    prepare(&mut cmd);
    debug!(cmd = ?cmd, "Running {}", tool);

    let output = with_timeout(tool, timeout_secs, async {
        cmd.output().await.map_err(|e| ToolError::Unavailable {
            tool: tool.to_string(),
            message: e.to_string(),
        })
    })
    .await?;

    Ok(ToolOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Bounds a tool future by `timeout_secs`; 0 waits forever.
///
/// The child is killed when its future is dropped, so an expired call does
/// not leave a process behind.
pub async fn with_timeout<F, T>(tool: MkvTool, timeout_secs: u64, fut: F) -> Result<T, ToolError>
where
    F: Future<Output = Result<T, ToolError>>,
{
    if timeout_secs == 0 {
        return fut.await;
    }

    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(result) => result,
        Err(_) => Err(ToolError::Timeout {
            tool: tool.to_string(),
            seconds: timeout_secs,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: i32) -> ToolOutput {
        ToolOutput {
            code,
            stdout: "Error: the file could not be opened".to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn warnings_are_accepted() {
        assert!(output(0).check(MkvTool::Mkvpropedit).is_ok());
        assert!(output(1).check(MkvTool::Mkvpropedit).is_ok());
    }

    #[test]
    fn errors_carry_stdout_when_stderr_is_empty() {
        let err = output(2).check(MkvTool::Mkvinfo).unwrap_err();
        match err {
            ToolError::Failed { tool, code, stderr } => {
                assert_eq!(tool, "mkvinfo");
                assert_eq!(code, 2);
                assert!(stderr.contains("could not be opened"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn killed_process_is_a_failure() {
        assert!(output(-1).check(MkvTool::Mkvmerge).is_err());
    }

    #[tokio::test]
    async fn timeout_zero_waits() {
        let value = with_timeout(MkvTool::Mkvmerge, 0, async { Ok::<_, ToolError>(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn expired_call_reports_timeout() {
        let result = with_timeout(MkvTool::Mkvmerge, 1, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, ToolError>(())
        })
        .await;

        assert!(matches!(result, Err(ToolError::Timeout { seconds: 1, .. })));
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let cmd = Command::new("/nonexistent/tagsweep-missing-tool");
        let err = run(MkvTool::Mkvinfo, cmd, 0).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
