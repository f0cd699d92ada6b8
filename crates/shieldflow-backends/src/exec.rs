//! Subprocess execution for external scanning tools

use shieldflow_core::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured output of one tool invocation
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// First stderr line, for compact error messages
    pub fn stderr_summary(&self) -> &str {
        self.stderr.lines().next().unwrap_or("").trim()
    }
}

/// Launch a tool and wait for it to exit, capturing stdout/stderr.
///
/// The child is spawned with `kill_on_drop`, so when the caller's timeout
/// abandons this future the process is killed rather than leaked. A non-zero
/// exit code is not an error here; adapters interpret exit codes through
/// their own tables.
pub async fn run_tool<I, S>(program: &str, args: I, cwd: Option<&Path>) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(program, "launching tool");
    let child = cmd
        .spawn()
        .map_err(|e| Error::backend(program, format!("failed to launch: {e}")))?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| Error::backend(program, format!("failed waiting for tool: {e}")))?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_tool_captures_output() {
        let out = run_tool("sh", ["-c", "echo hello; echo oops >&2; exit 3"], None)
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr_summary(), "oops");
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let err = run_tool("definitely-not-a-real-scanner", ["--version"], None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to launch"));
    }
}
