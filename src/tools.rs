use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::time;

/// Why an external tool produced no usable output.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} timed out after {after:?}")]
    Timeout { program: String, after: Duration },
    #[error("{program} exited with {code}: {stderr}")]
    Exit {
        program: String,
        code: String,
        stderr: String,
    },
}

/// Seam over process execution so adapters can be driven by canned output in tests.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `program args..` to completion and return its stdout.
    async fn run(&self, program: &Path, args: &[String], timeout: Duration)
        -> Result<String, ToolError>;
}

/// Runs tools as child processes with `tokio::process`.
///
/// The child is killed when the timeout fires or the calling future is dropped.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

#[async_trait]
impl ToolRunner for CommandRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, ToolError> {
        let name = program.display().to_string();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: name.clone(),
                source,
            })?;

        let output = match time::timeout(timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|source| ToolError::Spawn {
                program: name.clone(),
                source,
            })?,
            Err(_) => {
                return Err(ToolError::Timeout {
                    program: name,
                    after: timeout,
                })
            }
        };

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ToolError::Exit {
                program: name,
                code,
                stderr: snippet(&String::from_utf8_lossy(&output.stderr)),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn snippet(s: &str) -> String {
    let s = s.trim().replace('\n', " | ");
    match s.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s,
    }
}
