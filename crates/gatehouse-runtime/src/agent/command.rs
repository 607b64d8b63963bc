//! Subprocess-backed agent runtime.
//!
//! Protocol: the [`AgentCall`] is written to the child's stdin as one JSON
//! line, then stdin is closed. Every non-empty stdout line is one turn event:
//! valid JSON is passed through as a value, anything else as a bare string.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use super::call::{AgentCall, AgentRuntime, TurnStream};
use crate::errors::AgentError;

const STDERR_TAIL_LINES: usize = 20;

/// Runs the agent as a child process, one process per invocation.
pub struct CommandRuntime {
    command: String,
    args: Vec<String>,
}

impl CommandRuntime {
    /// Create a runtime that launches `command args…`.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl AgentRuntime for CommandRuntime {
    async fn invoke(&self, call: AgentCall) -> Result<TurnStream, AgentError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        let _ = cmd
            .args(&self.args)
            .current_dir(&call.working_directory)
            .envs(&call.permission_callback.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %self.command, working_dir = %call.working_directory.display(), "spawning agent runtime");

        let mut child = cmd
            .spawn()
            .map_err(|e| AgentError::Spawn(format!("{}: {e}", self.command)))?;

        let payload = serde_json::to_string(&call)
            .map_err(|e| AgentError::Spawn(format!("failed to encode call: {e}")))?;
        if let Some(mut stdin) = child.stdin.take() {
            // Written off the read path so a large call cannot stall against a
            // runner that fills stdout first. A runner that ignores stdin may
            // exit before the write finishes; its exit status decides the
            // outcome. Dropping `stdin` at the end of the task closes it.
            drop(tokio::spawn(async move {
                if let Err(e) = stdin.write_all(format!("{payload}\n").as_bytes()).await {
                    warn!(error = %e, "failed to write call to agent runtime");
                }
            }));
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Spawn("agent stdout not captured".into()))?;
        let stderr_pipe = child.stderr.take();
        let stderr_handle = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let stream = async_stream::stream! {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            yield Ok(parse_line(line));
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(AgentError::Upstream(format!("failed to read agent output: {e}")));
                        return;
                    }
                }
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!("agent runtime exited cleanly");
                }
                Ok(status) => {
                    let stderr = stderr_handle.await.unwrap_or_default();
                    yield Err(AgentError::Upstream(format!(
                        "agent runtime exited with {status}: {}",
                        tail(&stderr, STDERR_TAIL_LINES)
                    )));
                }
                Err(e) => {
                    yield Err(AgentError::Upstream(format!("failed to wait for agent runtime: {e}")));
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

fn parse_line(line: &str) -> Value {
    serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
