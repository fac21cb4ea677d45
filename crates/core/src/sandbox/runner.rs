//! Host command execution with a hard wall-clock timeout.
//!
//! [`ShellRunner`] spawns a command, captures stdout/stderr, and classifies
//! the outcome:
//!
//! | Outcome                                   | Result                         |
//! |-------------------------------------------|--------------------------------|
//! | anything written to stderr                | `Ok(Error, formatted stderr)`  |
//! | killed after the timeout                  | `Ok(Timeout, partial stdout)`  |
//! | non-zero exit, empty stderr / spawn error | `Err(SandboxError)`            |
//! | otherwise                                 | `Ok(Success, stdout)`          |
//!
//! A non-empty stderr counts as failure even when the exit code is zero.

use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::config::MAX_OUTPUT_BYTES;
use super::error::SandboxError;
use super::format::format_error;
use super::result::ExecutionResult;

/// How long to keep draining pipes after a timed-out process is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A host command: program plus arguments, never interpreted by a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// First argument, i.e. the runtime subcommand (`run`, `cp`, `exec`, ...).
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Seam between the sandbox and the host process table.
pub trait CommandRunner: Send + Sync {
    /// Run `command`, killing it once `timeout` elapses.
    fn run(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> impl Future<Output = Result<ExecutionResult, SandboxError>> + Send;
}

/// [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<ExecutionResult, SandboxError> {
        run_command(command, timeout).await
    }
}

/// Spawn `command`, capture its output, and enforce `timeout`.
pub async fn run_command(
    command: &CommandSpec,
    timeout: Duration,
) -> Result<ExecutionResult, SandboxError> {
    // `kill_on_drop(true)` guarantees the child dies with us even on early return.
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SandboxError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let start = Instant::now();

    // Buffers are shared with the reader tasks so whatever was flushed before
    // a timeout kill is still available afterwards.
    let stdout_buf = SharedBuffer::default();
    let stderr_buf = SharedBuffer::default();
    let mut stdout_task = tokio::spawn(drain(child.stdout.take(), stdout_buf.clone()));
    let mut stderr_task = tokio::spawn(drain(child.stderr.take(), stderr_buf.clone()));

    let completed = tokio::time::timeout(timeout, async {
        let status = child.wait().await?;
        let _ = (&mut stdout_task).await;
        let _ = (&mut stderr_task).await;
        Ok::<_, std::io::Error>(status)
    })
    .await;

    let elapsed_ms = start.elapsed().as_millis() as u64;

    match completed {
        Ok(Ok(status)) => {
            tracing::debug!(
                command = %command,
                exit_code = ?status.code(),
                elapsed_ms,
                "Command finished"
            );
            classify(
                command,
                status.code(),
                stdout_buf.to_string_lossy(),
                stderr_buf.to_string_lossy(),
            )
        }
        Ok(Err(source)) => Err(SandboxError::Spawn {
            command: command.to_string(),
            source,
        }),
        Err(_elapsed) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let _ = tokio::time::timeout(DRAIN_GRACE, &mut stdout_task).await;
            stdout_task.abort();
            stderr_task.abort();

            tracing::warn!(command = %command, elapsed_ms, "Command timed out and was killed");
            Ok(ExecutionResult::timeout(stdout_buf.to_string_lossy()))
        }
    }
}

/// Map a finished process onto the result model.
fn classify(
    command: &CommandSpec,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
) -> Result<ExecutionResult, SandboxError> {
    if !stderr.is_empty() {
        return Ok(ExecutionResult::error(format_error(&stderr)));
    }

    match exit_code {
        Some(0) => Ok(ExecutionResult::success(stdout)),
        code => Err(SandboxError::CommandFailed {
            command: command.to_string(),
            exit_code: code.unwrap_or(-1),
        }),
    }
}

#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn append(&self, bytes: &[u8]) {
        let mut buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let room = MAX_OUTPUT_BYTES.saturating_sub(buf.len());
        buf.extend_from_slice(&bytes[..bytes.len().min(room)]);
    }

    fn to_string_lossy(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Read a stream to EOF into `buf`, capped at [`MAX_OUTPUT_BYTES`].
///
/// Reading continues past the cap so the child never blocks on a full pipe.
async fn drain<R: AsyncRead + Unpin>(handle: Option<R>, buf: SharedBuffer) {
    let Some(mut reader) = handle else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.append(&chunk[..n]),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
