//! Drives one submission through a fresh container.
//!
//! ```text
//! validate ─► start ─► stage + cp in ─► exec (bounded) ─► cp log out ─► read
//!                 │                                                     │
//!                 └──────────────── teardown (always) ◄─────────────────┘
//! ```
//!
//! Validation failures return before anything is acquired. Once `start` has
//! been issued, container removal and host log deletion run on every exit
//! path, and their own failures are logged instead of replacing the outcome.
//! If the execution future is dropped or panics before teardown finishes, a
//! [`TeardownGuard`] finishes it on a fresh task.
//!
//! The interpreter runs under `timeout -s KILL` inside the container, so the
//! script is dead before its log is copied back. The runner's own timeout is
//! [`SandboxConfig::exec_timeout`], which leaves room for that kill to land.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use super::config::{SandboxConfig, MAX_OUTPUT_BYTES};
use super::container::ContainerManager;
use super::error::SandboxError;
use super::handle::ExecutionHandle;
use super::result::{ExecutionResult, ExecutionStatus};
use super::runner::{CommandRunner, CommandSpec};
use super::submission::{Submission, SubmissionRequest};
use super::workspace::WorkspaceFiles;
use crate::error::CoreError;

/// Exit codes of a run killed by the in-container `timeout`: 124 from GNU
/// coreutils, 128 + SIGKILL from busybox.
const KILLED_EXIT_CODES: [i32; 2] = [124, 137];

pub struct ScriptOrchestrator<R> {
    runner: Arc<R>,
    containers: Arc<ContainerManager<R>>,
    workspace: WorkspaceFiles,
    config: Arc<SandboxConfig>,
}

impl<R: CommandRunner + 'static> ScriptOrchestrator<R> {
    pub fn new(runner: Arc<R>, config: SandboxConfig) -> Self {
        let config = Arc::new(config);
        Self {
            containers: Arc::new(ContainerManager::new(
                Arc::clone(&runner),
                Arc::clone(&config),
            )),
            workspace: WorkspaceFiles::new(config.work_dir.clone()),
            runner,
            config,
        }
    }

    /// One-time startup work: create the working directory and make sure the
    /// runtime image is available. Call before accepting traffic.
    pub async fn prepare(&self) -> Result<(), SandboxError> {
        self.workspace.ensure_root().await?;
        self.containers.pre_pull().await
    }

    /// Run a submission to completion and release everything it acquired.
    ///
    /// Script errors and timeouts come back as `Ok` results. `Err` means the
    /// request was invalid or the sandbox itself failed.
    ///
    /// Dropping the returned future part-way hands teardown to a background
    /// task. Callers that need teardown finished before they see the outcome
    /// should use [`execute_detached`](Self::execute_detached).
    pub async fn execute(&self, request: SubmissionRequest) -> Result<ExecutionResult, CoreError> {
        let submission = request.validate(self.config.max_script_bytes)?;
        let handle = ExecutionHandle::generate(
            submission.language,
            self.workspace.root(),
            &self.config.container_dir,
        );

        let span = tracing::info_span!(
            "execution",
            execution_id = %handle.id,
            language = %submission.language,
        );

        async {
            let started = Instant::now();
            tracing::debug!(container = %handle.container_name, "Execution started");

            let guard = TeardownGuard::arm(&self.containers, &self.workspace, &handle);
            let outcome = self.run_in_sandbox(&submission, &handle).await;
            guard.release().await;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &outcome {
                Ok(result) => {
                    tracing::info!(status = ?result.status, elapsed_ms, "Execution finished")
                }
                Err(e) => tracing::error!(error = %e, elapsed_ms, "Execution failed"),
            }

            outcome.map_err(CoreError::from)
        }
        .instrument(span)
        .await
    }

    /// [`execute`](Self::execute) on its own task, so teardown completes even
    /// if the caller stops waiting.
    pub async fn execute_detached(
        self: &Arc<Self>,
        request: SubmissionRequest,
    ) -> Result<ExecutionResult, CoreError> {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.execute(request).await }.in_current_span());

        match task.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(SandboxError::Task(join_err.to_string()).into()),
        }
    }

    async fn run_in_sandbox(
        &self,
        submission: &Submission,
        handle: &ExecutionHandle,
    ) -> Result<ExecutionResult, SandboxError> {
        self.containers.start(&handle.container_name).await?;
        self.copy_script_in(submission, handle).await?;

        let run = match self
            .runner
            .run(&self.interpreter_command(handle), self.config.exec_timeout())
            .await
        {
            Err(SandboxError::CommandFailed { exit_code, .. })
                if KILLED_EXIT_CODES.contains(&exit_code) =>
            {
                tracing::debug!(exit_code, "Interpreter killed by in-container timeout");
                ExecutionResult::timeout("")
            }
            other => other?,
        };

        let log_source = handle.in_container(&handle.container_log_path);
        let log_target = handle.host_log_path.to_string_lossy();
        let copied = self.copy(&log_source, &log_target).await;

        match run.status {
            ExecutionStatus::Success | ExecutionStatus::Timeout => {
                copied?;
                let output = self
                    .workspace
                    .read(&handle.host_log_path, MAX_OUTPUT_BYTES)
                    .await?;
                Ok(ExecutionResult {
                    status: run.status,
                    result: output,
                })
            }
            // The script's own diagnostics are the result; the log adds nothing.
            ExecutionStatus::Error => {
                if let Err(e) = copied {
                    tracing::debug!(error = %e, "Log copy after script error failed");
                }
                Ok(run)
            }
        }
    }

    async fn copy_script_in(
        &self,
        submission: &Submission,
        handle: &ExecutionHandle,
    ) -> Result<(), SandboxError> {
        let copied = match self
            .workspace
            .stage(&handle.script_file, &submission.script)
            .await
        {
            Ok(path) => {
                let target = handle.in_container(&handle.container_script_path);
                self.copy(&path.to_string_lossy(), &target).await
            }
            Err(e) => Err(e),
        };

        // Not needed once the copy has been attempted, whatever its outcome.
        if let Err(e) = self.workspace.cleanup(&handle.host_script_path).await {
            tracing::warn!(error = %e, "Failed to delete host script");
        }

        copied
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), SandboxError> {
        let command = CommandSpec::new(&self.config.runtime).args(["cp", from, to]);
        let copied = self.runner.run(&command, self.config.command_timeout).await?;

        match copied.status {
            ExecutionStatus::Success => Ok(()),
            ExecutionStatus::Timeout => Err(SandboxError::Copy {
                from: from.to_string(),
                to: to.to_string(),
                detail: "timed out".to_string(),
            }),
            ExecutionStatus::Error => Err(SandboxError::Copy {
                from: from.to_string(),
                to: to.to_string(),
                detail: copied.result,
            }),
        }
    }

    /// `exec` that runs the interpreter under an in-container kill timeout,
    /// with stdout capped and redirected to the log file inside the container
    /// so output written before the kill survives.
    ///
    /// The shell's own stderr goes to `/dev/null` (job status lines such as
    /// `Killed`); the interpreter's stderr is passed through on fd 3.
    fn interpreter_command(&self, handle: &ExecutionHandle) -> CommandSpec {
        let container_dir = self.config.container_dir.trim_end_matches('/');
        let kill_after_secs = self.config.run_timeout.as_millis().div_ceil(1000).max(1);
        let shell = format!(
            "set -o pipefail; exec 3>&2 2>/dev/null; \
             timeout -s KILL {kill_after_secs} deno run --no-prompt {script} 2>&3 \
             | {{ head -c {MAX_OUTPUT_BYTES}; cat > /dev/null; }} > {log}",
            script = handle.container_script_path,
            log = handle.container_log_path,
        );

        CommandSpec::new(&self.config.runtime).args([
            "exec".to_string(),
            "--env".to_string(),
            format!("DENO_DIR={container_dir}/deno-dir"),
            handle.container_name.clone(),
            "sh".to_string(),
            "-c".to_string(),
            shell,
        ])
    }
}

async fn teardown<R: CommandRunner>(
    containers: &ContainerManager<R>,
    workspace: &WorkspaceFiles,
    handle: &ExecutionHandle,
) {
    if let Err(e) = containers.remove(&handle.container_name).await {
        tracing::warn!(
            container = %handle.container_name,
            error = %e,
            "Failed to remove container"
        );
    }
    if let Err(e) = workspace.cleanup(&handle.host_log_path).await {
        tracing::warn!(error = %e, "Failed to delete host log");
    }
}

/// Owns an execution's teardown from `start` onwards.
///
/// [`release`](Self::release) tears down inline. A guard dropped while still
/// armed (cancelled future, panic in a runner) spawns the same teardown onto
/// the current tokio runtime.
struct TeardownGuard<R: CommandRunner + 'static> {
    containers: Arc<ContainerManager<R>>,
    workspace: WorkspaceFiles,
    handle: Option<ExecutionHandle>,
}

impl<R: CommandRunner + 'static> TeardownGuard<R> {
    fn arm(
        containers: &Arc<ContainerManager<R>>,
        workspace: &WorkspaceFiles,
        handle: &ExecutionHandle,
    ) -> Self {
        Self {
            containers: Arc::clone(containers),
            workspace: workspace.clone(),
            handle: Some(handle.clone()),
        }
    }

    async fn release(mut self) {
        if let Some(handle) = &self.handle {
            teardown(&self.containers, &self.workspace, handle).await;
        }
        self.handle = None;
    }
}

impl<R: CommandRunner + 'static> Drop for TeardownGuard<R> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(
                    container = %handle.container_name,
                    "Execution abandoned before teardown, finishing it in the background"
                );
                let containers = Arc::clone(&self.containers);
                let workspace = self.workspace.clone();
                runtime.spawn(
                    async move { teardown(&containers, &workspace, &handle).await }
                        .in_current_span(),
                );
            }
            Err(_) => tracing::error!(
                container = %handle.container_name,
                "No runtime left to tear down abandoned execution"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
