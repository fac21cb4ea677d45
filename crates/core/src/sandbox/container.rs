//! Container lifecycle over the container runtime's CLI.
//!
//! Containers are started from the pinned image with an idle entrypoint so
//! nothing runs until the orchestrator execs the interpreter. This manager is
//! the only component that creates or destroys containers.

use std::sync::Arc;

use super::config::SandboxConfig;
use super::error::SandboxError;
use super::result::{ExecutionResult, ExecutionStatus};
use super::runner::{CommandRunner, CommandSpec};

/// Label applied to every sandbox container for out-of-band inspection.
pub const MANAGED_LABEL: &str = "scriptbox.managed=true";

/// Starts, confirms, and removes sandbox containers.
pub struct ContainerManager<R> {
    runner: Arc<R>,
    config: Arc<SandboxConfig>,
}

impl<R: CommandRunner> ContainerManager<R> {
    pub fn new(runner: Arc<R>, config: Arc<SandboxConfig>) -> Self {
        Self { runner, config }
    }

    fn cli(&self) -> CommandSpec {
        CommandSpec::new(&self.config.runtime)
    }

    /// Pull the runtime image unless it is already present locally.
    ///
    /// Meant to run once at startup, before any request is accepted.
    pub async fn pre_pull(&self) -> Result<(), SandboxError> {
        let image = &self.config.image;

        let list = self.cli().args(["images", "--quiet", image.as_str()]);
        let listed = self.runner.run(&list, self.config.command_timeout).await?;
        if listed.status != ExecutionStatus::Success {
            return Err(image_error(image, &listed));
        }
        if !listed.result.trim().is_empty() {
            tracing::info!(image = %image, "Runtime image already present");
            return Ok(());
        }

        tracing::info!(image = %image, "Pulling runtime image");
        let pull = self.cli().args(["pull", "--quiet", image.as_str()]);
        let pulled = self.runner.run(&pull, self.config.pull_timeout).await?;
        if pulled.status != ExecutionStatus::Success {
            return Err(image_error(image, &pulled));
        }

        tracing::info!(image = %image, "Runtime image pulled");
        Ok(())
    }

    /// Launch a detached, idle container and wait until it reports as running.
    pub async fn start(&self, name: &str) -> Result<(), SandboxError> {
        let command = self.start_command(name);
        let started = self.runner.run(&command, self.config.command_timeout).await?;

        // The runtime may print warnings (e.g. unsupported swap limits) while
        // still starting the container, so the status poll below is authoritative.
        let start_detail = match started.status {
            ExecutionStatus::Success => None,
            status => {
                tracing::warn!(
                    container = %name,
                    ?status,
                    detail = %started.result,
                    "Container start reported a problem"
                );
                Some(started.result)
            }
        };

        let attempts = self.config.start_poll_attempts.max(1);
        for attempt in 1..=attempts {
            if self.is_running(name).await? {
                tracing::debug!(container = %name, attempt, "Container running");
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.start_poll_interval).await;
            }
        }

        Err(match start_detail {
            Some(detail) => SandboxError::ContainerStart {
                name: name.to_string(),
                detail,
            },
            None => SandboxError::ContainerNotRunning {
                name: name.to_string(),
                attempts,
            },
        })
    }

    /// Force-remove the container if it exists. Missing containers are a no-op.
    ///
    /// Safe to call when [`start`](Self::start) never succeeded.
    pub async fn remove(&self, name: &str) -> Result<(), SandboxError> {
        if !self.exists(name).await? {
            tracing::debug!(container = %name, "Container already gone");
            return Ok(());
        }

        let command = self.cli().args(["rm", "--force", name]);
        let removed = self.runner.run(&command, self.config.command_timeout).await?;
        match removed.status {
            ExecutionStatus::Success => {
                tracing::debug!(container = %name, "Container removed");
                Ok(())
            }
            // Lost a race with another removal; the end state is what we want.
            ExecutionStatus::Error if removed.result.contains("No such container") => Ok(()),
            _ => Err(SandboxError::ContainerRemove {
                name: name.to_string(),
                detail: removed.result,
            }),
        }
    }

    /// Whether the container is currently in the running state.
    pub async fn is_running(&self, name: &str) -> Result<bool, SandboxError> {
        self.list_named(name, false).await
    }

    /// Whether the container exists in any state.
    pub async fn exists(&self, name: &str) -> Result<bool, SandboxError> {
        self.list_named(name, true).await
    }

    async fn list_named(&self, name: &str, all: bool) -> Result<bool, SandboxError> {
        let mut command = self.cli().arg("ps");
        if all {
            command = command.arg("--all");
        }
        let command = command.args(["--filter", &format!("name={name}"), "--format", "{{.Names}}"]);

        let listed = self.runner.run(&command, self.config.command_timeout).await?;
        if listed.status != ExecutionStatus::Success {
            return Err(SandboxError::Runtime {
                command: command.to_string(),
                detail: listed.result,
            });
        }

        // The name filter is a substring match, so compare exactly.
        Ok(listed.result.lines().any(|line| line.trim() == name))
    }

    fn start_command(&self, name: &str) -> CommandSpec {
        let limits = &self.config.limits;
        let mut command = self.cli().args([
            "run",
            "--detach",
            "--name",
            name,
            "--label",
            MANAGED_LABEL,
            "--cap-drop",
            "ALL",
            "--security-opt",
            "no-new-privileges",
        ]);

        if limits.network_disabled {
            command = command.arg("--network=none");
        }
        if let Some(memory) = &limits.memory {
            command = command.args(["--memory", memory.as_str()]);
        }
        if let Some(cpus) = &limits.cpus {
            command = command.args(["--cpus", cpus.as_str()]);
        }
        if let Some(pids) = limits.pids {
            command = command.args(["--pids-limit".to_string(), pids.to_string()]);
        }

        // Idle entrypoint: keep the container alive without running anything.
        command.args([
            "--entrypoint",
            "tail",
            self.config.image.as_str(),
            "-f",
            "/dev/null",
        ])
    }
}

fn image_error(image: &str, outcome: &ExecutionResult) -> SandboxError {
    let detail = match outcome.status {
        ExecutionStatus::Timeout => "timed out".to_string(),
        _ => outcome.result.clone(),
    };
    SandboxError::Image {
        image: image.to_string(),
        detail,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
