//! Sandbox configuration.
//!
//! Passed explicitly to every component instead of living in module-level
//! constants, so tests can point the sandbox at an isolated temp directory.

use std::path::PathBuf;
use std::time::Duration;

/// Pinned runtime image. Deno runs both JavaScript and TypeScript.
pub const DEFAULT_IMAGE: &str = "denoland/deno:alpine-1.46.3";

/// Maximum bytes kept from any one output stream or log (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Extra time the host gives `exec` beyond the in-container run timeout, so
/// the in-container kill normally fires first.
pub const RUN_KILL_GRACE: Duration = Duration::from_secs(2);

/// Resource limits applied to every sandbox container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory limit in docker syntax (e.g. `256m`).
    pub memory: Option<String>,
    /// CPU quota in docker syntax (e.g. `0.5`).
    pub cpus: Option<String>,
    /// Maximum number of processes inside the container.
    pub pids: Option<u32>,
    /// Start containers with `--network none`.
    pub network_disabled: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: Some("256m".to_string()),
            cpus: Some("0.5".to_string()),
            pids: Some(64),
            network_disabled: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Container CLI binary (`docker`, `podman`, ...).
    pub runtime: String,
    /// Image every container is started from.
    pub image: String,
    /// Host directory holding per-execution script and log files.
    pub work_dir: PathBuf,
    /// Directory inside the container the script and log are written to.
    pub container_dir: String,
    /// Budget for the interpreter run, enforced by a kill inside the container.
    pub run_timeout: Duration,
    /// Budget for every other runtime command (run, ps, cp, rm).
    pub command_timeout: Duration,
    /// Budget for pulling the image at startup.
    pub pull_timeout: Duration,
    /// How many times to check that a fresh container is running.
    pub start_poll_attempts: u32,
    /// Delay between running-state checks.
    pub start_poll_interval: Duration,
    pub limits: ResourceLimits,
    /// Upper bound on submitted script size in bytes.
    pub max_script_bytes: usize,
}

impl SandboxConfig {
    /// Default configuration rooted at the given host working directory.
    pub fn with_work_dir(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Host-side timeout for the `exec` that runs the interpreter.
    pub fn exec_timeout(&self) -> Duration {
        self.run_timeout + RUN_KILL_GRACE
    }

    /// Longest one execution can take before it has a result: container start
    /// polling, copy-in, the run with its kill grace, and copy-back.
    pub fn execution_budget(&self) -> Duration {
        self.start_poll_interval * self.start_poll_attempts
            + self.command_timeout * 2
            + self.exec_timeout()
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            image: DEFAULT_IMAGE.to_string(),
            work_dir: std::env::temp_dir().join("scriptbox"),
            container_dir: "/tmp".to_string(),
            run_timeout: Duration::from_millis(5_000),
            command_timeout: Duration::from_millis(10_000),
            pull_timeout: Duration::from_secs(600),
            start_poll_attempts: 10,
            start_poll_interval: Duration::from_millis(200),
            limits: ResourceLimits::default(),
            max_script_bytes: 64 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
