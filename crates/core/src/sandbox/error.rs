//! Infrastructure failures of the sandbox.
//!
//! A [`SandboxError`] always means the platform is broken, never that the
//! submitted script misbehaved. Script failures travel as
//! [`ExecutionResult`](super::result::ExecutionResult) values instead.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The host could not spawn or wait on a subprocess.
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A command exited non-zero without writing anything to stderr.
    #[error("`{command}` exited with code {exit_code} and no diagnostic output")]
    CommandFailed { command: String, exit_code: i32 },

    /// A container runtime command reported an error on stderr.
    #[error("`{command}` failed: {detail}")]
    Runtime { command: String, detail: String },

    /// The runtime image could not be found or pulled.
    #[error("Runtime image '{image}' unavailable: {detail}")]
    Image { image: String, detail: String },

    /// `run` was issued but the container never reported as running.
    #[error("Container '{name}' not running after {attempts} status checks")]
    ContainerNotRunning { name: String, attempts: u32 },

    /// The container runtime refused to start the container.
    #[error("Container '{name}' failed to start: {detail}")]
    ContainerStart { name: String, detail: String },

    /// The container could not be stopped or removed.
    #[error("Container '{name}' could not be removed: {detail}")]
    ContainerRemove { name: String, detail: String },

    /// Copying a file into or out of the container failed.
    #[error("Copy {from} -> {to} failed: {detail}")]
    Copy {
        from: String,
        to: String,
        detail: String,
    },

    /// Reading or writing the host working directory failed.
    #[error("Workspace I/O on {}: {}", .path.display(), .source)]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The detached execution task panicked or was cancelled.
    #[error("Execution task failed: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
