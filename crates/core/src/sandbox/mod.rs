//! Sandboxed script execution.
//!
//! Each submission runs in a fresh container started from a pinned runtime
//! image. The orchestrator stages the script on the host, copies it in, runs
//! the interpreter with output redirected to a log file inside the container,
//! copies the log back, and tears everything down on every exit path.
//!
//! Every container runtime interaction goes through the [`runner::CommandRunner`]
//! seam so the lifecycle can be exercised in tests without a container runtime.

pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod handle;
pub mod orchestrator;
pub mod result;
pub mod runner;
pub mod submission;
pub mod workspace;

pub use config::SandboxConfig;
pub use error::SandboxError;
pub use orchestrator::ScriptOrchestrator;
pub use result::{ExecutionResult, ExecutionStatus};
pub use runner::{CommandRunner, CommandSpec, ShellRunner};
pub use submission::{Language, Submission, SubmissionRequest};

/// Shared test doubles for sandbox tests.
#[cfg(test)]
pub(crate) mod test_helpers;
