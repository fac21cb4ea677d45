use validator::ValidationErrors;

use crate::sandbox::error::SandboxError;

/// Top-level failure of an execution request.
///
/// Script errors and timeouts are not represented here: they are ordinary
/// [`ExecutionResult`](crate::sandbox::result::ExecutionResult) values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The submission was rejected before any resource was acquired.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The sandbox itself failed (container runtime, copy, host filesystem).
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}
