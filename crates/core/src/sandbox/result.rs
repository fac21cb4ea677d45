//! Result/status model threaded through every sandbox layer.

use serde::{Deserialize, Serialize};

/// Classified outcome of a command or a whole execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The command exited cleanly with nothing on its error stream.
    Success,
    /// The script (or command) reported an error on its error stream.
    Error,
    /// The command was killed after exceeding its time budget.
    Timeout,
}

/// The only value handed back to callers of the sandbox.
///
/// `result` holds stdout on success, the formatted error text on error, and
/// whatever output was captured before the kill on timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub result: String,
}

impl ExecutionResult {
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            result: result.into(),
        }
    }

    pub fn error(result: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            result: result.into(),
        }
    }

    pub fn timeout(result: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Timeout,
            result: result.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
