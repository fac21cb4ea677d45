//! Host-side working directory for per-execution files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncReadExt;

use super::error::SandboxError;

/// Stages script files in, and removes files from, a single host directory.
#[derive(Debug, Clone)]
pub struct WorkspaceFiles {
    root: PathBuf,
}

impl WorkspaceFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the working directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), SandboxError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SandboxError::Workspace {
                path: self.root.clone(),
                source,
            })
    }

    /// Write `content` to `file_name` under the working directory.
    ///
    /// The name must be unique per execution; see
    /// [`ExecutionHandle`](super::handle::ExecutionHandle).
    pub async fn stage(&self, file_name: &str, content: &str) -> Result<PathBuf, SandboxError> {
        let path = self.root.join(file_name);
        fs::write(&path, content)
            .await
            .map_err(|source| SandboxError::Workspace {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Delete `path` if present. Deleting a missing file is a no-op.
    pub async fn cleanup(&self, path: &Path) -> Result<(), SandboxError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SandboxError::Workspace {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Read at most `limit` bytes of a file copied back from a container.
    pub async fn read(&self, path: &Path, limit: usize) -> Result<String, SandboxError> {
        let io_err = |source| SandboxError::Workspace {
            path: path.to_path_buf(),
            source,
        };

        let file = fs::File::open(path).await.map_err(io_err)?;
        let mut bytes = Vec::new();
        file.take(limit as u64)
            .read_to_end(&mut bytes)
            .await
            .map_err(io_err)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
