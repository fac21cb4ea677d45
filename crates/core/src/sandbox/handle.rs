//! Per-execution resource names.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::submission::Language;

/// Prefix shared by every sandbox container name.
pub const CONTAINER_PREFIX: &str = "scriptbox";

/// Names of every resource one execution owns.
///
/// All names derive from a single random identifier, which is what keeps
/// concurrent executions from ever touching each other's container or files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    pub id: String,
    pub container_name: String,
    pub script_file: String,
    pub log_file: String,
    pub host_script_path: PathBuf,
    pub container_script_path: String,
    pub host_log_path: PathBuf,
    pub container_log_path: String,
}

impl ExecutionHandle {
    /// Derive a handle from a fresh random identifier.
    pub fn generate(language: Language, host_dir: &Path, container_dir: &str) -> Self {
        Self::from_id(Uuid::new_v4().simple().to_string(), language, host_dir, container_dir)
    }

    pub fn from_id(id: String, language: Language, host_dir: &Path, container_dir: &str) -> Self {
        let script_file = format!("script-{id}.{}", language.extension());
        let log_file = format!("logs-{id}.txt");
        let container_dir = container_dir.trim_end_matches('/');

        Self {
            container_name: format!("{CONTAINER_PREFIX}-{id}"),
            host_script_path: host_dir.join(&script_file),
            container_script_path: format!("{container_dir}/{script_file}"),
            host_log_path: host_dir.join(&log_file),
            container_log_path: format!("{container_dir}/{log_file}"),
            script_file,
            log_file,
            id,
        }
    }

    /// `docker cp` address of a path inside this execution's container.
    pub fn in_container(&self, path: &str) -> String {
        format!("{}:{path}", self.container_name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
