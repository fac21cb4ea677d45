use std::sync::Arc;

use scriptbox_core::sandbox::{ScriptOrchestrator, ShellRunner};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs submissions in per-request containers.
    pub orchestrator: Arc<ScriptOrchestrator<ShellRunner>>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let orchestrator = ScriptOrchestrator::new(Arc::new(ShellRunner), config.sandbox.clone());
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
