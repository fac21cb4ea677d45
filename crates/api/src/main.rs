use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scriptbox_api::config::ServerConfig;
use scriptbox_api::router::build_app_router;
use scriptbox_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to one JSON object per line for log shippers.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scriptbox_api=debug,scriptbox_core=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        runtime = %config.sandbox.runtime,
        image = %config.sandbox.image,
        work_dir = %config.sandbox.work_dir.display(),
        run_timeout_ms = config.sandbox.run_timeout.as_millis() as u64,
        "Loaded sandbox configuration"
    );

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    let execution_budget = config.sandbox.execution_budget();
    if request_timeout <= execution_budget {
        tracing::warn!(
            request_timeout_secs = config.request_timeout_secs,
            execution_budget_ms = execution_budget.as_millis() as u64,
            "Request timeout is shorter than the worst-case sandbox execution"
        );
    }

    // --- Sandbox ---
    let state = AppState::new(config.clone());

    state
        .orchestrator
        .prepare()
        .await
        .expect("Failed to prepare sandbox (work dir / runtime image)");
    tracing::info!("Sandbox ready");

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    // In-flight executions run on detached tasks; graceful shutdown waits for
    // their responses, which in turn wait for container teardown.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
