use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use scriptbox_core::sandbox::config::{ResourceLimits, DEFAULT_IMAGE};
use scriptbox_core::sandbox::SandboxConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development against a local
/// docker daemon. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Container runtime, image, paths, timeouts and limits.
    pub sandbox: SandboxConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                        |
    /// |----------------------------------|--------------------------------|
    /// | `HOST`                           | `0.0.0.0`                      |
    /// | `PORT`                           | `3000`                         |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                           |
    /// | `SANDBOX_RUNTIME`                | `docker`                       |
    /// | `SANDBOX_IMAGE`                  | `denoland/deno:alpine-1.46.3`  |
    /// | `SANDBOX_WORK_DIR`               | `<tmp>/scriptbox`              |
    /// | `SANDBOX_CONTAINER_DIR`          | `/tmp`                         |
    /// | `SANDBOX_RUN_TIMEOUT_MS`         | `5000`                         |
    /// | `SANDBOX_COMMAND_TIMEOUT_MS`     | `10000`                        |
    /// | `SANDBOX_PULL_TIMEOUT_SECS`      | `600`                          |
    /// | `SANDBOX_START_POLL_ATTEMPTS`    | `10`                           |
    /// | `SANDBOX_START_POLL_INTERVAL_MS` | `200`                          |
    /// | `SANDBOX_MEMORY_LIMIT`           | `256m` (empty disables)        |
    /// | `SANDBOX_CPU_LIMIT`              | `0.5` (empty disables)         |
    /// | `SANDBOX_PIDS_LIMIT`             | `64` (`0` disables)            |
    /// | `SANDBOX_NETWORK_DISABLED`       | `true`                         |
    /// | `SANDBOX_MAX_SCRIPT_BYTES`       | `65536`                        |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "PORT", 3000);

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30);

        let defaults = SandboxConfig::default();
        let default_limits = ResourceLimits::default();

        let limits = ResourceLimits {
            memory: optional(&var, "SANDBOX_MEMORY_LIMIT", default_limits.memory),
            cpus: optional(&var, "SANDBOX_CPU_LIMIT", default_limits.cpus),
            pids: match var("SANDBOX_PIDS_LIMIT") {
                Some(raw) => match parse_value::<u32>("SANDBOX_PIDS_LIMIT", &raw) {
                    0 => None,
                    n => Some(n),
                },
                None => default_limits.pids,
            },
            network_disabled: parse_or(
                &var,
                "SANDBOX_NETWORK_DISABLED",
                default_limits.network_disabled,
            ),
        };

        let sandbox = SandboxConfig {
            runtime: var("SANDBOX_RUNTIME").unwrap_or(defaults.runtime),
            image: var("SANDBOX_IMAGE").unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            work_dir: var("SANDBOX_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            container_dir: var("SANDBOX_CONTAINER_DIR").unwrap_or(defaults.container_dir),
            run_timeout: millis_or(&var, "SANDBOX_RUN_TIMEOUT_MS", defaults.run_timeout),
            command_timeout: millis_or(
                &var,
                "SANDBOX_COMMAND_TIMEOUT_MS",
                defaults.command_timeout,
            ),
            pull_timeout: Duration::from_secs(parse_or(
                &var,
                "SANDBOX_PULL_TIMEOUT_SECS",
                defaults.pull_timeout.as_secs(),
            )),
            start_poll_attempts: parse_or(
                &var,
                "SANDBOX_START_POLL_ATTEMPTS",
                defaults.start_poll_attempts,
            ),
            start_poll_interval: millis_or(
                &var,
                "SANDBOX_START_POLL_INTERVAL_MS",
                defaults.start_poll_interval,
            ),
            limits,
            max_script_bytes: parse_or(&var, "SANDBOX_MAX_SCRIPT_BYTES", defaults.max_script_bytes),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            sandbox,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>()))
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(key).map_or(default, |raw| parse_value(key, &raw))
}

fn millis_or(var: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    var(key).map_or(default, |raw| Duration::from_millis(parse_value(key, &raw)))
}

/// Unset keeps the default; set-but-empty disables the setting.
fn optional(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Option<String>,
) -> Option<String> {
    match var(key) {
        Some(raw) if raw.trim().is_empty() => None,
        Some(raw) => Some(raw.trim().to_string()),
        None => default,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
