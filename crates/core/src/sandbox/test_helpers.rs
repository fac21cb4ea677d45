use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use super::config::SandboxConfig;
use super::error::SandboxError;
use super::result::ExecutionResult;
use super::runner::{CommandRunner, CommandSpec};

/// Config pointed at `work_dir` with a fast start-poll budget.
pub fn test_config(work_dir: impl Into<PathBuf>) -> SandboxConfig {
    SandboxConfig {
        start_poll_attempts: 3,
        start_poll_interval: Duration::from_millis(1),
        run_timeout: Duration::from_millis(200),
        command_timeout: Duration::from_secs(1),
        ..SandboxConfig::with_work_dir(work_dir)
    }
}

/// What the fake interpreter run (`exec`) reports.
#[derive(Debug, Clone, Default)]
pub enum ExecOutcome {
    #[default]
    Success,
    ScriptError(String),
    /// Host-side timeout of the `exec` client itself.
    Timeout,
    /// The in-container `timeout -s KILL` fired: silent exit 137.
    KilledInContainer,
    /// Silent non-zero exit: an infrastructure failure.
    Infra,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBehaviour {
    pub image_present: bool,
    pub pull_fails: bool,
    /// `run` creates the container but it never shows up as running.
    pub never_running: bool,
    /// Stderr emitted by `run`; the container is not created.
    pub run_stderr: Option<String>,
    pub fail_copy_in: bool,
    pub fail_copy_out: bool,
    pub exec: ExecOutcome,
    pub exec_delay: Option<Duration>,
    /// Panic inside the runner when `exec` arrives.
    pub exec_panics: bool,
    /// Log content copied back; defaults to the script copied in.
    pub log: Option<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<CommandSpec>,
    created: HashSet<String>,
    running: HashSet<String>,
    image_pulled: bool,
    scripts: HashMap<String, String>,
    /// Host script path each container's copy-in read from.
    staged_from: HashMap<String, PathBuf>,
    /// Whether that host script still existed when `exec` arrived.
    host_script_at_exec: Vec<bool>,
    exec_timeouts: Vec<Duration>,
}

/// In-memory container runtime that records every command it receives.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    behaviour: FakeBehaviour,
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new(behaviour: FakeBehaviour) -> Self {
        Self {
            behaviour,
            state: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, subcommand: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.subcommand() == Some(subcommand))
            .collect()
    }

    pub fn count(&self, subcommand: &str) -> usize {
        self.calls_for(subcommand).len()
    }

    /// For each `exec`, whether the staged host script was still on disk.
    pub fn host_script_at_exec(&self) -> Vec<bool> {
        self.state.lock().unwrap().host_script_at_exec.clone()
    }

    pub fn exec_timeouts(&self) -> Vec<Duration> {
        self.state.lock().unwrap().exec_timeouts.clone()
    }

    /// Containers that exist in any state.
    pub fn live_containers(&self) -> Vec<String> {
        self.state.lock().unwrap().created.iter().cloned().collect()
    }

    fn respond(&self, command: &CommandSpec) -> Result<ExecutionResult, SandboxError> {
        let args: Vec<&str> = command.args.iter().map(String::as_str).collect();
        let mut state = self.state.lock().unwrap();

        match args.as_slice() {
            ["images", ..] => {
                let present = self.behaviour.image_present || state.image_pulled;
                Ok(ExecutionResult::success(if present { "sha256:1f2e3d\n" } else { "" }))
            }
            ["pull", ..] => {
                if self.behaviour.pull_fails {
                    return Ok(ExecutionResult::error("pull access denied"));
                }
                state.image_pulled = true;
                Ok(ExecutionResult::success(""))
            }
            ["run", "--detach", "--name", name, ..] => {
                if let Some(stderr) = &self.behaviour.run_stderr {
                    return Ok(ExecutionResult::error(stderr.clone()));
                }
                state.created.insert(name.to_string());
                if !self.behaviour.never_running {
                    state.running.insert(name.to_string());
                }
                Ok(ExecutionResult::success(format!("{name}\n")))
            }
            ["ps", rest @ ..] => {
                let all = rest.contains(&"--all");
                let filter = rest
                    .iter()
                    .find_map(|a| a.strip_prefix("name="))
                    .unwrap_or_default();
                let pool = if all { &state.created } else { &state.running };
                let names: Vec<&str> = pool
                    .iter()
                    .filter(|n| n.contains(filter))
                    .map(String::as_str)
                    .collect();
                Ok(ExecutionResult::success(names.join("\n")))
            }
            ["rm", "--force", name] => {
                state.running.remove(*name);
                if !state.created.remove(*name) {
                    return Ok(ExecutionResult::error(format!(
                        "Error response from daemon: No such container: {name}"
                    )));
                }
                Ok(ExecutionResult::success(format!("{name}\n")))
            }
            ["cp", from, to] => match container_part(to) {
                Some(name) => {
                    if self.behaviour.fail_copy_in {
                        return Ok(ExecutionResult::error("no space left on device"));
                    }
                    if !state.running.contains(name) {
                        return Ok(ExecutionResult::error(format!("No such container: {name}")));
                    }
                    let script = std::fs::read_to_string(from).map_err(|source| {
                        SandboxError::Workspace {
                            path: PathBuf::from(*from),
                            source,
                        }
                    })?;
                    state.scripts.insert(name.to_string(), script);
                    state.staged_from.insert(name.to_string(), PathBuf::from(*from));
                    Ok(ExecutionResult::success(""))
                }
                None => {
                    let name = container_part(from).unwrap_or_default();
                    if self.behaviour.fail_copy_out {
                        return Ok(ExecutionResult::error(format!(
                            "Could not find the file in container {name}"
                        )));
                    }
                    let log = match &self.behaviour.log {
                        Some(log) => log.clone(),
                        None => state.scripts.get(name).cloned().unwrap_or_default(),
                    };
                    std::fs::write(to, log).map_err(|source| SandboxError::Workspace {
                        path: PathBuf::from(*to),
                        source,
                    })?;
                    Ok(ExecutionResult::success(""))
                }
            },
            ["exec", rest @ ..] => {
                let staged = rest
                    .iter()
                    .find_map(|arg| state.staged_from.get(*arg).cloned());
                if let Some(path) = staged {
                    state.host_script_at_exec.push(path.exists());
                }
                self.exec_outcome(command)
            }
            _ => Ok(ExecutionResult::error(format!("unknown command: {command}"))),
        }
    }

    fn exec_outcome(&self, command: &CommandSpec) -> Result<ExecutionResult, SandboxError> {
        match &self.behaviour.exec {
            ExecOutcome::Success => Ok(ExecutionResult::success("")),
            ExecOutcome::ScriptError(message) => Ok(ExecutionResult::error(message.clone())),
            ExecOutcome::Timeout => Ok(ExecutionResult::timeout("")),
            ExecOutcome::KilledInContainer => Err(SandboxError::CommandFailed {
                command: command.to_string(),
                exit_code: 137,
            }),
            ExecOutcome::Infra => Err(SandboxError::CommandFailed {
                command: command.to_string(),
                exit_code: 126,
            }),
        }
    }
}

/// Container name in a `name:/path` copy address. Host paths are absolute.
fn container_part(address: &str) -> Option<&str> {
    address
        .split_once(':')
        .map(|(name, _)| name)
        .filter(|name| !name.is_empty() && !name.contains('/'))
}

impl CommandRunner for FakeRuntime {
    async fn run(
        &self,
        command: &CommandSpec,
        timeout: Duration,
    ) -> Result<ExecutionResult, SandboxError> {
        self.state.lock().unwrap().calls.push(command.clone());

        if command.subcommand() == Some("exec") {
            self.state.lock().unwrap().exec_timeouts.push(timeout);
            if self.behaviour.exec_panics {
                panic!("runtime fault during exec");
            }
            if let Some(delay) = self.behaviour.exec_delay {
                tokio::time::sleep(delay).await;
            }
        }

        self.respond(command)
    }
}
