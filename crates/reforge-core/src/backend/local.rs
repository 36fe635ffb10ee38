//! Local subprocess execution backend
//!
//! Runs each candidate in its own interpreter process under a private
//! temporary directory. Deployment writes the candidate source plus a
//! generated runner script and validates that the source byte-compiles;
//! execution feeds one encoded input tuple through the runner and decodes
//! a `RESULT: <json>|<seconds>` reply. Isolation is a process boundary
//! with rlimits, not a VM; callers needing stronger isolation plug in a
//! different [`ExecutionBackend`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use async_trait::async_trait;

use super::{DeployError, EnvironmentHandle, ExecutionBackend, TransportError};
use crate::signature::FunctionSignature;
use crate::synth::TestCase;
use crate::value::Value;
use crate::variant::ExecutionOutcome;

const CANDIDATE_FILE: &str = "candidate.py";
const RUNNER_FILE: &str = "runner.py";
const INPUT_FILE: &str = "input.json";
const MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Runner script template. `__ENTRY__` is replaced at deploy time with the
/// callable name the harness discovered, so the script resolves the entry
/// point by name instead of scanning the loaded module.
const RUNNER_TEMPLATE: &str = r#"import json
import sys
import time

ENTRY = "__ENTRY__"


def decode(node):
    kind = node["t"]
    value = node.get("v")
    if kind == "null":
        return None
    if kind == "float":
        return float(value) if isinstance(value, str) else value
    if kind == "list":
        return [decode(item) for item in value]
    if kind == "dict":
        return {key: decode(item) for key, item in value.items()}
    if kind == "set":
        return {decode(item) for item in value}
    return value


def encode(value):
    if value is None:
        return {"t": "null"}
    if isinstance(value, bool):
        return {"t": "bool", "v": value}
    if isinstance(value, int):
        if -(2 ** 63) <= value < 2 ** 63:
            return {"t": "int", "v": value}
        return {"t": "raw", "v": repr(value)}
    if isinstance(value, float):
        if value != value:
            return {"t": "float", "v": "nan"}
        if value == float("inf"):
            return {"t": "float", "v": "inf"}
        if value == float("-inf"):
            return {"t": "float", "v": "-inf"}
        return {"t": "float", "v": value}
    if isinstance(value, str):
        return {"t": "str", "v": value}
    if isinstance(value, (list, tuple)):
        return {"t": "list", "v": [encode(item) for item in value]}
    if isinstance(value, dict):
        return {"t": "dict", "v": {str(key): encode(item) for key, item in value.items()}}
    if isinstance(value, (set, frozenset)):
        return {"t": "set", "v": sorted((encode(item) for item in value), key=json.dumps)}
    return {"t": "raw", "v": repr(value)}


def main():
    with open(sys.argv[1], "r", encoding="utf-8") as handle:
        args = [decode(node) for node in json.load(handle)]
    try:
        import candidate
        func = getattr(candidate, ENTRY, None)
    except Exception as exc:
        print("ERROR: %s: %s" % (type(exc).__name__, exc))
        sys.exit(1)
    if func is None or not callable(func):
        print("ERROR: entry point %r not found" % ENTRY)
        sys.exit(1)
    try:
        start = time.perf_counter()
        result = func(*args)
        elapsed = time.perf_counter() - start
    except Exception as exc:
        print("ERROR: %s: %s" % (type(exc).__name__, exc))
        sys.exit(1)
    print("RESULT: %s|%.9f" % (json.dumps(encode(result)), elapsed))


main()
"#;

struct DeployedEnv {
    // Held for its Drop: removing the entry deletes the directory
    _dir: TempDir,
    root: PathBuf,
}

/// [`ExecutionBackend`] backed by local interpreter subprocesses.
pub struct LocalProcessBackend {
    python_bin: String,
    exec_timeout: Duration,
    deploy_timeout: Duration,
    max_memory_bytes: Option<u64>,
    envs: Mutex<HashMap<Uuid, DeployedEnv>>,
}

impl LocalProcessBackend {
    /// Backend with default settings (`python3`, 30s execution timeout,
    /// no memory cap)
    pub fn new() -> Self {
        Self {
            python_bin: "python3".to_string(),
            exec_timeout: Duration::from_secs(30),
            deploy_timeout: Duration::from_secs(30),
            max_memory_bytes: None,
            envs: Mutex::new(HashMap::new()),
        }
    }

    /// Set the interpreter binary
    pub fn with_python_bin(mut self, bin: impl Into<String>) -> Self {
        self.python_bin = bin.into();
        self
    }

    /// Set the per-case execution timeout
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    /// Cap the candidate process address space (Unix only)
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = Some(bytes);
        self
    }

    /// Number of live environments (for teardown accounting in tests)
    pub fn live_environments(&self) -> usize {
        self.envs.lock().len()
    }

    fn command(&self, root: &PathBuf, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.python_bin);
        cmd.args(args)
            .current_dir(root)
            .env("PYTHONDONTWRITEBYTECODE", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        self.apply_unix_limits(&mut cmd);

        cmd
    }

    #[cfg(unix)]
    fn apply_unix_limits(&self, cmd: &mut Command) {
        use std::os::unix::process::CommandExt;

        let max_memory = self.max_memory_bytes;
        unsafe {
            cmd.pre_exec(move || {
                if let Some(mem) = max_memory {
                    let limit = libc::rlimit {
                        rlim_cur: mem,
                        rlim_max: mem,
                    };
                    libc::setrlimit(libc::RLIMIT_AS, &limit);
                }
                Ok(())
            });
        }
    }

    /// Spawn one interpreter invocation and capture its output.
    async fn run_process(
        &self,
        root: &PathBuf,
        args: &[String],
        time_limit: Duration,
    ) -> Result<ProcessReply, TransportError> {
        let mut child = self
            .command(root, args)
            .spawn()
            .map_err(|e| TransportError::Channel(format!("failed to spawn interpreter: {e}")))?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            match stdout_handle {
                Some(out) => read_limited(out, MAX_OUTPUT_BYTES).await,
                None => String::new(),
            }
        });
        let stderr_task = tokio::spawn(async move {
            match stderr_handle {
                Some(err) => read_limited(err, MAX_OUTPUT_BYTES).await,
                None => String::new(),
            }
        });

        let (exit_code, timed_out) = match timeout(time_limit, child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                return Err(TransportError::Channel(format!("process wait failed: {e}")));
            }
            Err(_) => {
                let _ = child.kill().await;
                (None, true)
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ProcessReply {
            exit_code,
            timed_out,
            stdout,
            stderr,
        })
    }

    fn env_root(&self, env: &EnvironmentHandle) -> Result<PathBuf, TransportError> {
        self.envs
            .lock()
            .get(&env.id)
            .map(|deployed| deployed.root.clone())
            .ok_or(TransportError::UnknownEnvironment(env.id))
    }
}

impl Default for LocalProcessBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct ProcessReply {
    exit_code: Option<i32>,
    timed_out: bool,
    stdout: String,
    stderr: String,
}

#[async_trait]
impl ExecutionBackend for LocalProcessBackend {
    async fn deploy(
        &self,
        variant_id: &str,
        source: &str,
    ) -> Result<EnvironmentHandle, DeployError> {
        // Entry point is resolved here, once, by the discovery contract;
        // the runner script receives the name instead of re-discovering it.
        let signature = FunctionSignature::parse(source)
            .map_err(|e| DeployError::Rejected(e.to_string()))?;

        let dir = TempDir::new()
            .map_err(|e| DeployError::Provision(format!("tempdir creation failed: {e}")))?;
        let root = dir.path().to_path_buf();

        tokio::fs::write(root.join(CANDIDATE_FILE), source)
            .await
            .map_err(|e| DeployError::Provision(format!("writing candidate failed: {e}")))?;

        let runner = RUNNER_TEMPLATE.replace("__ENTRY__", &signature.name);
        tokio::fs::write(root.join(RUNNER_FILE), runner)
            .await
            .map_err(|e| DeployError::Provision(format!("writing runner failed: {e}")))?;

        // Byte-compile check: catches syntax errors before any case runs
        let reply = self
            .run_process(
                &root,
                &[
                    "-m".to_string(),
                    "py_compile".to_string(),
                    CANDIDATE_FILE.to_string(),
                ],
                self.deploy_timeout,
            )
            .await
            .map_err(|e| DeployError::Provision(e.to_string()))?;

        if reply.timed_out {
            return Err(DeployError::Provision("compile check timed out".to_string()));
        }
        if reply.exit_code != Some(0) {
            return Err(DeployError::Rejected(reply.stderr.trim().to_string()));
        }

        let handle = EnvironmentHandle::new(variant_id);
        tracing::debug!(
            variant_id = %variant_id,
            env_id = %handle.id,
            root = %root.display(),
            "deployed candidate"
        );
        self.envs
            .lock()
            .insert(handle.id, DeployedEnv { _dir: dir, root });
        Ok(handle)
    }

    async fn execute(
        &self,
        env: &EnvironmentHandle,
        input: &TestCase,
    ) -> Result<ExecutionOutcome, TransportError> {
        let root = self.env_root(env)?;

        let payload = serde_json::to_string(&input.args)
            .map_err(|e| TransportError::Protocol(format!("input encoding failed: {e}")))?;
        tokio::fs::write(root.join(INPUT_FILE), payload)
            .await
            .map_err(|e| TransportError::Channel(format!("writing input failed: {e}")))?;

        let reply = self
            .run_process(
                &root,
                &[RUNNER_FILE.to_string(), INPUT_FILE.to_string()],
                self.exec_timeout,
            )
            .await?;

        if reply.timed_out {
            return Ok(ExecutionOutcome::failure(
                format!(
                    "execution timed out after {}s",
                    self.exec_timeout.as_secs()
                ),
                self.exec_timeout.as_secs_f64(),
            ));
        }

        parse_reply(&reply)
    }

    async fn teardown(&self, env: EnvironmentHandle) {
        match self.envs.lock().remove(&env.id) {
            Some(deployed) => {
                tracing::debug!(
                    variant_id = %env.variant_id,
                    env_id = %env.id,
                    "tore down environment"
                );
                drop(deployed);
            }
            None => {
                // Already gone; leakage would be logged, never propagated
                tracing::warn!(env_id = %env.id, "teardown of unknown environment");
            }
        }
    }
}

/// Decode one runner reply into an [`ExecutionOutcome`].
fn parse_reply(reply: &ProcessReply) -> Result<ExecutionOutcome, TransportError> {
    if let Some(line) = reply
        .stdout
        .lines()
        .find(|line| line.starts_with("ERROR: "))
    {
        return Ok(ExecutionOutcome::failure(
            line.trim_start_matches("ERROR: ").to_string(),
            0.0,
        ));
    }

    if let Some(line) = reply
        .stdout
        .lines()
        .find(|line| line.starts_with("RESULT: "))
    {
        let body = line.trim_start_matches("RESULT: ");
        let (json_part, latency_part) = body
            .rsplit_once('|')
            .ok_or_else(|| TransportError::Protocol(format!("missing latency field: {body}")))?;
        let value: Value = serde_json::from_str(json_part)
            .map_err(|e| TransportError::Protocol(format!("undecodable result: {e}")))?;
        let latency: f64 = latency_part
            .trim()
            .parse()
            .map_err(|_| TransportError::Protocol(format!("bad latency field: {latency_part}")))?;
        return Ok(ExecutionOutcome::success(value, latency));
    }

    if reply.exit_code == Some(0) {
        return Err(TransportError::Protocol(
            "runner produced no RESULT line".to_string(),
        ));
    }

    let detail = if reply.stderr.trim().is_empty() {
        format!("interpreter exited with code {:?}", reply.exit_code)
    } else {
        reply.stderr.trim().to_string()
    };
    Ok(ExecutionOutcome::failure(detail, 0.0))
}

async fn read_limited<R: tokio::io::AsyncRead + Unpin>(reader: R, max_bytes: u64) -> String {
    let mut reader = BufReader::new(reader);
    let mut output = String::new();
    let mut total: u64 = 0;

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(n) => {
                total += n as u64;
                if total > max_bytes {
                    output.push_str("\n... (output truncated)");
                    break;
                }
                output.push_str(&line);
            }
            Err(_) => break,
        }
    }

    output
}
