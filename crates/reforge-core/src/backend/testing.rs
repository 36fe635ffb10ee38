//! Deterministic scripted backend for tests
//!
//! Executes nothing: deployments succeed or fail by script, and each
//! variant's executions are answered by a closure keyed on its id. Used by
//! the runner/oracle unit tests and the integration suite, where
//! deterministic latencies and failures matter more than real isolation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DeployError, EnvironmentHandle, ExecutionBackend, TransportError};
use crate::synth::TestCase;
use crate::variant::ExecutionOutcome;

type ExecuteHandler =
    Box<dyn Fn(&TestCase) -> Result<ExecutionOutcome, TransportError> + Send + Sync>;

/// Scripted in-memory [`ExecutionBackend`].
pub struct ScriptedBackend {
    handlers: HashMap<String, ExecuteHandler>,
    failing_deploys: HashSet<String>,
    deployed: Mutex<Vec<String>>,
    torn_down: AtomicUsize,
}

impl ScriptedBackend {
    /// Backend with no scripts; every execution fails until scripted
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            failing_deploys: HashSet::new(),
            deployed: Mutex::new(Vec::new()),
            torn_down: AtomicUsize::new(0),
        }
    }

    /// Script the execution handler for one variant id
    pub fn on_execute<F>(mut self, variant_id: &str, handler: F) -> Self
    where
        F: Fn(&TestCase) -> Result<ExecutionOutcome, TransportError> + Send + Sync + 'static,
    {
        self.handlers.insert(variant_id.to_string(), Box::new(handler));
        self
    }

    /// Make deployment fail for one variant id
    pub fn fail_deploy(mut self, variant_id: &str) -> Self {
        self.failing_deploys.insert(variant_id.to_string());
        self
    }

    /// Variant ids deployed so far, in deployment order
    pub fn deployed(&self) -> Vec<String> {
        self.deployed.lock().clone()
    }

    /// Number of environments torn down
    pub fn torn_down(&self) -> usize {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBackend for ScriptedBackend {
    async fn deploy(
        &self,
        variant_id: &str,
        _source: &str,
    ) -> Result<EnvironmentHandle, DeployError> {
        if self.failing_deploys.contains(variant_id) {
            return Err(DeployError::Rejected(format!(
                "scripted deploy failure for {variant_id}"
            )));
        }
        self.deployed.lock().push(variant_id.to_string());
        Ok(EnvironmentHandle::new(variant_id))
    }

    async fn execute(
        &self,
        env: &EnvironmentHandle,
        input: &TestCase,
    ) -> Result<ExecutionOutcome, TransportError> {
        match self.handlers.get(&env.variant_id) {
            Some(handler) => handler(input),
            None => Ok(ExecutionOutcome::failure(
                format!("no script for variant {}", env.variant_id),
                0.0,
            )),
        }
    }

    async fn teardown(&self, _env: EnvironmentHandle) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }
}
