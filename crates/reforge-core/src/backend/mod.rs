//! Execution backend boundary
//!
//! Candidate code never runs in the harness process. Deploying, executing,
//! and tearing down isolated environments happens exclusively behind
//! [`ExecutionBackend`]; the harness only ever sees opaque handles and
//! decoded outcomes.

mod local;
pub mod testing;

pub use local::LocalProcessBackend;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::synth::TestCase;
use crate::variant::ExecutionOutcome;

/// Opaque handle to one deployed execution environment.
///
/// Each variant owns exactly one environment for the duration of a run;
/// handles are never shared across variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentHandle {
    /// Backend-assigned environment id
    pub id: Uuid,

    /// Variant deployed into this environment
    pub variant_id: String,
}

impl EnvironmentHandle {
    /// Mint a handle for a variant
    pub fn new(variant_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            variant_id: variant_id.into(),
        }
    }
}

/// Deployment failure. Recorded per variant; the variant is abandoned but
/// the run continues.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The candidate source was rejected (does not compile, no callable)
    #[error("candidate rejected: {0}")]
    Rejected(String),

    /// The backend could not provision an environment
    #[error("environment provisioning failed: {0}")]
    Provision(String),
}

/// Transport-level execution failure (lost environment, broken pipe,
/// undecodable reply). Recorded per case as a failed execution; not
/// distinguished from program-level failures at this layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handle does not refer to a live environment
    #[error("unknown environment {0}")]
    UnknownEnvironment(Uuid),

    /// Process or channel failure while talking to the environment
    #[error("execution transport failed: {0}")]
    Channel(String),

    /// The environment replied with something the wire codec cannot read
    #[error("malformed execution reply: {0}")]
    Protocol(String),
}

/// Isolated execution provider.
///
/// The only operations expected to block or await I/O in the whole
/// harness; everything around them is pure computation.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Provision an environment and deploy one candidate into it.
    async fn deploy(
        &self,
        variant_id: &str,
        source: &str,
    ) -> Result<EnvironmentHandle, DeployError>;

    /// Run the deployed candidate against one input tuple.
    async fn execute(
        &self,
        env: &EnvironmentHandle,
        input: &TestCase,
    ) -> Result<ExecutionOutcome, TransportError>;

    /// Release an environment. Best-effort: failures are logged by the
    /// implementation and never propagated; a leaked environment must not
    /// turn into an evaluation failure.
    async fn teardown(&self, env: EnvironmentHandle);
}
