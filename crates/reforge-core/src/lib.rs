//! Reforge evaluation harness
//!
//! Takes one baseline function plus a set of candidate rewrites, derives
//! ground truth by running the baseline over a synthesized input set, then
//! executes every candidate against the same inputs inside isolated
//! environments and picks the best rewrite: correctness first, speed
//! second.
//!
//! # Features
//!
//! - **Input synthesis**: deterministic, type-directed test case pools
//! - **Reference oracle**: sequential ground-truth table with an explicit
//!   expected-failure sentinel
//! - **Parallel runner**: cross-variant concurrent execution behind an
//!   [`backend::ExecutionBackend`] boundary with structured cancellation
//! - **Tolerant comparison**: type-aware equivalence with a contractual
//!   rule order
//!
//! # Example
//!
//! ```rust,ignore
//! use reforge_core::{EvalHarness, HarnessConfig, LocalProcessBackend};
//!
//! let config = HarnessConfig::load(None)?;
//! let backend = Arc::new(config.build_local_backend());
//! let harness = EvalHarness::new(backend, config);
//! let outcome = harness.evaluate(&candidates).await?;
//! println!("{}", reforge_core::report::render_table(&outcome));
//! ```

pub mod backend;
pub mod compare;
pub mod config;
pub mod error;
pub mod harness;
pub mod oracle;
pub mod provider;
pub mod report;
pub mod runner;
pub mod select;
pub mod signature;
pub mod synth;
pub mod value;
pub mod variant;

// Re-exports for convenience
pub use backend::{ExecutionBackend, LocalProcessBackend};
pub use config::{HarnessConfig, LlmConfig};
pub use error::{EvalError, EvalResult};
pub use harness::{EvalHarness, EvaluationOutcome};
pub use provider::{CandidateSet, CandidateSource, RewriteGenerator, SampleLibrary};
pub use select::Selection;
pub use value::Value;
pub use variant::{Variant, VariantReport, VariantState};
