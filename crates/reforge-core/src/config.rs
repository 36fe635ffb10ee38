//! Harness configuration
//!
//! Defaults → optional JSON file → environment overrides, in that order.
//! Environment variables use the `REFORGE_` prefix; the LLM key also
//! falls back to `OPENAI_API_KEY` so existing provider setups work
//! untouched.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::LocalProcessBackend;
use crate::error::{EvalError, EvalResult};

/// Settings for the rewrite-generating model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; absent means generation is unavailable
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// Configuration for evaluation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Interpreter binary used by the local backend
    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    /// Per-case execution timeout
    #[serde(with = "humantime_serde", default = "default_exec_timeout")]
    pub exec_timeout: Duration,

    /// Address-space cap for candidate processes (Unix only)
    pub max_memory_bytes: Option<u64>,

    /// Keep execution environments alive after the run for inspection
    #[serde(default)]
    pub keep_environments: bool,

    /// Upper bound on generated rewrites per run
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Directory of candidate sample sources
    #[serde(default = "default_samples_dir")]
    pub samples_dir: PathBuf,

    /// Directory generated rewrites are persisted to
    #[serde(default = "default_variations_dir")]
    pub variations_dir: PathBuf,

    /// Directory the JSON report is written to (none = skip)
    pub output_dir: Option<PathBuf>,

    /// Model endpoint settings
    #[serde(default)]
    pub llm: LlmConfig,
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_exec_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_variants() -> usize {
    5
}

fn default_samples_dir() -> PathBuf {
    PathBuf::from("samples")
}

fn default_variations_dir() -> PathBuf {
    PathBuf::from("variations")
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            python_bin: default_python_bin(),
            exec_timeout: default_exec_timeout(),
            max_memory_bytes: None,
            keep_environments: false,
            max_variants: default_max_variants(),
            samples_dir: default_samples_dir(),
            variations_dir: default_variations_dir(),
            output_dir: None,
            llm: LlmConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration: defaults, then the given JSON file (when it
    /// exists), then environment overrides.
    pub fn load(config_file: Option<&Path>) -> EvalResult<Self> {
        dotenv::dotenv().ok();

        let mut config = match config_file {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content).map_err(|e| {
                    EvalError::config(format!("unreadable config {}: {e}", path.display()))
                })?
            }
            _ => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `REFORGE_*` environment overrides.
    fn apply_env(&mut self) -> EvalResult<()> {
        if let Ok(bin) = env::var("REFORGE_PYTHON_BIN") {
            self.python_bin = bin;
        }
        if let Ok(secs) = env::var("REFORGE_EXEC_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| EvalError::config("invalid REFORGE_EXEC_TIMEOUT_SECS value"))?;
            self.exec_timeout = Duration::from_secs(secs);
        }
        if let Ok(keep) = env::var("REFORGE_KEEP_ENVIRONMENTS") {
            self.keep_environments = keep.parse().unwrap_or(false);
        }
        if let Ok(dir) = env::var("REFORGE_SAMPLES_DIR") {
            self.samples_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("REFORGE_OUTPUT_DIR") {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Ok(key) = env::var("REFORGE_LLM_API_KEY").or_else(|_| env::var("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Ok(url) = env::var("REFORGE_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = env::var("REFORGE_LLM_MODEL") {
            self.llm.model = model;
        }
        Ok(())
    }

    fn validate(&self) -> EvalResult<()> {
        if self.max_variants == 0 {
            return Err(EvalError::config("max_variants must be at least 1"));
        }
        if self.exec_timeout.is_zero() {
            return Err(EvalError::config("exec_timeout must be positive"));
        }
        Ok(())
    }

    /// Set the per-case execution timeout
    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    /// Set the interpreter binary
    pub fn with_python_bin(mut self, bin: impl Into<String>) -> Self {
        self.python_bin = bin.into();
        self
    }

    /// Keep environments alive after the run
    pub fn with_keep_environments(mut self, keep: bool) -> Self {
        self.keep_environments = keep;
        self
    }

    /// Set the report output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Build a local backend from these settings.
    pub fn build_local_backend(&self) -> LocalProcessBackend {
        let mut backend = LocalProcessBackend::new()
            .with_python_bin(&self.python_bin)
            .with_exec_timeout(self.exec_timeout);
        if let Some(bytes) = self.max_memory_bytes {
            backend = backend.with_memory_limit(bytes);
        }
        backend
    }
}
