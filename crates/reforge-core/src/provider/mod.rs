//! Candidate sources
//!
//! Where baselines and rewrites come from: a sample library on disk, and
//! optionally a model endpoint that proposes rewrites of a baseline. Each
//! source must define exactly one public callable; that discovery contract
//! is enforced at deploy time.

mod llm;

pub use llm::RewriteGenerator;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, EvalResult};
use crate::variant::Variant;

/// Sample file seeded into an empty library so a fresh checkout has
/// something to evaluate.
const DEFAULT_SAMPLE: &str = "def func(x):\n    \"\"\"Calculate the square of a number\"\"\"\n    return x * x\n";

/// One candidate source blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSource {
    /// Human-readable name (file stem or generated id)
    pub name: String,

    /// Source text
    pub code: String,
}

/// A baseline plus the rewrites competing against it, in stable encounter
/// order.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    /// The trusted implementation ground truth derives from
    pub baseline: CandidateSource,

    /// Candidate rewrites
    pub variants: Vec<CandidateSource>,
}

impl CandidateSet {
    /// Assemble a set from a baseline and its rewrites
    pub fn new(baseline: CandidateSource, variants: Vec<CandidateSource>) -> Self {
        Self { baseline, variants }
    }

    /// All competitors in runner order: the baseline first, then every
    /// rewrite. The baseline competes on its own timing like any other
    /// candidate.
    pub fn to_variants(&self) -> Vec<Variant> {
        let mut all = Vec::with_capacity(self.variants.len() + 1);
        all.push(Variant::new(&self.baseline.name, &self.baseline.code));
        for variant in &self.variants {
            all.push(Variant::new(&variant.name, &variant.code));
        }
        all
    }
}

/// Directory of sample sources.
pub struct SampleLibrary {
    dir: PathBuf,
}

impl SampleLibrary {
    /// Library rooted at a directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory if needed and seed the default sample when it
    /// holds no sources yet.
    pub async fn ensure_default(&self) -> EvalResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        if self.list().await?.is_empty() {
            let path = self.dir.join("sample1.py");
            tokio::fs::write(&path, DEFAULT_SAMPLE).await?;
            tracing::info!(path = %path.display(), "seeded default sample");
        }
        Ok(())
    }

    /// Sample paths in the library, sorted by file name.
    pub async fn list(&self) -> EvalResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "py") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Load every sample in the library.
    pub async fn load_all(&self) -> EvalResult<Vec<CandidateSource>> {
        let mut sources = Vec::new();
        for path in self.list().await? {
            sources.push(load_source(&path).await?);
        }
        Ok(sources)
    }
}

/// Read one source file, naming it after its file stem.
pub async fn load_source(path: &Path) -> EvalResult<CandidateSource> {
    let code = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EvalError::provider(format!("cannot read {}: {e}", path.display())))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("candidate")
        .to_string();
    Ok(CandidateSource { name, code })
}

/// Load every `.py` file in a directory as a rewrite, sorted by name.
pub async fn load_variants_dir(dir: &Path) -> EvalResult<Vec<CandidateSource>> {
    SampleLibrary::new(dir).load_all().await
}

/// Persist generated rewrites as `variation_<i>.py` files.
pub async fn save_variants(dir: &Path, variants: &[CandidateSource]) -> EvalResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut paths = Vec::with_capacity(variants.len());
    for (i, variant) in variants.iter().enumerate() {
        let path = dir.join(format!("variation_{}.py", i + 1));
        tokio::fs::write(&path, &variant.code).await?;
        tracing::debug!(path = %path.display(), "saved generated rewrite");
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_default_seeds_empty_library() {
        let dir = TempDir::new().unwrap();
        let library = SampleLibrary::new(dir.path());
        library.ensure_default().await.unwrap();

        let sources = library.load_all().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "sample1");
        assert!(sources[0].code.contains("def func"));
    }

    #[tokio::test]
    async fn test_ensure_default_leaves_existing_samples() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("mine.py"), "def mine(x):\n    return x\n")
            .await
            .unwrap();
        let library = SampleLibrary::new(dir.path());
        library.ensure_default().await.unwrap();

        let sources = library.load_all().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "mine");
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["b.py", "a.py", "notes.txt"] {
            tokio::fs::write(dir.path().join(name), "def f(x):\n    return x\n")
                .await
                .unwrap();
        }
        let library = SampleLibrary::new(dir.path());
        let paths = library.list().await.unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py"]);
    }

    #[test]
    fn test_to_variants_puts_baseline_first() {
        let set = CandidateSet::new(
            CandidateSource {
                name: "original".into(),
                code: "def f(x): return x".into(),
            },
            vec![CandidateSource {
                name: "variant-1".into(),
                code: "def f(x): return x".into(),
            }],
        );
        let variants = set.to_variants();
        assert_eq!(variants[0].id, "original");
        assert_eq!(variants[1].id, "variant-1");
    }

    #[tokio::test]
    async fn test_save_variants_writes_numbered_files() {
        let dir = TempDir::new().unwrap();
        let variants = vec![
            CandidateSource {
                name: "variant-1".into(),
                code: "def f(x): return x\n".into(),
            },
            CandidateSource {
                name: "variant-2".into(),
                code: "def f(x): return x + 0\n".into(),
            },
        ];
        let paths = save_variants(dir.path(), &variants).await.unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("variation_1.py"));
        assert!(paths[1].exists());
    }
}
