use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::DEFAULT_MIN_CLASS_COUNT;
use crate::data::sampler::DEFAULT_SEED;
use crate::data::stats::{CrosstabSpec, ThresholdQuery};

// ---------------------------------------------------------------------------
// Sampling run
// ---------------------------------------------------------------------------

/// Everything one sampling run needs. Missing fields in a config file fall
/// back to [`SampleConfig::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Table to sample from.
    pub input: PathBuf,
    /// Where the sample is written (overwritten if present).
    pub output: PathBuf,
    /// Column whose classes are kept in proportion.
    pub stratify_column: String,
    /// Signed so that zero and negative requests can be reported, not parsed away.
    pub sample_size: i64,
    /// Classes with fewer rows are dropped before sampling.
    pub min_class_count: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/artists.csv"),
            output: PathBuf::from("results/200samples.csv"),
            stratify_column: "star".to_string(),
            sample_size: 200,
            min_class_count: DEFAULT_MIN_CLASS_COUNT,
            seed: DEFAULT_SEED,
        }
    }
}

impl SampleConfig {
    /// Read a JSON config file, e.g.
    ///
    /// ```json
    /// { "input": "data/artists.csv", "stratify_column": "star", "sample_size": 200 }
    /// ```
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Statistics report
// ---------------------------------------------------------------------------

/// Which sections `stats` prints. Sections are printed in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    pub input: PathBuf,
    /// Rows shown in the preview; 0 skips it.
    pub head: usize,
    pub thresholds: Vec<ThresholdQuery>,
    pub describe: bool,
    /// Restricts `describe` to these columns; empty means every numeric column.
    pub describe_columns: Vec<String>,
    pub frequencies: Vec<String>,
    pub crosstabs: Vec<CrosstabSpec>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("results/200samples.csv"),
            head: 5,
            thresholds: Vec::new(),
            describe: true,
            describe_columns: Vec::new(),
            frequencies: Vec::new(),
            crosstabs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{ "sample_size": 50, "seed": 7 }"#).unwrap();

        let cfg = SampleConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.sample_size, 50);
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.stratify_column, "star");
        assert_eq!(cfg.min_class_count, 4);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        std::fs::write(&path, r#"{ "sample_sise": 50 }"#).unwrap();
        assert!(SampleConfig::from_json_file(&path).is_err());
    }
}
