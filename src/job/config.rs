//! Job configuration
//!
//! Loaded from a YAML file or built in code; command-line flags override
//! individual fields afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use linkrank_engine::{ConfigurationError, DEFAULT_MAX_ROUNDS};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::JobResult;

/// Settings of one rank job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Seed file or directory of part files
    pub input: PathBuf,
    /// Output root; rounds land in `iteration<N>`, the result in `final`
    pub output: PathBuf,
    /// Round budget
    pub max_rounds: usize,
    /// Shuffle partitions
    pub partitions: usize,
    /// Dedicated worker threads (None = global pool)
    pub threads: Option<usize>,
    /// Persist every round's output
    pub write_iterations: bool,
    /// Replace an existing, non-empty output directory
    pub overwrite: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            partitions: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            threads: None,
            write_iterations: true,
            overwrite: false,
        }
    }
}

impl JobConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    /// Load settings from a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> JobResult<Self> {
        let path = path.as_ref();
        info!("Loading job config from {:?}", path);
        let text = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Reject bad settings before any round runs
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_rounds == 0 {
            return Err(ConfigurationError::InvalidMaxRounds(self.max_rounds));
        }
        if self.partitions == 0 {
            return Err(ConfigurationError::InvalidPartitions(self.partitions));
        }
        if self.threads == Some(0) {
            return Err(ConfigurationError::Invalid(
                "threads must be positive".to_string(),
            ));
        }
        if self.input.as_os_str().is_empty() {
            return Err(ConfigurationError::MissingInput("<none>".to_string()));
        }
        if !self.input.exists() {
            return Err(ConfigurationError::MissingInput(
                self.input.display().to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ConfigurationError::Invalid(
                "missing output path".to_string(),
            ));
        }
        if self.overwrite && is_within(&self.input, &self.output) {
            return Err(ConfigurationError::Invalid(format!(
                "input {} lies inside output directory {}, which overwrite would remove",
                self.input.display(),
                self.output.display()
            )));
        }
        if !self.overwrite && is_non_empty_dir(&self.output) {
            return Err(ConfigurationError::Invalid(format!(
                "output directory {} already exists and is not empty",
                self.output.display()
            )));
        }
        Ok(())
    }
}

/// Whether `path` is `dir` or somewhere below it; both must exist to match
fn is_within(path: &Path, dir: &Path) -> bool {
    match (fs::canonicalize(path), fs::canonicalize(dir)) {
        (Ok(path), Ok(dir)) => path.starts_with(dir),
        _ => false,
    }
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
