//! Rank jobs over text input
//!
//! A job reads the seed records, runs propagation on the local substrate,
//! and writes each round plus the final state in the text wire format.

pub mod config;
pub mod report;

pub use config::JobConfig;
pub use report::{JobOutcome, JobReport};

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use linkrank_engine::{BatchSubstrate, IterationController, LocalSubstrate, PropagationConfig};
use tracing::{info, warn};

use crate::error::JobResult;
use crate::persistence::{
    is_round_output, read_graph, write_nodes, IterationWriter, LineContext,
};

/// Name of the final output directory under the output root
pub const FINAL_DIR: &str = "final";

/// Name of the JSON run report under the output root
pub const REPORT_FILE: &str = "report.json";

/// One rank propagation job
pub struct RankJob {
    config: JobConfig,
}

impl RankJob {
    /// Validate `config`; nothing touches the file system until [`run`](Self::run)
    pub fn new(config: JobConfig) -> JobResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    fn substrate(&self) -> JobResult<LocalSubstrate> {
        let substrate = match self.config.threads {
            Some(threads) => LocalSubstrate::with_threads(self.config.partitions, threads)?,
            None => LocalSubstrate::new(self.config.partitions)?,
        };
        Ok(substrate)
    }

    /// Run to a terminal state on the local substrate
    ///
    /// A failed round is reported in the returned [`JobReport`], not as an
    /// `Err`; errors are reserved for I/O and configuration problems.
    pub fn run(&self) -> JobResult<JobReport> {
        self.run_on(self.substrate()?)
    }

    /// Like [`run`](Self::run), with rounds executed by `substrate`
    pub fn run_on<S: BatchSubstrate>(&self, substrate: S) -> JobResult<JobReport> {
        let started_at = Utc::now();
        let output = &self.config.output;

        // a finished round directory carries ranks even on two-field lines
        let context = if is_round_output(&self.config.input) {
            info!("Resuming from round output {:?}", self.config.input);
            LineContext::Round
        } else {
            LineContext::Seed
        };
        let seed = read_graph(&self.config.input, context)?;
        let input_records = seed.nodes.len();

        if self.config.overwrite && output.exists() {
            warn!("Replacing existing output directory {:?}", output);
            fs::remove_dir_all(output)?;
        }
        fs::create_dir_all(output)?;

        let controller = IterationController::new(
            substrate,
            PropagationConfig::new(self.config.max_rounds)?,
        )?;

        let outcome = if self.config.write_iterations {
            let mut writer = IterationWriter::new(output.clone());
            controller.run_with_observer(seed.nodes, &mut writer)
        } else {
            controller.run(seed.nodes)
        };

        let final_output = if outcome.is_success() {
            let dir: PathBuf = output.join(FINAL_DIR);
            write_nodes(&dir, &outcome.nodes)?;
            Some(dir)
        } else {
            None
        };

        let report = JobReport::from_outcome(
            &outcome,
            input_records,
            seed.skipped,
            final_output,
            started_at,
        );
        report.write_json(&output.join(REPORT_FILE))?;

        info!(
            "Job {} after {} round(s): {} vertices",
            report.outcome, report.rounds, report.vertices
        );

        Ok(report)
    }
}
