//! Run report written next to the job output

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use linkrank_engine::{ControllerState, PropagationOutcome};
use serde::{Deserialize, Serialize};

use crate::error::JobResult;

/// Terminal state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Converged,
    MaxRoundsReached,
    Failed,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed)
    }
}

impl From<ControllerState> for JobOutcome {
    fn from(state: ControllerState) -> Self {
        match state {
            ControllerState::Converged => JobOutcome::Converged,
            ControllerState::MaxRoundsReached => JobOutcome::MaxRoundsReached,
            // a run only ends in a terminal state
            ControllerState::Failed | ControllerState::Running(_) => JobOutcome::Failed,
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            JobOutcome::Converged => "converged",
            JobOutcome::MaxRoundsReached => "max rounds reached",
            JobOutcome::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

/// Summary of one job run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub outcome: JobOutcome,
    /// Rounds that completed
    pub rounds: usize,
    /// Failing round on failure, otherwise the last round run
    pub round_reached: usize,
    /// Vertices in the final output (or in the last good round on failure)
    pub vertices: usize,
    /// Seed records read
    pub input_records: usize,
    /// Seed lines skipped as malformed
    pub skipped_lines: usize,
    /// Changed count per completed round
    pub changed_history: Vec<u64>,
    /// Failure description when `outcome` is `failed`
    pub failure: Option<String>,
    /// Final output directory, when one was written
    pub final_output: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn from_outcome(
        outcome: &PropagationOutcome,
        input_records: usize,
        skipped_lines: usize,
        final_output: Option<PathBuf>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            outcome: outcome.state.into(),
            rounds: outcome.rounds,
            round_reached: outcome.round_reached(),
            vertices: outcome.nodes.len(),
            input_records,
            skipped_lines,
            changed_history: outcome.changed_history.clone(),
            failure: outcome.failure.as_ref().map(|e| e.to_string()),
            final_output,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn write_json(&self, path: &Path) -> JobResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> JobResult<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
