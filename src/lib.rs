//! Linkrank
//!
//! Iterative rank propagation over link graphs stored as text files.
//!
//! # Architecture
//!
//! - `linkrank-engine` holds the round protocol: contribution emitter, rank
//!   aggregator, convergence monitor and iteration controller, running on any
//!   [`BatchSubstrate`]
//! - this crate adds the text wire format, per-round output directories,
//!   seed building from vertex / edge listings, and rankings
//!
//! ## Example Usage
//!
//! ```rust
//! use linkrank::{GraphNode, IterationController, LocalSubstrate, PropagationConfig};
//!
//! let seed = vec![
//!     GraphNode::seed("A", vec!["B".to_string()]),
//!     GraphNode::seed("B", vec!["A".to_string()]),
//! ];
//!
//! let controller = IterationController::new(
//!     LocalSubstrate::new(2).unwrap(),
//!     PropagationConfig::new(1).unwrap(),
//! )
//! .unwrap();
//!
//! let outcome = controller.run(seed);
//! assert!(outcome.is_success());
//! assert!((outcome.nodes[0].rank - 0.8725).abs() < 1e-12);
//! ```

#![warn(clippy::all)]

pub mod error;
pub mod job;
pub mod persistence;
pub mod ranking;
pub mod seed;

pub use error::{JobError, JobResult};

pub use job::{JobConfig, JobOutcome, JobReport, RankJob, FINAL_DIR, REPORT_FILE};

pub use persistence::{
    format_line, is_round_output, iteration_dir, parse_line, read_graph, write_nodes, IterationWriter,
    LineContext, ReadSummary,
};

pub use ranking::{read_ranking, top_n, RankedVertex, DEFAULT_TOP_N};

pub use seed::SeedBuilder;

pub use linkrank_engine::{
    BatchSubstrate, ConfigurationError, ControllerState, Counters, DecodeError, Emitted,
    GraphNode, IterationController, LocalSubstrate, PropagationConfig, PropagationOutcome,
    RankRecord, RoundExecutionError, RoundObserver, ShuffleRecord, CONVERGENCE_THRESHOLD, DAMPING,
    DEFAULT_MAX_ROUNDS, INITIAL_RANK, TELEPORT,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
