//! Iterative rank propagation engine
//!
//! Each round re-derives every vertex's rank from the contributions of its
//! in-neighbors:
//!
//! - the emitter re-emits each vertex's state and one contribution per out-link
//! - the batch substrate groups everything by vertex id (round barrier)
//! - the aggregator folds each group into a new state and reports whether the
//!   vertex moved by more than the convergence threshold
//! - the controller threads round output into the next round until nothing
//!   changes or the round budget is spent
//!
//! The substrate is a trait so rounds can run on local `rayon` workers
//! ([`LocalSubstrate`]) or anything else that offers map / group / reduce.

pub mod aggregator;
pub mod codec;
pub mod controller;
pub mod convergence;
pub mod emitter;
pub mod error;
pub mod record;
pub mod substrate;

pub use aggregator::{aggregate, Aggregated};
pub use codec::ShuffleRecord;
pub use controller::{
    ControllerState, IterationController, PropagationConfig, PropagationOutcome, RoundObserver,
    RoundResult,
};
pub use convergence::{has_changed, ConvergenceMonitor, CONVERGENCE_COUNTER};
pub use emitter::emit_contributions;
pub use error::{
    ConfigurationError, DecodeError, EngineError, EngineResult, RoundExecutionError,
};
pub use record::{GraphNode, RankRecord};
pub use substrate::{BatchSubstrate, Counters, Emitted, LocalSubstrate};

/// Damping factor applied to propagated rank
pub const DAMPING: f64 = 0.85;

/// Baseline rank every vertex receives regardless of in-links
pub const TELEPORT: f64 = 0.15;

/// Per-vertex delta above which a vertex counts as still changing
pub const CONVERGENCE_THRESHOLD: f64 = 0.001;

/// Rank of every seed vertex, and the assumed previous rank of a vertex
/// that only appears as a contribution target
pub const INITIAL_RANK: f64 = 1.0;

/// Default round budget
pub const DEFAULT_MAX_ROUNDS: usize = 10;
