//! Iteration controller
//!
//! Drives rounds of emit → group → aggregate until the changed count drops
//! to zero, the round budget runs out, or the substrate fails a round.

use std::error::Error;

use rayon::slice::ParallelSliceMut;
use tracing::{debug, error, info};

use crate::aggregator::aggregate;
use crate::convergence::ConvergenceMonitor;
use crate::emitter::emit_contributions;
use crate::error::{ConfigurationError, RoundExecutionError};
use crate::record::{GraphNode, RankRecord};
use crate::substrate::{BatchSubstrate, Counters};
use crate::DEFAULT_MAX_ROUNDS;

/// Propagation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationConfig {
    /// Upper bound on rounds (must be positive)
    pub max_rounds: usize,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl PropagationConfig {
    pub fn new(max_rounds: usize) -> Result<Self, ConfigurationError> {
        let config = Self { max_rounds };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_rounds == 0 {
            return Err(ConfigurationError::InvalidMaxRounds(self.max_rounds));
        }
        Ok(())
    }
}

/// Controller state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// About to run the round with this 0-based index
    Running(usize),
    /// A round finished with no vertex changing
    Converged,
    /// The round budget ran out before convergence
    MaxRoundsReached,
    /// The substrate failed a round
    Failed,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ControllerState::Running(_))
    }
}

/// Terminal report of a propagation run
#[derive(Debug)]
pub struct PropagationOutcome {
    /// Terminal state (never `Running`)
    pub state: ControllerState,
    /// Rounds that completed successfully
    pub rounds: usize,
    /// Output of the last completed round (the seed set if none completed)
    pub nodes: Vec<GraphNode>,
    /// Changed count of every completed round, in order
    pub changed_history: Vec<u64>,
    /// Set when `state` is `Failed`
    pub failure: Option<RoundExecutionError>,
}

impl PropagationOutcome {
    pub fn is_converged(&self) -> bool {
        self.state == ControllerState::Converged
    }

    /// Converged or stopped at the round budget
    pub fn is_success(&self) -> bool {
        matches!(
            self.state,
            ControllerState::Converged | ControllerState::MaxRoundsReached
        )
    }

    /// Round index reached: the failing round on failure, else the last one run
    pub fn round_reached(&self) -> usize {
        match &self.failure {
            Some(err) => err.round,
            None => self.rounds,
        }
    }
}

/// Output of a single round
#[derive(Debug, Clone)]
pub struct RoundResult {
    /// New authoritative states, sorted by id
    pub nodes: Vec<GraphNode>,
    /// All counters the reduce side produced
    pub counters: Counters,
    /// Vertices whose rank moved by more than the threshold
    pub changed_count: u64,
}

/// Hook called after every completed round
///
/// Returning an error fails the run at that round.
pub trait RoundObserver {
    fn on_round(
        &mut self,
        round: usize,
        nodes: &[GraphNode],
        counters: &Counters,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<F> RoundObserver for F
where
    F: FnMut(usize, &[GraphNode], &Counters) -> Result<(), Box<dyn Error + Send + Sync>>,
{
    fn on_round(
        &mut self,
        round: usize,
        nodes: &[GraphNode],
        counters: &Counters,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self(round, nodes, counters)
    }
}

struct NoopObserver;

impl RoundObserver for NoopObserver {
    fn on_round(
        &mut self,
        _round: usize,
        _nodes: &[GraphNode],
        _counters: &Counters,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Runs propagation rounds on a batch substrate
pub struct IterationController<S: BatchSubstrate> {
    substrate: S,
    config: PropagationConfig,
    monitor: ConvergenceMonitor,
}

impl<S: BatchSubstrate> IterationController<S> {
    pub fn new(substrate: S, config: PropagationConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            substrate,
            config,
            monitor: ConvergenceMonitor,
        })
    }

    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    /// Run one round over `input`; `round` is the 1-based round number
    pub fn run_round(
        &self,
        round: usize,
        input: &[GraphNode],
    ) -> Result<RoundResult, RoundExecutionError> {
        let shuffle = self.substrate.map_phase::<GraphNode, RankRecord, _>(
            round,
            input,
            |node: &GraphNode, emit: &mut dyn FnMut(String, RankRecord)| {
                emit_contributions(node, &mut |key, record| emit(key, record))
            },
        )?;

        let monitor = self.monitor;
        let (mut nodes, counters) = self.substrate.group_and_reduce::<RankRecord, _, _>(
            round,
            shuffle,
            move |id: &str, records: Vec<RankRecord>| {
                let agg = aggregate(id, records);
                let delta = monitor.observe(agg.old_rank, agg.node.rank);
                (agg.node, delta)
            },
        )?;

        nodes.par_sort_unstable();
        let changed_count = self.monitor.changed_count(&counters);

        Ok(RoundResult {
            nodes,
            counters,
            changed_count,
        })
    }

    /// Run rounds from `seed` until a terminal state
    pub fn run(&self, seed: Vec<GraphNode>) -> PropagationOutcome {
        self.run_with_observer(seed, &mut NoopObserver)
    }

    /// Like [`run`](Self::run), calling `observer` after each completed round
    pub fn run_with_observer(
        &self,
        seed: Vec<GraphNode>,
        observer: &mut dyn RoundObserver,
    ) -> PropagationOutcome {
        let max_rounds = self.config.max_rounds;
        let mut state = ControllerState::Running(0);
        let mut current = seed;
        let mut changed_history = Vec::new();
        let mut failure = None;

        info!(
            "Starting rank propagation over {} vertices (max {} rounds)",
            current.len(),
            max_rounds
        );

        while let ControllerState::Running(index) = state {
            let round = index + 1;
            debug!("Round {} of {}", round, max_rounds);

            let result = self.run_round(round, &current).and_then(|result| {
                observer
                    .on_round(round, &result.nodes, &result.counters)
                    .map_err(|e| {
                        RoundExecutionError::new(round, format!("round observer failed: {}", e))
                    })?;
                Ok(result)
            });

            state = match result {
                Err(err) => {
                    error!("{}", err);
                    failure = Some(err);
                    ControllerState::Failed
                }
                Ok(result) => {
                    info!(
                        "Round {}: {} vertices, {} still changing",
                        round,
                        result.nodes.len(),
                        result.changed_count
                    );
                    changed_history.push(result.changed_count);
                    current = result.nodes;

                    if result.changed_count == 0 {
                        info!("Converged at round {}", round);
                        ControllerState::Converged
                    } else if round == max_rounds {
                        info!("Stopped at round budget {} without converging", max_rounds);
                        ControllerState::MaxRoundsReached
                    } else {
                        ControllerState::Running(round)
                    }
                }
            };
        }

        PropagationOutcome {
            state,
            rounds: changed_history.len(),
            nodes: current,
            changed_history,
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substrate::LocalSubstrate;

    fn controller(max_rounds: usize) -> IterationController<LocalSubstrate> {
        IterationController::new(
            LocalSubstrate::new(2).unwrap(),
            PropagationConfig::new(max_rounds).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_max_rounds_rejected() {
        assert_eq!(
            PropagationConfig::new(0),
            Err(ConfigurationError::InvalidMaxRounds(0))
        );
        let bad = PropagationConfig { max_rounds: 0 };
        assert!(IterationController::new(LocalSubstrate::new(1).unwrap(), bad).is_err());
    }

    #[test]
    fn test_single_dangling_vertex_converges_at_round_two() {
        let outcome = controller(10).run(vec![GraphNode::seed("A", vec![])]);

        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.changed_history, vec![1, 0]);
        assert_eq!(outcome.nodes.len(), 1);
        assert_eq!(outcome.nodes[0].rank, 0.15);
    }

    #[test]
    fn test_round_budget_reported_separately() {
        let seed = vec![
            GraphNode::seed("A", vec!["B".to_string()]),
            GraphNode::seed("B", vec!["A".to_string()]),
        ];
        let outcome = controller(1).run(seed);

        assert_eq!(outcome.state, ControllerState::MaxRoundsReached);
        assert!(outcome.state.is_terminal());
        assert!(outcome.is_success());
        assert!(!outcome.is_converged());
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.changed_history, vec![2]);
    }

    #[test]
    fn test_only_running_is_non_terminal() {
        assert!(!ControllerState::Running(0).is_terminal());
        assert!(!ControllerState::Running(7).is_terminal());
        assert!(ControllerState::Converged.is_terminal());
        assert!(ControllerState::MaxRoundsReached.is_terminal());
        assert!(ControllerState::Failed.is_terminal());
    }

    #[test]
    fn test_empty_seed_converges_immediately() {
        let outcome = controller(5).run(Vec::new());
        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.nodes.is_empty());
    }

    #[test]
    fn test_observer_sees_every_round_and_can_fail_it() {
        let seed = vec![GraphNode::seed("A", vec![])];
        let mut seen = Vec::new();
        let mut record = |round: usize,
                          nodes: &[GraphNode],
                          _counters: &Counters|
         -> Result<(), Box<dyn Error + Send + Sync>> {
            seen.push((round, nodes.len()));
            Ok(())
        };
        let outcome = controller(10).run_with_observer(seed.clone(), &mut record);
        assert!(outcome.is_converged());
        assert_eq!(seen, vec![(1, 1), (2, 1)]);

        let mut failing = |round: usize,
                           _nodes: &[GraphNode],
                           _counters: &Counters|
         -> Result<(), Box<dyn Error + Send + Sync>> {
            if round == 2 {
                Err("disk full".into())
            } else {
                Ok(())
            }
        };
        let outcome = controller(10).run_with_observer(seed, &mut failing);
        assert_eq!(outcome.state, ControllerState::Failed);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.round_reached(), 2);
        assert!(outcome.failure.unwrap().reason.contains("disk full"));
    }
}
