//! Rank aggregator (reduce side of a round)

use tracing::warn;

use crate::record::{GraphNode, RankRecord};
use crate::{DAMPING, INITIAL_RANK, TELEPORT};

/// Result of folding one vertex's group
#[derive(Debug, Clone)]
pub struct Aggregated {
    /// New authoritative state
    pub node: GraphNode,
    /// Rank the new value is compared against
    pub old_rank: f64,
    /// Whether the group carried the vertex's own state record
    pub had_state: bool,
}

/// Fold every record emitted for `id` this round into its new state
///
/// A vertex seen only as a contribution target gets `old_rank = 1.0` and no
/// out-links. Its new rank is `TELEPORT + DAMPING * sum(contributions)`.
pub fn aggregate<I>(id: &str, records: I) -> Aggregated
where
    I: IntoIterator<Item = RankRecord>,
{
    let mut sum_contrib = 0.0;
    let mut state: Option<GraphNode> = None;

    for record in records {
        match record {
            RankRecord::NodeState(node) => {
                if state.is_some() {
                    warn!("Duplicate state record for vertex '{}', keeping the last one", id);
                }
                state = Some(node);
            }
            RankRecord::Contribution { rank, .. } => sum_contrib += rank,
        }
    }

    let new_rank = TELEPORT + DAMPING * sum_contrib;
    let had_state = state.is_some();
    let (old_rank, out_links) = match state {
        Some(node) => (node.rank, node.out_links),
        None => (INITIAL_RANK, Vec::new()),
    };

    Aggregated {
        node: GraphNode::new(id, new_rank, out_links),
        old_rank,
        had_state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(id: &str, rank: f64) -> RankRecord {
        RankRecord::Contribution {
            id: id.to_string(),
            rank,
        }
    }

    #[test]
    fn test_state_plus_contributions() {
        let records = vec![
            contribution("B", 0.5),
            RankRecord::NodeState(GraphNode::new("B", 1.0, vec!["A".to_string()])),
            contribution("B", 0.25),
        ];
        let agg = aggregate("B", records);

        assert!(agg.had_state);
        assert_eq!(agg.old_rank, 1.0);
        assert!((agg.node.rank - (0.15 + 0.85 * 0.75)).abs() < 1e-12);
        assert_eq!(agg.node.out_links, vec!["A"]);
    }

    #[test]
    fn test_no_contributions_yields_teleport() {
        let agg = aggregate("A", vec![RankRecord::NodeState(GraphNode::seed("A", vec![]))]);
        assert_eq!(agg.node.rank, TELEPORT);
    }

    #[test]
    fn test_contribution_only_vertex() {
        let agg = aggregate("ghost", vec![contribution("ghost", 0.85)]);

        assert!(!agg.had_state);
        assert_eq!(agg.old_rank, INITIAL_RANK);
        assert!(agg.node.out_links.is_empty());
        assert!((agg.node.rank - 0.8725).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_state_keeps_last() {
        let records = vec![
            RankRecord::NodeState(GraphNode::new("A", 0.3, vec!["B".to_string()])),
            RankRecord::NodeState(GraphNode::new("A", 0.6, vec!["C".to_string()])),
        ];
        let agg = aggregate("A", records);
        assert_eq!(agg.old_rank, 0.6);
        assert_eq!(agg.node.out_links, vec!["C"]);
    }
}
