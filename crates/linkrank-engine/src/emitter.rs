//! Contribution emitter (map side of a round)

use crate::record::{GraphNode, RankRecord};
use crate::DAMPING;

/// Emit a vertex's own state plus its contributions for this round
///
/// The state record is always re-emitted under the vertex's own id. A vertex
/// with out-links sends `rank * DAMPING / out_degree` to every target; a
/// dangling vertex sends nothing and its mass is dropped.
pub fn emit_contributions<F>(node: &GraphNode, emit: &mut F)
where
    F: FnMut(String, RankRecord),
{
    emit(node.id.clone(), RankRecord::NodeState(node.clone()));

    if node.is_dangling() {
        return;
    }

    let contribution = node.rank * DAMPING / node.out_degree() as f64;
    for target in &node.out_links {
        emit(
            target.clone(),
            RankRecord::Contribution {
                id: target.clone(),
                rank: contribution,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(node: &GraphNode) -> Vec<(String, RankRecord)> {
        let mut out = Vec::new();
        emit_contributions(node, &mut |key, record| out.push((key, record)));
        out
    }

    #[test]
    fn test_state_is_always_reemitted() {
        let node = GraphNode::new("A", 0.4, vec![]);
        let out = collect(&node);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "A");
        match &out[0].1 {
            RankRecord::NodeState(n) => {
                assert_eq!(n.rank, 0.4);
                assert!(n.out_links.is_empty());
            }
            other => panic!("expected node state, got {:?}", other),
        }
    }

    #[test]
    fn test_contribution_split_across_links() {
        let node = GraphNode::new("A", 2.0, vec!["B".to_string(), "C".to_string()]);
        let out = collect(&node);

        assert_eq!(out.len(), 3);
        let contributions: Vec<_> = out
            .iter()
            .filter(|(_, r)| !r.is_node_state())
            .collect();
        assert_eq!(contributions.len(), 2);
        for (key, record) in contributions {
            assert_eq!(key, record.id());
            assert!((record.rank() - 2.0 * 0.85 / 2.0).abs() < 1e-12);
        }
        assert_eq!(out[1].0, "B");
        assert_eq!(out[2].0, "C");
    }

    #[test]
    fn test_self_loop_and_unknown_targets_are_not_filtered() {
        let node = GraphNode::new("A", 1.0, vec!["A".to_string(), "ghost".to_string()]);
        let keys: Vec<_> = collect(&node).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "A", "ghost"]);
    }
}
