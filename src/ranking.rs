//! Top-N ranking over a job's output

use std::cmp::Ordering;
use std::path::Path;

use linkrank_engine::GraphNode;
use serde::Serialize;

use crate::error::JobResult;
use crate::persistence::{read_graph, LineContext};

/// Default number of vertices in a ranking
pub const DEFAULT_TOP_N: usize = 10;

/// One row of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedVertex {
    /// 1-based position
    pub position: usize,
    pub id: String,
    pub rank: f64,
    pub out_degree: usize,
}

/// Highest-ranked `n` vertices, ties broken by id
pub fn top_n(nodes: &[GraphNode], n: usize) -> Vec<RankedVertex> {
    let mut sorted: Vec<&GraphNode> = nodes.iter().collect();
    sorted.sort_by(|a, b| match b.rank.total_cmp(&a.rank) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other,
    });

    sorted
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, node)| RankedVertex {
            position: i + 1,
            id: node.id.clone(),
            rank: node.rank,
            out_degree: node.out_degree(),
        })
        .collect()
}

/// Read a result file or directory and rank it
pub fn read_ranking(path: &Path, n: usize) -> JobResult<Vec<RankedVertex>> {
    let summary = read_graph(path, LineContext::Round)?;
    Ok(top_n(&summary.nodes, n))
}
