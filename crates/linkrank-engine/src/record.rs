//! Vertex state and the per-round record stream
//!
//! A round moves two kinds of records through the shuffle: a vertex's own
//! authoritative state, and transient contributions addressed to a vertex.

use std::cmp::Ordering;
use std::fmt;

use crate::INITIAL_RANK;

/// Authoritative rank state of one vertex
///
/// Equality and ordering look at `id` only, so sorting a round's output is
/// stable by vertex id regardless of rank.
#[derive(Debug, Clone)]
pub struct GraphNode {
    /// Vertex id (non-empty)
    pub id: String,
    /// Current rank estimate
    pub rank: f64,
    /// Out-link targets in input order; empty for a dangling vertex
    pub out_links: Vec<String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, rank: f64, out_links: Vec<String>) -> Self {
        Self {
            id: id.into(),
            rank,
            out_links,
        }
    }

    /// A seed vertex at the initial rank
    pub fn seed(id: impl Into<String>, out_links: Vec<String>) -> Self {
        Self::new(id, INITIAL_RANK, out_links)
    }

    pub fn out_degree(&self) -> usize {
        self.out_links.len()
    }

    pub fn is_dangling(&self) -> bool {
        self.out_links.is_empty()
    }
}

impl PartialEq for GraphNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GraphNode {}

impl PartialOrd for GraphNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GraphNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:?}", self.id, self.rank)?;
        if !self.out_links.is_empty() {
            write!(f, "\t{}", self.out_links.join(","))?;
        }
        Ok(())
    }
}

/// One record of a round's intermediate stream
#[derive(Debug, Clone)]
pub enum RankRecord {
    /// A vertex's own state, re-emitted so the aggregator sees its old rank
    /// and out-links
    NodeState(GraphNode),
    /// Rank mass sent to `id` by one of its in-neighbors
    Contribution { id: String, rank: f64 },
}

impl RankRecord {
    /// Vertex the record belongs to (the recipient, for a contribution)
    pub fn id(&self) -> &str {
        match self {
            RankRecord::NodeState(node) => &node.id,
            RankRecord::Contribution { id, .. } => id,
        }
    }

    pub fn rank(&self) -> f64 {
        match self {
            RankRecord::NodeState(node) => node.rank,
            RankRecord::Contribution { rank, .. } => *rank,
        }
    }

    pub fn is_node_state(&self) -> bool {
        matches!(self, RankRecord::NodeState(_))
    }
}

impl From<GraphNode> for RankRecord {
    fn from(node: GraphNode) -> Self {
        RankRecord::NodeState(node)
    }
}
