//! Text wire format for vertex records
//!
//! One record per line: `id<TAB>rank[<TAB>link1,link2,...]`.
//! In seed input a two-field line is `id<TAB>title`: the title is dropped and
//! the vertex starts at the initial rank with no out-links.

use linkrank_engine::{DecodeError, GraphNode};

/// Where a line comes from, which decides how a two-field line reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineContext {
    /// Input of round 1, before any round ran
    Seed,
    /// Output of a previous round
    Round,
}

/// Parse one line; blank lines yield `Ok(None)`
pub fn parse_line(line: &str, context: LineContext) -> Result<Option<GraphNode>, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 2 {
        return Err(DecodeError::MissingFields {
            expected: 2,
            found: parts.len(),
        });
    }

    let id = parts[0].trim();
    if id.is_empty() {
        return Err(DecodeError::EmptyId);
    }

    if parts.len() == 2 && context == LineContext::Seed {
        return Ok(Some(GraphNode::seed(id, Vec::new())));
    }

    let raw_rank = parts[1].trim();
    let rank: f64 = raw_rank
        .parse()
        .map_err(|_| DecodeError::InvalidRank(raw_rank.to_string()))?;
    if !rank.is_finite() {
        return Err(DecodeError::InvalidRank(raw_rank.to_string()));
    }

    let out_links = parts
        .get(2)
        .map(|field| parse_links(field))
        .unwrap_or_default();

    Ok(Some(GraphNode::new(id, rank, out_links)))
}

fn parse_links(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string)
        .collect()
}

/// Render a vertex as one line (no trailing newline)
pub fn format_line(node: &GraphNode) -> String {
    node.to_string()
}
