//! Binary shuffle encoding for round records
//!
//! Layout (fixed-width, little endian): id, rank, node-record flag,
//! out-link count, out-link ids. Strings carry a `u64` length prefix.
//! Trailing bytes are rejected.

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::record::{GraphNode, RankRecord};

/// A record type the substrate can move through its shuffle as bytes
pub trait ShuffleRecord: Sized + Send {
    fn encode(&self) -> Result<Vec<u8>, DecodeError>;
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

#[derive(Serialize)]
struct WireRecordRef<'a> {
    id: &'a str,
    rank: f64,
    is_node: bool,
    out_links: &'a [String],
}

#[derive(Deserialize)]
struct WireRecord {
    id: String,
    rank: f64,
    is_node: bool,
    out_links: Vec<String>,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl ShuffleRecord for RankRecord {
    fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let wire = match self {
            RankRecord::NodeState(node) => WireRecordRef {
                id: &node.id,
                rank: node.rank,
                is_node: true,
                out_links: &node.out_links,
            },
            RankRecord::Contribution { id, rank } => WireRecordRef {
                id,
                rank: *rank,
                is_node: false,
                out_links: &[],
            },
        };
        Ok(wire_options().serialize(&wire)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let wire: WireRecord = wire_options().deserialize(bytes)?;
        if wire.id.is_empty() {
            return Err(DecodeError::EmptyId);
        }

        if wire.is_node {
            Ok(RankRecord::NodeState(GraphNode::new(
                wire.id,
                wire.rank,
                wire.out_links,
            )))
        } else if wire.out_links.is_empty() {
            Ok(RankRecord::Contribution {
                id: wire.id,
                rank: wire.rank,
            })
        } else {
            Err(DecodeError::Binary(format!(
                "contribution record for '{}' carries {} out-links",
                wire.id,
                wire.out_links.len()
            )))
        }
    }
}
