//! Builds seed records from separate vertex and edge listings
//!
//! Vertex listing lines are `id<TAB>title`, edge listing lines are
//! `source<TAB>target`. Every listed vertex and every edge source becomes a
//! seed at the initial rank; duplicate edges collapse to one out-link.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use linkrank_engine::GraphNode;
use tracing::{info, warn};

use crate::persistence::format_line;

/// Accumulates vertices and edges in first-seen order
#[derive(Debug, Default)]
pub struct SeedBuilder {
    vertices: IndexMap<String, IndexSet<String>>,
    skipped: usize,
}

impl SeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, id: &str) {
        if !self.vertices.contains_key(id) {
            self.vertices.insert(id.to_string(), IndexSet::new());
        }
    }

    /// Record `source -> target`; the target is not added as a vertex
    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.vertices
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    /// Load a vertex listing (`id<TAB>title`)
    pub fn load_vertices(&mut self, path: &Path) -> io::Result<usize> {
        let mut pairs = Vec::new();
        self.skipped += for_each_pair(path, |id, _title| pairs.push(id.to_string()))?;
        for id in &pairs {
            self.add_vertex(id);
        }
        info!("Loaded {} vertices from {:?}", pairs.len(), path);
        Ok(pairs.len())
    }

    /// Load an edge listing (`source<TAB>target`)
    pub fn load_edges(&mut self, path: &Path) -> io::Result<usize> {
        let mut pairs = Vec::new();
        self.skipped += for_each_pair(path, |source, target| {
            pairs.push((source.to_string(), target.to_string()))
        })?;
        for (source, target) in &pairs {
            self.add_edge(source, target);
        }
        info!("Loaded {} edges from {:?}", pairs.len(), path);
        Ok(pairs.len())
    }

    /// Lines skipped while loading
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn build(&self) -> Vec<GraphNode> {
        self.vertices
            .iter()
            .map(|(id, links)| GraphNode::seed(id.clone(), links.iter().cloned().collect()))
            .collect()
    }

    /// Write the seed set in the text wire format
    pub fn write(&self, path: &Path) -> io::Result<usize> {
        let nodes = self.build();
        let mut out = BufWriter::new(File::create(path)?);
        for node in &nodes {
            writeln!(out, "{}", format_line(node))?;
        }
        out.flush()?;
        info!("Wrote {} seed records to {:?}", nodes.len(), path);
        Ok(nodes.len())
    }
}

/// Call `f` for every well-formed two-field line; returns the skipped count
fn for_each_pair<F>(path: &Path, mut f: F) -> io::Result<usize>
where
    F: FnMut(&str, &str),
{
    let reader = BufReader::new(File::open(path)?);
    let mut skipped = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split('\t').map(str::trim);
        match (parts.next(), parts.next()) {
            (Some(first), Some(second)) if !first.is_empty() && !second.is_empty() => {
                f(first, second)
            }
            _ => {
                warn!("Skipping {:?}:{}: expected two tab-separated fields", path, index + 1);
                skipped += 1;
            }
        }
    }
    Ok(skipped)
}
