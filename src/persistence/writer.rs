//! Writes round output in the text wire format
//!
//! Every output directory holds a single `part-r-00000` file and an empty
//! `_SUCCESS` marker once the part file is complete.

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use linkrank_engine::{Counters, GraphNode, RoundObserver};
use tracing::debug;

use super::wire::format_line;

pub const PART_FILE: &str = "part-r-00000";
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Write `nodes` into `dir`, creating it; returns the part file path
pub fn write_nodes(dir: &Path, nodes: &[GraphNode]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let part = dir.join(PART_FILE);

    let mut out = BufWriter::new(File::create(&part)?);
    for node in nodes {
        writeln!(out, "{}", format_line(node))?;
    }
    out.flush()?;

    File::create(dir.join(SUCCESS_MARKER))?;
    debug!("Wrote {} vertices to {:?}", nodes.len(), part);
    Ok(part)
}

/// Directory of one round's output: `<root>/iteration<N>`, N 1-based
pub fn iteration_dir(root: &Path, round: usize) -> PathBuf {
    root.join(format!("iteration{}", round))
}

/// Whether `path` is a completed output directory of an earlier round
pub fn is_round_output(path: &Path) -> bool {
    path.is_dir() && path.join(SUCCESS_MARKER).is_file()
}

/// Round observer that persists every round under `iteration<N>`
pub struct IterationWriter {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl IterationWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    /// Part files written so far, in round order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl RoundObserver for IterationWriter {
    fn on_round(
        &mut self,
        round: usize,
        nodes: &[GraphNode],
        _counters: &Counters,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let part = write_nodes(&iteration_dir(&self.root, round), nodes)?;
        self.written.push(part);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_nodes_layout() {
        let dir = TempDir::new().unwrap();
        let nodes = vec![
            GraphNode::new("A", 0.15, vec![]),
            GraphNode::new("B", 1.0, vec!["A".to_string()]),
        ];
        let part = write_nodes(&dir.path().join("final"), &nodes).unwrap();

        assert_eq!(fs::read_to_string(&part).unwrap(), "A\t0.15\nB\t1.0\tA\n");
        assert!(dir.path().join("final").join(SUCCESS_MARKER).exists());
    }

    #[test]
    fn test_iteration_writer_numbers_rounds() {
        let dir = TempDir::new().unwrap();
        let mut writer = IterationWriter::new(dir.path());
        let nodes = vec![GraphNode::new("A", 0.15, vec![])];

        writer.on_round(1, &nodes, &Counters::new()).unwrap();
        writer.on_round(2, &nodes, &Counters::new()).unwrap();

        assert_eq!(writer.written().len(), 2);
        assert!(iteration_dir(dir.path(), 1).join(PART_FILE).exists());
        assert!(iteration_dir(dir.path(), 2).join(PART_FILE).exists());
    }
}
