//! Reads vertex records from a file or a directory of part files

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use linkrank_engine::GraphNode;
use tracing::{debug, info, warn};

use super::wire::{parse_line, LineContext};

/// Records read from an input path
#[derive(Debug, Default)]
pub struct ReadSummary {
    /// Parsed vertices, in file then line order
    pub nodes: Vec<GraphNode>,
    /// Files read
    pub files: usize,
    /// Non-blank lines seen
    pub lines: usize,
    /// Lines dropped because they did not decode
    pub skipped: usize,
}

/// Files behind an input path
///
/// A directory contributes its regular files in name order, skipping names
/// that start with `_` or `.` (markers such as `_SUCCESS`).
pub fn input_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('_') || name.starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read every record under `path`, skipping lines that do not decode
pub fn read_graph(path: &Path, context: LineContext) -> io::Result<ReadSummary> {
    let mut summary = ReadSummary::default();

    for file in input_files(path)? {
        debug!("Reading vertex records from {:?}", file);
        let reader = BufReader::new(File::open(&file)?);
        summary.files += 1;

        for (index, raw) in reader.split(b'\n').enumerate() {
            let raw = raw?;
            let line_no = index + 1;

            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping {:?}:{}: not UTF-8 ({})", file, line_no, e);
                    summary.lines += 1;
                    summary.skipped += 1;
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            summary.lines += 1;

            match parse_line(line, context) {
                Ok(Some(node)) => summary.nodes.push(node),
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping {:?}:{}: {} ({:?})", file, line_no, e, line);
                    summary.skipped += 1;
                }
            }
        }
    }

    info!(
        "Read {} vertices from {} file(s), skipped {} malformed line(s)",
        summary.nodes.len(),
        summary.files,
        summary.skipped
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_reads_file_and_skips_bad_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("graph.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "A\t1.0\tB,C").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "B\tnot-a-rank\tC").unwrap();
        writeln!(file, "C\tPage C").unwrap();
        file.write_all(b"\xff\xfe\t1.0\n").unwrap();

        let summary = read_graph(&path, LineContext::Seed).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.lines, 4);
        assert_eq!(summary.skipped, 2);
        let ids: Vec<_> = summary.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_reads_directory_in_name_order_skipping_markers() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("part-r-00001"), "B\t0.5\n").unwrap();
        fs::write(dir.path().join("part-r-00000"), "A\t0.25\tB\n").unwrap();
        fs::write(dir.path().join("_SUCCESS"), "").unwrap();
        fs::write(dir.path().join(".part-r-00000.crc"), "junk").unwrap();

        let summary = read_graph(dir.path(), LineContext::Round).unwrap();
        assert_eq!(summary.files, 2);
        let ids: Vec<_> = summary.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(summary.nodes[1].rank, 0.5);
    }

    #[test]
    fn test_missing_path_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_graph(&dir.path().join("nope"), LineContext::Seed).is_err());
    }
}
