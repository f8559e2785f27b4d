//! Reading and writing vertex records between rounds
//!
//! Each round lands in `iteration<N>/part-r-00000`, and any such directory
//! can be read back as input.

pub mod reader;
pub mod wire;
pub mod writer;

pub use reader::{input_files, read_graph, ReadSummary};
pub use wire::{format_line, parse_line, LineContext};
pub use writer::{
    is_round_output, iteration_dir, write_nodes, IterationWriter, PART_FILE, SUCCESS_MARKER,
};
