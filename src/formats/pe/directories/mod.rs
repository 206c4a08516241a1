//! Data directory parsers

pub mod codeview;
pub mod debug;

pub use codeview::{extract_pdb_path, find_pdb_path, PdbPath};
pub use debug::{parse_debug_directory, DebugDirectory, ValidatedDirectory};
