//! `xlbatch_io_fs`:
//! Filesystem kernel for finished batch output.
//!
//! - `protect` : encrypt workbooks into a protected sibling directory
//! - `archive` : zip a directory and remove it
//! - `spec`    : options/errors
//! - `report`  : run-time report model
//! - `util`    : shared helper functions

pub mod archive;
pub mod protect;
pub mod report;
pub mod spec;
mod util;

pub use archive::archive_tree;
pub use protect::{encrypt_file, protect_tree};
pub use report::{ReportProtect, ReportProtectBuilder};
pub use spec::{ArchiveTreeError, ProtectTreeError, SpecProtectOptions};
