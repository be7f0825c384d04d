//! Protect/archive specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `protect_tree`.
#[derive(Debug, Clone)]
pub struct SpecProtectOptions {
    /// Globs matched against file basenames; empty admits every file.
    pub patterns_include_files: Vec<String>,
    /// Leave the plain source file in place after encrypting it.
    pub if_keep_source: bool,
    /// Carry access/modification times over to the encrypted file.
    pub if_preserve_times: bool,
}

impl Default for SpecProtectOptions {
    fn default() -> Self {
        Self {
            patterns_include_files: vec!["*.xlsx".to_string()],
            if_keep_source: false,
            if_preserve_times: true,
        }
    }
}

/// `protect_tree` failures. The first failure aborts the run.
#[derive(Debug, Error)]
pub enum ProtectTreeError {
    /// Invalid include glob.
    #[error("Invalid include pattern: {0}")]
    InvalidPattern(String),
    /// Source path is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        .path_source.display(),
        .path_destination.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        path_source: PathBuf,
        /// Normalized destination directory.
        path_destination: PathBuf,
    },
    /// Destination directory initialization failed.
    #[error("Failed to initialize destination {}: {source}", .path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A password was supplied for a file that is not in the source directory.
    #[error("File listed for protection does not exist: {}", .0.display())]
    MissingSourceFile(PathBuf),
    /// Encrypting one file failed.
    #[error("Failed to encrypt {}: {message}", .path.display())]
    Encrypt {
        /// Source file being encrypted.
        path: PathBuf,
        /// Encryptor error text.
        message: String,
    },
    /// Filesystem failure on one path.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read, written or removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// `archive_tree` failures.
#[derive(Debug, Error)]
pub enum ArchiveTreeError {
    /// Directory to archive does not exist or is not a directory.
    #[error("Archive source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Filesystem failure on one path.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being read, written or removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Zip encoder failure.
    #[error("Failed to write archive {}: {message}", .path.display())]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// Encoder error text.
        message: String,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
