//! Batch options, run context, report and error types.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;
use xlbatch_io_fs::{ArchiveTreeError, ProtectTreeError, ReportProtect};

////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Caller options for [`crate::create_xl_file_multiple_templates`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchOptions {
    /// Restrict each workbook to the rows matching its split value.
    pub split_by_value: bool,
    /// Column holding the split values.
    pub split_by: Option<String>,
    /// Split values; duplicates collapse to one workbook.
    pub split_by_range: Option<Vec<String>>,
    /// Batch number embedded in file ids.
    pub batch: u32,
    /// Worksheet protection password applied to every written sheet.
    pub sheet_password: Option<String>,
    /// Workbook structure password; ignored when empty.
    pub workbook_password: Option<String>,
    /// Encrypt the workbooks and write a password manifest.
    pub protect_files: bool,
    /// Random passwords instead of project/value derived ones.
    pub random_password: bool,
    /// Zip the output folders and remove them.
    pub in_zip: bool,
}

impl Default for SpecBatchOptions {
    fn default() -> Self {
        Self {
            split_by_value: false,
            split_by: None,
            split_by_range: None,
            batch: 1,
            sheet_password: None,
            workbook_password: None,
            protect_files: false,
            random_password: false,
            in_zip: false,
        }
    }
}

/// Run-scoped inputs that would otherwise come from process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBatchContext {
    /// Root under which folders and the manifest are created.
    pub dir_out: PathBuf,
    /// Date stamped into folder and file names.
    pub today: NaiveDate,
}

impl SpecBatchContext {
    pub fn new(dir_out: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            dir_out: dir_out.into(),
            today,
        }
    }

    /// Current local date with `dir_out` as root.
    pub fn from_local_now(dir_out: impl Into<PathBuf>) -> Self {
        Self::new(dir_out, chrono::Local::now().date_naive())
    }
}

/// Plain and protected output folders of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecOutputFolders {
    pub path_plain: PathBuf,
    /// Only created when files are protected.
    pub path_protected: PathBuf,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Report

/// Outcome of one completed batch.
#[derive(Debug, Clone, Default)]
pub struct ReportBatch {
    /// Sanitized project name.
    pub project: String,
    /// `YYYYMMDD` stamp used in names.
    pub date: String,
    /// Workbooks at their final location (plain or protected folder).
    pub files: Vec<PathBuf>,
    /// Password manifest, when files were protected.
    pub path_manifest: Option<PathBuf>,
    /// Zip archives, when archiving was requested.
    pub archives: Vec<PathBuf>,
    /// Encryption counters, when files were protected.
    pub report_protect: Option<ReportProtect>,
    /// Non-fatal warnings from every stage.
    pub warnings: Vec<String>,
}

impl ReportBatch {
    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files".to_string(), self.files.len() as u64);
        dict_counts.insert(
            "cnt_protected".to_string(),
            self.report_protect
                .as_ref()
                .map_or(0, |report| report.cnt_protected),
        );
        dict_counts.insert("cnt_archives".to_string(), self.archives.len() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warnings.len() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} project={} date={} files={} protected={} archives={} warnings={}",
            self.project,
            self.date,
            dict_counts["cnt_files"],
            dict_counts["cnt_protected"],
            dict_counts["cnt_archives"],
            dict_counts["cnt_warnings"],
        )
    }
}

impl fmt::Display for ReportBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BATCH]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Template feasibility and loading failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Split column absent from the template data.
    #[error("Template '{sheet}' has no column '{column}'.")]
    ColumnNotFound { sheet: String, column: String },
    /// Required split values absent from the template data.
    #[error(
        "Template '{sheet}' is missing values {missing:?} in column '{column}'."
    )]
    MissingSplitValues {
        sheet: String,
        column: String,
        /// Sorted missing values.
        missing: Vec<String>,
    },
    /// Template data could not be loaded.
    #[error("Failed to load template {}: {message}", .path.display())]
    Load { path: PathBuf, message: String },
    /// Dataframe operation failed.
    #[error("Template '{sheet}': {message}")]
    Frame { sheet: String, message: String },
}

/// Batch routine failures. The first one aborts the run.
#[derive(Debug, Error)]
pub enum BatchError {
    /// `split_by_range` is missing or is not a list of strings.
    #[error("split_by_range must be a list of strings, got {0}.")]
    SplitRangeNotList(String),
    /// Value filtering requested without a split column.
    #[error("split_by_value requires a split_by column.")]
    MissingSplitColumn,
    /// Project name has no usable characters.
    #[error("Project name {0:?} has no usable characters.")]
    InvalidProjectName(String),
    /// Malformed job file.
    #[error("Invalid job {}: {message}", .path.display())]
    Job { path: PathBuf, message: String },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Workbook write or workbook protection failed.
    #[error("Failed to write workbook {}: {message}", .path.display())]
    Xlsx { path: PathBuf, message: String },
    #[error(transparent)]
    Protect(#[from] ProtectTreeError),
    #[error(transparent)]
    Archive(#[from] ArchiveTreeError),
    /// Password manifest read or write failed.
    #[error("Password manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
