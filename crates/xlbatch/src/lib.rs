//! `xlbatch`:
//! Batch generation of per-entity Excel workbooks from dataframe templates.
//!
//! - `batch`    : orchestration routine
//! - `template` : split-capable template trait and dataframe template
//! - `naming`   : file/folder/manifest names
//! - `password` : per-file password schemes
//! - `manifest` : password manifest CSV
//! - `folders`  : output folder creation
//! - `job`      : JSON job files
//! - `conf`     : constants
//! - `spec`     : options, context, report, errors

pub mod batch;
pub mod conf;
pub mod folders;
pub mod job;
pub mod manifest;
pub mod naming;
pub mod password;
pub mod spec;
pub mod template;

pub use batch::create_xl_file_multiple_templates;
pub use job::{SpecJob, SpecJobFile, SpecJobTemplate, parse_split_by_range};
pub use manifest::{SpecPasswordManifest, SpecPasswordRecord};
pub use spec::{
    BatchError, ReportBatch, SpecBatchContext, SpecBatchOptions, SpecOutputFolders,
    TemplateError,
};
pub use template::{FrameTemplate, SplitTemplate};
pub use xlbatch_io_fs::ReportProtect;
