//! JSON job files describing one batch run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::batch::create_xl_file_multiple_templates;
use crate::spec::{BatchError, ReportBatch, SpecBatchContext, SpecBatchOptions};
use crate::template::{FrameTemplate, SplitTemplate};

/// One template entry: a polars IPC file and its main sheet label.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecJobTemplate {
    /// Relative paths resolve against the job file's directory.
    pub path: PathBuf,
    #[serde(default)]
    pub main_sheet: Option<String>,
}

/// Job file as written by the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecJobFile {
    pub project_name: String,
    pub templates: Vec<SpecJobTemplate>,
    #[serde(default)]
    pub split_by_value: bool,
    #[serde(default)]
    pub split_by: Option<String>,
    /// Kept untyped so non-list values surface as `SplitRangeNotList`.
    #[serde(default)]
    pub split_by_range: Option<Value>,
    #[serde(default = "derive_default_batch")]
    pub batch: u32,
    #[serde(default)]
    pub sheet_password: Option<String>,
    #[serde(default)]
    pub workbook_password: Option<String>,
    #[serde(default)]
    pub protect_files: bool,
    #[serde(default)]
    pub random_password: bool,
    #[serde(default)]
    pub in_zip: bool,
    #[serde(default)]
    pub dir_out: Option<PathBuf>,
}

fn derive_default_batch() -> u32 {
    1
}

/// Validated job ready to run.
#[derive(Debug, Clone)]
pub struct SpecJob {
    pub project_name: String,
    pub templates: Vec<SpecJobTemplate>,
    pub options: SpecBatchOptions,
    pub dir_out: PathBuf,
}

impl SpecJob {
    /// Read and validate a job file.
    pub fn load(path_file: &Path) -> Result<Self, BatchError> {
        let c_text = fs::read_to_string(path_file).map_err(|e| BatchError::Io {
            path: path_file.to_path_buf(),
            source: e,
        })?;
        let path_dir_base = path_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_json_str(&c_text, &path_dir_base).map_err(|err| match err {
            BatchError::Job { message, .. } => BatchError::Job {
                path: path_file.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse job JSON; relative paths resolve against `path_dir_base`.
    pub fn from_json_str(c_text: &str, path_dir_base: &Path) -> Result<Self, BatchError> {
        let job: SpecJobFile = serde_json::from_str(c_text).map_err(|e| BatchError::Job {
            path: PathBuf::new(),
            message: e.to_string(),
        })?;

        let split_by_range = parse_split_by_range(job.split_by_range.as_ref())?;
        let templates = job
            .templates
            .into_iter()
            .map(|template| SpecJobTemplate {
                path: resolve_path(&template.path, path_dir_base),
                main_sheet: template.main_sheet,
            })
            .collect();
        let dir_out = job
            .dir_out
            .map(|path| resolve_path(&path, path_dir_base))
            .unwrap_or_else(|| path_dir_base.to_path_buf());

        Ok(Self {
            project_name: job.project_name,
            templates,
            options: SpecBatchOptions {
                split_by_value: job.split_by_value,
                split_by: job.split_by,
                split_by_range,
                batch: job.batch,
                sheet_password: job.sheet_password,
                workbook_password: job.workbook_password,
                protect_files: job.protect_files,
                random_password: job.random_password,
                in_zip: job.in_zip,
            },
            dir_out,
        })
    }

    /// Load the template files, in job order.
    pub fn load_templates(&self) -> Result<Vec<FrameTemplate>, BatchError> {
        self.templates
            .iter()
            .map(|template| {
                let main_sheet = template.main_sheet.clone().unwrap_or_else(|| {
                    template
                        .path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default()
                });
                FrameTemplate::from_ipc_file(&template.path, main_sheet).map_err(BatchError::from)
            })
            .collect()
    }

    /// Load templates and run the batch. `dir_out` overrides the job's output root.
    pub fn run(
        &self,
        today: chrono::NaiveDate,
        dir_out: Option<&Path>,
    ) -> Result<Option<ReportBatch>, BatchError> {
        let l_templates = self.load_templates()?;
        let l_template_refs = l_templates
            .iter()
            .map(|template| template as &dyn SplitTemplate)
            .collect::<Vec<_>>();
        let context = SpecBatchContext::new(dir_out.unwrap_or(self.dir_out.as_path()), today);
        create_xl_file_multiple_templates(
            &self.project_name,
            &l_template_refs,
            &self.options,
            &context,
        )
    }
}

/// `null`/absent -> `None`; an array of strings -> values; anything else fails.
pub fn parse_split_by_range(value: Option<&Value>) -> Result<Option<Vec<String>>, BatchError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(l_items)) => l_items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                other => Err(BatchError::SplitRangeNotList(format!(
                    "array containing {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(BatchError::SplitRangeNotList(other.to_string())),
    }
}

fn resolve_path(path: &Path, path_dir_base: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    path_dir_base.join(path)
}
