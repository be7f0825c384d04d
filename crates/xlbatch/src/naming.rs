//! File, folder and manifest naming.

use chrono::NaiveDate;

use crate::conf::{
    C_FORMAT_DATE, C_INFIX_PASSWORD_MASTER, C_SUFFIX_FOLDER_PROTECTED, N_WIDTH_FILE_INDEX,
};
use crate::spec::BatchError;

/// Keep only alphanumerics and plain spaces (`"Acme, Inc."` -> `"Acme Inc"`).
pub fn sanitize_split_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c == ' ' || c.is_alphanumeric())
        .collect()
}

/// Project identity used in every name of the run.
pub fn derive_project_name(raw: &str) -> Result<String, BatchError> {
    let c_name: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if c_name.is_empty() {
        return Err(BatchError::InvalidProjectName(raw.to_string()));
    }
    Ok(c_name)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(C_FORMAT_DATE).to_string()
}

/// `{project}ID{batch}{index:03}`.
pub fn create_file_id(project: &str, batch: u32, n_index: usize) -> String {
    format!("{project}ID{batch}{n_index:0width$}", width = N_WIDTH_FILE_INDEX)
}

/// `{file_id}-{sanitized}-{date}.xlsx`.
pub fn create_file_name(file_id: &str, sanitized: &str, date: &str) -> String {
    format!("{file_id}-{sanitized}-{date}.xlsx")
}

pub fn create_folder_name(project: &str, date: &str) -> String {
    format!("{project}-{date}")
}

pub fn create_protected_folder_name(project: &str, date: &str) -> String {
    format!("{}{C_SUFFIX_FOLDER_PROTECTED}", create_folder_name(project, date))
}

/// `{project}-PasswordMaster-{date}.csv`.
pub fn create_manifest_name(project: &str, date: &str) -> String {
    format!("{project}-{C_INFIX_PASSWORD_MASTER}-{date}.csv")
}
