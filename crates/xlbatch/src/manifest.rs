//! Password manifest: one row per generated workbook, persisted as CSV.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::conf::{C_COL_FILE_ID, C_COL_FILE_NAME, C_COL_PASSWORD, C_COL_SPLIT_VALUE_FALLBACK};
use crate::spec::BatchError;

/// Password issued for one workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPasswordRecord {
    pub file_id: String,
    pub file_name: String,
    /// Unsanitized split value.
    pub split_value: String,
    pub password: String,
}

/// Records of one batch, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecPasswordManifest {
    /// Split column, used as the third CSV header.
    pub split_by: Option<String>,
    pub records: Vec<SpecPasswordRecord>,
}

impl SpecPasswordManifest {
    pub fn new(split_by: Option<String>) -> Self {
        Self {
            split_by,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: SpecPasswordRecord) {
        self.records.push(record);
    }

    /// `File ID, Filename, {split_by}, Password`.
    pub fn header(&self) -> [&str; 4] {
        [
            C_COL_FILE_ID,
            C_COL_FILE_NAME,
            self.split_by.as_deref().unwrap_or(C_COL_SPLIT_VALUE_FALLBACK),
            C_COL_PASSWORD,
        ]
    }

    /// File name -> password, as consumed by `protect_tree`.
    pub fn to_password_map(&self) -> BTreeMap<String, String> {
        self.records
            .iter()
            .map(|record| (record.file_name.clone(), record.password.clone()))
            .collect()
    }

    pub fn write_csv(&self, path_file: &Path) -> Result<(), BatchError> {
        let err_manifest = |message: String| BatchError::Manifest {
            path: path_file.to_path_buf(),
            message,
        };

        let mut writer = csv::Writer::from_path(path_file).map_err(|e| err_manifest(e.to_string()))?;
        writer
            .write_record(self.header())
            .map_err(|e| err_manifest(e.to_string()))?;
        for record in &self.records {
            writer
                .write_record([
                    record.file_id.as_str(),
                    record.file_name.as_str(),
                    record.split_value.as_str(),
                    record.password.as_str(),
                ])
                .map_err(|e| err_manifest(e.to_string()))?;
        }
        writer.flush().map_err(|e| err_manifest(e.to_string()))?;
        log::debug!("Wrote password manifest {}", path_file.display());
        Ok(())
    }

    pub fn read_csv(path_file: &Path) -> Result<Self, BatchError> {
        let err_manifest = |message: String| BatchError::Manifest {
            path: path_file.to_path_buf(),
            message,
        };

        let mut reader = csv::Reader::from_path(path_file).map_err(|e| err_manifest(e.to_string()))?;
        let headers = reader.headers().map_err(|e| err_manifest(e.to_string()))?.clone();
        if headers.len() != 4 {
            return Err(err_manifest(format!(
                "Expected 4 columns, found {}.",
                headers.len()
            )));
        }
        let split_by = headers
            .get(2)
            .filter(|name| *name != C_COL_SPLIT_VALUE_FALLBACK)
            .map(str::to_string);

        let mut manifest = Self::new(split_by);
        for row in reader.records() {
            let row = row.map_err(|e| err_manifest(e.to_string()))?;
            let field = |n_idx: usize| row.get(n_idx).unwrap_or_default().to_string();
            manifest.push(SpecPasswordRecord {
                file_id: field(0),
                file_name: field(1),
                split_value: field(2),
                password: field(3),
            });
        }
        Ok(manifest)
    }
}

impl fmt::Display for SpecPasswordManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l_header = self.header();
        let l_rows = self
            .records
            .iter()
            .map(|record| {
                [
                    record.file_id.as_str(),
                    record.file_name.as_str(),
                    record.split_value.as_str(),
                    record.password.as_str(),
                ]
            })
            .collect::<Vec<_>>();

        let mut l_widths = l_header.map(|cell| cell.chars().count());
        for row in &l_rows {
            for (n_idx, cell) in row.iter().enumerate() {
                l_widths[n_idx] = l_widths[n_idx].max(cell.chars().count());
            }
        }

        let write_row = |f: &mut fmt::Formatter<'_>, row: &[&str; 4]| -> fmt::Result {
            let l_cells = row
                .iter()
                .zip(l_widths.iter())
                .map(|(cell, &n_width)| format!("{cell:<n_width$}"))
                .collect::<Vec<_>>();
            writeln!(f, "{}", l_cells.join("  ").trim_end())
        };

        write_row(f, &l_header)?;
        for row in &l_rows {
            write_row(f, row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _manifest() -> SpecPasswordManifest {
        let mut manifest = SpecPasswordManifest::new(Some("Region".to_string()));
        manifest.push(SpecPasswordRecord {
            file_id: "AcmeID1001".to_string(),
            file_name: "AcmeID1001-East-20240101.xlsx".to_string(),
            split_value: "East".to_string(),
            password: "pw-east".to_string(),
        });
        manifest.push(SpecPasswordRecord {
            file_id: "AcmeID1002".to_string(),
            file_name: "AcmeID1002-West, Inc-20240101.xlsx".to_string(),
            split_value: "West, Inc.".to_string(),
            password: "pw-west".to_string(),
        });
        manifest
    }

    #[test]
    fn csv_round_trip_keeps_header_and_rows() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("Acme-PasswordMaster-20240101.csv");
        let manifest = _manifest();
        manifest.write_csv(&path).expect("write");

        let c_text = std::fs::read_to_string(&path).expect("read");
        assert!(c_text.starts_with("File ID,Filename,Region,Password\n"));

        let manifest_back = SpecPasswordManifest::read_csv(&path).expect("read csv");
        assert_eq!(manifest_back, manifest);
    }

    #[test]
    fn header_falls_back_without_split_column() {
        let manifest = SpecPasswordManifest::new(None);
        assert_eq!(
            manifest.header(),
            ["File ID", "Filename", "Split Value", "Password"]
        );
    }

    #[test]
    fn password_map_is_keyed_by_file_name() {
        let dict_pw = _manifest().to_password_map();
        assert_eq!(dict_pw.len(), 2);
        assert_eq!(dict_pw["AcmeID1001-East-20240101.xlsx"], "pw-east");
    }

    #[test]
    fn display_aligns_columns() {
        let c_table = _manifest().to_string();
        let l_lines = c_table.lines().collect::<Vec<_>>();
        assert_eq!(l_lines.len(), 3);
        let n_col = l_lines[0].find("Filename").expect("header");
        assert_eq!(l_lines[1].find("AcmeID1001-East"), Some(n_col));
    }
}
