//! XLSX writer kernel that renders DataFrames into workbook sheets.

use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::conf::N_LEN_EXCEL_SHEET_NAME_MAX;
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetReport, SpecXlsxFormats, SpecXlsxReport, SpecXlsxSheetWriteOptions,
    SpecXlsxWriteOptions,
};
use crate::util::{
    convert_cell_value, derive_partial_path, estimate_text_width, sanitize_sheet_name,
    validate_sheet_extent, validate_unique_columns,
};

/// Stateful workbook writer.
///
/// Sheets are buffered in memory; nothing exists at the output path until
/// [`Self::close`] succeeds.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    report: SpecXlsxReport,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    pub fn new(
        path_file_out: PathBuf,
        formats: SpecXlsxFormats,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            report: SpecXlsxReport::default(),
            if_closed: false,
        }
    }

    /// Snapshot of the per-sheet write report.
    pub fn report(&self) -> SpecXlsxReport {
        self.report.clone()
    }

    /// Flush workbook to disk. Idempotent.
    ///
    /// Bytes go to a `.partial` sibling first and are renamed into place, so a
    /// reader never observes a half-written workbook.
    pub fn close(&mut self) -> Result<(), String> {
        if self.if_closed {
            return Ok(());
        }
        if self.set_sheet_names_existing.is_empty() {
            // An empty package is not a valid workbook.
            self.workbook.add_worksheet();
        }

        let v_bytes = self
            .workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error_text)?;
        let path_partial = derive_partial_path(&self.path_file_out);
        fs::write(&path_partial, v_bytes)
            .map_err(|err| format!("Failed to write {}: {err}", path_partial.display()))?;
        fs::rename(&path_partial, &self.path_file_out).map_err(|err| {
            format!(
                "Failed to move {} into place: {err}",
                self.path_file_out.display()
            )
        })?;

        self.if_closed = true;
        log::debug!("Saved workbook {}", self.path_file_out.display());
        Ok(())
    }

    /// Write one sheet from an in-memory dataframe.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        if self.if_closed {
            return Err("Cannot write after close().".to_string());
        }
        self.write_sheet(df_data, sheet_name, options)
    }

    fn write_sheet(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<(), String> {
        validate_policy_autofit(&options.policy_autofit)?;

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();
        validate_sheet_extent(n_height_df, n_width_df)?;

        let if_keep_missing_values = options
            .if_keep_missing_values
            .unwrap_or(self.write_options.keep_missing_values);
        let value_policy = self.write_options.value_policy.clone();

        let set_cols_idx_numeric: BTreeSet<usize> = if self.write_options.infer_numeric_cols {
            derive_column_indices(df_data, |col| col.dtype().is_numeric())
        } else {
            BTreeSet::new()
        };
        let set_cols_idx_integer: BTreeSet<usize> = if self.write_options.infer_integer_cols {
            derive_column_indices(df_data, |col| col.dtype().is_integer())
                .intersection(&set_cols_idx_numeric)
                .copied()
                .collect()
        } else {
            BTreeSet::new()
        };

        let l_fmt_data_by_col: Vec<Format> = (0..n_width_df)
            .map(|n_idx_col| {
                let fmt_spec = if set_cols_idx_integer.contains(&n_idx_col) {
                    &self.formats.integer
                } else if set_cols_idx_numeric.contains(&n_idx_col) {
                    &self.formats.decimal
                } else {
                    &self.formats.text
                };
                derive_rust_xlsx_format(fmt_spec)
            })
            .collect();
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);

        let sheet_name_unique = self.derive_unique_sheet_name(&sanitize_sheet_name(sheet_name, "_"));
        if sheet_name_unique != sheet_name {
            self.report.warn(format!(
                "Sheet name {sheet_name:?} written as {sheet_name_unique:?}."
            ));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        let policy_autofit = &options.policy_autofit;
        let mut l_width_by_col = vec![0usize; n_width_df];

        for (n_idx_col, c_colname) in l_colnames_df.iter().enumerate() {
            worksheet
                .write_string_with_format(0, cast_col_num(n_idx_col)?, c_colname, &fmt_header)
                .map_err(derive_xlsx_error_text)?;
            l_width_by_col[n_idx_col] = estimate_text_width(c_colname);
        }

        let n_rows_body_inferred = match policy_autofit.rule_columns {
            EnumAutofitColumnsRule::All => policy_autofit
                .height_body_inferred_max
                .map_or(n_height_df, |n_max| usize::min(n_max, n_height_df)),
            _ => 0,
        };

        let l_cols = df_data.get_columns();
        for n_row in 0..n_height_df {
            for (n_idx_col, col) in l_cols.iter().enumerate() {
                let value_raw = derive_cell_value_from_any_value(
                    col.get(n_row)
                        .map_err(|err| format!("Failed to access cell value: {err}"))?,
                );
                let value = convert_cell_value(
                    &value_raw,
                    set_cols_idx_numeric.contains(&n_idx_col),
                    set_cols_idx_integer.contains(&n_idx_col),
                    if_keep_missing_values,
                    &value_policy,
                );

                if n_row < n_rows_body_inferred {
                    l_width_by_col[n_idx_col] =
                        usize::max(l_width_by_col[n_idx_col], estimate_value_width(&value));
                }

                write_cell_with_format(
                    worksheet,
                    n_row + 1,
                    n_idx_col,
                    &value,
                    &l_fmt_data_by_col[n_idx_col],
                )?;
            }
        }

        worksheet
            .set_freeze_panes(
                cast_row_num(options.row_freeze.unwrap_or(1))?,
                cast_col_num(options.col_freeze)?,
            )
            .map_err(derive_xlsx_error_text)?;

        if !matches!(policy_autofit.rule_columns, EnumAutofitColumnsRule::None) {
            let n_min = usize::max(1, policy_autofit.width_cell_min);
            let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
            for (n_idx_col, n_width) in l_width_by_col.iter().enumerate() {
                let n_width_final = (n_width + policy_autofit.width_cell_padding).clamp(n_min, n_max);
                worksheet
                    .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
                    .map_err(derive_xlsx_error_text)?;
            }
        }

        let if_protected = match options.sheet_password.as_deref() {
            Some("") => {
                worksheet.protect();
                true
            }
            Some(c_password) => {
                worksheet.protect_with_password(c_password);
                true
            }
            None => false,
        };

        self.report.sheets.push(SpecSheetReport {
            sheet_name: sheet_name_unique,
            n_rows: n_height_df,
            n_cols: n_width_df,
            if_protected,
        });
        Ok(())
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        let c_key = name.to_lowercase();
        if !self.set_sheet_names_existing.contains(&c_key) {
            self.set_sheet_names_existing.insert(c_key);
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 4))
            .collect();
        let mut n_idx = 2usize;
        loop {
            let candidate = format!("{base_name}__{n_idx}");
            let c_key = candidate.to_lowercase();
            if !self.set_sheet_names_existing.contains(&c_key) {
                self.set_sheet_names_existing.insert(c_key);
                return candidate;
            }
            n_idx += 1;
        }
    }
}

/// Decode a polars IPC payload.
pub fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, String> {
    IpcReader::new(Cursor::new(v_ipc_df))
        .finish()
        .map_err(|err| format!("Failed to read IPC DataFrame bytes: {err}"))
}

/// Map a polars cell to the writer's value model.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "TRUE" } else { "FALSE" }.to_string())
        }
        AnyValue::UInt8(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt16(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int8(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int16(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn derive_column_indices(
    df: &DataFrame,
    predicate: impl Fn(&polars::prelude::Column) -> bool,
) -> BTreeSet<usize> {
    df.get_columns()
        .iter()
        .enumerate()
        .filter(|(_, col)| predicate(col))
        .map(|(n_idx, _)| n_idx)
        .collect()
}

fn estimate_value_width(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_text_width(s),
        EnumCellValue::Number(n) if n.fract() == 0.0 => format!("{n:.0}").len(),
        EnumCellValue::Number(n) => format!("{n:.2}").len(),
    }
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), String> {
    if policy_autofit.width_cell_min == 0 {
        return Err("policy_autofit.width_cell_min must be >= 1.".to_string());
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        );
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), String> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => worksheet.write_blank(n_row, n_col, format),
        EnumCellValue::String(val) => worksheet.write_string_with_format(n_row, n_col, val, format),
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)
        }
    }
    .map_err(derive_xlsx_error_text)?;
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(align) = spec.align.as_deref().and_then(derive_format_align) {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::path::Path;

    use polars::df;

    use super::*;
    use crate::conf::{derive_default_xlsx_formats, derive_default_xlsx_write_options};

    fn read_part(path: &Path, name: &str) -> String {
        let file = fs::File::open(path).expect("open workbook");
        let mut archive = zip::ZipArchive::new(file).expect("parse zip archive");
        let mut part = archive.by_name(name).expect("part exists");
        let mut txt = String::new();
        part.read_to_string(&mut txt).expect("read part");
        txt
    }

    fn create_writer(path: PathBuf) -> XlsxWriter {
        XlsxWriter::new(
            path,
            derive_default_xlsx_formats(),
            derive_default_xlsx_write_options(),
        )
    }

    #[test]
    fn writer_creates_file_only_on_close() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("out.xlsx");
        let df = df!("Region" => ["East", "West"], "Amount" => [1i64, 2]).expect("df");

        let mut writer = create_writer(path.clone());
        writer
            .write_sheet_from_dataframe(&df, "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .expect("write sheet");
        assert!(!path.exists());

        writer.close().expect("close");
        writer.close().expect("close is idempotent");
        assert!(path.exists());
        assert!(!derive_partial_path(&path).exists());

        let report = writer.report();
        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.sheets[0].n_rows, 2);
        assert_eq!(report.sheets[0].n_cols, 2);
    }

    #[test]
    fn writer_rejects_write_after_close() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let df = df!("a" => [1i64]).expect("df");
        let mut writer = create_writer(tmp.path().join("out.xlsx"));
        writer.close().expect("close empty workbook");
        let err = writer
            .write_sheet_from_dataframe(&df, "Sheet1", &SpecXlsxSheetWriteOptions::default())
            .expect_err("must fail");
        assert!(err.contains("after close"));
    }

    #[test]
    fn writer_applies_sheet_password() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("locked.xlsx");
        let df = df!("a" => ["x"]).expect("df");

        let mut writer = create_writer(path.clone());
        let options = SpecXlsxSheetWriteOptions {
            sheet_password: Some("password".to_string()),
            ..Default::default()
        };
        writer
            .write_sheet_from_dataframe(&df, "Sheet1", &options)
            .expect("write sheet");
        writer.close().expect("close");

        let xml = read_part(&path, "xl/worksheets/sheet1.xml");
        assert!(xml.contains("<sheetProtection"));
        assert!(xml.contains("password=\"83AF\""));
        assert!(writer.report().sheets[0].if_protected);
    }

    #[test]
    fn writer_deduplicates_sheet_names_case_insensitively() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let df = df!("a" => [1i64]).expect("df");
        let mut writer = create_writer(tmp.path().join("out.xlsx"));
        let options = SpecXlsxSheetWriteOptions::default();
        writer
            .write_sheet_from_dataframe(&df, "Data", &options)
            .expect("first");
        writer
            .write_sheet_from_dataframe(&df, "data", &options)
            .expect("second");

        let report = writer.report();
        assert_eq!(report.sheets[0].sheet_name, "Data");
        assert_eq!(report.sheets[1].sheet_name, "data__2");
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn derive_dataframe_from_ipc_bytes_rejects_garbage() {
        let err = derive_dataframe_from_ipc_bytes(b"not ipc").expect_err("must fail");
        assert!(err.contains("IPC"));
    }
}
