//! Formats, write options and reports of the workbook writer.

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Layered cell style; unset fields fall through to the base preset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    pub font_name: Option<String>,
    /// Points.
    pub font_size: Option<i64>,
    pub bold: Option<bool>,
    /// `left`, `center` or `right`.
    pub align: Option<String>,
    /// Thin border on all four sides when `> 0`.
    pub border: Option<i64>,
    pub text_wrap: Option<bool>,
    /// Excel number format code such as `#,##0.00`.
    pub num_format: Option<String>,
    /// `#RRGGBB` fill.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Copy of `self` with every field set in `patch` replaced.
    pub fn overlay(&self, patch: &SpecCellFormat) -> SpecCellFormat {
        fn pick<T: Clone>(patch: &Option<T>, base: &Option<T>) -> Option<T> {
            patch.as_ref().or(base.as_ref()).cloned()
        }
        SpecCellFormat {
            font_name: pick(&patch.font_name, &self.font_name),
            font_size: pick(&patch.font_size, &self.font_size),
            bold: pick(&patch.bold, &self.bold),
            align: pick(&patch.align, &self.align),
            border: pick(&patch.border, &self.border),
            text_wrap: pick(&patch.text_wrap, &self.text_wrap),
            num_format: pick(&patch.num_format, &self.num_format),
            bg_color: pick(&patch.bg_color, &self.bg_color),
        }
    }
}

/// Style presets picked per column: header row, then text/integer/decimal body cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxFormats {
    pub text: SpecCellFormat,
    pub integer: SpecCellFormat,
    pub decimal: SpecCellFormat,
    pub header: SpecCellFormat,
}

/// Cell content after dataframe conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Left blank.
    None,
    String(String),
    Number(f64),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// What a fractional value in an integer-typed column becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumIntegerCoerceMode {
    /// Truncated toward zero.
    Coerce,
    /// Written as text so no digits are lost.
    #[default]
    Strict,
}

/// Placeholders for missing and non-finite values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Written for nulls when missing values are kept.
    pub missing_value_str: String,
    pub nan_str: String,
    pub posinf_str: String,
    pub neginf_str: String,
    pub integer_coerce: EnumIntegerCoerceMode,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: String::new(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
            integer_coerce: EnumIntegerCoerceMode::default(),
        }
    }
}

/// Which cells drive column widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Widths left at the Excel default.
    None,
    #[default]
    Header,
    /// Header plus the first `height_body_inferred_max` body rows.
    All,
}

/// Column width inference for one sheet, in character units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    pub rule_columns: EnumAutofitColumnsRule,
    /// Body rows sampled under [`EnumAutofitColumnsRule::All`]; `None` samples all.
    pub height_body_inferred_max: Option<usize>,
    pub width_cell_min: usize,
    pub width_cell_max: usize,
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::default(),
            height_body_inferred_max: Some(5_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options fixed for the lifetime of one [`crate::XlsxWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    pub value_policy: SpecXlsxValuePolicy,
    /// Write policy placeholders for nulls and non-finite numbers instead of blanks.
    pub keep_missing_values: bool,
    /// Numeric dtypes get the decimal preset.
    pub infer_numeric_cols: bool,
    /// Integer dtypes get the integer preset.
    pub infer_integer_cols: bool,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            value_policy: SpecXlsxValuePolicy::default(),
            keep_missing_values: false,
            infer_numeric_cols: true,
            infer_integer_cols: true,
        }
    }
}

/// Layout and protection of one written sheet.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxSheetWriteOptions {
    pub col_freeze: usize,
    /// `None` freezes below the header row.
    pub row_freeze: Option<usize>,
    /// Per-sheet override of [`SpecXlsxWriteOptions::keep_missing_values`].
    pub if_keep_missing_values: Option<bool>,
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Lock the sheet. `Some("")` locks it without a password.
    pub sheet_password: Option<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetReport {
    /// Name as written, after sanitizing and de-duplication.
    pub sheet_name: String,
    /// Body rows, header excluded.
    pub n_rows: usize,
    pub n_cols: usize,
    pub if_protected: bool,
}

/// What one workbook received so far.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    pub sheets: Vec<SpecSheetReport>,
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        log::warn!("{msg}");
        self.warnings.push(msg.to_string());
    }

    pub fn n_rows_total(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.n_rows).sum()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_prefers_patch_fields() {
        let base = SpecCellFormat {
            font_name: Some("Calibri".to_string()),
            align: Some("left".to_string()),
            ..Default::default()
        };
        let patch = SpecCellFormat {
            align: Some("right".to_string()),
            bold: Some(true),
            ..Default::default()
        };
        let merged = base.overlay(&patch);
        assert_eq!(merged.font_name.as_deref(), Some("Calibri"));
        assert_eq!(merged.align.as_deref(), Some("right"));
        assert_eq!(merged.bold, Some(true));
        assert_eq!(merged.bg_color, None);
    }

    #[test]
    fn report_totals_rows_across_sheets() {
        let mut report = SpecXlsxReport::default();
        for n_rows in [3, 4] {
            report.sheets.push(SpecSheetReport {
                sheet_name: format!("Sheet{n_rows}"),
                n_rows,
                n_cols: 2,
                if_protected: false,
            });
        }
        report.warn("renamed");
        assert_eq!(report.n_rows_total(), 7);
        assert_eq!(report.warnings, vec!["renamed".to_string()]);
    }
}
