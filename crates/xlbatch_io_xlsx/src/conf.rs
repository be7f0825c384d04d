//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecXlsxFormats, SpecXlsxWriteOptions};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Excel truncates legacy protection passwords to this many UTF-16 units.
pub const N_LEN_LEGACY_PASSWORD_MAX: usize = 15;

/// Package part holding the workbook definition.
pub const C_PART_WORKBOOK: &str = "xl/workbook.xml";
/// Suffix appended to in-flight files before the final rename.
pub const C_SUFFIX_PARTIAL: &str = ".partial";

/// Build the default format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_formats() -> SpecXlsxFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        align: Some("left".to_string()),
        ..Default::default()
    };

    SpecXlsxFormats {
        text: cfg_base_fmt_spec.clone(),
        integer: cfg_base_fmt_spec.overlay(&SpecCellFormat {
            num_format: Some("0".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        decimal: cfg_base_fmt_spec.overlay(&SpecCellFormat {
            num_format: Some("#,##0.00".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        header: cfg_base_fmt_spec.overlay(&SpecCellFormat {
            bold: Some(true),
            border: Some(1),
            align: Some("center".to_string()),
            bg_color: Some("#D9E1F2".to_string()),
            text_wrap: Some(true),
            ..Default::default()
        }),
    }
}

/// Build default write options.
pub fn derive_default_xlsx_write_options() -> SpecXlsxWriteOptions {
    SpecXlsxWriteOptions::default()
}
