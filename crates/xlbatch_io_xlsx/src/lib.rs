//! `xlbatch_io_xlsx`:
//! XLSX writer kernel for batch report generation.
//!
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options
//! - `util`    : pure helper functions
//! - `writer`  : DataFrame-to-sheet writer
//! - `protect` : post-write workbook structure protection
pub mod conf;
pub mod protect;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats, derive_default_xlsx_write_options,
};
pub use protect::protect_workbook;
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, EnumIntegerCoerceMode, SpecAutofitCellsPolicy,
    SpecCellFormat, SpecSheetReport, SpecXlsxFormats, SpecXlsxReport, SpecXlsxSheetWriteOptions,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions,
};
pub use util::{convert_cell_value, hash_legacy_password, sanitize_sheet_name};
pub use writer::{
    XlsxWriter, derive_cell_value_from_any_value, derive_dataframe_from_ipc_bytes,
};
