//! Templates: one worksheet's data plus the split capability the batch needs.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;

use polars::prelude::{
    AnyValue, BooleanChunked, DataFrame, DataType, IpcReader, NewChunkedArray, PlSmallStr,
    SerReader,
};
use xlbatch_io_xlsx::{
    EnumCellValue, SpecXlsxSheetWriteOptions, derive_cell_value_from_any_value,
    derive_dataframe_from_ipc_bytes,
};

use crate::conf::{C_KEY_MAIN_SHEET, C_MAIN_SHEET_FALLBACK};
use crate::spec::TemplateError;

/// Data source for one sheet of every generated workbook.
///
/// Implementors provide the data and sheet labels; feasibility checks and
/// row selection have default implementations over [`Self::data`] that a
/// template kind may override.
pub trait SplitTemplate {
    /// Full template data.
    fn data(&self) -> &DataFrame;

    /// Named sheet regions; `"main_sheet"` labels progress messages.
    fn tab_names(&self) -> &BTreeMap<String, String>;

    fn main_sheet_name(&self) -> &str {
        self.tab_names()
            .get(C_KEY_MAIN_SHEET)
            .map_or(C_MAIN_SHEET_FALLBACK, String::as_str)
    }

    /// Layout options used when this template is written.
    fn sheet_write_options(&self) -> SpecXlsxSheetWriteOptions {
        SpecXlsxSheetWriteOptions::default()
    }

    /// Fail unless every value in `values` occurs in `column`.
    fn check_split_by_range(
        &self,
        column: &str,
        values: &BTreeSet<String>,
    ) -> Result<(), TemplateError> {
        let column_texts = derive_column_texts(self.data(), column, self.main_sheet_name())?;
        let set_present = column_texts
            .l_texts
            .iter()
            .flatten()
            .map(String::as_str)
            .collect::<BTreeSet<_>>();
        let l_missing = values
            .iter()
            .filter(|value| !set_present.contains(column_texts.derive_key(value).as_str()))
            .cloned()
            .collect::<Vec<_>>();
        if l_missing.is_empty() {
            return Ok(());
        }
        Err(TemplateError::MissingSplitValues {
            sheet: self.main_sheet_name().to_string(),
            column: column.to_string(),
            missing: l_missing,
        })
    }

    /// Rows whose `column` cell reads as `value`. Nulls never match; boolean
    /// cells read as `true`/`false` in any letter case.
    fn select_rows(&self, column: &str, value: &str) -> Result<DataFrame, TemplateError> {
        let sheet = self.main_sheet_name();
        let column_texts = derive_column_texts(self.data(), column, sheet)?;
        let c_key = column_texts.derive_key(value);
        let l_mask = column_texts
            .l_texts
            .iter()
            .map(|text| text.as_deref() == Some(c_key.as_str()))
            .collect::<Vec<_>>();
        let mask = BooleanChunked::from_slice(PlSmallStr::from_static("mask"), &l_mask);
        self.data().filter(&mask).map_err(|err| TemplateError::Frame {
            sheet: sheet.to_string(),
            message: err.to_string(),
        })
    }
}

/// Template backed by an in-memory polars `DataFrame`.
#[derive(Debug, Clone)]
pub struct FrameTemplate {
    df_data: DataFrame,
    dict_tab_names: BTreeMap<String, String>,
    options_sheet: SpecXlsxSheetWriteOptions,
}

impl FrameTemplate {
    pub fn new(df_data: DataFrame, main_sheet: impl Into<String>) -> Self {
        let mut dict_tab_names = BTreeMap::new();
        dict_tab_names.insert(C_KEY_MAIN_SHEET.to_string(), main_sheet.into());
        Self {
            df_data,
            dict_tab_names,
            options_sheet: SpecXlsxSheetWriteOptions::default(),
        }
    }

    /// Decode polars IPC bytes.
    pub fn from_ipc_bytes(
        v_ipc_df: &[u8],
        main_sheet: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let main_sheet = main_sheet.into();
        let df_data = derive_dataframe_from_ipc_bytes(v_ipc_df).map_err(|message| {
            TemplateError::Frame {
                sheet: main_sheet.clone(),
                message,
            }
        })?;
        Ok(Self::new(df_data, main_sheet))
    }

    /// Read a polars IPC file.
    pub fn from_ipc_file(
        path_file: &Path,
        main_sheet: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let err_load = |message: String| TemplateError::Load {
            path: path_file.to_path_buf(),
            message,
        };
        let file = File::open(path_file).map_err(|e| err_load(e.to_string()))?;
        let df_data = IpcReader::new(file)
            .finish()
            .map_err(|e| err_load(e.to_string()))?;
        Ok(Self::new(df_data, main_sheet))
    }

    /// Add or replace a named sheet region.
    pub fn with_tab_name(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.dict_tab_names.insert(key.into(), name.into());
        self
    }

    pub fn with_sheet_write_options(mut self, options: SpecXlsxSheetWriteOptions) -> Self {
        self.options_sheet = options;
        self
    }
}

impl SplitTemplate for FrameTemplate {
    fn data(&self) -> &DataFrame {
        &self.df_data
    }

    fn tab_names(&self) -> &BTreeMap<String, String> {
        &self.dict_tab_names
    }

    fn sheet_write_options(&self) -> SpecXlsxSheetWriteOptions {
        self.options_sheet.clone()
    }
}

/// Text form of one column, as compared against split values.
struct SpecColumnTexts {
    /// `None` for nulls.
    l_texts: Vec<Option<String>>,
    if_fold_case: bool,
}

impl SpecColumnTexts {
    /// Split value in the form stored in `l_texts`.
    fn derive_key(&self, value: &str) -> String {
        if self.if_fold_case {
            value.to_ascii_lowercase()
        } else {
            value.to_string()
        }
    }
}

/// Text form of every cell in `column`: strings as-is, integers exactly,
/// whole floats without a fraction, booleans as `true`/`false`.
fn derive_column_texts(
    df: &DataFrame,
    column: &str,
    sheet: &str,
) -> Result<SpecColumnTexts, TemplateError> {
    let col = df
        .column(column)
        .map_err(|_| TemplateError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })?;
    let l_texts = (0..df.height())
        .map(|n_row| {
            col.get(n_row)
                .map(derive_cell_text)
                .map_err(|err| TemplateError::Frame {
                    sheet: sheet.to_string(),
                    message: err.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SpecColumnTexts {
        l_texts,
        if_fold_case: matches!(col.dtype(), DataType::Boolean),
    })
}

fn derive_cell_text(value: AnyValue<'_>) -> Option<String> {
    // Integers bypass the f64 cell model so ids above 2^53 stay exact.
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(val) => Some(val.to_string()),
        AnyValue::Int8(val) => Some(val.to_string()),
        AnyValue::Int16(val) => Some(val.to_string()),
        AnyValue::Int32(val) => Some(val.to_string()),
        AnyValue::Int64(val) => Some(val.to_string()),
        AnyValue::UInt8(val) => Some(val.to_string()),
        AnyValue::UInt16(val) => Some(val.to_string()),
        AnyValue::UInt32(val) => Some(val.to_string()),
        AnyValue::UInt64(val) => Some(val.to_string()),
        other => match derive_cell_value_from_any_value(other) {
            EnumCellValue::None => None,
            EnumCellValue::String(text) => Some(text),
            EnumCellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{n:.0}"))
            }
            EnumCellValue::Number(n) => Some(n.to_string()),
        },
    }
}
