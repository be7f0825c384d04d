//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::conf::{
    C_SUFFIX_PARTIAL, N_LEN_EXCEL_SHEET_NAME_MAX, N_LEN_LEGACY_PASSWORD_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, EnumIntegerCoerceMode, SpecXlsxValuePolicy};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; `None` for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

/// Normalize cell value according to numeric/integer flags and value policy.
///
/// Non-numeric columns always yield text. Non-finite numbers become blanks
/// unless `if_keep_missing_values` asks for their policy text.
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_is_numeric_col: bool,
    if_is_integer_col: bool,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    let n_value = match value {
        EnumCellValue::None => {
            return if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            };
        }
        EnumCellValue::String(s) if !if_is_numeric_col => return EnumCellValue::String(s.clone()),
        EnumCellValue::Number(n) if !if_is_numeric_col => {
            return EnumCellValue::String(n.to_string());
        }
        EnumCellValue::String(s) => match s.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => return EnumCellValue::String(s.clone()),
        },
        EnumCellValue::Number(n) => *n,
    };

    if let Some(c_text) = convert_nan_inf_to_str(n_value, value_policy) {
        return if if_keep_missing_values {
            EnumCellValue::String(c_text)
        } else {
            EnumCellValue::None
        };
    }

    if !if_is_integer_col || n_value.fract() == 0.0 {
        return EnumCellValue::Number(n_value);
    }
    match value_policy.integer_coerce {
        EnumIntegerCoerceMode::Coerce => EnumCellValue::Number(n_value.trunc()),
        EnumIntegerCoerceMode::Strict => EnumCellValue::String(n_value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let l_dups = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} at indices {l_pos:?}"))
        .collect::<Vec<_>>();
    if l_dups.is_empty() {
        return Ok(());
    }
    Err(format!("Duplicate column names detected: {}", l_dups.join("; ")))
}

/// Reject frames that do not fit one worksheet below a single header row.
pub fn validate_sheet_extent(height_df: usize, width_df: usize) -> Result<(), String> {
    if width_df > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Too many columns for one sheet: {width_df} > {N_NCOLS_EXCEL_MAX}."
        ));
    }
    if height_df + 1 > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Too many rows for one sheet: {height_df} + header > {N_NROWS_EXCEL_MAX}."
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name = c_name.trim().trim_matches('\'');
    if c_name.is_empty() {
        return "Sheet".to_string();
    }
    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Approximate display width; wide glyphs count as 1.6 units.
pub fn estimate_text_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Protection

/// Hash a password with Excel's legacy sheet/workbook protection scheme.
///
/// This is the 16-bit value stored as hex in `workbookPassword`. It only
/// deters casual edits; it is not encryption.
pub fn hash_legacy_password(password: &str) -> u16 {
    let mut n_hash: u16 = 0;
    let mut n_len: u16 = 0;

    for (n_idx, chr) in password
        .encode_utf16()
        .take(N_LEN_LEGACY_PASSWORD_MAX)
        .enumerate()
    {
        n_len += 1;
        let n_shift = (n_idx + 1) as u32;
        let n_char = chr as u32;
        let n_rotated = ((n_char << n_shift) & 0x7FFF) | (n_char >> (15 - n_shift));
        n_hash ^= n_rotated as u16;
    }

    n_hash ^ n_len ^ 0xCE4B
}

/// Sibling path used while a file is being produced.
pub fn derive_partial_path(path_file: &Path) -> PathBuf {
    let mut c_name = path_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    c_name.push(C_SUFFIX_PARTIAL);
    path_file.with_file_name(c_name)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
