//! Constants shared by the batch routine.

/// Key in `tab_names` holding the template's main sheet label.
pub const C_KEY_MAIN_SHEET: &str = "main_sheet";
/// Main sheet label used when a template does not name one.
pub const C_MAIN_SHEET_FALLBACK: &str = "Sheet";
/// Prefix of generated sheet names (`Sheet1`, `Sheet2`, ...).
pub const C_PREFIX_SHEET_NAME: &str = "Sheet";

/// Suffix of the protected output folder.
pub const C_SUFFIX_FOLDER_PROTECTED: &str = "-Protected";
/// Infix of the password manifest file name.
pub const C_INFIX_PASSWORD_MASTER: &str = "PasswordMaster";
/// Manifest column label used when no split column is given.
pub const C_COL_SPLIT_VALUE_FALLBACK: &str = "Split Value";
/// Leading manifest columns.
pub const C_COL_FILE_ID: &str = "File ID";
pub const C_COL_FILE_NAME: &str = "Filename";
pub const C_COL_PASSWORD: &str = "Password";

/// Password alphabet without look-alike characters (`0/O`, `1/l/I`).
pub const C_PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
/// Generated password length.
pub const N_LEN_PASSWORD: usize = 12;

/// Zero-padded width of the per-batch sequence index.
pub const N_WIDTH_FILE_INDEX: usize = 3;
/// Date stamp format used in folder and file names.
pub const C_FORMAT_DATE: &str = "%Y%m%d";
