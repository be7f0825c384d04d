//! Password encryption of finished workbooks into a sibling directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use ms_offcrypto_writer::Ecma376AgileWriter;

use crate::report::{ReportProtect, ReportProtectBuilder};
use crate::spec::{ProtectTreeError, SpecProtectOptions};
use crate::util::{
    SpecFilePatterns, copy_file_times, derive_partial_path, is_overlap, list_files_sorted,
};

/// Encrypt the files of `dir_source` listed in `passwords` into `dir_destination`.
///
/// `passwords` maps a file name (not a path) to its open password. Only files
/// directly under `dir_source` are considered, in name order. Each listed
/// file is written to `dir_destination` under the same name as an ECMA-376
/// agile encrypted package, then removed from the source unless
/// [`SpecProtectOptions::if_keep_source`] is set.
///
/// Matched files without a password are left in place and reported as
/// skipped. A password whose file is missing is an error, and so is any
/// failure while encrypting; the run stops at the first one.
pub fn protect_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    passwords: &BTreeMap<String, String>,
    spec_options: &SpecProtectOptions,
) -> Result<ReportProtect, ProtectTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(ProtectTreeError::SourceNotDirectory(path_dir_src));
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(ProtectTreeError::SourceDestinationOverlap {
            path_source: path_dir_src,
            path_destination: path_dir_dst,
        });
    }

    let spec_pats = SpecFilePatterns::from_raw(&spec_options.patterns_include_files)?;

    for name_file in passwords.keys() {
        let path_file_src = path_dir_src.join(name_file);
        if !path_file_src.is_file() {
            return Err(ProtectTreeError::MissingSourceFile(path_file_src));
        }
    }

    fs::create_dir_all(&path_dir_dst).map_err(|e| ProtectTreeError::DestinationInitFailed {
        path: path_dir_dst.clone(),
        source: e,
    })?;

    let l_files = list_files_sorted(&path_dir_src).map_err(|e| ProtectTreeError::Io {
        path: path_dir_src.clone(),
        source: e,
    })?;

    let mut builder = ReportProtectBuilder::default();
    for path_file_src in l_files {
        builder.add_scanned();
        let name_file = path_file_src
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !spec_pats.is_included(&name_file) {
            continue;
        }
        builder.add_matched();

        let Some(password) = passwords.get(&name_file) else {
            builder.add_skipped(format!(
                "No password listed for {}; left unprotected.",
                path_file_src.display()
            ));
            continue;
        };

        let path_file_dst = path_dir_dst.join(&name_file);
        encrypt_file(&path_file_src, &path_file_dst, password)?;
        if spec_options.if_preserve_times {
            copy_file_times(&path_file_src, &path_file_dst).map_err(|e| ProtectTreeError::Io {
                path: path_file_dst.clone(),
                source: e,
            })?;
        }
        if !spec_options.if_keep_source {
            fs::remove_file(&path_file_src).map_err(|e| ProtectTreeError::Io {
                path: path_file_src.clone(),
                source: e,
            })?;
        }
        log::debug!("Protected {}", path_file_dst.display());
        builder.add_protected(path_file_dst);
    }

    let report = builder.build();
    log::info!("{report}");
    Ok(report)
}

/// Write `path_file_src` encrypted with `password` to `path_file_dst`.
///
/// The output is an OLE compound file holding the `EncryptionInfo` and
/// `EncryptedPackage` streams. It is staged next to the target and renamed
/// into place.
pub fn encrypt_file(
    path_file_src: &Path,
    path_file_dst: &Path,
    password: &str,
) -> Result<PathBuf, ProtectTreeError> {
    let v_plain = fs::read(path_file_src).map_err(|e| ProtectTreeError::Io {
        path: path_file_src.to_path_buf(),
        source: e,
    })?;

    let err_encrypt = |message: String| ProtectTreeError::Encrypt {
        path: path_file_src.to_path_buf(),
        message,
    };
    let mut rng = rand::rng();
    let mut writer = Ecma376AgileWriter::create(&mut rng, password, Cursor::new(Vec::<u8>::new()))
        .map_err(|e| err_encrypt(e.to_string()))?;
    writer
        .write_all(&v_plain)
        .map_err(|e| err_encrypt(e.to_string()))?;
    let v_encrypted = writer
        .into_inner()
        .map_err(|e| err_encrypt(e.to_string()))?
        .into_inner();

    let path_partial = derive_partial_path(path_file_dst);
    fs::write(&path_partial, &v_encrypted).map_err(|e| ProtectTreeError::Io {
        path: path_partial.clone(),
        source: e,
    })?;
    fs::rename(&path_partial, path_file_dst).map_err(|e| ProtectTreeError::Io {
        path: path_file_dst.to_path_buf(),
        source: e,
    })?;
    Ok(path_file_dst.to_path_buf())
}
