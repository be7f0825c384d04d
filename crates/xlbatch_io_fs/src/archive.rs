//! Zip a finished output directory and remove the original.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::spec::ArchiveTreeError;
use crate::util::{derive_archive_path, derive_entry_name, derive_partial_path, list_tree_sorted};

/// Archive `dir` into `{dir}.zip` and delete `dir`.
///
/// Entry names are relative to `dir` with `/` separators, in sorted order.
/// The directory is removed only after the archive has been written and
/// renamed into place, so a failure leaves the original tree intact.
pub fn archive_tree<P: AsRef<Path>>(dir: P) -> Result<PathBuf, ArchiveTreeError> {
    let path_dir = dir.as_ref().to_path_buf();
    if !path_dir.is_dir() {
        return Err(ArchiveTreeError::SourceNotDirectory(path_dir));
    }

    let path_archive = derive_archive_path(&path_dir);
    let path_partial = derive_partial_path(&path_archive);
    _write_archive(&path_dir, &path_partial)?;
    fs::rename(&path_partial, &path_archive).map_err(|e| ArchiveTreeError::Io {
        path: path_archive.clone(),
        source: e,
    })?;
    fs::remove_dir_all(&path_dir).map_err(|e| ArchiveTreeError::Io {
        path: path_dir.clone(),
        source: e,
    })?;

    log::info!("Archived {} -> {}", path_dir.display(), path_archive.display());
    Ok(path_archive)
}

fn _write_archive(path_dir: &Path, path_archive: &Path) -> Result<(), ArchiveTreeError> {
    let err_io = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| ArchiveTreeError::Io { path, source: e }
    };
    let err_zip = |e: zip::result::ZipError| ArchiveTreeError::Zip {
        path: path_archive.to_path_buf(),
        message: e.to_string(),
    };

    let l_entries = list_tree_sorted(path_dir).map_err(err_io(path_dir))?;
    let file_dst = File::create(path_archive).map_err(err_io(path_archive))?;
    let mut writer = ZipWriter::new(file_dst);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (path_item, if_dir) in l_entries {
        let Some(c_name) = derive_entry_name(&path_item, path_dir) else {
            continue;
        };
        if if_dir {
            writer
                .add_directory(format!("{c_name}/"), options)
                .map_err(err_zip)?;
            continue;
        }
        let v_bytes = fs::read(&path_item).map_err(err_io(&path_item))?;
        writer.start_file(c_name, options).map_err(err_zip)?;
        writer.write_all(&v_bytes).map_err(err_io(path_archive))?;
    }
    writer.finish().map_err(err_zip)?;
    Ok(())
}
