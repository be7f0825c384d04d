use std::fs;
use std::path::Path;

use crate::naming::{create_folder_name, create_protected_folder_name};
use crate::spec::{BatchError, SpecOutputFolders};

/// Create the run's output folders under `dir_out`. Existing folders are reused.
pub fn create_output_folders(
    dir_out: &Path,
    project: &str,
    date: &str,
    if_protect_files: bool,
) -> Result<SpecOutputFolders, BatchError> {
    let spec_folders = SpecOutputFolders {
        path_plain: dir_out.join(create_folder_name(project, date)),
        path_protected: dir_out.join(create_protected_folder_name(project, date)),
    };

    _create_dir(&spec_folders.path_plain)?;
    if if_protect_files {
        _create_dir(&spec_folders.path_protected)?;
    }
    Ok(spec_folders)
}

fn _create_dir(path_dir: &Path) -> Result<(), BatchError> {
    fs::create_dir_all(path_dir).map_err(|e| BatchError::Io {
        path: path_dir.to_path_buf(),
        source: e,
    })?;
    log::debug!("Output folder {}", path_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_folder_only_when_requested() {
        let tmp = tempfile::tempdir().expect("tempdir");

        let spec_folders =
            create_output_folders(tmp.path(), "Acme", "20240101", false).expect("folders");
        assert!(spec_folders.path_plain.is_dir());
        assert!(!spec_folders.path_protected.exists());
        assert_eq!(
            spec_folders.path_protected,
            tmp.path().join("Acme-20240101-Protected")
        );

        let spec_folders =
            create_output_folders(tmp.path(), "Acme", "20240101", true).expect("folders again");
        assert!(spec_folders.path_plain.is_dir());
        assert!(spec_folders.path_protected.is_dir());
    }
}
