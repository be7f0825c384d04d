use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::spec::ProtectTreeError;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

/// Compiled basename globs. No patterns admits every file.
#[derive(Debug, Clone)]
pub(crate) struct SpecFilePatterns {
    globs_include: Option<GlobSet>,
}

impl SpecFilePatterns {
    pub(crate) fn from_raw(patterns_include: &[String]) -> Result<Self, ProtectTreeError> {
        if patterns_include.is_empty() {
            return Ok(Self {
                globs_include: None,
            });
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns_include {
            let glob =
                Glob::new(pattern).map_err(|e| ProtectTreeError::InvalidPattern(e.to_string()))?;
            builder.add(glob);
        }
        let globs_include = builder
            .build()
            .map_err(|e| ProtectTreeError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            globs_include: Some(globs_include),
        })
    }

    pub(crate) fn is_included(&self, name_file: &str) -> bool {
        self.globs_include
            .as_ref()
            .is_none_or(|globs| globs.is_match(name_file))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Regular files directly under `path_dir`, sorted by name.
pub(crate) fn list_files_sorted(path_dir: &Path) -> Result<Vec<PathBuf>, io::Error> {
    let mut l_files = Vec::new();
    for entry in fs::read_dir(path_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            l_files.push(entry.path());
        }
    }
    l_files.sort();
    Ok(l_files)
}

/// Every entry under `path_dir` (directories before their children), sorted.
pub(crate) fn list_tree_sorted(path_dir: &Path) -> Result<Vec<(PathBuf, bool)>, io::Error> {
    let mut l_entries = Vec::new();
    let mut l_stack = vec![path_dir.to_path_buf()];
    while let Some(path_cursor) = l_stack.pop() {
        let mut l_children = fs::read_dir(&path_cursor)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        l_children.sort();
        for path_child in l_children {
            let meta = fs::symlink_metadata(&path_child)?;
            if meta.is_dir() {
                l_stack.push(path_child.clone());
                l_entries.push((path_child, true));
            } else if meta.is_file() {
                l_entries.push((path_child, false));
            }
        }
    }
    l_entries.sort();
    Ok(l_entries)
}

/// Forward-slash relative name for a zip entry.
pub(crate) fn derive_entry_name(path_item: &Path, path_dir_root: &Path) -> Option<String> {
    let path_rel = path_item.strip_prefix(path_dir_root).ok()?;
    let l_parts = path_rel
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    if l_parts.is_empty() {
        return None;
    }
    Some(l_parts.join("/"))
}

/// `dir` → `dir.zip`, keeping any existing extension in the stem.
pub(crate) fn derive_archive_path(path_dir: &Path) -> PathBuf {
    let mut c_name = path_dir
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    c_name.push(".zip");
    path_dir.with_file_name(c_name)
}

pub(crate) fn derive_partial_path(path_file: &Path) -> PathBuf {
    let mut c_name = path_file
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    c_name.push(".partial");
    path_file.with_file_name(c_name)
}

pub(crate) fn copy_file_times(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    set_file_times(
        path_file_dst,
        FileTime::from_last_access_time(&stat_src),
        FileTime::from_last_modification_time(&stat_src),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match_basename_globs() {
        let pats = SpecFilePatterns::from_raw(&["*.xlsx".to_string(), "*.xlsm".to_string()])
            .expect("compile");
        assert!(pats.is_included("AcmeID1001-East-20240101.xlsx"));
        assert!(pats.is_included("macro.xlsm"));
        assert!(!pats.is_included("notes.txt"));

        let pats = SpecFilePatterns::from_raw(&[]).expect("compile");
        assert!(pats.is_included("notes.txt"));
    }

    #[test]
    fn patterns_invalid_glob_rejected() {
        let err = SpecFilePatterns::from_raw(&["[".to_string()]).expect_err("must fail");
        assert!(matches!(err, ProtectTreeError::InvalidPattern(_)));
    }

    #[test]
    fn archive_and_entry_names() {
        let root = Path::new("/out/Acme-20240101");
        assert_eq!(
            derive_archive_path(root),
            PathBuf::from("/out/Acme-20240101.zip")
        );
        assert_eq!(
            derive_entry_name(&root.join("sub").join("a.xlsx"), root).as_deref(),
            Some("sub/a.xlsx")
        );
        assert_eq!(derive_entry_name(root, root), None);
    }

    #[test]
    fn list_tree_sorted_lists_nested_entries() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(tmp.path().join("b")).expect("mkdir");
        fs::write(tmp.path().join("b/c.txt"), "c").expect("write");
        fs::write(tmp.path().join("a.txt"), "a").expect("write");

        let l_entries = list_tree_sorted(tmp.path()).expect("list");
        let l_names = l_entries
            .iter()
            .map(|(path, if_dir)| (derive_entry_name(path, tmp.path()).unwrap_or_default(), *if_dir))
            .collect::<Vec<_>>();
        assert_eq!(
            l_names,
            vec![
                ("a.txt".to_string(), false),
                ("b".to_string(), true),
                ("b/c.txt".to_string(), false)
            ]
        );
        assert_eq!(list_files_sorted(tmp.path()).expect("files").len(), 1);
    }
}
