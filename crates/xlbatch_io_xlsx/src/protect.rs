//! Workbook-level structure protection applied to an already saved package.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::conf::C_PART_WORKBOOK;
use crate::util::{derive_partial_path, hash_legacy_password};

/// Lock the structure of the workbook at `path_file` with `password`.
///
/// Sheets can no longer be added, removed, renamed or reordered in Excel
/// without the password. The package is rewritten to a sibling file and
/// renamed over the original.
pub fn protect_workbook(path_file: &Path, password: &str) -> Result<(), String> {
    let c_element = format!(
        "<workbookProtection workbookPassword=\"{:04X}\" lockStructure=\"1\"/>",
        hash_legacy_password(password)
    );

    let file_src = File::open(path_file)
        .map_err(|err| format!("Failed to open {}: {err}", path_file.display()))?;
    let mut archive = ZipArchive::new(file_src)
        .map_err(|err| format!("Failed to parse workbook package: {err}"))?;

    let path_partial = derive_partial_path(path_file);
    let result = write_protected_package(&mut archive, &path_partial, &c_element)
        .and_then(|if_found_workbook| {
            if if_found_workbook {
                Ok(())
            } else {
                Err(format!("Package has no {C_PART_WORKBOOK} part."))
            }
        });
    if let Err(err) = result {
        discard_partial(&path_partial);
        return Err(err);
    }

    if let Err(err) = fs::rename(&path_partial, path_file) {
        discard_partial(&path_partial);
        return Err(format!("Failed to replace {}: {err}", path_file.display()));
    }
    log::debug!("Locked workbook structure of {}", path_file.display());
    Ok(())
}

/// Copy every part of `archive` into `path_partial`, patching the workbook part.
/// Returns whether the workbook part was seen.
fn write_protected_package(
    archive: &mut ZipArchive<File>,
    path_partial: &Path,
    c_element: &str,
) -> Result<bool, String> {
    let file_dst = File::create(path_partial)
        .map_err(|err| format!("Failed to create {}: {err}", path_partial.display()))?;
    let mut writer = ZipWriter::new(file_dst);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut if_found_workbook = false;
    for n_idx in 0..archive.len() {
        let mut entry = archive
            .by_index(n_idx)
            .map_err(|err| format!("Failed to read package entry: {err}"))?;
        if entry.is_dir() {
            continue;
        }
        let c_name = entry.name().to_string();
        let mut v_bytes = Vec::new();
        entry
            .read_to_end(&mut v_bytes)
            .map_err(|err| format!("Failed to read part {c_name}: {err}"))?;

        if c_name == C_PART_WORKBOOK {
            let c_xml = String::from_utf8(v_bytes)
                .map_err(|err| format!("Workbook part is not UTF-8: {err}"))?;
            v_bytes = insert_workbook_protection(&c_xml, c_element)?.into_bytes();
            if_found_workbook = true;
        }

        writer
            .start_file(c_name.as_str(), options)
            .map_err(|err| format!("Failed to write part {c_name}: {err}"))?;
        writer
            .write_all(&v_bytes)
            .map_err(|err| format!("Failed to write part {c_name}: {err}"))?;
    }
    writer
        .finish()
        .map_err(|err| format!("Failed to finalize workbook package: {err}"))?;
    Ok(if_found_workbook)
}

fn discard_partial(path_partial: &Path) {
    if !path_partial.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(path_partial) {
        log::warn!("Failed to remove {}: {err}", path_partial.display());
    }
}

/// Insert (or replace) the `<workbookProtection/>` element.
///
/// OOXML orders it after `<workbookPr>` and before `<bookViews>`/`<sheets>`.
pub fn insert_workbook_protection(xml: &str, element: &str) -> Result<String, String> {
    if let Some(n_start) = xml.find("<workbookProtection") {
        let n_end = xml[n_start..]
            .find("/>")
            .map(|n_off| n_start + n_off + 2)
            .ok_or_else(|| "Malformed workbookProtection element.".to_string())?;
        return Ok(format!("{}{element}{}", &xml[..n_start], &xml[n_end..]));
    }

    let n_anchor = ["<bookViews", "<sheets"]
        .iter()
        .find_map(|c_tag| xml.find(c_tag))
        .ok_or_else(|| "Workbook part has no <bookViews> or <sheets> element.".to_string())?;
    Ok(format!("{}{element}{}", &xml[..n_anchor], &xml[n_anchor..]))
}
