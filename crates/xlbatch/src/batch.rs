//! Batch orchestration: one workbook per split value.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use xlbatch_io_fs::{SpecProtectOptions, archive_tree, protect_tree};
use xlbatch_io_xlsx::{
    XlsxWriter, derive_default_xlsx_formats, derive_default_xlsx_write_options, protect_workbook,
};

use crate::conf::C_PREFIX_SHEET_NAME;
use crate::folders::create_output_folders;
use crate::manifest::{SpecPasswordManifest, SpecPasswordRecord};
use crate::naming::{
    create_file_id, create_file_name, create_manifest_name, derive_project_name, format_date,
    sanitize_split_value,
};
use crate::password::create_password;
use crate::spec::{
    BatchError, ReportBatch, SpecBatchContext, SpecBatchOptions, SpecOutputFolders,
};
use crate::template::SplitTemplate;

/// Generate one workbook per distinct split value.
///
/// Each workbook holds one sheet per template (`Sheet1`, `Sheet2`, ...),
/// restricted to the rows of its split value when `split_by_value` is set.
/// Depending on the options the workbooks are then structure-locked,
/// encrypted into the protected folder with a CSV password manifest written
/// to `dir_out`, and both folders are zipped.
///
/// Returns `Ok(None)` without touching the filesystem when neither
/// `split_by` nor `split_by_range` is given. Argument and feasibility errors
/// are raised before anything is created. Later failures abort the batch and
/// leave already written workbooks in place.
pub fn create_xl_file_multiple_templates(
    project_name: &str,
    templates: &[&dyn SplitTemplate],
    options: &SpecBatchOptions,
    context: &SpecBatchContext,
) -> Result<Option<ReportBatch>, BatchError> {
    if options.split_by.is_none() && options.split_by_range.is_none() {
        log::debug!("No split column or split values given; nothing to do.");
        return Ok(None);
    }
    let Some(split_by_range) = options.split_by_range.as_ref() else {
        return Err(BatchError::SplitRangeNotList("None".to_string()));
    };
    let set_split_values: BTreeSet<String> = split_by_range.iter().cloned().collect();

    let split_by = options.split_by.as_deref();
    let column_filter = match (options.split_by_value, split_by) {
        (true, None) => return Err(BatchError::MissingSplitColumn),
        (true, Some(column)) => Some(column),
        (false, _) => None,
    };
    let project = derive_project_name(project_name)?;

    if let Some(column) = column_filter {
        for template in templates {
            log::info!("Checking: {}", template.main_sheet_name());
            template.check_split_by_range(column, &set_split_values)?;
        }
    }

    let date = format_date(context.today);
    let spec_folders =
        create_output_folders(&context.dir_out, &project, &date, options.protect_files)?;

    let mut report = ReportBatch {
        project: project.clone(),
        date: date.clone(),
        ..ReportBatch::default()
    };
    let mut manifest = SpecPasswordManifest::new(options.split_by.clone());
    let workbook_password = options
        .workbook_password
        .as_deref()
        .filter(|pw| !pw.is_empty());

    let n_total = set_split_values.len();
    for (n_idx, split_value) in set_split_values.iter().enumerate() {
        let n_index = n_idx + 1;
        let file_id = create_file_id(&project, options.batch, n_index);
        let file_name = create_file_name(&file_id, &sanitize_split_value(split_value), &date);
        let path_file = spec_folders.path_plain.join(&file_name);

        let l_warnings = write_workbook(
            &path_file,
            templates,
            column_filter.map(|column| (column, split_value.as_str())),
            options.sheet_password.as_deref(),
        )?;
        report.warnings.extend(l_warnings);

        if let Some(password) = workbook_password {
            protect_workbook(&path_file, password).map_err(|message| BatchError::Xlsx {
                path: path_file.clone(),
                message,
            })?;
        }

        if options.protect_files {
            manifest.push(SpecPasswordRecord {
                file_id,
                file_name,
                split_value: split_value.clone(),
                password: create_password(&project, split_value, options.random_password),
            });
        }
        report.files.push(path_file);
        log::info!("[{n_index}/{n_total}] {split_value}");
    }

    if options.protect_files {
        protect_outputs(&mut report, &manifest, &spec_folders, context)?;
    }

    if options.in_zip {
        archive_outputs(&mut report, &spec_folders)?;
    }

    log::info!("{report}");
    Ok(Some(report))
}

/// Write one workbook with a sheet per template and close it.
fn write_workbook(
    path_file: &Path,
    templates: &[&dyn SplitTemplate],
    filter: Option<(&str, &str)>,
    sheet_password: Option<&str>,
) -> Result<Vec<String>, BatchError> {
    let err_xlsx = |message: String| BatchError::Xlsx {
        path: path_file.to_path_buf(),
        message,
    };

    let mut writer = XlsxWriter::new(
        path_file.to_path_buf(),
        derive_default_xlsx_formats(),
        derive_default_xlsx_write_options(),
    );
    for (n_idx, template) in templates.iter().enumerate() {
        let df_rows: DataFrame = match filter {
            Some((column, value)) => template.select_rows(column, value)?,
            None => template.data().clone(),
        };
        let mut options_sheet = template.sheet_write_options();
        options_sheet.sheet_password = sheet_password
            .filter(|pw| !pw.is_empty())
            .map(str::to_string);

        let sheet_name = format!("{C_PREFIX_SHEET_NAME}{}", n_idx + 1);
        writer
            .write_sheet_from_dataframe(&df_rows, &sheet_name, &options_sheet)
            .map_err(err_xlsx)?;
    }
    writer.close().map_err(err_xlsx)?;
    log::debug!("Wrote {}", path_file.display());
    Ok(writer.report().warnings)
}

/// Write the manifest and move the workbooks into the protected folder encrypted.
fn protect_outputs(
    report: &mut ReportBatch,
    manifest: &SpecPasswordManifest,
    spec_folders: &SpecOutputFolders,
    context: &SpecBatchContext,
) -> Result<(), BatchError> {
    let path_manifest = context
        .dir_out
        .join(create_manifest_name(&report.project, &report.date));
    manifest.write_csv(&path_manifest)?;
    let dict_passwords = load_password_map(&path_manifest, manifest.records.len())?;

    let report_protect = protect_tree(
        &spec_folders.path_plain,
        &spec_folders.path_protected,
        &dict_passwords,
        &SpecProtectOptions::default(),
    )?;
    log::info!("Password manifest {}:\n{manifest}", path_manifest.display());

    report.files = report
        .files
        .iter()
        .map(|path_file| relocate(path_file, &spec_folders.path_protected))
        .collect();
    report.warnings.extend(report_protect.warnings.iter().cloned());
    report.path_manifest = Some(path_manifest);
    report.report_protect = Some(report_protect);
    Ok(())
}

/// File name -> password as read back from the saved manifest CSV.
fn load_password_map(
    path_manifest: &Path,
    n_records_expected: usize,
) -> Result<BTreeMap<String, String>, BatchError> {
    let manifest_saved = SpecPasswordManifest::read_csv(path_manifest)?;
    if manifest_saved.records.len() != n_records_expected {
        return Err(BatchError::Manifest {
            path: path_manifest.to_path_buf(),
            message: format!(
                "Expected {n_records_expected} records, read {}.",
                manifest_saved.records.len()
            ),
        });
    }
    Ok(manifest_saved.to_password_map())
}

/// Zip each existing output folder; the archive replaces the folder.
fn archive_outputs(
    report: &mut ReportBatch,
    spec_folders: &SpecOutputFolders,
) -> Result<(), BatchError> {
    for path_dir in [&spec_folders.path_plain, &spec_folders.path_protected] {
        if !path_dir.is_dir() {
            let warning = format!("Nothing to archive at {}.", path_dir.display());
            log::warn!("{warning}");
            report.warnings.push(warning);
            continue;
        }
        report.archives.push(archive_tree(path_dir)?);
    }
    Ok(())
}

fn relocate(path_file: &Path, path_dir: &Path) -> PathBuf {
    match path_file.file_name() {
        Some(name) => path_dir.join(name),
        None => path_file.to_path_buf(),
    }
}
