use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::df;
use polars::prelude::{DataFrame, IpcWriter, SerWriter};
use xlbatch::{
    BatchError, FrameTemplate, SpecBatchContext, SpecBatchOptions, SpecJob, SpecPasswordManifest,
    SplitTemplate, create_xl_file_multiple_templates,
};
use zip::ZipArchive;

const TUP_OLE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

fn context(path_dir: &Path) -> SpecBatchContext {
    SpecBatchContext::new(path_dir, NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"))
}

fn orders() -> DataFrame {
    df!(
        "Region" => ["East", "West", "East", "West", "East"],
        "Customer" => ["a", "b", "c", "d", "e"],
        "Amount" => [10i64, 20, 30, 40, 50],
    )
    .expect("df")
}

fn region_options(l_values: &[&str]) -> SpecBatchOptions {
    SpecBatchOptions {
        split_by_value: true,
        split_by: Some("Region".to_string()),
        split_by_range: Some(l_values.iter().map(|v| v.to_string()).collect()),
        ..SpecBatchOptions::default()
    }
}

fn read_part(path_file: &Path, name_part: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path_file).expect("open")).expect("zip");
    let mut c_xml = String::new();
    archive
        .by_name(name_part)
        .expect("part")
        .read_to_string(&mut c_xml)
        .expect("read part");
    c_xml
}

fn list_names(path_dir: &Path) -> BTreeSet<String> {
    fs::read_dir(path_dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn acme_region_split_writes_one_workbook_per_region() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template = FrameTemplate::new(orders(), "Orders");

    let report = create_xl_file_multiple_templates(
        "Acme",
        &[&template],
        &region_options(&["East", "West"]),
        &context(tmp.path()),
    )
    .expect("batch")
    .expect("report");

    let dir_plain = tmp.path().join("Acme-20240101");
    assert_eq!(
        list_names(&dir_plain),
        BTreeSet::from([
            "AcmeID1001-East-20240101.xlsx".to_string(),
            "AcmeID1002-West-20240101.xlsx".to_string(),
        ])
    );
    assert_eq!(report.files.len(), 2);
    assert!(report.path_manifest.is_none());

    let path_east = dir_plain.join("AcmeID1001-East-20240101.xlsx");
    let c_workbook = read_part(&path_east, "xl/workbook.xml");
    assert!(c_workbook.contains("name=\"Sheet1\""));
    assert!(!c_workbook.contains("workbookProtection"));

    let c_sheet = read_part(&path_east, "xl/worksheets/sheet1.xml");
    assert_eq!(c_sheet.matches("<row ").count(), 4);
    let c_strings = read_part(&path_east, "xl/sharedStrings.xml");
    assert!(c_strings.contains(">East<"));
    assert!(!c_strings.contains(">West<"));
}

#[test]
fn protect_files_moves_encrypted_workbooks_and_writes_manifest() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template = FrameTemplate::new(orders(), "Orders");
    let options = SpecBatchOptions {
        protect_files: true,
        random_password: false,
        ..region_options(&["East", "West"])
    };

    let report = create_xl_file_multiple_templates(
        "Acme",
        &[&template],
        &options,
        &context(tmp.path()),
    )
    .expect("batch")
    .expect("report");

    let path_manifest = tmp.path().join("Acme-PasswordMaster-20240101.csv");
    assert_eq!(report.path_manifest.as_deref(), Some(path_manifest.as_path()));
    let c_csv = fs::read_to_string(&path_manifest).expect("manifest");
    assert!(c_csv.starts_with("File ID,Filename,Region,Password\n"));

    let manifest = SpecPasswordManifest::read_csv(&path_manifest).expect("read manifest");
    assert_eq!(manifest.records.len(), 2);
    let set_pairs = manifest
        .records
        .iter()
        .map(|record| (record.file_id.clone(), record.file_name.clone()))
        .collect::<BTreeSet<_>>();
    assert_eq!(set_pairs.len(), 2);

    let dir_plain = tmp.path().join("Acme-20240101");
    let dir_protected = tmp.path().join("Acme-20240101-Protected");
    assert!(list_names(&dir_plain).is_empty());
    for record in &manifest.records {
        let v_bytes = fs::read(dir_protected.join(&record.file_name)).expect("protected file");
        assert_eq!(&v_bytes[..8], &TUP_OLE_SIGNATURE);
    }
    assert!(report.files.iter().all(|path| path.starts_with(&dir_protected)));
    assert_eq!(
        report.report_protect.as_ref().map(|r| r.cnt_protected),
        Some(2)
    );
}

#[test]
fn deterministic_passwords_repeat_across_runs() {
    let options = SpecBatchOptions {
        protect_files: true,
        ..region_options(&["West", "East"])
    };
    let template = FrameTemplate::new(orders(), "Orders");

    let l_manifests = (0..2)
        .map(|_| {
            let tmp = tempfile::tempdir().expect("tempdir");
            create_xl_file_multiple_templates("Acme", &[&template], &options, &context(tmp.path()))
                .expect("batch");
            SpecPasswordManifest::read_csv(&tmp.path().join("Acme-PasswordMaster-20240101.csv"))
                .expect("manifest")
        })
        .collect::<Vec<_>>();
    assert_eq!(l_manifests[0], l_manifests[1]);
}

#[test]
fn in_zip_replaces_both_folders_with_archives() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template = FrameTemplate::new(orders(), "Orders");
    let options = SpecBatchOptions {
        protect_files: true,
        in_zip: true,
        ..region_options(&["East", "West"])
    };

    let report = create_xl_file_multiple_templates(
        "Acme",
        &[&template],
        &options,
        &context(tmp.path()),
    )
    .expect("batch")
    .expect("report");

    let dir_plain = tmp.path().join("Acme-20240101");
    let dir_protected = tmp.path().join("Acme-20240101-Protected");
    assert!(!dir_plain.exists());
    assert!(!dir_protected.exists());

    let path_zip_plain = tmp.path().join("Acme-20240101.zip");
    let path_zip_protected = tmp.path().join("Acme-20240101-Protected.zip");
    assert_eq!(report.archives, vec![path_zip_plain.clone(), path_zip_protected.clone()]);

    let archive = ZipArchive::new(File::open(&path_zip_protected).expect("open")).expect("zip");
    let set_names = archive.file_names().map(str::to_string).collect::<BTreeSet<_>>();
    assert_eq!(
        set_names,
        BTreeSet::from([
            "AcmeID1001-East-20240101.xlsx".to_string(),
            "AcmeID1002-West-20240101.xlsx".to_string(),
        ])
    );
    assert!(path_zip_plain.is_file());
}

#[test]
fn in_zip_without_protection_archives_plain_folder() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template = FrameTemplate::new(orders(), "Orders");
    let options = SpecBatchOptions {
        in_zip: true,
        ..region_options(&["East", "West"])
    };

    let report = create_xl_file_multiple_templates(
        "Acme",
        &[&template],
        &options,
        &context(tmp.path()),
    )
    .expect("batch")
    .expect("report");

    let path_zip_plain = tmp.path().join("Acme-20240101.zip");
    assert_eq!(report.archives, vec![path_zip_plain.clone()]);
    assert!(!tmp.path().join("Acme-20240101").exists());
    let archive = ZipArchive::new(File::open(&path_zip_plain).expect("open")).expect("zip");
    assert_eq!(archive.len(), 2);
    assert!(report.warnings.iter().any(|w| w.contains("Nothing to archive")));
}

#[test]
fn punctuation_is_stripped_from_file_names() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let df = df!("Supplier" => ["Acme, Inc.", "Beta/Gamma"]).expect("df");
    let template = FrameTemplate::new(df, "Suppliers");
    let options = SpecBatchOptions {
        split_by_value: true,
        split_by: Some("Supplier".to_string()),
        split_by_range: Some(vec!["Acme, Inc.".to_string(), "Beta/Gamma".to_string()]),
        ..SpecBatchOptions::default()
    };

    create_xl_file_multiple_templates("Acme", &[&template], &options, &context(tmp.path()))
        .expect("batch");

    assert_eq!(
        list_names(&tmp.path().join("Acme-20240101")),
        BTreeSet::from([
            "AcmeID1001-Acme Inc-20240101.xlsx".to_string(),
            "AcmeID1002-BetaGamma-20240101.xlsx".to_string(),
        ])
    );
}

#[test]
fn same_inputs_produce_same_names() {
    let template = FrameTemplate::new(orders(), "Orders");
    let options = SpecBatchOptions {
        batch: 7,
        ..region_options(&["West", "East", "East"])
    };

    let l_runs = (0..2)
        .map(|_| {
            let tmp = tempfile::tempdir().expect("tempdir");
            create_xl_file_multiple_templates("Acme", &[&template], &options, &context(tmp.path()))
                .expect("batch")
                .expect("report")
                .files
                .iter()
                .map(|path| path.file_name().expect("name").to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    assert_eq!(l_runs[0], l_runs[1]);
    assert_eq!(
        l_runs[0],
        vec![
            "AcmeID7001-East-20240101.xlsx".to_string(),
            "AcmeID7002-West-20240101.xlsx".to_string(),
        ]
    );
}

#[test]
fn multiple_templates_with_sheet_and_workbook_passwords() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template_orders = FrameTemplate::new(orders(), "Orders");
    let template_contacts = FrameTemplate::new(
        df!("Region" => ["East", "West"], "Contact" => ["x@e", "y@w"]).expect("df"),
        "Contacts",
    );
    let options = SpecBatchOptions {
        sheet_password: Some("sheet-pw".to_string()),
        workbook_password: Some("password".to_string()),
        ..region_options(&["East"])
    };
    let l_templates: Vec<&dyn SplitTemplate> = vec![&template_orders, &template_contacts];

    let report =
        create_xl_file_multiple_templates("Acme", &l_templates, &options, &context(tmp.path()))
            .expect("batch")
            .expect("report");

    let path_file = &report.files[0];
    let c_workbook = read_part(path_file, "xl/workbook.xml");
    assert!(c_workbook.contains("name=\"Sheet1\""));
    assert!(c_workbook.contains("name=\"Sheet2\""));
    assert!(c_workbook.contains("workbookPassword=\"83AF\""));
    assert!(read_part(path_file, "xl/worksheets/sheet1.xml").contains("<sheetProtection"));
    assert!(read_part(path_file, "xl/worksheets/sheet2.xml").contains("<sheetProtection"));
}

#[test]
fn without_value_filter_every_workbook_holds_all_rows() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let template = FrameTemplate::new(orders(), "Orders");
    let options = SpecBatchOptions {
        split_by_value: false,
        split_by: None,
        split_by_range: Some(vec!["North".to_string(), "South".to_string()]),
        ..SpecBatchOptions::default()
    };

    let report = create_xl_file_multiple_templates(
        "Acme",
        &[&template],
        &options,
        &context(tmp.path()),
    )
    .expect("batch")
    .expect("report");

    assert_eq!(report.files.len(), 2);
    for path_file in &report.files {
        let c_sheet = read_part(path_file, "xl/worksheets/sheet1.xml");
        assert_eq!(c_sheet.matches("<row ").count(), 6);
    }
}

#[test]
fn job_file_runs_end_to_end() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut df = orders();
    let mut file_ipc = File::create(tmp.path().join("orders.arrow")).expect("create");
    IpcWriter::new(&mut file_ipc).finish(&mut df).expect("ipc");

    let path_job = tmp.path().join("job.json");
    fs::write(
        &path_job,
        r#"{
            "project_name": "Acme",
            "templates": [{"path": "orders.arrow", "main_sheet": "Orders"}],
            "split_by_value": true,
            "split_by": "Region",
            "split_by_range": ["East", "West"],
            "dir_out": "out"
        }"#,
    )
    .expect("write job");

    let job = SpecJob::load(&path_job).expect("job");
    let report = job
        .run(NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"), None)
        .expect("run")
        .expect("report");
    let l_expected: Vec<PathBuf> = ["AcmeID1001-East-20240101.xlsx", "AcmeID1002-West-20240101.xlsx"]
        .iter()
        .map(|name| tmp.path().join("out").join("Acme-20240101").join(name))
        .collect();
    assert_eq!(report.files, l_expected);
}

#[test]
fn job_with_scalar_split_range_creates_nothing() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path_job = tmp.path().join("job.json");
    fs::write(
        &path_job,
        r#"{"project_name": "Acme", "templates": [], "split_by": "Region", "split_by_range": "East"}"#,
    )
    .expect("write job");

    let err = SpecJob::load(&path_job).expect_err("not a list");
    assert!(matches!(err, BatchError::SplitRangeNotList(_)));
    assert_eq!(list_names(tmp.path()), BTreeSet::from(["job.json".to_string()]));
}
