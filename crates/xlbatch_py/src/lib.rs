use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use pyo3::exceptions::{PyOSError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyBytes, PyList};
use xlbatch::{
    BatchError, FrameTemplate, ReportBatch, SpecBatchContext, SpecBatchOptions, SplitTemplate,
    create_xl_file_multiple_templates,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "xlbatch.create_xl_file_multiple_temp.v1";
const C_BRIDGE_TRANSPORT: &str = "polars_ipc";

#[pyclass(name = "ReportBatch")]
#[derive(Debug, Clone)]
struct PyReportBatch {
    #[pyo3(get)]
    project: String,
    #[pyo3(get)]
    date: String,
    #[pyo3(get)]
    files: Vec<String>,
    #[pyo3(get)]
    path_manifest: Option<String>,
    #[pyo3(get)]
    archives: Vec<String>,
    #[pyo3(get)]
    warnings: Vec<String>,
    dict_counts: BTreeMap<String, u64>,
    c_summary: String,
}

impl From<ReportBatch> for PyReportBatch {
    fn from(report: ReportBatch) -> Self {
        let to_text = |path: &std::path::PathBuf| path.to_string_lossy().to_string();
        Self {
            dict_counts: report.to_dict(),
            c_summary: report.to_string(),
            files: report.files.iter().map(to_text).collect(),
            path_manifest: report.path_manifest.as_ref().map(to_text),
            archives: report.archives.iter().map(to_text).collect(),
            project: report.project,
            date: report.date,
            warnings: report.warnings,
        }
    }
}

#[pymethods]
impl PyReportBatch {
    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.dict_counts.clone()
    }

    fn __str__(&self) -> String {
        self.c_summary.clone()
    }
}

fn map_batch_error(err: BatchError) -> PyErr {
    match err {
        BatchError::SplitRangeNotList(_) => PyTypeError::new_err(err.to_string()),
        BatchError::MissingSplitColumn
        | BatchError::InvalidProjectName(_)
        | BatchError::Job { .. }
        | BatchError::Template(_) => PyValueError::new_err(err.to_string()),
        BatchError::Io { .. }
        | BatchError::Xlsx { .. }
        | BatchError::Protect(_)
        | BatchError::Archive(_)
        | BatchError::Manifest { .. } => PyOSError::new_err(err.to_string()),
    }
}

/// `(ipc_bytes, main_sheet)` tuples into templates.
fn parse_template_list(template_list: &Bound<'_, PyAny>) -> PyResult<Vec<FrameTemplate>> {
    let mut l_templates = Vec::new();
    for item in template_list.try_iter()? {
        let (obj_bytes, main_sheet): (Bound<'_, PyBytes>, String) = item?.extract()?;
        let template = FrameTemplate::from_ipc_bytes(obj_bytes.as_bytes(), main_sheet)
            .map_err(|err| PyValueError::new_err(err.to_string()))?;
        l_templates.push(template);
    }
    Ok(l_templates)
}

fn parse_split_by_range(
    split_by_range: Option<&Bound<'_, PyAny>>,
) -> PyResult<Option<Vec<String>>> {
    let Some(obj) = split_by_range else {
        return Ok(None);
    };
    if obj.is_none() {
        return Ok(None);
    }
    if !obj.is_instance_of::<PyList>() {
        return Err(PyTypeError::new_err(format!("{} is not a list", obj.repr()?)));
    }
    obj.extract::<Vec<String>>()
        .map(Some)
        .map_err(|err| PyTypeError::new_err(format!("split_by_range items must be str: {err}")))
}

fn parse_today(today: Option<&str>) -> PyResult<NaiveDate> {
    match today {
        None => Ok(Local::now().date_naive()),
        Some(value) => NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|err| {
            PyValueError::new_err(format!(
                "Invalid `today`: expected YYYYMMDD, got {value:?}: {err}"
            ))
        }),
    }
}

#[pyfunction(name = "create_xl_file_multiple_temp")]
#[pyo3(signature = (
    *,
    project_name,
    template_list,
    split_by_value,
    split_by = None,
    split_by_range = None,
    batch = 1,
    sheet_password = None,
    workbook_password = None,
    protect_files = false,
    random_password = false,
    in_zip = false,
    dir_out = ".",
    today = None
))]
#[allow(clippy::too_many_arguments)]
fn create_xl_file_multiple_temp_py(
    py: Python<'_>,
    project_name: String,
    template_list: &Bound<'_, PyAny>,
    split_by_value: bool,
    split_by: Option<String>,
    split_by_range: Option<&Bound<'_, PyAny>>,
    batch: u32,
    sheet_password: Option<String>,
    workbook_password: Option<String>,
    protect_files: bool,
    random_password: bool,
    in_zip: bool,
    dir_out: &str,
    today: Option<&str>,
) -> PyResult<Option<PyReportBatch>> {
    let options = SpecBatchOptions {
        split_by_value,
        split_by,
        split_by_range: parse_split_by_range(split_by_range)?,
        batch,
        sheet_password,
        workbook_password,
        protect_files,
        random_password,
        in_zip,
    };
    let context = SpecBatchContext::new(dir_out, parse_today(today)?);
    let l_templates = parse_template_list(template_list)?;

    let report_batch = py.allow_threads(|| {
        let l_template_refs = l_templates
            .iter()
            .map(|template| template as &dyn SplitTemplate)
            .collect::<Vec<_>>();
        create_xl_file_multiple_templates(&project_name, &l_template_refs, &options, &context)
    });
    let report_batch = report_batch.map_err(map_batch_error)?;
    Ok(report_batch.map(PyReportBatch::from))
}

#[pymodule]
fn _xlbatch_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportBatch>()?;
    module.add_function(wrap_pyfunction!(create_xl_file_multiple_temp_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}

