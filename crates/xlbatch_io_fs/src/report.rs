//! Protect report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Aggregate counters and diagnostics for one `protect_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportProtect {
    /// Files found in the source directory.
    pub cnt_scanned: u64,
    /// Files that passed the include/exclude filters.
    pub cnt_matched: u64,
    /// Files encrypted into the destination.
    pub cnt_protected: u64,
    /// Matched files left untouched (no password listed).
    pub cnt_skipped: u64,
    /// Encrypted output files, in processing order.
    pub files: Vec<PathBuf>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ReportProtect {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_protected".to_string(), self.cnt_protected);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} matched={} protected={} skipped={} warnings={}",
            self.cnt_scanned,
            self.cnt_matched,
            self.cnt_protected,
            self.cnt_skipped,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportProtect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[PROTECT]"))
    }
}

/// Mutable accumulator for protect statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportProtectBuilder {
    report: ReportProtect,
}

impl ReportProtectBuilder {
    /// Increment scanned count by one.
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    /// Increment matched count by one.
    pub fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    /// Record one encrypted output file.
    pub fn add_protected(&mut self, path_file_dst: PathBuf) {
        self.report.cnt_protected += 1;
        self.report.files.push(path_file_dst);
    }

    /// Record one skipped file with the reason.
    pub fn add_skipped(&mut self, warning: String) {
        self.report.cnt_skipped += 1;
        self.add_warning(warning);
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportProtect {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportProtect, ReportProtectBuilder};

    #[test]
    fn report_protect_to_dict_and_format() {
        let report = ReportProtect {
            cnt_scanned: 4,
            cnt_matched: 3,
            cnt_protected: 2,
            cnt_skipped: 1,
            files: vec![],
            warnings: vec!["w".to_string()],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 4);
        assert_eq!(dict_counts["cnt_protected"], 2);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[PROTECT]");
        assert_eq!(
            txt,
            "[PROTECT] scanned=4 matched=3 protected=2 skipped=1 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_counts_skips_as_warnings() {
        let mut builder = ReportProtectBuilder::default();
        builder.add_scanned();
        builder.add_matched();
        builder.add_skipped("no password for a.xlsx".to_string());
        let report = builder.build();
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.warnings, vec!["no password for a.xlsx".to_string()]);
    }
}
