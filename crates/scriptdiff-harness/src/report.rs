//! Report generation for batch runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::verify::VerificationSummary;

/// A conformance report for one fixture directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// `script` or `stack`.
    pub variant: String,
    /// Report mode the run used.
    pub mode: i32,
    /// Library under test.
    pub library: String,
    /// Oracle the library was compared against.
    pub oracle: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Variant: {}\n", self.variant));
        out.push_str(&format!("- Mode: {}\n", self.mode));
        out.push_str(&format!("- Library: {}\n", self.library));
        out.push_str(&format!("- Oracle: {}\n", self.oracle));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n", self.summary.failed));
        out.push_str(&format!("- Errored: {}\n\n", self.summary.errored));

        out.push_str("| Fixture | Status | Detail |\n");
        out.push_str("|---------|--------|--------|\n");
        for r in &self.summary.results {
            let detail = r.error.as_deref().unwrap_or("").replace('|', "\\|");
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                r.case_name,
                r.status.as_str(),
                detail
            ));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Write markdown to `path` and JSON next to it with a `.json`
    /// extension. Returns both paths.
    pub fn write(&self, path: &Path) -> std::io::Result<(PathBuf, PathBuf)> {
        check_report_path(path)?;
        let json_path = path.with_extension("json");
        std::fs::write(path, self.to_markdown())?;
        std::fs::write(&json_path, self.to_json())?;
        Ok((path.to_path_buf(), json_path))
    }
}

/// Reject a markdown path whose `.json` sibling would be the path itself.
pub fn check_report_path(path: &Path) -> std::io::Result<()> {
    if path.with_extension("json") == path {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "report path {} must not end in .json; the JSON report is written beside it",
                path.display()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{CaseStatus, VerificationResult};

    fn report() -> ConformanceReport {
        let results = vec![
            VerificationResult {
                case_name: String::from("p2pkh.fixture"),
                status: CaseStatus::Pass,
                exit_code: Some(1),
                library: Some(String::from("01")),
                oracle: Some(String::from("01")),
                error: None,
                diff: None,
            },
            VerificationResult {
                case_name: String::from("broken.fixture"),
                status: CaseStatus::Error,
                exit_code: None,
                library: None,
                oracle: None,
                error: Some(String::from("malformed | fixture")),
                diff: None,
            },
        ];
        ConformanceReport {
            title: String::from("scriptdiff batch"),
            variant: String::from("stack"),
            mode: 0,
            library: String::from("stub"),
            oracle: String::from("recompute:stub"),
            timestamp: String::from("2026-01-01T00:00:00.000Z"),
            summary: VerificationSummary::from_results(results),
        }
    }

    #[test]
    fn markdown_has_one_row_per_fixture() {
        let md = report().to_markdown();
        assert!(md.starts_with("# scriptdiff batch\n"));
        assert!(md.contains("- Errored: 1\n"));
        assert!(md.contains("| p2pkh.fixture | PASS |  |\n"));
        assert!(md.contains("| broken.fixture | ERROR | malformed \\| fixture |\n"));
    }

    #[test]
    fn json_roundtrips() {
        let json = report().to_json();
        let back: ConformanceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.total, 2);
        assert_eq!(back.summary.results[1].status, CaseStatus::Error);
    }

    #[test]
    fn write_puts_json_next_to_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let (md, json) = report().write(&dir.path().join("report.md")).unwrap();
        assert_eq!(json, dir.path().join("report.json"));
        assert!(std::fs::read_to_string(md).unwrap().contains("PASS"));
        assert!(std::fs::read_to_string(json).unwrap().contains("\"passed\": 1"));
    }

    #[test]
    fn json_report_path_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        let err = report().write(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
        assert!(!path.exists());
        assert!(check_report_path(&dir.path().join("r.md")).is_ok());
        assert!(check_report_path(&dir.path().join("r")).is_ok());
    }
}
