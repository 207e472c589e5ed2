//! Per-fixture verdicts and their aggregate.

use serde::{Deserialize, Serialize};

/// Verdict for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    /// Library and oracle agreed.
    Pass,
    /// Library and oracle diverged.
    Fail,
    /// The run never reached a comparison.
    Error,
}

impl CaseStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

/// Result of verifying a single fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Fixture file name.
    pub case_name: String,
    pub status: CaseStatus,
    /// Library status code, when the library was reached and agreed.
    pub exit_code: Option<i32>,
    /// Library result, hex.
    pub library: Option<String>,
    /// Oracle result, hex.
    pub oracle: Option<String>,
    /// Error message for `ERROR`, divergence message for `FAIL`.
    pub error: Option<String>,
    /// Hex diff around the first divergence.
    pub diff: Option<String>,
}

impl VerificationResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Pass
    }
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        let passed = count(CaseStatus::Pass);
        let failed = count(CaseStatus::Fail);
        let errored = count(CaseStatus::Error);
        Self {
            total: results.len(),
            passed,
            failed,
            errored,
            results,
        }
    }

    /// Returns true if every fixture passed. An empty run passes.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}
