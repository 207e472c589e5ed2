//! Batch execution over a fixture directory.

use std::path::{Path, PathBuf};

use scriptdiff_core::{Variant, Verifier};

use crate::error::HarnessError;
use crate::mode::ReportMode;
use crate::oracle::{Oracle, RecomputeOracle, build_oracle, select_transport};
use crate::pipeline::{Console, HarnessConfig, RunRequest, run_fixture};
use crate::structured_log::LogEmitter;
use crate::verify::{CaseStatus, VerificationResult};

/// Runs every fixture in a directory and collects verdicts.
///
/// Divergences become `FAIL` rows instead of aborting the process.
pub struct TestRunner {
    pub variant: Variant,
    pub mode: ReportMode,
    /// Socket path for the stack variant outside modes 1 and 3.
    pub endpoint: Option<PathBuf>,
    pub config: HarnessConfig,
}

impl TestRunner {
    #[must_use]
    pub fn new(variant: Variant, mode: ReportMode, config: HarnessConfig) -> Self {
        Self {
            variant,
            mode,
            endpoint: None,
            config,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Option<PathBuf>) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// The oracle this runner compares against.
    pub fn oracle<'v, V: Verifier>(
        &self,
        verifier: &'v V,
    ) -> Result<Box<dyn Oracle + 'v>, HarnessError> {
        match self.variant {
            Variant::Script => Ok(Box::new(RecomputeOracle::new(verifier, Variant::Script))),
            Variant::Stack => {
                let choice = select_transport(self.mode, self.endpoint.as_deref())?;
                Ok(build_oracle(&choice, &self.config)?)
            }
        }
    }

    /// Run all fixtures in `dir`, in file-name order.
    ///
    /// Only directory-level problems (unreadable directory, no usable
    /// oracle) fail the whole run; per-fixture failures become rows.
    pub fn run<V: Verifier>(
        &self,
        dir: &Path,
        verifier: &V,
        log: &mut LogEmitter,
    ) -> Result<Vec<VerificationResult>, HarnessError> {
        let mut oracle = self.oracle(verifier)?;
        let fixtures = list_fixtures(dir)?;
        Ok(fixtures
            .iter()
            .map(|path| self.run_case(path, verifier, oracle.as_mut(), log))
            .collect())
    }

    fn run_case<V: Verifier, O: Oracle + ?Sized>(
        &self,
        path: &Path,
        verifier: &V,
        oracle: &mut O,
        log: &mut LogEmitter,
    ) -> VerificationResult {
        let request = RunRequest {
            variant: self.variant,
            fixture: path,
            mode: self.mode,
        };
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let result = run_fixture(
            &request,
            verifier,
            oracle,
            &mut Console {
                out: &mut out,
                diag: &mut diag,
            },
            log,
        );
        let case_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        match result {
            Ok(outcome) => VerificationResult {
                case_name,
                status: CaseStatus::Pass,
                exit_code: Some(outcome.exit_code),
                library: Some(outcome.library_hex),
                oracle: Some(outcome.oracle_hex),
                error: None,
                diff: None,
            },
            Err(HarnessError::ResultDivergence {
                offset,
                library,
                oracle,
            }) => VerificationResult {
                case_name,
                status: CaseStatus::Fail,
                exit_code: None,
                library: Some(library),
                oracle: Some(oracle),
                error: Some(format!("divergence at byte {offset}")),
                diff: Some(String::from_utf8_lossy(&diag).into_owned()),
            },
            Err(err) => VerificationResult {
                case_name,
                status: CaseStatus::Error,
                exit_code: None,
                library: None,
                oracle: None,
                error: Some(err.to_string()),
                diff: None,
            },
        }
    }
}

/// Regular, non-hidden files in `dir`, sorted by name.
pub fn list_fixtures(dir: &Path) -> Result<Vec<PathBuf>, HarnessError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_visible_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.fixture"), "").unwrap();
        std::fs::write(dir.path().join("a.fixture"), "").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let names: Vec<_> = list_fixtures(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.fixture", "b.fixture"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_fixtures(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn stack_runner_without_endpoint_cannot_build_oracle() {
        struct Never;
        impl Verifier for Never {
            fn verify(
                &self,
                _: Variant,
                _: &scriptdiff_core::VerifyRequest<'_>,
            ) -> Result<scriptdiff_core::Verification, scriptdiff_core::VerifierError> {
                Err(scriptdiff_core::VerifierError::NotConfigured)
            }
            fn label(&self) -> String {
                String::from("never")
            }
        }
        let runner = TestRunner::new(Variant::Stack, ReportMode(0), HarnessConfig::default());
        let err = runner.oracle(&Never).err().unwrap();
        assert_eq!(err.kind(), "oracle_unavailable");
    }
}
