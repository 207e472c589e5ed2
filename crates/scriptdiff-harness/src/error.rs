//! Harness-level error taxonomy.

use std::path::PathBuf;
use std::time::Duration;

use scriptdiff_core::{FixtureError, VerifierError};
use thiserror::Error;

use crate::oracle::OracleError;

/// Every failure a single fixture run can end in.
///
/// Nothing here is retried. [`HarnessError::ResultDivergence`] is not an
/// operational failure but the signal the harness exists to raise; callers
/// check [`HarnessError::is_divergence`] to route it separately.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("fixture read failed for {}: {source}", path.display())]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed fixture: {0}")]
    MalformedFixture(FixtureError),
    #[error("malformed oracle response from {endpoint}: {source}")]
    MalformedOracleResponse {
        endpoint: String,
        #[source]
        source: FixtureError,
    },
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(OracleError),
    #[error("oracle {endpoint} timed out after {timeout:?}")]
    OracleTimeout { endpoint: String, timeout: Duration },
    #[error("consensus library call failed: {0}")]
    Verifier(#[from] VerifierError),
    #[error("result divergence at byte {offset}: library={library} oracle={oracle}")]
    ResultDivergence {
        offset: usize,
        library: String,
        oracle: String,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    #[must_use]
    pub fn is_divergence(&self) -> bool {
        matches!(self, Self::ResultDivergence { .. })
    }

    /// Stable snake_case name for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FixtureRead { .. } => "fixture_read",
            Self::MalformedFixture(_) => "malformed_fixture",
            Self::MalformedOracleResponse { .. } => "malformed_oracle_response",
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::OracleTimeout { .. } => "oracle_timeout",
            Self::Verifier(_) => "verifier",
            Self::ResultDivergence { .. } => "result_divergence",
            Self::Io(_) => "io",
        }
    }
}

impl From<FixtureError> for HarnessError {
    fn from(err: FixtureError) -> Self {
        match err {
            FixtureError::Read { path, source } => Self::FixtureRead { path, source },
            other => Self::MalformedFixture(other),
        }
    }
}

impl From<OracleError> for HarnessError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Timeout { endpoint, timeout } => Self::OracleTimeout { endpoint, timeout },
            OracleError::Recompute(inner) => Self::Verifier(inner),
            other => Self::OracleUnavailable(other),
        }
    }
}
