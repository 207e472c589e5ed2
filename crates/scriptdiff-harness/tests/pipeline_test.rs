//! Integration test: single-fixture pipeline with stub library and oracle.
//!
//! Validates that:
//! 1. Agreeing results print both hex lines and propagate the library status.
//! 2. A one-byte mutation in the oracle result diverges exactly once, with
//!    one `differ` marker when the mode asks for it.
//! 3. Fixture and oracle failures surface as distinct harness errors.
//! 4. Every log line the pipeline writes validates against the log contract.
//!
//! Run: cargo test -p scriptdiff-harness --test pipeline_test

use std::cell::Cell;
use std::path::{Path, PathBuf};

use scriptdiff_core::{
    ConsensusError, Variant, Verification, Verifier, VerifierError, VerifyRequest,
};
use scriptdiff_harness::oracle::{FixtureRef, RecomputeOracle};
use scriptdiff_harness::structured_log::{LogEmitter, validate_log_file};
use scriptdiff_harness::{
    Comparison, Console, HarnessError, Oracle, OracleError, OracleResponse, ReportMode,
    RunOutcome, RunRequest, run_fixture,
};

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

struct StubVerifier {
    status: i32,
    stack: Option<Vec<u8>>,
}

impl Verifier for StubVerifier {
    fn verify(
        &self,
        _variant: Variant,
        _request: &VerifyRequest<'_>,
    ) -> Result<Verification, VerifierError> {
        Ok(Verification {
            status: self.status,
            error: ConsensusError::Ok,
            stack: self.stack.clone(),
        })
    }

    fn label(&self) -> String {
        String::from("stub")
    }
}

struct StubOracle {
    raw: Vec<u8>,
    calls: Cell<usize>,
}

impl StubOracle {
    fn answering(raw: &str) -> Self {
        Self {
            raw: raw.as_bytes().to_vec(),
            calls: Cell::new(0),
        }
    }
}

impl Oracle for StubOracle {
    fn query(&mut self, _fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError> {
        self.calls.set(self.calls.get() + 1);
        Ok(OracleResponse {
            raw: self.raw.clone(),
            truncated: false,
        })
    }

    fn label(&self) -> String {
        String::from("socket:stub")
    }
}

struct Captured {
    result: Result<RunOutcome, HarnessError>,
    out: String,
    diag: String,
}

fn run_case<V: Verifier, O: Oracle>(
    variant: Variant,
    fixture: &Path,
    mode: i32,
    verifier: &V,
    oracle: &mut O,
    log: &mut LogEmitter,
) -> Captured {
    let mut out = Vec::new();
    let mut diag = Vec::new();
    let result = run_fixture(
        &RunRequest {
            variant,
            fixture,
            mode: ReportMode(mode),
        },
        verifier,
        oracle,
        &mut Console {
            out: &mut out,
            diag: &mut diag,
        },
        log,
    );
    Captured {
        result,
        out: String::from_utf8(out).unwrap(),
        diag: String::from_utf8(diag).unwrap(),
    }
}

#[test]
fn matching_results_propagate_library_status() {
    let verifier = StubVerifier {
        status: 0,
        stack: Some(vec![0x01, 0xab]),
    };
    let mut oracle = StubOracle::answering("01ab\n");
    let mut log = LogEmitter::to_sink("test", "match");
    let run = run_case(
        Variant::Stack,
        &fixture_path("p2pkh_spend.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );

    let outcome = run.result.unwrap();
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(run.out, "01ab\n01ab\n");
    assert_eq!(
        outcome.comparison,
        Comparison::Match {
            compared: 2,
            oracle_extra: 0
        }
    );
    assert_eq!(oracle.calls.get(), 1);
}

#[test]
fn nonzero_status_is_propagated_on_match() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut oracle = StubOracle::answering("01\n");
    let mut log = LogEmitter::to_sink("test", "status");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    assert_eq!(run.result.unwrap().exit_code, 1);
}

#[test]
fn one_byte_mutation_diverges_once_with_marker() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0xde, 0xad]),
    };
    let mut oracle = StubOracle::answering("deac\n");
    let mut log = LogEmitter::to_sink("test", "diverge");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        2,
        &verifier,
        &mut oracle,
        &mut log,
    );

    let err = run.result.unwrap_err();
    assert!(err.is_divergence(), "{err}");
    match err {
        HarnessError::ResultDivergence {
            offset,
            library,
            oracle,
        } => {
            assert_eq!(offset, 1);
            assert_eq!(library, "dead");
            assert_eq!(oracle, "deac");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(run.out, "dead\ndeac\ndiffer\n");
    assert_eq!(run.out.matches("differ").count(), 1);
    assert!(run.diag.contains("@@ byte 1"));
}

#[test]
fn divergence_without_marker_mode_prints_no_marker() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x00]),
    };
    let mut oracle = StubOracle::answering("01\n");
    let mut log = LogEmitter::to_sink("test", "quiet");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    assert!(run.result.unwrap_err().is_divergence());
    assert_eq!(run.out, "00\n01\n");
}

#[test]
fn short_oracle_result_diverges() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01, 0x02]),
    };
    let mut oracle = StubOracle::answering("01\n");
    let mut log = LogEmitter::to_sink("test", "short");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    match run.result.unwrap_err() {
        HarnessError::ResultDivergence { offset, .. } => assert_eq!(offset, 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn extra_oracle_bytes_still_match() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut oracle = StubOracle::answering("01ffff\n");
    let mut log = LogEmitter::to_sink("test", "extra");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    assert_eq!(
        run.result.unwrap().comparison,
        Comparison::Match {
            compared: 1,
            oracle_extra: 2
        }
    );
}

#[test]
fn input_and_error_modes_write_diagnostics_not_stdout() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut log = LogEmitter::to_sink("test", "modes");

    let mut oracle = StubOracle::answering("01\n");
    let inputs = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        1,
        &verifier,
        &mut oracle,
        &mut log,
    );
    assert_eq!(inputs.out, "01\n01\n");
    assert!(inputs.diag.contains("scriptPubKey: 51\n"));
    assert!(inputs.diag.contains("nIn: 0\n"));

    let mut oracle = StubOracle::answering("01\n");
    let errors = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        4,
        &verifier,
        &mut oracle,
        &mut log,
    );
    assert_eq!(errors.out, "01\n01\n");
    assert_eq!(errors.diag, "error: ERR_OK\n");
}

#[test]
fn missing_fixture_fails_before_library_and_oracle() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut oracle = StubOracle::answering("01\n");
    let mut log = LogEmitter::to_sink("test", "missing");
    let dir = tempfile::tempdir().unwrap();
    let run = run_case(
        Variant::Stack,
        &dir.path().join("absent.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    let err = run.result.unwrap_err();
    assert!(matches!(err, HarnessError::FixtureRead { .. }), "{err}");
    assert_eq!(oracle.calls.get(), 0);
    assert!(run.out.is_empty());
}

#[test]
fn malformed_fixtures_are_reported_explicitly() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        ("odd.fixture", "515\n00\n0\n0\n"),
        ("nonhex.fixture", "5z\n00\n0\n0\n"),
        ("short.fixture", "51\n00\n"),
        ("decimal.fixture", "51\n00\nzero\n0\n"),
    ];
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut log = LogEmitter::to_sink("test", "malformed");
    for (name, text) in cases {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        let mut oracle = StubOracle::answering("01\n");
        let run = run_case(Variant::Stack, &path, 0, &verifier, &mut oracle, &mut log);
        let err = run.result.unwrap_err();
        assert!(
            matches!(err, HarnessError::MalformedFixture(_)),
            "{name}: {err}"
        );
        assert_eq!(oracle.calls.get(), 0, "{name}");
    }
}

#[test]
fn malformed_oracle_response_is_its_own_error() {
    let verifier = StubVerifier {
        status: 1,
        stack: Some(vec![0x01]),
    };
    let mut oracle = StubOracle::answering("0x01\n");
    let mut log = LogEmitter::to_sink("test", "bad-oracle");
    let run = run_case(
        Variant::Stack,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    let err = run.result.unwrap_err();
    assert_eq!(err.kind(), "malformed_oracle_response", "{err}");
    assert!(run.out.is_empty());
}

#[test]
fn script_variant_compares_against_recomputation() {
    let verifier = StubVerifier {
        status: 1,
        stack: None,
    };
    let mut oracle = RecomputeOracle::new(&verifier, Variant::Script);
    let mut log = LogEmitter::to_sink("test", "script");
    let run = run_case(
        Variant::Script,
        &fixture_path("op_true.fixture"),
        0,
        &verifier,
        &mut oracle,
        &mut log,
    );
    let outcome = run.result.unwrap();
    assert_eq!(outcome.exit_code, 1);
    // status 1 and ERR_OK (0), both little-endian i32.
    assert_eq!(run.out, "0100000000000000\n0100000000000000\n");
}

#[test]
fn pipeline_log_lines_validate() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("run.jsonl");
    {
        let mut log = LogEmitter::to_file(&log_path, "test", "logs").unwrap();
        let verifier = StubVerifier {
            status: 1,
            stack: Some(vec![0x01]),
        };
        let mut oracle = StubOracle::answering("01\n");
        let ok = run_case(
            Variant::Stack,
            &fixture_path("op_true.fixture"),
            0,
            &verifier,
            &mut oracle,
            &mut log,
        );
        assert!(ok.result.is_ok());

        let mut oracle = StubOracle::answering("02\n");
        let bad = run_case(
            Variant::Stack,
            &fixture_path("op_true.fixture"),
            0,
            &verifier,
            &mut oracle,
            &mut log,
        );
        assert!(bad.result.unwrap_err().is_divergence());
    }

    let (lines, errors) = validate_log_file(&log_path).unwrap();
    assert!(errors.is_empty(), "{errors:?}");
    assert!(lines >= 4, "expected several log lines, got {lines}");

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.contains("\"event\":\"fixture_passed\""));
    assert!(content.contains("\"event\":\"result_divergence\""));
    assert!(content.contains("\"transport\":\"socket\""));
}
