//! One fixture, end to end.
//!
//! Stages run strictly in order: read fixture, call library, query oracle,
//! compare, report. Any failure short-circuits with a [`HarnessError`]; a
//! divergence is reported as [`HarnessError::ResultDivergence`] after both
//! result lines (and the optional `differ` marker) have been written and
//! flushed.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use scriptdiff_core::{
    ConsensusFlags, FixtureRecord, ORACLE_READ_CAP, Variant, Verification, Verifier,
    VerifyRequest, encode_hex,
};
use serde_json::json;

use crate::compare::{Comparison, compare_results, decode_oracle_result};
use crate::diff::render_diff;
use crate::error::HarnessError;
use crate::mode::ReportMode;
use crate::oracle::{FixtureRef, Oracle};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome, Stage};

/// Resolved oracle settings.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub oracle_program: String,
    pub oracle_args: Vec<String>,
    pub oracle_timeout: Duration,
    pub read_cap: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            oracle_program: String::from("node"),
            oracle_args: vec![String::from("valid_script_stack.js")],
            oracle_timeout: Duration::from_secs(10),
            read_cap: ORACLE_READ_CAP,
        }
    }
}

impl HarnessConfig {
    /// Replace the helper command. An empty `args` keeps the program bare.
    #[must_use]
    pub fn with_oracle_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.oracle_program = program.into();
        self.oracle_args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }
}

/// What to run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub variant: Variant,
    pub fixture: &'a Path,
    pub mode: ReportMode,
}

/// Where a run writes.
///
/// `out` carries only the result encodings and the `differ` marker;
/// decoded inputs, error classifications and diffs go to `diag`.
pub struct Console<'a> {
    pub out: &'a mut dyn Write,
    pub diag: &'a mut dyn Write,
}

/// A run whose library and oracle results agreed.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The library's return code, used as the process exit status.
    pub exit_code: i32,
    pub verification: Verification,
    pub library_hex: String,
    pub oracle_hex: String,
    pub comparison: Comparison,
}

/// Run one fixture through the library and the oracle and compare.
pub fn run_fixture<V, O>(
    request: &RunRequest<'_>,
    verifier: &V,
    oracle: &mut O,
    console: &mut Console<'_>,
    log: &mut LogEmitter,
) -> Result<RunOutcome, HarnessError>
where
    V: Verifier + ?Sized,
    O: Oracle + ?Sized,
{
    let started = Instant::now();
    let transport = transport_name(&oracle.label());
    let mut stage = Stage::ReadFixture;
    let result = run_stages(request, verifier, oracle, console, log, &transport, &mut stage);
    let base = base_entry(request, &transport, elapsed_ms(started));

    match &result {
        Ok(outcome) => {
            log.emit_entry(
                base(LogLevel::Info, "fixture_passed")
                    .with_stage(Stage::Report)
                    .with_outcome(Outcome::Pass)
                    .with_exit_code(outcome.exit_code),
            )?;
        }
        // Logging failures here are dropped; the run error takes precedence.
        Err(err) if err.is_divergence() => {
            let _ = log.emit_entry(
                base(LogLevel::Error, "result_divergence")
                    .with_stage(Stage::Compare)
                    .with_outcome(Outcome::Fail)
                    .with_details(json!({ "message": err.to_string() })),
            );
        }
        Err(err) => {
            let outcome = if matches!(err, HarnessError::OracleTimeout { .. }) {
                Outcome::Timeout
            } else {
                Outcome::Error
            };
            let _ = log.emit_entry(
                base(LogLevel::Error, "fixture_error")
                    .with_stage(stage)
                    .with_outcome(outcome)
                    .with_details(json!({ "kind": err.kind(), "message": err.to_string() })),
            );
        }
    }
    let _ = log.flush();
    result
}

fn run_stages<V, O>(
    request: &RunRequest<'_>,
    verifier: &V,
    oracle: &mut O,
    console: &mut Console<'_>,
    log: &mut LogEmitter,
    transport: &str,
    stage: &mut Stage,
) -> Result<RunOutcome, HarnessError>
where
    V: Verifier + ?Sized,
    O: Oracle + ?Sized,
{
    let started = Instant::now();
    let base = |level: LogLevel, event: &'static str| {
        LogEntry::new("", level, event)
            .with_variant(request.variant.as_str())
            .with_transport(transport)
    };

    let record = FixtureRecord::read(request.fixture)?;
    log.emit_entry(
        base(LogLevel::Debug, "fixture_loaded")
            .with_stage(Stage::ReadFixture)
            .with_fixture(request.fixture.display().to_string())
            .with_fixture_sha256(record.digest())
            .with_details(json!({
                "script_len": record.script_pubkey.len(),
                "tx_len": record.tx_to.len(),
                "n_in": record.n_in,
                "flags": record.flags,
            })),
    )?;

    if request.mode.print_inputs() {
        writeln!(console.diag, "scriptPubKey: {}", encode_hex(&record.script_pubkey))?;
        writeln!(console.diag, "txTo: {}", encode_hex(&record.tx_to))?;
        writeln!(console.diag, "nIn: {}", record.n_in)?;
        writeln!(console.diag, "flags: {}", record.flags)?;
    }

    let flags = ConsensusFlags(record.flags);
    if !flags.is_supported() {
        log.emit_entry(
            base(LogLevel::Warn, "unsupported_flags")
                .with_stage(Stage::CallLibrary)
                .with_details(json!({
                    "flags": flags.0,
                    "unsupported_bits": flags.unsupported_bits(),
                })),
        )?;
    }

    *stage = Stage::CallLibrary;
    let verification = verifier.verify(request.variant, &VerifyRequest::from_record(&record))?;
    log.emit_entry(
        base(LogLevel::Debug, "library_returned")
            .with_stage(Stage::CallLibrary)
            .with_exit_code(verification.status)
            .with_consensus_error(verification.error.to_string())
            .with_details(json!({ "library": verifier.label(), "flags": flags.names() })),
    )?;
    if request.mode.print_error() {
        writeln!(console.diag, "error: {}", verification.error)?;
    }

    *stage = Stage::QueryOracle;
    let response = oracle.query(&FixtureRef {
        path: request.fixture,
        record: &record,
    })?;
    if response.truncated {
        log.emit_entry(
            base(LogLevel::Warn, "oracle_response_truncated")
                .with_stage(Stage::QueryOracle)
                .with_details(json!({ "bytes": response.raw.len() })),
        )?;
    }
    let oracle_bytes = decode_oracle_result(&response.raw).map_err(|source| {
        HarnessError::MalformedOracleResponse {
            endpoint: oracle.label(),
            source,
        }
    })?;

    *stage = Stage::Compare;
    let library_bytes = verification.result_bytes();
    let library_hex = encode_hex(&library_bytes);
    let oracle_hex = encode_hex(&oracle_bytes);
    writeln!(console.out, "{library_hex}")?;
    writeln!(console.out, "{oracle_hex}")?;

    let comparison = compare_results(&library_bytes, &oracle_bytes);
    match comparison {
        Comparison::Diverged { offset } => {
            if request.mode.print_differ() {
                writeln!(console.out, "differ")?;
            }
            console.out.flush()?;
            write!(console.diag, "{}", render_diff(&library_bytes, &oracle_bytes, offset))?;
            return Err(HarnessError::ResultDivergence {
                offset,
                library: library_hex,
                oracle: oracle_hex,
            });
        }
        Comparison::Match { oracle_extra, .. } if oracle_extra > 0 => {
            log.emit_entry(
                base(LogLevel::Warn, "oracle_extra_bytes_ignored")
                    .with_stage(Stage::Compare)
                    .with_details(json!({ "extra": oracle_extra })),
            )?;
        }
        Comparison::Match { .. } => {}
    }
    console.out.flush()?;
    log.emit_entry(
        base(LogLevel::Debug, "results_matched")
            .with_stage(Stage::Compare)
            .with_duration_ms(elapsed_ms(started)),
    )?;

    Ok(RunOutcome {
        exit_code: verification.status,
        verification,
        library_hex,
        oracle_hex,
        comparison,
    })
}

fn base_entry<'a>(
    request: &'a RunRequest<'_>,
    transport: &'a str,
    duration_ms: u64,
) -> impl Fn(LogLevel, &str) -> LogEntry + 'a {
    move |level: LogLevel, event: &str| {
        LogEntry::new("", level, event)
            .with_variant(request.variant.as_str())
            .with_transport(transport)
            .with_fixture(request.fixture.display().to_string())
            .with_duration_ms(duration_ms)
    }
}

/// `subprocess:node x.js` -> `subprocess`.
fn transport_name(label: &str) -> String {
    label.split(':').next().unwrap_or(label).to_string()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
