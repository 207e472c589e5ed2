//! CLI entrypoint for the scriptdiff differential harness.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use scriptdiff_abi::ConsensusLibrary;
use scriptdiff_core::{Variant, Verifier};
use scriptdiff_harness::pipeline::Console;
use scriptdiff_harness::report::check_report_path;
use scriptdiff_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, now_utc, validate_log_file,
};
use serde_json::json;
use scriptdiff_harness::verify::VerificationSummary;
use scriptdiff_harness::{
    ConformanceReport, HarnessConfig, HarnessError, Oracle, ReportMode, RunRequest, TestRunner,
    run_fixture,
};

/// Differential testing of a consensus library against a reference oracle.
#[derive(Debug, Parser)]
#[command(name = "scriptdiff")]
#[command(about = "Compare libbitcoinconsensus results against a reference oracle")]
struct Cli {
    /// Consensus shared library (default: $SCRIPTDIFF_CONSENSUS_LIB, then $BITCOINCONSENSUS_LIB).
    #[arg(long, global = true)]
    library: Option<PathBuf>,
    /// Helper program for the subprocess oracle (default: node valid_script_stack.js).
    #[arg(long, global = true)]
    oracle_cmd: Option<String>,
    /// Argument passed to the helper before the fixture path. Repeatable.
    #[arg(long = "oracle-arg", global = true, allow_hyphen_values = true)]
    oracle_args: Vec<String>,
    /// Oracle deadline in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    oracle_timeout_ms: u64,
    /// JSONL log file (validated in place by `validate-log`).
    #[arg(long, global = true)]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check one fixture through the status-only entry point.
    Script {
        fixture: PathBuf,
        /// Report mode (1 inputs, 2 differ marker, 3 both, 4 error class).
        #[arg(allow_hyphen_values = true)]
        mode: Option<String>,
    },
    /// Check one fixture through the stack-reporting entry point.
    Stack {
        fixture: PathBuf,
        /// Report mode; 1 and 3 also select the subprocess oracle.
        #[arg(allow_hyphen_values = true)]
        mode: Option<String>,
        /// Oracle socket path, used unless the mode selects the subprocess.
        endpoint: Option<PathBuf>,
    },
    /// Run every fixture in a directory and report, without aborting.
    Batch {
        /// Directory of fixture files.
        #[arg(long)]
        fixtures: PathBuf,
        #[arg(long, value_enum, default_value_t = VariantArg::Stack)]
        variant: VariantArg,
        #[arg(long, allow_hyphen_values = true)]
        mode: Option<String>,
        /// Oracle socket path.
        #[arg(long)]
        endpoint: Option<PathBuf>,
        /// Markdown report path; JSON is written alongside.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate the JSONL file given by --log.
    ValidateLog,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Script,
    Stack,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Script => Variant::Script,
            VariantArg::Stack => Variant::Stack,
        }
    }
}

const CAMPAIGN: &str = "scriptdiff";
const EXIT_HARNESS_ERROR: i32 = 2;

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) if err.is_divergence() => {
            // Everything is dropped by now; only stdout needs a final flush.
            let _ = std::io::stdout().flush();
            eprintln!("scriptdiff: {err}");
            std::process::abort();
        }
        Err(err) => {
            eprintln!("scriptdiff: {err}");
            EXIT_HARNESS_ERROR
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32, HarnessError> {
    let config = harness_config(&cli);
    match cli.command {
        Command::Script { ref fixture, ref mode } => {
            run_single(&cli, config, Variant::Script, fixture, mode.as_deref(), None)
        }
        Command::Stack {
            ref fixture,
            ref mode,
            ref endpoint,
        } => run_single(
            &cli,
            config,
            Variant::Stack,
            fixture,
            mode.as_deref(),
            endpoint.clone(),
        ),
        Command::Batch {
            ref fixtures,
            variant,
            ref mode,
            ref endpoint,
            ref report,
        } => run_batch(
            &cli,
            config,
            variant.into(),
            fixtures,
            ReportMode::parse(mode.as_deref()),
            endpoint.clone(),
            report.as_deref(),
        ),
        Command::ValidateLog => validate_log(cli.log.as_deref()),
    }
}

fn harness_config(cli: &Cli) -> HarnessConfig {
    let config = HarnessConfig::default()
        .with_timeout(Duration::from_millis(cli.oracle_timeout_ms));
    match &cli.oracle_cmd {
        Some(program) => config.with_oracle_command(program.clone(), cli.oracle_args.clone()),
        None if !cli.oracle_args.is_empty() => {
            let program = config.oracle_program.clone();
            config.with_oracle_command(program, cli.oracle_args.clone())
        }
        None => config,
    }
}

fn open_library(path: Option<&Path>) -> Result<ConsensusLibrary, HarnessError> {
    let library = match path {
        Some(path) => ConsensusLibrary::load(path)?,
        None => ConsensusLibrary::discover()?,
    };
    Ok(library)
}

fn log_library(log: &mut LogEmitter, library: &ConsensusLibrary) -> Result<(), HarnessError> {
    log.emit_entry(
        LogEntry::new("", LogLevel::Info, "library_loaded").with_details(json!({
            "path": library.path().display().to_string(),
            "version": library.version(),
            "stack_api": library.has_stack_api(),
        })),
    )?;
    Ok(())
}

fn open_log(path: Option<&Path>) -> Result<LogEmitter, HarnessError> {
    let run_id = format!(
        "run-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    );
    match path {
        Some(path) => Ok(LogEmitter::to_file(path, CAMPAIGN, &run_id)?),
        None => Ok(LogEmitter::to_sink(CAMPAIGN, &run_id)),
    }
}

fn run_single(
    cli: &Cli,
    config: HarnessConfig,
    variant: Variant,
    fixture: &Path,
    mode: Option<&str>,
    endpoint: Option<PathBuf>,
) -> Result<i32, HarnessError> {
    let mode = ReportMode::parse(mode);
    let library = open_library(cli.library.as_deref())?;
    let mut log = open_log(cli.log.as_deref())?;
    log_library(&mut log, &library)?;
    let runner = TestRunner::new(variant, mode, config).with_endpoint(endpoint);
    let mut oracle = runner.oracle(&library)?;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let mut out = stdout.lock();
    let mut diag = stderr.lock();
    let outcome = run_fixture(
        &RunRequest {
            variant,
            fixture,
            mode,
        },
        &library,
        oracle.as_mut(),
        &mut Console {
            out: &mut out,
            diag: &mut diag,
        },
        &mut log,
    )?;
    Ok(outcome.exit_code)
}

fn run_batch(
    cli: &Cli,
    config: HarnessConfig,
    variant: Variant,
    fixtures: &Path,
    mode: ReportMode,
    endpoint: Option<PathBuf>,
    report: Option<&Path>,
) -> Result<i32, HarnessError> {
    if let Some(report_path) = report {
        check_report_path(report_path)?;
    }
    let library = open_library(cli.library.as_deref())?;
    let mut log = open_log(cli.log.as_deref())?;
    log_library(&mut log, &library)?;
    let runner = TestRunner::new(variant, mode, config).with_endpoint(endpoint);
    let oracle_label = runner.oracle(&library)?.label();

    eprintln!(
        "Running {variant} fixtures in {} against {oracle_label}",
        fixtures.display()
    );
    log.emit(LogLevel::Info, "batch_start")?;
    let results = runner.run(fixtures, &library, &mut log)?;
    let summary = VerificationSummary::from_results(results);
    let report_doc = ConformanceReport {
        title: String::from("scriptdiff conformance report"),
        variant: variant.as_str().to_string(),
        mode: mode.0,
        library: library.label(),
        oracle: oracle_label,
        timestamp: now_utc(),
        summary,
    };

    for r in report_doc.summary.results.iter().filter(|r| !r.passed()) {
        eprintln!(
            "[{}] {}: {}",
            r.status.as_str(),
            r.case_name,
            r.error.as_deref().unwrap_or("")
        );
    }
    eprintln!(
        "Batch complete: total={}, passed={}, failed={}, errored={}",
        report_doc.summary.total,
        report_doc.summary.passed,
        report_doc.summary.failed,
        report_doc.summary.errored
    );
    log.emit(LogLevel::Info, "batch_complete")?;
    log.flush()?;

    if let Some(report_path) = report {
        let (md_path, json_path) = report_doc.write(report_path)?;
        let mut index = ArtifactIndex::new(log.run_id(), CAMPAIGN);
        index.add_file(&md_path, "report_markdown")?;
        index.add_file(&json_path, "report_json")?;
        if let Some(log_path) = cli.log.as_deref() {
            index.add_file(log_path, "log")?;
        }
        let index_path = report_path.with_extension("index.json");
        std::fs::write(&index_path, index.to_json().map_err(std::io::Error::other)?)?;
        eprintln!(
            "Wrote {}, {} and {}",
            md_path.display(),
            json_path.display(),
            index_path.display()
        );
    }

    Ok(if report_doc.summary.all_passed() { 0 } else { 1 })
}

fn validate_log(path: Option<&Path>) -> Result<i32, HarnessError> {
    let Some(path) = path else {
        eprintln!("scriptdiff: validate-log requires --log <path>");
        return Ok(EXIT_HARNESS_ERROR);
    };
    let (lines, errors) = validate_log_file(path)?;
    for err in &errors {
        eprintln!("{err}");
    }
    eprintln!(
        "Validated {lines} log lines in {}: {} errors",
        path.display(),
        errors.len()
    );
    Ok(if errors.is_empty() { 0 } else { 1 })
}
