//! Differential test harness for consensus libraries.
//!
//! This crate provides:
//! - Oracle transports: subprocess pipe, Unix-domain socket, recomputation
//! - Comparator: bounded byte-wise comparison of library vs oracle results
//! - Pipeline: read fixture, call library, query oracle, compare, report
//! - Batch runner + conformance reports (markdown and JSON)
//! - Structured JSONL logging for every pipeline stage

#![forbid(unsafe_code)]

pub mod compare;
pub mod diff;
pub mod error;
pub mod mode;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use compare::{Comparison, compare_results};
pub use error::HarnessError;
pub use mode::ReportMode;
pub use oracle::{Oracle, OracleError, OracleResponse};
pub use pipeline::{Console, HarnessConfig, RunOutcome, RunRequest, run_fixture};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{CaseStatus, VerificationResult, VerificationSummary};
