//! Integration test: calls into a real consensus library.
//!
//! Skipped unless `SCRIPTDIFF_CONSENSUS_LIB` or `BITCOINCONSENSUS_LIB` points
//! at a shared library exporting the `bitcoinconsensus_*` C API.
//!
//! Run: SCRIPTDIFF_CONSENSUS_LIB=/path/libbitcoinconsensus.so \
//!      cargo test -p scriptdiff-abi --test real_library_test

use scriptdiff_abi::{ConsensusLibrary, discover_library_path};
use scriptdiff_core::{
    ConsensusError, ConsensusFlags, FixtureRecord, STACK_CAPACITY, Variant, Verifier,
    VerifierError, VerifyRequest,
};

const SPEND_TX: &str = "0100000001a38021e92bd97f43857328a337df14a084bb9d87e9dd82e607e96170e13c103a0000000000ffffffff0100f2052a010000001976a9146aeffd5d1dcc7f85a431d9d5798e2e13c8bf847a88ac00000000";

fn load() -> Option<ConsensusLibrary> {
    let path = discover_library_path()?;
    Some(ConsensusLibrary::load(&path).expect("configured consensus library should load"))
}

fn record(script_hex: &str, flags: u32) -> FixtureRecord {
    FixtureRecord::parse(format!("{script_hex}\n{SPEND_TX}\n0\n{flags}\n").as_bytes())
        .expect("valid fixture text")
}

#[test]
fn op_true_spend_is_valid() {
    let Some(lib) = load() else {
        eprintln!("skipping: no consensus library configured");
        return;
    };
    let rec = record("51", ConsensusFlags::NONE);
    let out = lib
        .verify(Variant::Script, &VerifyRequest::from_record(&rec))
        .unwrap();
    assert_eq!(out.status, 1, "OP_TRUE spend should verify");
    assert_eq!(out.error, ConsensusError::Ok);
    assert!(out.stack.is_none());
}

#[test]
fn op_false_spend_is_invalid() {
    let Some(lib) = load() else {
        eprintln!("skipping: no consensus library configured");
        return;
    };
    let rec = record("00", ConsensusFlags::NONE);
    let out = lib
        .verify(Variant::Script, &VerifyRequest::from_record(&rec))
        .unwrap();
    assert_eq!(out.status, 0);
    assert_eq!(out.error, ConsensusError::Ok);
}

#[test]
fn out_of_range_input_index_is_classified() {
    let Some(lib) = load() else {
        eprintln!("skipping: no consensus library configured");
        return;
    };
    let mut rec = record("51", ConsensusFlags::NONE);
    rec.n_in = 5;
    let out = lib
        .verify(Variant::Script, &VerifyRequest::from_record(&rec))
        .unwrap();
    assert_eq!(out.status, 0);
    assert_eq!(out.error, ConsensusError::TxIndex);
}

#[test]
fn stack_variant_reports_bounded_stack_or_unsupported() {
    let Some(lib) = load() else {
        eprintln!("skipping: no consensus library configured");
        return;
    };
    let rec = record("51", ConsensusFlags::NONE);
    match lib.verify(Variant::Stack, &VerifyRequest::from_record(&rec)) {
        Ok(out) => {
            let stack = out.stack.expect("stack variant reports a stack");
            assert!(stack.len() <= STACK_CAPACITY);
        }
        Err(VerifierError::Unsupported { variant, .. }) => {
            assert!(!lib.has_stack_api());
            assert_eq!(variant, Variant::Stack);
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}
