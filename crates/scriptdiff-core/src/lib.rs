//! Safe domain code for the scriptdiff differential harness.
//!
//! This crate provides:
//! - Bounded byte buffers with a declared maximum capacity
//! - The fixture decoder: newline-delimited hex/decimal fixture records
//! - Lowercase hex rendering for result encodings
//! - The `Verifier` seam through which the consensus library is called

#![deny(unsafe_code)]

pub mod buffer;
pub mod consensus;
pub mod error;
pub mod fixture;
pub mod hex;

pub use buffer::BoundedBytes;
pub use consensus::{
    ConsensusError, ConsensusFlags, Variant, Verification, Verifier, VerifierError, VerifyRequest,
};
pub use error::FixtureError;
pub use fixture::{FixtureRecord, decode_hex_line, parse_decimal_line};
pub use hex::encode_hex;

/// Maximum decoded scriptPubKey length.
pub const SCRIPT_CAPACITY: usize = 10_000;
/// Maximum decoded transaction length.
pub const TX_CAPACITY: usize = 10_000;
/// Size of the stack buffer handed to the library's stack entry point.
pub const STACK_CAPACITY: usize = 1_024;
/// Longest fixture line accepted, in characters.
pub const MAX_LINE_LEN: usize = 20_000;
/// Hard upper bound on bytes read from an oracle transport.
pub const ORACLE_READ_CAP: usize = 2_048;
