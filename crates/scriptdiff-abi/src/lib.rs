//! Foreign boundary to the consensus library under test.
//!
//! The library is loaded at runtime with `libloading` so the harness can be
//! pointed at any build exposing the `bitcoinconsensus_*` C API:
//! 1. `bitcoinconsensus_verify_script` (required)
//! 2. `bitcoinconsensus_verify_script_stack` (optional, stack-reporting fork)
//! 3. `bitcoinconsensus_version` (optional)
//!
//! This is the only crate in the workspace that contains `unsafe` code.

pub mod discover;
pub mod library;
mod symbols;

pub use discover::{LIBRARY_ENV_VARS, discover_library_path, discover_with};
pub use library::ConsensusLibrary;
