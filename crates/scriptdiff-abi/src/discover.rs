//! Library path discovery from the environment.

use std::path::PathBuf;

/// Environment variables consulted, in order.
pub const LIBRARY_ENV_VARS: [&str; 2] = ["SCRIPTDIFF_CONSENSUS_LIB", "BITCOINCONSENSUS_LIB"];

/// Resolve the library path from the process environment.
#[must_use]
pub fn discover_library_path() -> Option<PathBuf> {
    discover_with(|key| std::env::var(key).ok())
}

/// Resolve the library path through an arbitrary lookup.
///
/// The first variable that names an existing file wins; unset, empty and
/// dangling values are skipped.
pub fn discover_with(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    LIBRARY_ENV_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}
