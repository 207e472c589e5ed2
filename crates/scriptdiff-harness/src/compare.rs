//! Byte-wise comparison of library and oracle results.

use scriptdiff_core::{FixtureError, STACK_CAPACITY, decode_hex_line};

/// Verdict of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// The first `compared` bytes agree. `oracle_extra` counts oracle bytes
    /// past the library result, which do not take part in the verdict.
    Match { compared: usize, oracle_extra: usize },
    /// First differing byte offset. An oracle result shorter than the
    /// library's diverges at the oracle's length.
    Diverged { offset: usize },
}

impl Comparison {
    #[must_use]
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Compare `library.len()` bytes.
#[must_use]
pub fn compare_results(library: &[u8], oracle: &[u8]) -> Comparison {
    let offset = library
        .iter()
        .zip(oracle)
        .position(|(l, o)| l != o)
        .or_else(|| (oracle.len() < library.len()).then_some(oracle.len()));
    match offset {
        Some(offset) => Comparison::Diverged { offset },
        None => Comparison::Match {
            compared: library.len(),
            oracle_extra: oracle.len() - library.len(),
        },
    }
}

/// Decode the first line of an oracle response.
pub fn decode_oracle_result(raw: &[u8]) -> Result<Vec<u8>, FixtureError> {
    decode_hex_line(raw, STACK_CAPACITY)
        .map(|bytes| bytes.into_vec())
        .map_err(|err| err.in_field("oracle", 1))
}
