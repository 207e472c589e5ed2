//! Fixture decoding: newline-delimited hex and decimal records.
//!
//! A fixture file holds one test case:
//!
//! ```text
//! <scriptPubKey hex>
//! <transaction hex>
//! <input index, decimal>
//! <flags, decimal>
//! ```
//!
//! Hex lines are decoded with [`decode_hex_line`], which stops at the first
//! newline, carriage return, NUL, end of input, or when the output reaches its
//! capacity. Odd digit counts and non-hex characters are errors, never silent
//! truncation.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::buffer::BoundedBytes;
use crate::error::FixtureError;
use crate::hex::{encode_hex, nibble};
use crate::{MAX_LINE_LEN, SCRIPT_CAPACITY, TX_CAPACITY};

#[inline]
fn is_terminator(c: u8) -> bool {
    matches!(c, b'\n' | b'\r' | 0)
}

/// Decode one line of ASCII hex into at most `capacity` bytes.
///
/// Consumes exactly two characters per output byte. Decoding ends at a line
/// terminator, end of input, or once `capacity` bytes have been produced;
/// whatever follows is not inspected.
pub fn decode_hex_line(input: &[u8], capacity: usize) -> Result<BoundedBytes, FixtureError> {
    let mut out = BoundedBytes::with_capacity(capacity);
    let mut i = 0;
    while i < input.len() && !is_terminator(input[i]) && !out.is_full() {
        let hi = nibble(input[i]).ok_or_else(|| non_hex(input[i], i))?;
        let lo = match input.get(i + 1) {
            Some(&c) if !is_terminator(c) => nibble(c).ok_or_else(|| non_hex(c, i + 1))?,
            _ => {
                return Err(FixtureError::malformed(
                    "hex",
                    1,
                    i + 1,
                    "odd number of hex digits",
                ));
            }
        };
        out.push((hi << 4) | lo)?;
        i += 2;
    }
    Ok(out)
}

fn non_hex(c: u8, index: usize) -> FixtureError {
    FixtureError::malformed(
        "hex",
        1,
        index + 1,
        format!("non-hex character {:?}", char::from(c)),
    )
}

/// Parse a decimal `u32` line, ignoring surrounding whitespace.
pub fn parse_decimal_line(line: &[u8], field: &'static str) -> Result<u32, FixtureError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| FixtureError::malformed(field, 1, 1, "line is not valid UTF-8"))?;
    let trimmed = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    if trimmed.is_empty() {
        return Err(FixtureError::malformed(field, 1, 1, "empty decimal field"));
    }
    trimmed
        .parse::<u32>()
        .map_err(|err| FixtureError::malformed(field, 1, 1, format!("{trimmed:?}: {err}")))
}

/// One decoded test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRecord {
    pub script_pubkey: Vec<u8>,
    pub tx_to: Vec<u8>,
    pub n_in: u32,
    pub flags: u32,
}

const FIELDS: [&str; 4] = ["scriptPubKey", "txTo", "nIn", "flags"];

impl FixtureRecord {
    /// Parse the four-line fixture format.
    pub fn parse(bytes: &[u8]) -> Result<Self, FixtureError> {
        let mut lines = bytes.split(|b| *b == b'\n');
        let mut taken: [&[u8]; 4] = [&[]; 4];
        for (idx, &field) in FIELDS.iter().enumerate() {
            let line_no = idx + 1;
            let line = lines.next().ok_or_else(|| {
                FixtureError::malformed(field, line_no, 0, "missing line")
            })?;
            if line.len() > MAX_LINE_LEN {
                return Err(FixtureError::malformed(
                    field,
                    line_no,
                    MAX_LINE_LEN + 1,
                    format!("line exceeds {MAX_LINE_LEN} characters"),
                ));
            }
            taken[idx] = line;
        }
        let script_pubkey = decode_hex_line(taken[0], SCRIPT_CAPACITY)
            .map_err(|e| e.in_field(FIELDS[0], 1))?
            .into_vec();
        let tx_to = decode_hex_line(taken[1], TX_CAPACITY)
            .map_err(|e| e.in_field(FIELDS[1], 2))?
            .into_vec();
        let n_in = parse_decimal_line(taken[2], FIELDS[2]).map_err(|e| e.in_field(FIELDS[2], 3))?;
        let flags =
            parse_decimal_line(taken[3], FIELDS[3]).map_err(|e| e.in_field(FIELDS[3], 4))?;
        Ok(Self {
            script_pubkey,
            tx_to,
            n_in,
            flags,
        })
    }

    /// Read and parse a fixture file.
    pub fn read(path: &Path) -> Result<Self, FixtureError> {
        let bytes = std::fs::read(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes)
    }

    /// Render the record in the four-line fixture format.
    #[must_use]
    pub fn to_fixture_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n",
            encode_hex(&self.script_pubkey),
            encode_hex(&self.tx_to),
            self.n_in,
            self.flags
        )
    }

    /// SHA-256 of the canonical fixture text, lowercase hex.
    #[must_use]
    pub fn digest(&self) -> String {
        encode_hex(&Sha256::digest(self.to_fixture_text().as_bytes()))
    }
}
