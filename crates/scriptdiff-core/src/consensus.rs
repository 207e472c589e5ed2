//! Vocabulary shared with the consensus library under test.
//!
//! The library itself is reached through the [`Verifier`] trait; this module
//! only defines the request/result types, the flag bitmask and the library's
//! error classification.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Script verification flag bitmask, as passed across the foreign boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConsensusFlags(pub u32);

impl ConsensusFlags {
    pub const NONE: u32 = 0;
    pub const P2SH: u32 = 1 << 0;
    pub const DERSIG: u32 = 1 << 2;
    pub const NULLDUMMY: u32 = 1 << 4;
    pub const CHECKLOCKTIMEVERIFY: u32 = 1 << 9;
    pub const CHECKSEQUENCEVERIFY: u32 = 1 << 10;
    pub const WITNESS: u32 = 1 << 11;

    /// Every flag the legacy library accepts; anything else is rejected
    /// with [`ConsensusError::InvalidFlags`].
    pub const VERIFY_ALL: u32 = Self::P2SH
        | Self::DERSIG
        | Self::NULLDUMMY
        | Self::CHECKLOCKTIMEVERIFY
        | Self::CHECKSEQUENCEVERIFY
        | Self::WITNESS;

    #[must_use]
    pub fn is_supported(self) -> bool {
        self.0 & !Self::VERIFY_ALL == 0
    }

    /// Bits outside [`Self::VERIFY_ALL`].
    #[must_use]
    pub fn unsupported_bits(self) -> u32 {
        self.0 & !Self::VERIFY_ALL
    }

    /// Human-readable flag names, `NONE` for an empty mask.
    #[must_use]
    pub fn names(self) -> Vec<String> {
        const NAMED: [(u32, &str); 6] = [
            (ConsensusFlags::P2SH, "P2SH"),
            (ConsensusFlags::DERSIG, "DERSIG"),
            (ConsensusFlags::NULLDUMMY, "NULLDUMMY"),
            (ConsensusFlags::CHECKLOCKTIMEVERIFY, "CHECKLOCKTIMEVERIFY"),
            (ConsensusFlags::CHECKSEQUENCEVERIFY, "CHECKSEQUENCEVERIFY"),
            (ConsensusFlags::WITNESS, "WITNESS"),
        ];
        if self.0 == 0 {
            return vec![String::from("NONE")];
        }
        let mut out: Vec<String> = NAMED
            .iter()
            .filter(|(bit, _)| self.0 & bit != 0)
            .map(|(_, name)| (*name).to_string())
            .collect();
        let rest = self.unsupported_bits();
        if rest != 0 {
            out.push(format!("0x{rest:x}"));
        }
        out
    }
}

/// Error classification reported by the library alongside its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusError {
    Ok,
    TxIndex,
    TxSizeMismatch,
    TxDeserialize,
    AmountRequired,
    InvalidFlags,
    Unknown(i32),
}

impl ConsensusError {
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::TxIndex,
            2 => Self::TxSizeMismatch,
            3 => Self::TxDeserialize,
            4 => Self::AmountRequired,
            5 => Self::InvalidFlags,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::TxIndex => 1,
            Self::TxSizeMismatch => 2,
            Self::TxDeserialize => 3,
            Self::AmountRequired => 4,
            Self::InvalidFlags => 5,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ERR_OK"),
            Self::TxIndex => f.write_str("ERR_TX_INDEX"),
            Self::TxSizeMismatch => f.write_str("ERR_TX_SIZE_MISMATCH"),
            Self::TxDeserialize => f.write_str("ERR_TX_DESERIALIZE"),
            Self::AmountRequired => f.write_str("ERR_AMOUNT_REQUIRED"),
            Self::InvalidFlags => f.write_str("ERR_INVALID_FLAGS"),
            Self::Unknown(code) => write!(f, "ERR_UNKNOWN({code})"),
        }
    }
}

/// Which library entry point a run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// `verify_script`: status and error classification only.
    Script,
    /// `verify_script_stack`: additionally reports the final stack.
    Stack,
}

impl Variant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Stack => "stack",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to one library call.
#[derive(Debug, Clone, Copy)]
pub struct VerifyRequest<'a> {
    pub script_pubkey: &'a [u8],
    pub tx_to: &'a [u8],
    pub n_in: u32,
    pub flags: ConsensusFlags,
}

impl<'a> VerifyRequest<'a> {
    #[must_use]
    pub fn from_record(record: &'a crate::FixtureRecord) -> Self {
        Self {
            script_pubkey: &record.script_pubkey,
            tx_to: &record.tx_to,
            n_in: record.n_in,
            flags: ConsensusFlags(record.flags),
        }
    }
}

/// What the library returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub status: i32,
    pub error: ConsensusError,
    /// Final stack contents; only the stack entry point reports it.
    pub stack: Option<Vec<u8>>,
}

impl Verification {
    /// The byte sequence compared against the oracle.
    ///
    /// For the stack entry point this is the stack itself. For the
    /// status-only entry point it is the status followed by the error code,
    /// both little-endian `i32`.
    #[must_use]
    pub fn result_bytes(&self) -> Vec<u8> {
        match &self.stack {
            Some(stack) => stack.clone(),
            None => {
                let mut out = Vec::with_capacity(8);
                out.extend_from_slice(&self.status.to_le_bytes());
                out.extend_from_slice(&self.error.code().to_le_bytes());
                out
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("failed to load consensus library {}: {message}", path.display())]
    Load { path: PathBuf, message: String },
    #[error("consensus library does not export {symbol}: {message}")]
    MissingSymbol {
        symbol: &'static str,
        message: String,
    },
    #[error("{variant} entry point is not available in {library}")]
    Unsupported { variant: Variant, library: String },
    #[error("{field} length {len} does not fit the C API length field")]
    LengthOverflow { field: &'static str, len: usize },
    #[error("library reported stack length {reported}, buffer holds {capacity}")]
    StackOverflow { reported: usize, capacity: usize },
    #[error("no consensus library configured (set SCRIPTDIFF_CONSENSUS_LIB or pass --library)")]
    NotConfigured,
}

/// The foreign verification boundary.
///
/// Implementations are synchronous and never retry.
pub trait Verifier {
    fn verify(
        &self,
        variant: Variant,
        request: &VerifyRequest<'_>,
    ) -> Result<Verification, VerifierError>;

    /// Short description used in logs and reports.
    fn label(&self) -> String;
}

impl<V: Verifier + ?Sized> Verifier for &V {
    fn verify(
        &self,
        variant: Variant,
        request: &VerifyRequest<'_>,
    ) -> Result<Verification, VerifierError> {
        (**self).verify(variant, request)
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_all_covers_legacy_flags() {
        assert!(ConsensusFlags(0).is_supported());
        assert!(ConsensusFlags(ConsensusFlags::P2SH | ConsensusFlags::WITNESS).is_supported());
        let bad = ConsensusFlags(ConsensusFlags::P2SH | (1 << 1));
        assert!(!bad.is_supported());
        assert_eq!(bad.unsupported_bits(), 1 << 1);
    }

    #[test]
    fn flag_names_include_unknown_bits() {
        assert_eq!(ConsensusFlags(0).names(), vec!["NONE"]);
        assert_eq!(
            ConsensusFlags(ConsensusFlags::P2SH | ConsensusFlags::DERSIG | (1 << 20)).names(),
            vec!["P2SH", "DERSIG", "0x100000"]
        );
    }

    #[test]
    fn error_codes_round_trip() {
        for code in -1..8 {
            assert_eq!(ConsensusError::from_code(code).code(), code);
        }
        assert_eq!(ConsensusError::from_code(5).to_string(), "ERR_INVALID_FLAGS");
        assert_eq!(ConsensusError::from_code(9).to_string(), "ERR_UNKNOWN(9)");
    }

    #[test]
    fn status_only_result_bytes_encode_status_and_error() {
        let v = Verification {
            status: 1,
            error: ConsensusError::Ok,
            stack: None,
        };
        assert_eq!(v.result_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        let v = Verification {
            status: 0,
            error: ConsensusError::TxDeserialize,
            stack: None,
        };
        assert_eq!(v.result_bytes(), vec![0, 0, 0, 0, 3, 0, 0, 0]);
    }

    #[test]
    fn stack_result_bytes_are_the_stack() {
        let v = Verification {
            status: 0,
            error: ConsensusError::Ok,
            stack: Some(vec![0xde, 0xad]),
        };
        assert_eq!(v.result_bytes(), vec![0xde, 0xad]);
    }
}
