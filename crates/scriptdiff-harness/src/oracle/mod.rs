//! Reference oracle transports.
//!
//! An oracle produces an independently computed result for a fixture as
//! hex text. Every transport reads at most `read_cap` bytes, stops at the
//! first newline, and gives up after `timeout`; callers only ever see an
//! [`OracleResponse`].

mod recompute;
#[cfg(unix)]
mod socket;
mod subprocess;

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use scriptdiff_core::{FixtureRecord, VerifierError};
use thiserror::Error;

use crate::mode::ReportMode;
use crate::pipeline::HarnessConfig;

pub use recompute::RecomputeOracle;
#[cfg(unix)]
pub use socket::SocketOracle;
pub use subprocess::SubprocessOracle;

/// The fixture being checked, as both a path (for external oracles) and a
/// decoded record (for in-process recomputation).
#[derive(Debug, Clone, Copy)]
pub struct FixtureRef<'a> {
    pub path: &'a Path,
    pub record: &'a FixtureRecord,
}

/// Raw bytes returned by an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResponse {
    pub raw: Vec<u8>,
    /// The read stopped because it hit the byte bound, not a newline or EOF.
    pub truncated: bool,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle {endpoint} unavailable: {reason}")]
    Unavailable { endpoint: String, reason: String },
    #[error("oracle {endpoint} did not answer within {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("oracle {endpoint} i/o failure: {source}")]
    Io {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("recomputing reference failed: {0}")]
    Recompute(#[from] VerifierError),
}

impl OracleError {
    /// Map a transport I/O error, treating would-block/timed-out as a timeout.
    pub(crate) fn from_io(endpoint: &str, timeout: Duration, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Self::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            },
            _ => Self::Io {
                endpoint: endpoint.to_string(),
                source,
            },
        }
    }
}

/// A source of reference results.
pub trait Oracle {
    fn query(&mut self, fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError>;

    /// Transport name and endpoint for logs.
    fn label(&self) -> String;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn query(&mut self, fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError> {
        (**self).query(fixture)
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// Read one response line of at most `cap` bytes.
///
/// Never pulls more than `cap` bytes from `reader`, even through buffering.
pub fn read_bounded<R: Read>(reader: R, cap: usize) -> std::io::Result<OracleResponse> {
    let mut raw = Vec::new();
    BufReader::new(reader.take(cap as u64)).read_until(b'\n', &mut raw)?;
    let truncated = raw.len() >= cap && raw.last() != Some(&b'\n');
    Ok(OracleResponse { raw, truncated })
}

/// Which external transport the stack variant uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportChoice {
    Subprocess,
    Socket(PathBuf),
}

impl TransportChoice {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subprocess => "subprocess",
            Self::Socket(_) => "socket",
        }
    }
}

/// Pick the transport from the report mode: 1 or 3 spawn the helper
/// program, anything else talks to the socket at `endpoint`.
pub fn select_transport(
    mode: ReportMode,
    endpoint: Option<&Path>,
) -> Result<TransportChoice, OracleError> {
    if mode.uses_subprocess() {
        return Ok(TransportChoice::Subprocess);
    }
    match endpoint {
        Some(path) => Ok(TransportChoice::Socket(path.to_path_buf())),
        None => Err(OracleError::Unavailable {
            endpoint: String::from("socket"),
            reason: format!("mode {} requires a socket path argument", mode.0),
        }),
    }
}

/// Build the oracle for a transport choice.
pub fn build_oracle(
    choice: &TransportChoice,
    config: &HarnessConfig,
) -> Result<Box<dyn Oracle>, OracleError> {
    match choice {
        TransportChoice::Subprocess => Ok(Box::new(SubprocessOracle::from_config(config))),
        #[cfg(unix)]
        TransportChoice::Socket(path) => Ok(Box::new(SocketOracle::new(
            path.clone(),
            config.oracle_timeout,
            config.read_cap,
        ))),
        #[cfg(not(unix))]
        TransportChoice::Socket(path) => Err(OracleError::Unavailable {
            endpoint: path.display().to_string(),
            reason: String::from("Unix-domain sockets are not supported on this platform"),
        }),
    }
}
