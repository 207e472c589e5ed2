//! Daemon oracle reached over a Unix-domain stream socket.
//!
//! Protocol: send the fixture path bytes, half-close the write side, read one
//! bounded response line.

use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::{FixtureRef, Oracle, OracleError, OracleResponse, read_bounded};

#[derive(Debug, Clone)]
pub struct SocketOracle {
    socket_path: PathBuf,
    timeout: Duration,
    read_cap: usize,
}

impl SocketOracle {
    #[must_use]
    pub fn new(socket_path: PathBuf, timeout: Duration, read_cap: usize) -> Self {
        Self {
            socket_path,
            timeout,
            read_cap,
        }
    }

    fn endpoint(&self) -> String {
        self.socket_path.display().to_string()
    }
}

impl Oracle for SocketOracle {
    fn query(&mut self, fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError> {
        let endpoint = self.endpoint();
        let deadline = Instant::now() + self.timeout;
        let mut stream =
            UnixStream::connect(&self.socket_path).map_err(|err| OracleError::Unavailable {
                endpoint: endpoint.clone(),
                reason: format!("connect failed: {err}"),
            })?;
        let io_err = |err: io::Error| OracleError::from_io(&endpoint, self.timeout, err);

        stream
            .set_write_timeout(Some(remaining(deadline).map_err(io_err)?))
            .map_err(io_err)?;
        stream
            .write_all(fixture.path.as_os_str().as_bytes())
            .map_err(io_err)?;
        match stream.shutdown(Shutdown::Write) {
            Ok(()) => {}
            // The daemon may already have answered and closed its end.
            Err(err) if err.kind() == io::ErrorKind::NotConnected => {}
            Err(err) => return Err(io_err(err)),
        }

        read_bounded(DeadlineReader { stream, deadline }, self.read_cap).map_err(io_err)
    }

    fn label(&self) -> String {
        format!("socket:{}", self.endpoint())
    }
}

fn remaining(deadline: Instant) -> io::Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::from(io::ErrorKind::TimedOut));
    }
    Ok(left)
}

/// Re-arms the socket read timeout before every read so the whole response
/// shares one deadline.
struct DeadlineReader {
    stream: UnixStream,
    deadline: Instant,
}

impl Read for DeadlineReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.set_read_timeout(Some(remaining(self.deadline)?))?;
        self.stream.read(buf)
    }
}
