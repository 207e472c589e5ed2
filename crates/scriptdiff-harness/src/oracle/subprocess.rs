//! Helper-program oracle: `program args... <fixture-path>`, answer on stdout.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use super::{FixtureRef, Oracle, OracleError, OracleResponse, read_bounded};
use crate::pipeline::HarnessConfig;

/// How long a helper may keep running after its answer has been read.
const EXIT_GRACE: Duration = Duration::from_millis(100);

/// Spawns one helper process per query.
#[derive(Debug, Clone)]
pub struct SubprocessOracle {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    read_cap: usize,
}

impl SubprocessOracle {
    #[must_use]
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        timeout: Duration,
        read_cap: usize,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
            read_cap,
        }
    }

    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config.oracle_program.clone(),
            config.oracle_args.clone(),
            config.oracle_timeout,
            config.read_cap,
        )
    }

    fn endpoint(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

impl Oracle for SubprocessOracle {
    fn query(&mut self, fixture: &FixtureRef<'_>) -> Result<OracleResponse, OracleError> {
        let endpoint = self.endpoint();
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(fixture.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| OracleError::Unavailable {
                endpoint: endpoint.clone(),
                reason: format!("failed to spawn: {err}"),
            })?;
        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(OracleError::Unavailable {
                endpoint,
                reason: String::from("failed to open helper stdout"),
            });
        };

        // The read runs on its own thread so the deadline holds even when the
        // helper never writes or never closes stdout.
        let cap = self.read_cap;
        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            let _ = tx.send(read_bounded(stdout, cap));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(response)) => {
                let _ = reader.join();
                // The answer is in; a helper that lingers only gets a short grace.
                let grace = EXIT_GRACE.min(self.timeout.saturating_sub(started.elapsed()));
                if !matches!(child.wait_timeout(grace), Ok(Some(_))) {
                    reap(&mut child);
                }
                Ok(response)
            }
            Ok(Err(err)) => {
                reap(&mut child);
                Err(OracleError::from_io(&endpoint, self.timeout, err))
            }
            Err(RecvTimeoutError::Timeout) => {
                // The reader thread is left to finish on its own; it exits once
                // the pipe's write end closes.
                reap(&mut child);
                Err(OracleError::Timeout {
                    endpoint,
                    timeout: self.timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                reap(&mut child);
                Err(OracleError::Unavailable {
                    endpoint,
                    reason: String::from("stdout reader exited without a result"),
                })
            }
        }
    }

    fn label(&self) -> String {
        format!("subprocess:{}", self.endpoint())
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

trait ChildExt {
    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>>;
}

impl ChildExt for Child {
    fn wait_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(10);
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                return Ok(None);
            }
            thread::sleep(poll_interval);
        }
    }
}
