//! External process execution.
//!
//! Both the build step and every test case hand a command line plus stdin
//! bytes to a [`ProcessRunner`] and get back the captured streams.
//! [`ShellRunner`] is the real implementation; tests substitute their own.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::RunnerError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Everything the process wrote to standard output.
    pub stdout: Vec<u8>,
    /// Everything the process wrote to standard error.
    pub stderr: Vec<u8>,
    /// Exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// Standard error decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Capability to run a command line to completion.
pub trait ProcessRunner {
    /// Runs `command`, writes `stdin` to it and closes the pipe, then waits
    /// for exit while capturing both output streams.
    ///
    /// Implementations may leave helper threads running after a timeout;
    /// see [`ShellRunner`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the process cannot be launched, its pipes
    /// fail, or it outlives `timeout`.
    fn run(
        &self,
        command: &str,
        stdin: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError>;
}

/// Runs command lines through the platform shell (`sh -c` or `cmd /C`).
///
/// On timeout only the shell itself is killed. Its stdin writer and output
/// reader threads are detached rather than joined, and they exit once every
/// process holding the pipes (including grandchildren of the shell) is gone.
/// A run can therefore leave up to three threads behind per timed-out case,
/// which lasts no longer than the CLI process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    fn command(command: &str) -> Command {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(command);
        cmd
    }
}

impl ProcessRunner for ShellRunner {
    fn run(
        &self,
        command: &str,
        stdin: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ProcessOutput, RunnerError> {
        let io_error = |source: io::Error| RunnerError::Io {
            command: command.to_string(),
            source,
        };

        let mut child = Self::command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            thread::spawn(move || match pipe.write_all(&input) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match timeout {
            Some(limit) => wait_with_deadline(&mut child, limit).map_err(io_error)?,
            None => Some(child.wait().map_err(io_error)?),
        };

        // Readers of a killed process are left detached: a grandchild of the
        // shell may still hold the pipes open.
        let Some(status) = status else {
            return Err(RunnerError::TimedOut {
                command: command.to_string(),
                timeout: timeout.unwrap_or_default(),
            });
        };

        if let Some(writer) = writer {
            join(writer).map_err(io_error)?;
        }
        let output = ProcessOutput {
            stdout: stdout.map(join).transpose().map_err(io_error)?.unwrap_or_default(),
            stderr: stderr.map(join).transpose().map_err(io_error)?.unwrap_or_default(),
            exit_code: status.code(),
        };
        log::debug!("`{command}` exited with {status}");
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join<T>(handle: JoinHandle<io::Result<T>>) -> io::Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe thread panicked")))
}

/// Polls the child until it exits or `limit` elapses. On expiry the child is
/// killed and reaped, and `None` is returned.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
