//! Process execution seam.
//!
//! Both the resolver (version probes, the detection helper) and the invoker
//! (the conversion itself) go through [`CommandRunner`]. Production code uses
//! [`SystemRunner`]; tests substitute a scripted runner so resolver ordering
//! and artifact checks can be exercised without an engine installed.
//!
//! Arguments are always a discrete list handed to the OS, never a shell
//! string, so file names with spaces or quotes need no escaping.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// A program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Why a process could not be run to completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("binary not found")]
    NotFound,

    #[error("permission denied while executing binary")]
    NotExecutable,

    #[error("timed out after {:.1}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("{0}")]
    Io(#[source] std::io::Error),
}

impl RunError {
    /// Classify a spawn error into a stable outcome.
    pub fn from_spawn(error: std::io::Error) -> Self {
        match error.kind() {
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::PermissionDenied => Self::NotExecutable,
            _ => {
                let lower = error.to_string().to_lowercase();
                if lower.contains("exec format error") || lower.contains("cannot execute") {
                    Self::NotExecutable
                } else {
                    Self::Io(error)
                }
            }
        }
    }
}

/// Runs an [`Invocation`] and captures its output.
///
/// `timeout = None` waits indefinitely. Implementations must kill the child
/// when the bound expires.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let child = cmd.spawn().map_err(RunError::from_spawn)?;

        // Dropping the future on timeout drops the child, and kill_on_drop
        // terminates it.
        let waited = child.wait_with_output();
        let output = match timeout {
            Some(bound) => tokio::time::timeout(bound, waited)
                .await
                .map_err(|_| RunError::TimedOut(bound))?,
            None => waited.await,
        }
        .map_err(RunError::Io)?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
