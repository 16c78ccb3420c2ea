//! Thin invocation layer for the external programs the pipeline shells out to.
//!
//! An [`Invocation`] is a program name plus an argument list. The program is
//! resolved on `PATH` before spawning so a missing tool is reported as such
//! instead of as a generic spawn failure. The child's stderr is always
//! inherited: its own diagnostics reach the user unchanged.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::debug;

/// Errors raised while running an external program.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("'{program}' was not found on the execution path: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' failed with {status}")]
    Failed { program: String, status: ExitStatus },
}

impl ToolError {
    /// The child's own exit code, when it exited normally with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { status, .. } => status.code(),
            _ => None,
        }
    }

    /// The program this error concerns.
    pub fn program(&self) -> &str {
        match self {
            ToolError::NotFound { program, .. }
            | ToolError::Spawn { program, .. }
            | ToolError::Failed { program, .. } => program,
        }
    }
}

/// A command template: program plus ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Resolves the program to an executable path.
    pub fn locate(&self) -> Result<PathBuf, ToolError> {
        which::which(&self.program).map_err(|source| ToolError::NotFound {
            program: self.program.clone(),
            source,
        })
    }

    /// Runs the program to completion with stdout inherited.
    pub fn run(&self) -> Result<(), ToolError> {
        self.run_with_stdout(Stdio::inherit())
    }

    /// Runs the program to completion with stdout wired to `stdout`.
    ///
    /// Blocks until the child exits. A non-zero exit is an error.
    pub fn run_with_stdout(&self, stdout: impl Into<Stdio>) -> Result<(), ToolError> {
        let executable = self.locate()?;
        debug!(command = %self, executable = %executable.display(), "running external tool");

        let status = Command::new(&executable)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| ToolError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
