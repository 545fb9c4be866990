//! External command execution
//!
//! [`CommandRunner`] is the only seam through which steps touch host tools.
//! [`SystemRunner`] spawns real processes; tests substitute a recording double.

use std::io::{ErrorKind, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::ExecError;

/// Raw result of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code 0 with empty output
    pub fn ok() -> Self {
        Self::new(0, "", "")
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Return non-zero exits as a result instead of an error
    pub allow_failure: bool,
    /// Bytes written to the child's stdin before waiting on it
    pub stdin: Option<String>,
}

impl RunOptions {
    /// Options that hand non-zero exits back to the caller
    pub fn allow_failure() -> Self {
        Self {
            allow_failure: true,
            stdin: None,
        }
    }

    /// Feed `input` to the child's stdin
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Executes host commands
pub trait CommandRunner {
    /// Run `argv` (program first) to completion, capturing stdout and stderr.
    ///
    /// A missing executable is always [`ExecError::ExecutorNotFound`]. A non-zero exit is
    /// [`ExecError::CommandFailed`] unless `options.allow_failure` is set.
    fn run(&self, argv: &[&str], options: &RunOptions) -> Result<CommandResult, ExecError>;

    /// Locate `program` on the command search path
    fn resolve(&self, program: &str) -> Option<PathBuf>;
}

/// [`CommandRunner`] backed by `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[&str], options: &RunOptions) -> Result<CommandResult, ExecError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ExecError::Io {
                program: String::new(),
                source: std::io::Error::new(ErrorKind::InvalidInput, "empty command"),
            });
        };
        let io_err = |source| ExecError::Io {
            program: (*program).to_string(),
            source,
        };

        tracing::debug!(?argv, stdin = options.stdin.is_some(), "spawning command");

        let stdin = if options.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut child = match Command::new(program)
            .args(args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExecError::ExecutorNotFound {
                    program: (*program).to_string(),
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        // Stdin is written and closed before waiting so the child sees EOF
        if let (Some(input), Some(mut pipe)) = (&options.stdin, child.stdin.take()) {
            match pipe.write_all(input.as_bytes()) {
                Ok(()) => {}
                // Child exited without reading its input
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => return Err(io_err(e)),
            }
        }

        let output = child.wait_with_output().map_err(io_err)?;

        let Some(exit_code) = output.status.code() else {
            let signal = output.status.signal().unwrap_or_default();
            tracing::warn!(program, signal, "command terminated by signal");
            return Err(ExecError::Interrupted {
                program: (*program).to_string(),
                signal,
            });
        };

        let result = CommandResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(program, exit_code, "command finished");

        if result.success() || options.allow_failure {
            Ok(result)
        } else {
            Err(ExecError::CommandFailed {
                program: (*program).to_string(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            })
        }
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_not_found_even_when_failure_allowed() {
        let err = SystemRunner
            .run(
                &["definitely-not-a-real-tool-4f2a"],
                &RunOptions::allow_failure(),
            )
            .unwrap_err();

        assert!(matches!(err, ExecError::ExecutorNotFound { program } if program == "definitely-not-a-real-tool-4f2a"));
    }

    #[test]
    fn test_non_zero_exit_raises_unless_allowed() {
        let err = SystemRunner
            .run(&["sh", "-c", "echo oops >&2; exit 3"], &RunOptions::default())
            .unwrap_err();
        match err {
            ExecError::CommandFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr.trim(), "oops");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let result = SystemRunner
            .run(&["sh", "-c", "exit 3"], &RunOptions::allow_failure())
            .unwrap();
        assert_eq!(result.exit_code, 3);
    }

    #[test]
    fn test_stdin_is_delivered_and_closed() {
        let result = SystemRunner
            .run(&["cat"], &RunOptions::default().with_stdin("y\n"))
            .unwrap();

        assert!(result.success());
        assert_eq!(result.stdout, "y\n");
    }

    #[test]
    fn test_resolve_finds_shell() {
        assert!(SystemRunner.resolve("sh").is_some());
        assert!(SystemRunner.resolve("definitely-not-a-real-tool-4f2a").is_none());
    }
}
