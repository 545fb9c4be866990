//! Error types for command execution and provisioning steps

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to execute an external command
#[derive(Debug, Error)]
pub enum ExecError {
    /// The executable could not be located on the host
    #[error("command '{program}' not found, is it installed and in PATH?")]
    ExecutorNotFound { program: String },

    /// Non-zero exit while failure was not allowed
    #[error("'{program}' failed with exit code {exit_code}: {}", stderr.trim())]
    CommandFailed {
        program: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The child was terminated by a signal (operator interrupt)
    #[error("'{program}' was interrupted by signal {signal}")]
    Interrupted { program: String, signal: i32 },

    /// Spawning or talking to the child failed
    #[error("failed to run '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Failure of a provisioning step
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Upload mode was given a binary path that does not exist
    #[error("source binary not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render service unit: {0}")]
    Render(#[from] tera::Error),

    /// A step ran before the steps it depends on completed
    #[error("step '{step}' requires '{missing}' to have completed")]
    PreconditionUnmet {
        step: &'static str,
        missing: &'static str,
    },
}

impl ProvisionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must end the run even for a soft step.
    ///
    /// A missing host tool or an operator interrupt is never a tolerable state.
    pub fn is_always_fatal(&self) -> bool {
        matches!(
            self,
            Self::Exec(ExecError::ExecutorNotFound { .. } | ExecError::Interrupted { .. })
        )
    }
}
