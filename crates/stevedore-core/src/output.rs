//! Result of a command run inside a sandbox

use crate::error::{Error, Result};

/// Exit code reported when a command never completed
pub const EXIT_CODE_UNKNOWN: i64 = -1;

/// Outcome of [`crate::SandboxManager::run`]
#[derive(Debug)]
pub struct ExecutionResult {
    /// Process exit code, or [`EXIT_CODE_UNKNOWN`]
    pub exit_code: i64,
    /// Captured output, stdout and stderr interleaved as produced
    pub transcript: String,
    /// Why the run did not complete, if it did not
    pub error: Option<Error>,
}

impl ExecutionResult {
    /// A run whose exit code was collected
    #[must_use]
    pub fn completed(exit_code: i64, transcript: String) -> Self {
        Self {
            exit_code,
            transcript,
            error: None,
        }
    }

    /// A run that failed before an exit code was collected
    #[must_use]
    pub fn failed(error: Error, transcript: String) -> Self {
        Self {
            exit_code: EXIT_CODE_UNKNOWN,
            transcript,
            error: Some(error),
        }
    }

    /// Completed with exit code 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.exit_code == 0
    }

    /// Convert into `Result<(exit_code, transcript)>`
    pub fn into_result(self) -> Result<(i64, String)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.exit_code, self.transcript)),
        }
    }
}
