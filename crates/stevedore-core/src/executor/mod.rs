//! Command execution inside a running sandbox
//!
//! A command runs as `sh -c <command>` in a fresh exec session. The session's
//! combined output arrives as tagged frames; each frame is appended to the
//! transcript and, when both sinks are supplied, also written to the sink for
//! its stream. Every runtime call shares one deadline.

mod demux;

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use crate::lifecycle::{ContainerHandle, SandboxManager};
use crate::output::{ExecutionResult, EXIT_CODE_UNKNOWN};
use crate::runtime::ExecSpec;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tracing::{debug, error, instrument, warn};

use demux::OutputSinks;

/// Writer a caller can hand to the executor
pub type Sink<'a> = &'a mut (dyn AsyncWrite + Unpin + Send);

/// A single command to run in a sandbox
pub struct ExecRequest<'a> {
    /// Command line, interpreted by `sh -c` inside the container
    pub command: String,
    /// Deadline for the whole run
    pub timeout: Duration,
    /// `KEY=VALUE` assignments for the exec session
    pub env: Vec<String>,
    /// Run with extended privileges
    pub privileged: bool,
    /// Destination for standard output
    pub stdout: Option<Sink<'a>>,
    /// Destination for standard error
    pub stderr: Option<Sink<'a>>,
}

impl<'a> ExecRequest<'a> {
    /// Create a request with no sinks
    #[must_use]
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
            env: Vec::new(),
            privileged: false,
            stdout: None,
            stderr: None,
        }
    }

    /// Set the exec environment
    #[must_use]
    pub fn env(mut self, env: Vec<String>) -> Self {
        self.env = env;
        self
    }

    /// Run privileged
    #[must_use]
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Route standard output to a sink
    #[must_use]
    pub fn stdout(mut self, sink: Sink<'a>) -> Self {
        self.stdout = Some(sink);
        self
    }

    /// Route standard error to a sink
    #[must_use]
    pub fn stderr(mut self, sink: Sink<'a>) -> Self {
        self.stderr = Some(sink);
        self
    }
}

impl std::fmt::Debug for ExecRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecRequest")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .field("env", &self.env)
            .field("privileged", &self.privileged)
            .field("stdout", &self.stdout.is_some())
            .field("stderr", &self.stderr.is_some())
            .finish()
    }
}

impl SandboxManager {
    /// Run a command in a sandbox and wait for it to finish.
    ///
    /// Returns exit code [`EXIT_CODE_UNKNOWN`] together with an error if the
    /// exec session could not be created, attached, or inspected, or if the
    /// deadline passed. Failures while copying output are only logged.
    #[instrument(skip(self, handle, request), fields(id = %handle.id(), timeout = ?request.timeout))]
    pub async fn run(&self, handle: &ContainerHandle, request: ExecRequest<'_>) -> ExecutionResult {
        let ExecRequest {
            command,
            timeout,
            env,
            privileged,
            stdout,
            stderr,
        } = request;

        let sinks = match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => Some(OutputSinks::new(stdout, stderr)),
            _ => None,
        };
        let spec = ExecSpec::shell(&command, env, privileged);

        let mut transcript = Vec::new();
        let outcome = tokio::time::timeout(
            timeout,
            self.exec_session(handle.id(), &spec, sinks, &mut transcript),
        )
        .await;

        let transcript = String::from_utf8_lossy(&transcript).into_owned();
        match outcome {
            Ok(Ok(exit_code)) => {
                debug!(id = %handle.id(), exit_code, "container exec finished");
                ExecutionResult::completed(exit_code, transcript)
            }
            Ok(Err(e)) => ExecutionResult::failed(e, transcript),
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(id = %handle.id(), timeout_ms, "container exec timed out");
                if self.options.stop_on_exec_timeout {
                    self.stop_after_timeout(handle).await;
                }
                ExecutionResult::failed(Error::Timeout(timeout_ms), transcript)
            }
        }
    }

    async fn exec_session(
        &self,
        id: &str,
        spec: &ExecSpec,
        sinks: Option<OutputSinks<'_>>,
        transcript: &mut Vec<u8>,
    ) -> Result<i64> {
        let exec_id = self.runtime.create_exec(id, spec).await.map_err(|e| {
            error!(id = %id, error = %e, "container exec create error");
            e
        })?;
        debug!(id = %id, exec_id = %exec_id, "container exec created");

        let mut output = self.runtime.attach_exec(&exec_id).await.map_err(|e| {
            error!(id = %id, exec_id = %exec_id, error = %e, "container exec attach error");
            e
        })?;
        debug!(id = %id, exec_id = %exec_id, "container exec started");

        match demux::copy_frames(&mut output, sinks, transcript).await {
            Ok(bytes) => debug!(id = %id, exec_id = %exec_id, bytes, "container exec output drained"),
            Err(e) => warn!(id = %id, exec_id = %exec_id, error = %e, "container exec copy error"),
        }
        drop(output);

        let exit_code = self.runtime.inspect_exec(&exec_id).await.map_err(|e| {
            error!(id = %id, exec_id = %exec_id, error = %e, "container exec inspect error");
            e
        })?;

        Ok(exit_code.unwrap_or_else(|| {
            warn!(id = %id, exec_id = %exec_id, "container exec reported no exit code");
            EXIT_CODE_UNKNOWN
        }))
    }

    async fn stop_after_timeout(&self, handle: &ContainerHandle) {
        match self
            .runtime
            .stop_container(handle.id(), self.options.stop_grace)
            .await
        {
            Ok(()) => debug!(id = %handle.id(), "container stopped after exec timeout"),
            Err(e) => error!(id = %handle.id(), error = %e, "container stop after exec timeout error"),
        }
    }
}
