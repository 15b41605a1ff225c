//! Container runtime adapter
//!
//! The engine never talks to a daemon directly. Everything goes through
//! [`ContainerRuntime`], which a backend (Docker, or a fake in tests)
//! implements. Implementations hold no per-container state and are shared
//! across every sandbox as `Arc<dyn ContainerRuntime>`.

use crate::error::Result;
use crate::params::CreateParams;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stream a frame of multiplexed output belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Standard input echo
    Stdin,
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// TTY console output (stdout and stderr merged)
    Console,
}

/// One demultiplexed frame of a combined output channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFrame {
    /// Originating stream
    pub stream: StreamKind,
    /// Raw bytes written by the process
    pub payload: Bytes,
}

impl OutputFrame {
    /// Create a frame
    pub fn new(stream: StreamKind, payload: impl Into<Bytes>) -> Self {
        Self {
            stream,
            payload: payload.into(),
        }
    }

    /// Stdout frame
    pub fn stdout(payload: impl Into<Bytes>) -> Self {
        Self::new(StreamKind::Stdout, payload)
    }

    /// Stderr frame
    pub fn stderr(payload: impl Into<Bytes>) -> Self {
        Self::new(StreamKind::Stderr, payload)
    }
}

/// Combined output channel of an exec session or container log
pub type FrameStream = BoxStream<'static, Result<OutputFrame>>;

/// Exec session creation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSpec {
    /// Argument vector
    pub cmd: Vec<String>,
    /// `KEY=VALUE` assignments
    pub env: Vec<String>,
    /// Attach standard output
    pub attach_stdout: bool,
    /// Attach standard error
    pub attach_stderr: bool,
    /// Run with extended privileges
    pub privileged: bool,
}

impl ExecSpec {
    /// Wrap a command line as `sh -c <command>` with both output streams attached
    #[must_use]
    pub fn shell(command: &str, env: Vec<String>, privileged: bool) -> Self {
        Self {
            cmd: vec!["sh".to_string(), "-c".to_string(), command.to_string()],
            env,
            attach_stdout: true,
            attach_stderr: true,
            privileged,
        }
    }
}

/// Which streams to request from the container log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSelection {
    /// Include standard output
    pub stdout: bool,
    /// Include standard error
    pub stderr: bool,
}

impl LogSelection {
    /// Both streams
    #[must_use]
    pub fn all() -> Self {
        Self {
            stdout: true,
            stderr: true,
        }
    }
}

/// Network identity of a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Primary IP address, if one is assigned
    pub ip_address: Option<String>,
}

/// Control API of a container runtime
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check that the runtime is reachable
    async fn ping(&self) -> Result<()>;

    /// Create a container and return its identifier
    async fn create_container(&self, name: &str, params: &CreateParams) -> Result<String>;

    /// Start a created container
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Stop a container, killing it after `grace`
    async fn stop_container(&self, id: &str, grace: Duration) -> Result<()>;

    /// Forcefully remove a container
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Inspect a container's network settings
    async fn inspect_container(&self, id: &str) -> Result<NetworkInfo>;

    /// Create an exec session and return its identifier
    async fn create_exec(&self, id: &str, spec: &ExecSpec) -> Result<String>;

    /// Start an exec session and attach to its combined output
    async fn attach_exec(&self, exec_id: &str) -> Result<FrameStream>;

    /// Exit code of an exec session (`None` while still running)
    async fn inspect_exec(&self, exec_id: &str) -> Result<Option<i64>>;

    /// Log output accumulated since the container started
    async fn fetch_logs(&self, id: &str, selection: LogSelection) -> Result<FrameStream>;
}
