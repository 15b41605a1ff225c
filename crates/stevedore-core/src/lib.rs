//! Stevedore Core - Sandbox container lifecycle and command execution
//!
//! This crate drives short-lived sandbox containers through a pluggable
//! container runtime:
//! - Params: translate a [`SandboxRequest`] into runtime creation parameters
//! - Lifecycle: create, start and stop a container
//! - Executor: run bounded-time commands with separated output streams
//! - Inspector: network address and accumulated logs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod executor;
mod inspector;
pub mod lifecycle;
pub mod output;
pub mod params;
pub mod request;
pub mod runtime;

pub use error::{Error, Result};
pub use executor::{ExecRequest, Sink};
pub use lifecycle::{ContainerHandle, ContainerState, LifecycleOptions, SandboxManager};
pub use output::{ExecutionResult, EXIT_CODE_UNKNOWN};
pub use params::{CreateParams, MASKED_PATHS};
pub use request::{MountKind, MountMode, MountSpec, SandboxRequest};
pub use runtime::{
    ContainerRuntime, ExecSpec, FrameStream, LogSelection, NetworkInfo, OutputFrame, StreamKind,
};
