//! Container lifecycle - create, start, stop
//!
//! A [`ContainerHandle`] only exists for a container that was both created
//! and started. Any failure on the way collapses to "no handle": the cause is
//! logged and the caller gets `None`.
//!
//! ```text
//! Created --start--> Running --cleanup--> Stopped (auto-removed by runtime)
//! ```

use crate::error::{Error, Result};
use crate::params::CreateParams;
use crate::request::SandboxRequest;
use crate::runtime::ContainerRuntime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};


/// Grace period before a stop escalates to a kill
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle state of a sandbox container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created, not yet started
    Created,
    /// Started and accepting exec sessions
    Running,
    /// Stop requested; the runtime removes it
    Stopped,
}

/// Handle to a running sandbox container
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    id: String,
    request: SandboxRequest,
    state: ContainerState,
}

impl ContainerHandle {
    /// Runtime-assigned container identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request the container was created from
    #[must_use]
    pub fn request(&self) -> &SandboxRequest {
        &self.request
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Short identifier for display
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }

    #[cfg(test)]
    pub(crate) fn running(id: impl Into<String>, request: SandboxRequest) -> Self {
        Self {
            id: id.into(),
            request,
            state: ContainerState::Running,
        }
    }
}

/// Lifecycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleOptions {
    /// Grace period passed to stop during cleanup
    #[serde(default = "default_stop_grace", with = "duration_secs")]
    pub stop_grace: Duration,
    /// Remove a container that was created but failed to start
    #[serde(default)]
    pub reclaim_unstarted: bool,
    /// Stop the container when a command exceeds its deadline
    #[serde(default)]
    pub stop_on_exec_timeout: bool,
}

fn default_stop_grace() -> Duration {
    DEFAULT_STOP_GRACE
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            stop_grace: DEFAULT_STOP_GRACE,
            reclaim_unstarted: false,
            stop_on_exec_timeout: false,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Entry point for sandbox operations
///
/// Owns a shared runtime adapter; cloning is cheap and every clone talks to
/// the same runtime. Dropping the last clone releases the runtime connection.
#[derive(Clone)]
pub struct SandboxManager {
    pub(crate) runtime: Arc<dyn ContainerRuntime>,
    pub(crate) options: LifecycleOptions,
}

impl SandboxManager {
    /// Create a manager over a runtime adapter
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::with_options(runtime, LifecycleOptions::default())
    }

    /// Create a manager with explicit lifecycle options
    #[must_use]
    pub fn with_options(runtime: Arc<dyn ContainerRuntime>, options: LifecycleOptions) -> Self {
        Self { runtime, options }
    }

    /// Lifecycle options in effect
    #[must_use]
    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Check that the runtime is reachable
    pub async fn ping(&self) -> Result<()> {
        self.runtime.ping().await
    }

    /// Create and start a sandbox container.
    ///
    /// Returns `None` if either step fails; the cause is logged.
    pub async fn create(&self, request: &SandboxRequest) -> Option<ContainerHandle> {
        self.provision(request).await.ok()
    }

    #[instrument(skip(self, request), fields(name = %request.name, image = %request.image))]
    async fn provision(&self, request: &SandboxRequest) -> Result<ContainerHandle> {
        let params = CreateParams::from_request(request);

        let id = self
            .runtime
            .create_container(&request.name, &params)
            .await
            .map_err(|e| {
                error!(name = %request.name, image = %request.image, error = %e, "container create error");
                e
            })?;

        if id.is_empty() {
            error!(name = %request.name, image = %request.image, "container create returned no id");
            return Err(Error::runtime("create_container", "runtime returned an empty id"));
        }

        let mut handle = ContainerHandle {
            id,
            request: request.clone(),
            state: ContainerState::Created,
        };
        debug!(name = %request.name, image = %request.image, id = %handle.id, "container created");

        if let Err(e) = self.runtime.start_container(&handle.id).await {
            error!(name = %request.name, image = %request.image, id = %handle.id, error = %e, "container start error");
            if self.options.reclaim_unstarted {
                self.reclaim(&handle.id).await;
            }
            return Err(e);
        }

        handle.state = ContainerState::Running;
        debug!(name = %request.name, image = %request.image, id = %handle.id, "container started");

        Ok(handle)
    }

    async fn reclaim(&self, id: &str) {
        match self.runtime.remove_container(id).await {
            Ok(()) => debug!(id = %id, "unstarted container removed"),
            Err(e) => warn!(id = %id, error = %e, "unstarted container remove error"),
        }
    }

    /// Stop a sandbox container. Never fails; errors are logged.
    ///
    /// The runtime removes the container once it has stopped, so no separate
    /// delete is issued. Safe to call more than once.
    pub async fn cleanup(&self, handle: &mut ContainerHandle) {
        match self
            .runtime
            .stop_container(&handle.id, self.options.stop_grace)
            .await
        {
            Ok(()) => debug!(id = %handle.id, "container removed"),
            Err(e) if e.is_not_found() => debug!(id = %handle.id, "container already gone"),
            Err(e) => error!(id = %handle.id, error = %e, "container remove error"),
        }
        handle.state = ContainerState::Stopped;
    }
}

impl std::fmt::Debug for SandboxManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxManager")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
