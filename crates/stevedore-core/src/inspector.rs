//! Read-only queries against a sandbox container

use crate::error::{Error, Result};
use crate::lifecycle::{ContainerHandle, SandboxManager};
use crate::runtime::LogSelection;
use futures::TryStreamExt;
use tracing::error;

impl SandboxManager {
    /// Primary IP address of the container.
    ///
    /// An empty string means the address is unknown: either inspection
    /// failed (logged) or the runtime assigned none.
    pub async fn address(&self, handle: &ContainerHandle) -> String {
        match self.runtime.inspect_container(handle.id()).await {
            Ok(info) => info.ip_address.unwrap_or_default(),
            Err(e) => {
                error!(id = %handle.id(), error = %e, "failed to get ip: container inspect error");
                String::new()
            }
        }
    }

    /// Stdout and stderr the container has produced since it started
    pub async fn logs(&self, handle: &ContainerHandle) -> Result<String> {
        let stream = self
            .runtime
            .fetch_logs(handle.id(), LogSelection::all())
            .await
            .map_err(|e| {
                error!(id = %handle.id(), error = %e, "container logs error");
                e
            })?;

        let bytes = stream
            .try_fold(Vec::new(), |mut acc, frame| async move {
                acc.extend_from_slice(&frame.payload);
                Ok::<_, Error>(acc)
            })
            .await
            .map_err(|e| {
                error!(id = %handle.id(), error = %e, "container logs read error");
                e
            })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
