//! Stevedore Docker - Docker Engine runtime for sandbox containers
//!
//! Implements [`ContainerRuntime`] on top of the Docker Engine API via
//! `bollard`, so a [`stevedore_core::SandboxManager`] can drive real
//! containers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod convert;

use async_trait::async_trait;
use bollard::container::{
    CreateContainerOptions, InspectContainerOptions, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::{Docker, API_DEFAULT_VERSION};
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stevedore_core::{
    ContainerRuntime, CreateParams, Error, ExecSpec, FrameStream, LogSelection, NetworkInfo,
    Result,
};
use tracing::{debug, info};

use convert::{runtime_error, stream_error};

/// Default per-request timeout against the daemon
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// How to reach the Docker daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerSettings {
    /// `unix://` socket or `tcp://`/`http://` address; `DOCKER_HOST` or the
    /// platform socket when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Docker Engine implementation of [`ContainerRuntime`]
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Build a client for `settings`.
    ///
    /// The endpoint comes from `settings.endpoint`, else `DOCKER_HOST`, else
    /// the platform socket. Socket endpoints are checked for existence here;
    /// `tcp://` and `http://` endpoints are not contacted until the first call.
    pub fn connect(settings: &DockerSettings) -> Result<Self> {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        let endpoint = resolve_endpoint(settings.endpoint.as_deref(), docker_host.as_deref());
        let timeout = settings.timeout_secs;

        let docker = match endpoint {
            None => Docker::connect_with_local_defaults(),
            #[cfg(unix)]
            Some(endpoint) if endpoint.starts_with("unix://") => {
                Docker::connect_with_unix(endpoint, timeout, API_DEFAULT_VERSION)
            }
            Some(endpoint) if endpoint.starts_with("tcp://") || endpoint.starts_with("http://") => {
                Docker::connect_with_http(endpoint, timeout, API_DEFAULT_VERSION)
            }
            Some(endpoint) => {
                return Err(Error::InvalidInput(format!(
                    "unsupported docker endpoint '{}'",
                    endpoint
                )))
            }
        }
        .map_err(|e| Error::Connection(e.to_string()))?;

        debug!(endpoint = ?endpoint, timeout_secs = timeout, "docker client configured");
        Ok(Self {
            docker: docker.with_timeout(Duration::from_secs(timeout)),
        })
    }
}

/// First non-blank of the configured endpoint and `DOCKER_HOST`
fn resolve_endpoint<'a>(configured: Option<&'a str>, docker_host: Option<&'a str>) -> Option<&'a str> {
    [configured, docker_host]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|endpoint| !endpoint.is_empty())
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        let reply = self
            .docker
            .ping()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        debug!(reply = %reply, "docker daemon reachable");
        Ok(())
    }

    async fn create_container(&self, name: &str, params: &CreateParams) -> Result<String> {
        let options = (!name.is_empty()).then(|| CreateContainerOptions {
            name: name.to_string(),
            platform: None,
        });
        let response = self
            .docker
            .create_container(options, convert::container_config(params))
            .await
            .map_err(|e| runtime_error("create_container", e))?;

        for warning in &response.warnings {
            info!(id = %response.id, warning = %warning, "container create warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| runtime_error("start_container", e))
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<()> {
        let options = StopContainerOptions {
            t: i64::try_from(grace.as_secs()).unwrap_or(i64::MAX),
        };
        match self.docker.stop_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped
            Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(runtime_error("stop_container", e)),
        }
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| runtime_error("remove_container", e))
    }

    async fn inspect_container(&self, id: &str) -> Result<NetworkInfo> {
        let info = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| runtime_error("inspect_container", e))?;
        Ok(NetworkInfo {
            ip_address: convert::primary_address(info),
        })
    }

    async fn create_exec(&self, id: &str, spec: &ExecSpec) -> Result<String> {
        let options = CreateExecOptions {
            attach_stdout: Some(spec.attach_stdout),
            attach_stderr: Some(spec.attach_stderr),
            cmd: Some(spec.cmd.clone()),
            env: (!spec.env.is_empty()).then(|| spec.env.clone()),
            privileged: Some(spec.privileged),
            ..Default::default()
        };
        let created = self
            .docker
            .create_exec(id, options)
            .await
            .map_err(|e| runtime_error("create_exec", e))?;
        Ok(created.id)
    }

    async fn attach_exec(&self, exec_id: &str) -> Result<FrameStream> {
        let started = self
            .docker
            .start_exec(exec_id, None)
            .await
            .map_err(|e| runtime_error("start_exec", e))?;

        match started {
            StartExecResults::Attached { output, .. } => Ok(output
                .map_ok(convert::frame)
                .map_err(stream_error)
                .boxed()),
            StartExecResults::Detached => Err(Error::runtime(
                "start_exec",
                "exec started detached, no output to attach",
            )),
        }
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<Option<i64>> {
        let info = self
            .docker
            .inspect_exec(exec_id)
            .await
            .map_err(|e| runtime_error("inspect_exec", e))?;
        Ok(info.exit_code)
    }

    async fn fetch_logs(&self, id: &str, selection: LogSelection) -> Result<FrameStream> {
        let options = LogsOptions::<String> {
            stdout: selection.stdout,
            stderr: selection.stderr,
            ..Default::default()
        };
        let mut logs = self.docker.logs(id, Some(options)).boxed();

        // bollard reports request failures as the first stream item;
        // surface those as request errors and keep the rest as read errors.
        let head = match logs.next().await {
            None => return Ok(stream::empty().boxed()),
            Some(Err(e)) => return Err(runtime_error("logs", e)),
            Some(Ok(first)) => convert::frame(first),
        };
        let rest = logs.map_ok(convert::frame).map_err(stream_error);
        Ok(stream::once(async move { Ok(head) }).chain(rest).boxed())
    }
}
