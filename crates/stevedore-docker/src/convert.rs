//! Mapping between stevedore-core types and Docker Engine API models

use bollard::container::{Config, LogOutput};
use bollard::errors::Error as DockerError;
use bollard::models::{ContainerInspectResponse, HostConfig, Mount, MountTypeEnum, ResourcesUlimits};
use stevedore_core::{CreateParams, Error, MountKind, MountSpec, OutputFrame, StreamKind};

/// Build the container and host configuration for `create_container`
pub(crate) fn container_config(params: &CreateParams) -> Config<String> {
    let container = &params.container;
    Config {
        image: Some(container.image.clone()),
        user: non_empty(&container.user),
        hostname: non_empty(&container.hostname),
        working_dir: non_empty(&container.working_dir),
        network_disabled: Some(container.network_disabled),
        env: (!container.env.is_empty()).then(|| container.env.clone()),
        stop_timeout: container.stop_timeout,
        cmd: (!container.cmd.is_empty()).then(|| container.cmd.clone()),
        host_config: Some(host_config(params)),
        ..Default::default()
    }
}

/// Empty collections become `None` so the daemon keeps its own defaults
/// (an explicit empty masked-path list would unmask everything).
pub(crate) fn host_config(params: &CreateParams) -> HostConfig {
    let host = &params.host;
    HostConfig {
        masked_paths: (!host.masked_paths.is_empty()).then(|| host.masked_paths.clone()),
        mounts: (!host.mounts.is_empty()).then(|| host.mounts.iter().map(mount).collect()),
        readonly_rootfs: Some(host.readonly_rootfs),
        auto_remove: Some(host.auto_remove),
        network_mode: non_empty(&host.network_mode),
        ulimits: Some(
            host.ulimits
                .iter()
                .map(|u| ResourcesUlimits {
                    name: Some(u.name.clone()),
                    soft: Some(u.soft),
                    hard: Some(u.hard),
                })
                .collect(),
        ),
        ..Default::default()
    }
}

fn mount(spec: &MountSpec) -> Mount {
    let typ = match spec.kind {
        MountKind::Bind => MountTypeEnum::BIND,
        MountKind::Volume => MountTypeEnum::VOLUME,
        MountKind::Tmpfs => MountTypeEnum::TMPFS,
    };
    Mount {
        source: (spec.kind != MountKind::Tmpfs).then(|| spec.source.clone()),
        target: Some(spec.target.clone()),
        typ: Some(typ),
        read_only: Some(spec.is_read_only()),
        ..Default::default()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Primary address: the legacy top-level field, else the first network with one
pub(crate) fn primary_address(info: ContainerInspectResponse) -> Option<String> {
    let settings = info.network_settings?;
    settings
        .ip_address
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            settings
                .networks?
                .into_values()
                .filter_map(|endpoint| endpoint.ip_address)
                .find(|ip| !ip.is_empty())
        })
}

pub(crate) fn frame(output: LogOutput) -> OutputFrame {
    match output {
        LogOutput::StdOut { message } => OutputFrame::new(StreamKind::Stdout, message),
        LogOutput::StdErr { message } => OutputFrame::new(StreamKind::Stderr, message),
        LogOutput::StdIn { message } => OutputFrame::new(StreamKind::Stdin, message),
        LogOutput::Console { message } => OutputFrame::new(StreamKind::Console, message),
    }
}

/// Daemon 404s become [`Error::NotFound`]; everything else is a runtime error
pub(crate) fn runtime_error(operation: &'static str, err: DockerError) -> Error {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404,
            message,
        } => Error::NotFound(message),
        DockerError::RequestTimeoutError => Error::runtime(operation, "request timed out"),
        other => Error::runtime(operation, other.to_string()),
    }
}

pub(crate) fn stream_error(err: DockerError) -> Error {
    Error::Stream(err.to_string())
}
