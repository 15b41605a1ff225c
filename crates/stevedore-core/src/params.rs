//! Runtime creation parameters built from a [`SandboxRequest`]

use crate::request::{MountSpec, SandboxRequest};
use serde::{Deserialize, Serialize};

/// Paths hidden from the container when `mask_sensitive_paths` is set
pub const MASKED_PATHS: [&str; 11] = [
    "/etc",
    "/sys",
    "/proc/tty",
    "/proc/sys",
    "/proc/sysrq-trigger",
    "/proc/cmdline",
    "/proc/config.gz",
    "/proc/mounts",
    "/proc/fs",
    "/proc/device-tree",
    "/proc/bus",
];

/// Network mode value selecting the host network namespace
pub const HOST_NETWORK_MODE: &str = "host";

/// Process resource limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ulimit {
    /// Limit name (e.g. "memlock")
    pub name: String,
    /// Soft limit, -1 for unlimited
    pub soft: i64,
    /// Hard limit, -1 for unlimited
    pub hard: i64,
}

impl Ulimit {
    /// Unlimited soft and hard limit
    #[must_use]
    pub fn unlimited(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soft: -1,
            hard: -1,
        }
    }
}

/// Container-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Image reference
    pub image: String,
    /// User the container process runs as
    pub user: String,
    /// Container hostname
    pub hostname: String,
    /// Working directory
    pub working_dir: String,
    /// Create without network interfaces
    pub network_disabled: bool,
    /// `KEY=VALUE` assignments
    pub env: Vec<String>,
    /// Seconds to wait on stop before killing
    pub stop_timeout: Option<i64>,
    /// Main process command (empty = image default)
    pub cmd: Vec<String>,
}

/// Host-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSettings {
    /// Paths replaced with empty stand-ins
    pub masked_paths: Vec<String>,
    /// Mounts, in order
    pub mounts: Vec<MountSpec>,
    /// Read-only root filesystem
    pub readonly_rootfs: bool,
    /// Remove the container once it stops
    pub auto_remove: bool,
    /// Empty string selects the runtime default (bridge)
    pub network_mode: String,
    /// Process resource limits
    pub ulimits: Vec<Ulimit>,
}

/// Everything the runtime needs to create a sandbox container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateParams {
    /// Container section
    pub container: ContainerSettings,
    /// Host section
    pub host: HostSettings,
}

impl CreateParams {
    /// Translate a request into creation parameters.
    ///
    /// `disable_network` and `use_host_network` are independent switches and
    /// both reach the runtime as given. Docker resolves the combination by
    /// creating the container without any network interface.
    #[must_use]
    pub fn from_request(request: &SandboxRequest) -> Self {
        let masked_paths = if request.mask_sensitive_paths {
            MASKED_PATHS.iter().map(|p| (*p).to_string()).collect()
        } else {
            Vec::new()
        };

        let network_mode = if request.use_host_network {
            HOST_NETWORK_MODE.to_string()
        } else {
            String::new()
        };

        Self {
            container: ContainerSettings {
                image: request.image.clone(),
                user: request.user.clone(),
                hostname: request.hostname.clone(),
                working_dir: request.working_dir.clone(),
                network_disabled: request.disable_network,
                env: request.env_assignments(),
                stop_timeout: request.stop_timeout,
                cmd: request.command.clone(),
            },
            host: HostSettings {
                masked_paths,
                mounts: request.mounts.clone(),
                readonly_rootfs: request.readonly_rootfs,
                auto_remove: true,
                network_mode,
                // swap-locking workloads get OOM-killed under the default memlock limit
                ulimits: vec![Ulimit::unlimited("memlock")],
            },
        }
    }
}
