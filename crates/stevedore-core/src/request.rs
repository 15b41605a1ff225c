//! Sandbox request - what the caller wants the container to look like

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Access mode of a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    /// Container cannot write through the mount
    #[default]
    ReadOnly,
    /// Container may write through the mount
    ReadWrite,
}

/// Kind of mount handed to the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// Host path bind mount
    #[default]
    Bind,
    /// Named volume
    Volume,
    /// In-memory filesystem (source is ignored)
    Tmpfs,
}

impl MountKind {
    /// Returns the runtime's name for this mount kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bind => "bind",
            Self::Volume => "volume",
            Self::Tmpfs => "tmpfs",
        }
    }
}

/// Mount point for a sandbox container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Host path or volume name
    pub source: String,
    /// Container path
    pub target: String,
    /// Access mode
    #[serde(default)]
    pub mode: MountMode,
    /// Mount kind
    #[serde(default)]
    pub kind: MountKind,
}

impl MountSpec {
    /// Create a new read-only bind mount
    #[must_use]
    pub fn read_only(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: MountMode::ReadOnly,
            kind: MountKind::Bind,
        }
    }

    /// Create a new read-write bind mount
    #[must_use]
    pub fn read_write(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            mode: MountMode::ReadWrite,
            kind: MountKind::Bind,
        }
    }

    /// Change the mount kind
    #[must_use]
    pub fn with_kind(mut self, kind: MountKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the container sees this mount read-only
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode == MountMode::ReadOnly
    }

    /// Parse a `source:target[:ro|:rw]` mount argument
    pub fn parse(arg: &str) -> Option<Self> {
        let mut parts = arg.splitn(3, ':');
        let source = parts.next().filter(|s| !s.is_empty())?;
        let target = parts.next().filter(|s| !s.is_empty())?;
        match parts.next() {
            None | Some("rw") => Some(Self::read_write(source, target)),
            Some("ro") => Some(Self::read_only(source, target)),
            Some(_) => None,
        }
    }
}

/// Logical description of a sandbox container
///
/// `disable_network` and `use_host_network` may both be set; both are passed
/// to the runtime unchanged (see [`crate::params::CreateParams::from_request`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxRequest {
    /// Container name (empty lets the runtime choose)
    pub name: String,
    /// User the container process runs as
    pub user: String,
    /// Container hostname
    pub hostname: String,
    /// Image reference
    pub image: String,
    /// Working directory inside the container
    pub working_dir: String,
    /// Mounts, in order
    pub mounts: Vec<MountSpec>,
    /// Replace sensitive kernel and config paths with empty stand-ins
    pub mask_sensitive_paths: bool,
    /// Mount the root filesystem read-only
    pub readonly_rootfs: bool,
    /// Start the container without network interfaces
    pub disable_network: bool,
    /// Share the host network namespace
    pub use_host_network: bool,
    /// Seconds the runtime waits on stop before killing (None = runtime default)
    pub stop_timeout: Option<i64>,
    /// Environment variables
    pub env: BTreeMap<String, String>,
    /// Main process command; empty keeps the image default
    #[serde(default)]
    pub command: Vec<String>,
}

impl SandboxRequest {
    /// Create a request for the given image
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Set the container name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the container user
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the container hostname
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Append a mount
    #[must_use]
    pub fn with_mount(mut self, mount: MountSpec) -> Self {
        self.mounts.push(mount);
        self
    }

    /// Mask sensitive paths
    #[must_use]
    pub fn with_masked_paths(mut self, mask: bool) -> Self {
        self.mask_sensitive_paths = mask;
        self
    }

    /// Read-only root filesystem
    #[must_use]
    pub fn with_readonly_rootfs(mut self, readonly: bool) -> Self {
        self.readonly_rootfs = readonly;
        self
    }

    /// Disable networking
    #[must_use]
    pub fn with_network_disabled(mut self, disabled: bool) -> Self {
        self.disable_network = disabled;
        self
    }

    /// Use the host network
    #[must_use]
    pub fn with_host_network(mut self, host: bool) -> Self {
        self.use_host_network = host;
        self
    }

    /// Set the stop timeout in seconds
    #[must_use]
    pub fn with_stop_timeout(mut self, secs: i64) -> Self {
        self.stop_timeout = Some(secs);
        self
    }

    /// Override the image's main process, e.g. a keep-alive for images
    /// whose default command exits immediately
    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable; invalid names are skipped
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if is_valid_env_name(&key) {
            self.env.insert(key, value.into());
        } else {
            warn!(key = %key, "Skipping invalid environment variable name");
        }
        self
    }

    /// Environment rendered as `KEY=VALUE` assignments
    #[must_use]
    pub fn env_assignments(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

/// Validate environment variable name
pub fn is_valid_env_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.chars().next().unwrap_or('0').is_ascii_digit()
}
