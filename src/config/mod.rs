//! Application configuration
//!
//! Layered settings for the Docker connection, sandbox defaults and
//! lifecycle policy. See [`loader`] for the source order.

mod loader;

pub use loader::load_config;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stevedore_core::{LifecycleOptions, SandboxRequest};
use stevedore_docker::DockerSettings;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub docker: DockerSettings,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Defaults for sandboxes started from the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default = "default_true")]
    pub mask_sensitive_paths: bool,
    #[serde(default)]
    pub readonly_rootfs: bool,
    #[serde(default)]
    pub disable_network: bool,
    #[serde(default)]
    pub use_host_network: bool,
    #[serde(default)]
    pub stop_timeout_secs: Option<i64>,
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

fn default_image() -> String {
    "alpine:latest".to_string()
}

/// Keeps images whose default command exits at once (e.g. `alpine`) alive
fn default_command() -> Vec<String> {
    ["tail", "-f", "/dev/null"].map(String::from).to_vec()
}

fn default_true() -> bool {
    true
}

fn default_exec_timeout_secs() -> u64 {
    60
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            command: default_command(),
            user: String::new(),
            hostname: String::new(),
            working_dir: String::new(),
            mask_sensitive_paths: default_true(),
            readonly_rootfs: false,
            disable_network: false,
            use_host_network: false,
            stop_timeout_secs: None,
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }
}

impl SandboxConfig {
    /// Base request built from the configured defaults
    pub fn request(&self) -> SandboxRequest {
        let mut request = SandboxRequest::new(&self.image)
            .with_command(self.command.iter().cloned())
            .with_user(&self.user)
            .with_hostname(&self.hostname)
            .with_working_dir(&self.working_dir)
            .with_masked_paths(self.mask_sensitive_paths)
            .with_readonly_rootfs(self.readonly_rootfs)
            .with_network_disabled(self.disable_network)
            .with_host_network(self.use_host_network);
        if let Some(secs) = self.stop_timeout_secs {
            request = request.with_stop_timeout(secs);
        }
        request
    }

    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

/// Lifecycle policy (exposed to TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
    #[serde(default)]
    pub reclaim_unstarted: bool,
    #[serde(default)]
    pub stop_on_exec_timeout: bool,
}

fn default_stop_grace_secs() -> u64 {
    1
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stop_grace_secs: default_stop_grace_secs(),
            reclaim_unstarted: false,
            stop_on_exec_timeout: false,
        }
    }
}

impl LifecycleConfig {
    pub fn options(&self) -> LifecycleOptions {
        LifecycleOptions {
            stop_grace: Duration::from_secs(self.stop_grace_secs),
            reclaim_unstarted: self.reclaim_unstarted,
            stop_on_exec_timeout: self.stop_on_exec_timeout,
        }
    }
}

#[cfg(test)]
mod tests;
