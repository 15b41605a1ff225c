//! `stevedore run`: one command in a disposable sandbox

use crate::config::{load_config, SandboxConfig};
use anyhow::{bail, Context};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stevedore_core::{ExecRequest, ExecutionResult, MountSpec, SandboxManager, SandboxRequest};
use stevedore_docker::DockerRuntime;
use tracing::{info, warn};
use uuid::Uuid;

/// Exit status when the command never produced one (mirrors `docker run`)
pub const EXIT_STATUS_UNAVAILABLE: i32 = 125;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image to run (defaults to `sandbox.image`)
    #[arg(long)]
    pub image: Option<String>,

    /// Container name (random when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Command deadline in seconds (defaults to `sandbox.exec_timeout_secs`)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Mask sensitive kernel and config paths
    #[arg(long, overrides_with = "no_mask")]
    pub mask: bool,

    /// Leave the runtime's default path masking in place
    #[arg(long, overrides_with = "mask")]
    pub no_mask: bool,

    /// Share the host network namespace
    #[arg(long)]
    pub host_network: bool,

    /// Start without network interfaces
    #[arg(long)]
    pub no_network: bool,

    /// Mount the root filesystem read-only
    #[arg(long)]
    pub readonly: bool,

    /// Bind mount, `SRC:DST[:ro|:rw]` (repeatable)
    #[arg(long = "mount", value_name = "SRC:DST[:ro]", value_parser = parse_mount)]
    pub mounts: Vec<MountSpec>,

    /// Environment variable for the container (repeatable)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Run the command with extended privileges
    #[arg(long)]
    pub privileged: bool,

    /// Print the container address after the command
    #[arg(long)]
    pub inspect: bool,

    /// Print the container logs after the command
    #[arg(long)]
    pub logs: bool,

    /// Print a JSON summary instead of streaming output
    #[arg(long)]
    pub json: bool,

    /// Command to run via `sh -c`
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

fn parse_mount(arg: &str) -> Result<MountSpec, String> {
    MountSpec::parse(arg).ok_or_else(|| format!("invalid mount '{}', expected SRC:DST[:ro|:rw]", arg))
}

fn parse_env(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid variable '{}', expected KEY=VALUE", arg)),
    }
}

impl RunArgs {
    /// Tri-state `--mask` / `--no-mask`; `None` keeps the configured default
    fn mask_override(&self) -> Option<bool> {
        match (self.mask, self.no_mask) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// Merge flags over the configured sandbox defaults
    pub fn sandbox_request(&self, defaults: &SandboxConfig) -> SandboxRequest {
        let mut request = defaults.request();

        if let Some(image) = &self.image {
            request.image = image.clone();
        }
        request.name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("stevedore-{}", &Uuid::new_v4().simple().to_string()[..12]));
        if let Some(mask) = self.mask_override() {
            request.mask_sensitive_paths = mask;
        }
        if self.host_network {
            request.use_host_network = true;
        }
        if self.no_network {
            request.disable_network = true;
        }
        if self.readonly {
            request.readonly_rootfs = true;
        }
        for mount in &self.mounts {
            request = request.with_mount(mount.clone());
        }
        for (key, value) in &self.env {
            request = request.with_env(key, value);
        }
        request
    }

    pub fn shell_command(&self) -> String {
        self.command.join(" ")
    }

    pub fn deadline(&self, defaults: &SandboxConfig) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| defaults.exec_timeout())
    }
}

/// Process exit status for an exec exit code
pub fn exit_status(exit_code: i64) -> i32 {
    match i32::try_from(exit_code) {
        Ok(code @ 0..=255) => code,
        _ => EXIT_STATUS_UNAVAILABLE,
    }
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    let runtime =
        DockerRuntime::connect(&config.docker).context("Failed to configure Docker client")?;
    let manager = SandboxManager::with_options(Arc::new(runtime), config.lifecycle.options());

    let request = args.sandbox_request(&config.sandbox);
    let Some(mut handle) = manager.create(&request).await else {
        bail!(
            "Failed to start sandbox '{}' from image '{}'",
            request.name,
            request.image
        );
    };
    info!(name = %request.name, id = %handle.short_id(), "sandbox ready");

    let exec = ExecRequest::new(args.shell_command(), args.deadline(&config.sandbox))
        .privileged(args.privileged);
    let result = if args.json {
        manager.run(&handle, exec).await
    } else {
        let mut stdout = tokio::io::stdout();
        let mut stderr = tokio::io::stderr();
        manager
            .run(&handle, exec.stdout(&mut stdout).stderr(&mut stderr))
            .await
    };

    let address = if args.inspect {
        Some(manager.address(&handle).await)
    } else {
        None
    };
    let logs = if args.logs {
        match manager.logs(&handle).await {
            Ok(logs) => Some(logs),
            Err(e) => {
                warn!(error = %e, "could not read container logs");
                None
            }
        }
    } else {
        None
    };

    manager.cleanup(&mut handle).await;

    let status = exit_status(result.exit_code);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary(&request, &result, address, logs))?);
    } else {
        if let Some(error) = &result.error {
            eprintln!("stevedore: {}", error);
        }
        if let Some(address) = address {
            println!("address: {}", if address.is_empty() { "-" } else { &address });
        }
        if let Some(logs) = logs {
            println!("--- container logs ---");
            print!("{}", logs);
        }
    }

    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

fn summary(
    request: &SandboxRequest,
    result: &ExecutionResult,
    address: Option<String>,
    logs: Option<String>,
) -> serde_json::Value {
    json!({
        "name": request.name,
        "image": request.image,
        "exit_code": result.exit_code,
        "transcript": result.transcript,
        "error": result.error.as_ref().map(|e| e.to_string()),
        "address": address,
        "logs": logs,
    })
}
