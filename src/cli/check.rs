//! `stevedore check`

use crate::config::load_config;
use anyhow::Context;
use std::sync::Arc;
use stevedore_core::SandboxManager;
use stevedore_docker::DockerRuntime;

pub async fn run() -> anyhow::Result<()> {
    println!("Stevedore Check\n");

    let config = load_config()?;
    let endpoint = config
        .docker
        .endpoint
        .clone()
        .unwrap_or_else(|| "local defaults".to_string());

    print!("Connecting to Docker ({})... ", endpoint);
    let runtime = DockerRuntime::connect(&config.docker).context("Failed to configure Docker client")?;
    let manager = SandboxManager::new(Arc::new(runtime));

    match manager.ping().await {
        Ok(()) => {
            println!("✅ reachable");
            println!("  default image: {}", config.sandbox.image);
            Ok(())
        }
        Err(e) => {
            println!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
