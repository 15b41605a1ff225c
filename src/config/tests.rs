//! Tests for configuration loading

use super::loader::{load_with_env, DEFAULT_CONFIG};
use super::*;
use config::{Environment, Map};

fn env(vars: &[(&str, &str)]) -> Environment {
    let source: Map<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Environment::with_prefix("STEVEDORE").source(Some(source))
}

#[test]
fn test_embedded_defaults() {
    let config = load_with_env(env(&[])).unwrap();

    assert!(config.docker.endpoint.is_none());
    assert_eq!(config.docker.timeout_secs, 120);
    assert_eq!(config.sandbox.image, "alpine:latest");
    assert_eq!(config.sandbox.command, vec!["tail", "-f", "/dev/null"]);
    assert!(config.sandbox.mask_sensitive_paths);
    assert_eq!(config.sandbox.exec_timeout_secs, 60);
    assert!(config.sandbox.stop_timeout_secs.is_none());
    assert_eq!(config.lifecycle.stop_grace_secs, 1);
    assert!(!config.lifecycle.reclaim_unstarted);
    assert!(!config.lifecycle.stop_on_exec_timeout);
}

#[test]
fn test_environment_overrides() {
    let config = load_with_env(env(&[
        ("STEVEDORE_DOCKER__ENDPOINT", "tcp://10.0.0.2:2375"),
        ("STEVEDORE_SANDBOX__IMAGE", "busybox:1.36"),
        ("STEVEDORE_SANDBOX__EXEC_TIMEOUT_SECS", "5"),
        ("STEVEDORE_LIFECYCLE__RECLAIM_UNSTARTED", "true"),
    ]))
    .unwrap();

    assert_eq!(config.docker.endpoint.as_deref(), Some("tcp://10.0.0.2:2375"));
    assert_eq!(config.sandbox.image, "busybox:1.36");
    assert_eq!(config.sandbox.exec_timeout(), Duration::from_secs(5));
    assert!(config.lifecycle.reclaim_unstarted);
}

#[test]
fn test_embedded_toml_parses_alone() {
    let config: AppConfig = toml_config(DEFAULT_CONFIG);
    assert_eq!(config.sandbox.image, "alpine:latest");
}

fn toml_config(source: &str) -> AppConfig {
    config::Config::builder()
        .add_source(config::File::from_str(source, config::FileFormat::Toml))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

#[test]
fn test_missing_sections_use_defaults() {
    let config = toml_config("[sandbox]\nimage = \"debian:stable\"\n");
    assert_eq!(config.sandbox.image, "debian:stable");
    assert!(config.sandbox.mask_sensitive_paths);
    assert_eq!(config.docker.timeout_secs, 120);
    assert_eq!(config.lifecycle.stop_grace_secs, 1);
}

#[test]
fn test_code_defaults_match_embedded_toml() {
    let embedded = toml_config(DEFAULT_CONFIG).sandbox;
    let omitted = toml_config("[sandbox]\nimage = \"alpine:latest\"\n").sandbox;
    let fallback = SandboxConfig::default();

    assert_eq!(omitted.command, embedded.command);
    assert_eq!(fallback.command, embedded.command);
    assert_eq!(fallback.image, embedded.image);
    assert_eq!(fallback.exec_timeout_secs, embedded.exec_timeout_secs);
    assert_eq!(fallback.mask_sensitive_paths, embedded.mask_sensitive_paths);
}

#[test]
fn test_sandbox_request_from_defaults() {
    let sandbox = SandboxConfig {
        stop_timeout_secs: Some(10),
        disable_network: true,
        ..SandboxConfig::default()
    };
    let request = sandbox.request();

    assert_eq!(request.image, "alpine:latest");
    assert!(request.mask_sensitive_paths);
    assert!(request.disable_network);
    assert_eq!(request.stop_timeout, Some(10));
    assert_eq!(request.command, vec!["tail", "-f", "/dev/null"]);
}

#[test]
fn test_lifecycle_options() {
    let lifecycle = LifecycleConfig {
        stop_grace_secs: 5,
        stop_on_exec_timeout: true,
        ..LifecycleConfig::default()
    };
    let options = lifecycle.options();

    assert_eq!(options.stop_grace, Duration::from_secs(5));
    assert!(options.stop_on_exec_timeout);
    assert!(!options.reclaim_unstarted);
}
