//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: infra_services UNION with negation, scalars REPLACE
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use stackup::application::ApplicationError;
use stackup::config::{local_config_path, Settings};
use stackup::domain::RuntimeKind;

// ============================================================
// Settings::load() local config tests
// ============================================================

#[test]
fn given_no_local_config_when_load_then_defaults() {
    let project = TempDir::new().unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.env_file, PathBuf::from(".env"));
    assert_eq!(
        settings.compose_files,
        vec![PathBuf::from("docker-compose.yml")]
    );
}

#[test]
fn given_local_infra_services_when_load_then_unions_with_current() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "infra_services = [\"minio\"]\n",
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert!(settings.infra_services.contains(&"postgres".to_string()));
    assert_eq!(settings.infra_services.last(), Some(&"minio".to_string()));
}

#[test]
fn given_local_negation_when_load_then_removes_service() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "infra_services = [\"!redis\", \"!qdrant\"]\n",
    )
    .unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert!(!settings.infra_services.contains(&"redis".to_string()));
    assert!(!settings.infra_services.contains(&"qdrant".to_string()));
}

#[test]
fn given_local_scalars_when_load_then_replace() {
    let project = TempDir::new().unwrap();
    let local = r#"
env_file = "deploy/.env"
compose_files = ["compose.yml", "compose.override.yml"]
project_name = "rag"
runtime = "podman"
log_tail = 25
"#;
    fs::write(local_config_path(project.path()), local).unwrap();

    let settings = Settings::load(Some(project.path())).expect("load settings");

    assert_eq!(settings.env_file, PathBuf::from("deploy/.env"));
    assert_eq!(settings.compose_files.len(), 2);
    assert_eq!(settings.project_name.as_deref(), Some("rag"));
    assert_eq!(settings.runtime, Some(RuntimeKind::Podman));
    assert_eq!(settings.log_tail, 25);
    assert_eq!(
        settings.env_path(project.path()),
        project.path().join("deploy/.env")
    );
}

#[test]
fn given_invalid_toml_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(local_config_path(project.path()), "log_tail = [not toml").unwrap();

    let err = Settings::load(Some(project.path())).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains(".stackup.toml"));
}

#[test]
fn given_unknown_runtime_when_load_then_config_error() {
    let project = TempDir::new().unwrap();
    fs::write(local_config_path(project.path()), "runtime = \"lxc\"\n").unwrap();

    assert!(matches!(
        Settings::load(Some(project.path())),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_empty_compose_files_when_load_then_rejected() {
    let project = TempDir::new().unwrap();
    fs::write(local_config_path(project.path()), "compose_files = []\n").unwrap();

    let err = Settings::load(Some(project.path())).unwrap_err();

    assert!(err.to_string().contains("compose_files"));
}

#[test]
fn given_effective_settings_when_rendered_then_reparses() {
    let project = TempDir::new().unwrap();
    fs::write(
        local_config_path(project.path()),
        "project_name = \"rag\"\n",
    )
    .unwrap();
    let settings = Settings::load(Some(project.path())).unwrap();

    let rendered = settings.to_toml().unwrap();
    let reparsed: Settings = toml::from_str(&rendered).unwrap();

    assert_eq!(reparsed, settings);
}
