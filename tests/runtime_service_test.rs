//! Tests for RuntimeService

#![cfg(unix)]

mod common;

use std::sync::Arc;

use stackup::application::services::RuntimeService;
use stackup::application::ApplicationError;
use stackup::config::Settings;
use stackup::domain::{RuntimeKind, Version};
use stackup::util::testing;

use common::MockCommandRunner;

fn service(cmd: MockCommandRunner) -> RuntimeService {
    testing::init_test_setup();
    RuntimeService::new(Arc::new(cmd), Arc::new(Settings::default()))
}

// ============================================================
// detect() tests
// ============================================================

#[test]
fn given_docker_and_podman_when_detect_then_prefers_docker() {
    let cmd = MockCommandRunner::docker().respond("podman --version", 0, "podman version 4.9.3");
    let svc = service(cmd);

    assert_eq!(svc.detect(None).unwrap(), RuntimeKind::Docker);
    assert_eq!(
        svc.installed(),
        vec![RuntimeKind::Docker, RuntimeKind::Podman]
    );
}

#[test]
fn given_only_podman_when_detect_then_returns_podman() {
    let svc = service(MockCommandRunner::podman());

    assert_eq!(svc.detect(None).unwrap(), RuntimeKind::Podman);
}

#[test]
fn given_broken_docker_binary_when_detect_then_skips_it() {
    let cmd = MockCommandRunner::podman().respond_err("docker --version", 127, "broken");
    let svc = service(cmd);

    assert_eq!(svc.detect(None).unwrap(), RuntimeKind::Podman);
}

#[test]
fn given_preferred_runtime_missing_when_detect_then_no_fallback() {
    let svc = service(MockCommandRunner::docker());

    let err = svc.detect(Some(RuntimeKind::Podman)).unwrap_err();

    match err {
        ApplicationError::RuntimeNotFound { searched } => assert_eq!(searched, vec!["podman"]),
        other => panic!("expected RuntimeNotFound, got {other:?}"),
    }
}

#[test]
fn given_nothing_installed_when_detect_then_lists_searched_runtimes() {
    let svc = service(MockCommandRunner::new());

    let err = svc.detect(None).unwrap_err();

    assert_eq!(
        err.to_string(),
        "no container runtime found (searched: docker, podman)"
    );
}

// ============================================================
// compose_tool() tests
// ============================================================

#[test]
fn given_compose_plugin_when_compose_tool_then_uses_plugin_form() {
    let svc = service(MockCommandRunner::docker());

    let tool = svc.compose_tool(RuntimeKind::Docker).unwrap();

    assert_eq!(tool.program, "docker");
    assert_eq!(tool.base_args, vec!["compose"]);
    assert_eq!(tool.version, Version::new(2, 24, 5));
}

#[test]
fn given_only_standalone_compose_when_compose_tool_then_falls_back() {
    let svc = service(MockCommandRunner::podman());

    let tool = svc.compose_tool(RuntimeKind::Podman).unwrap();

    assert_eq!(tool.program, "podman-compose");
    assert!(tool.base_args.is_empty());
    assert_eq!(tool.display_name(), "podman-compose");
}

#[test]
fn given_old_compose_when_compose_tool_then_too_old() {
    let cmd = MockCommandRunner::new()
        .respond("docker compose version", 1, "")
        .respond("docker-compose version", 0, "docker-compose version 1.29.2, build 5becea4c");
    let svc = service(cmd);

    let err = svc.compose_tool(RuntimeKind::Docker).unwrap_err();

    match err {
        ApplicationError::ComposeTooOld {
            tool,
            found,
            required,
        } => {
            assert_eq!(tool, "docker-compose");
            assert_eq!(found, Version::new(1, 29, 2));
            assert_eq!(required, Version::new(2, 20, 0));
        }
        other => panic!("expected ComposeTooOld, got {other:?}"),
    }
}

#[test]
fn given_custom_minimum_when_compose_tool_then_uses_setting() {
    let settings = Settings {
        min_docker_compose: "2.30".into(),
        ..Settings::default()
    };
    let svc = RuntimeService::new(Arc::new(MockCommandRunner::docker()), Arc::new(settings));

    assert!(matches!(
        svc.compose_tool(RuntimeKind::Docker),
        Err(ApplicationError::ComposeTooOld { .. })
    ));
}

#[test]
fn given_no_compose_when_compose_tool_then_unavailable() {
    let cmd = MockCommandRunner::new().respond("docker compose version", 0, "unknown command");
    let svc = service(cmd);

    let err = svc.compose_tool(RuntimeKind::Docker).unwrap_err();

    assert_eq!(
        err.to_string(),
        "no compose tool available for docker: tried docker compose, docker-compose"
    );
}

// ============================================================
// check_connectivity() / resolve() tests
// ============================================================

#[test]
fn given_daemon_down_when_check_connectivity_then_reports_stderr() {
    let cmd = MockCommandRunner::new().respond_err(
        "docker info",
        1,
        "Cannot connect to the Docker daemon at unix:///var/run/docker.sock.\n",
    );
    let svc = service(cmd);

    let err = svc.check_connectivity(RuntimeKind::Docker).unwrap_err();

    match err {
        ApplicationError::RuntimeUnreachable { runtime, message } => {
            assert_eq!(runtime, RuntimeKind::Docker);
            assert_eq!(
                message,
                "Cannot connect to the Docker daemon at unix:///var/run/docker.sock."
            );
        }
        other => panic!("expected RuntimeUnreachable, got {other:?}"),
    }
}

#[test]
fn given_working_docker_when_resolve_then_queries_version_and_info() {
    let cmd = Arc::new(MockCommandRunner::docker());
    let svc = RuntimeService::new(cmd.clone(), Arc::new(Settings::default()));

    let tool = svc.resolve(None).unwrap();

    assert_eq!(tool.runtime, RuntimeKind::Docker);
    assert_eq!(
        cmd.calls(),
        vec!["docker --version", "docker compose version", "docker info"]
    );
}
