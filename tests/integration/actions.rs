//! Operator commands: `get-zookeepers`, `resolve-interface` and `status`.

use serde_json::Value;

use crate::common::Deployment;

fn stdout_json(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_get_zookeepers_prints_connection_string() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.2", "10.0.0.1"]);
    deployment.dispatch_ok();

    let output = stdout_json(&deployment.run(&["get-zookeepers"]));
    assert_eq!(output["output"], "10.0.0.1:2181,10.0.0.2:2181");
}

#[test]
fn test_get_zookeepers_fails_before_install() {
    let deployment = Deployment::new();
    let output = deployment.run(&["get-zookeepers"]);
    assert!(!output.status.success(), "nothing is configured yet");
    assert!(output.stdout.is_empty(), "failures print nothing to stdout");
}

#[test]
fn test_resolve_interface_passes_wildcards_through() {
    let deployment = Deployment::new();
    for selector in ["0.0.0.0", "::"] {
        let output = deployment.run(&["resolve-interface", selector]);
        assert!(output.status.success(), "{selector}");
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), selector);
    }
}

#[test]
fn test_resolve_interface_finds_loopback_by_range() {
    let output = Deployment::new().run(&["resolve-interface", "127.0.0.0/8"]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let address = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    assert!(address.starts_with("127."), "{address}");
}

#[test]
fn test_resolve_interface_rejects_unknown_names() {
    let output = Deployment::new().run(&["resolve-interface", "nosuchif0"]);
    assert!(!output.status.success(), "unknown interfaces must not resolve");
}

#[test]
fn test_status_reports_phase_and_flags() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();

    let report = stdout_json(&deployment.run(&["status"]));
    assert_eq!(report["unit"], "kafka/1");
    assert_eq!(report["phase"], "started");
    assert_eq!(report["zookeeper_connect"], "10.0.0.1:2181");
    assert_eq!(report["status"]["state"], "active");
    let flags = report["flags"].as_array().unwrap();
    for flag in ["kafka.installed", "zookeeper.ready", "kafka.started"] {
        assert!(flags.iter().any(|f| f == flag), "{flag} missing from {flags:?}");
    }
}
