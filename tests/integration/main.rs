//! Uses the single integration test approach.
//!
//! This improves parallelism when running the tests, and reduces the number of binaries that have to be built (and linked)

mod actions;
mod common;
mod lifecycle;

use common::Deployment;

#[test]
fn test_help_runs() {
    let output = Deployment::new().run(&["--help"]);
    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dispatch"), "{stdout}");
    assert!(stdout.contains("get-zookeepers"), "{stdout}");
}

#[test]
fn test_missing_descriptor_fails() {
    let deployment = Deployment::new();
    std::fs::remove_file(&deployment.dist).unwrap();
    let output = deployment.dispatch();
    assert!(!output.status.success(), "dispatch without descriptor should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("deployment descriptor"), "{stderr}");
}
