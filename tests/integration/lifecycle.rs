//! Lifecycle scenarios driven through `kafka_coordinator dispatch`.

use std::fs;

use kafka_charm_common::Environment;
use serde_json::Value;

use crate::common::Deployment;

#[test]
fn test_fresh_unit_installs_then_blocks_without_zookeeper() {
    let deployment = Deployment::new();
    deployment.dispatch_ok();

    assert_eq!(deployment.phase(), "installed");
    let status = deployment.status();
    assert_eq!(status.state, "blocked");
    assert_eq!(status.message, "Waiting for relation to Zookeeper");
    assert_eq!(status.opened_ports, vec![9092]);

    assert_eq!(
        deployment.property("server.properties", "broker.id").as_deref(),
        Some("1")
    );
    assert_eq!(
        deployment.property("server.properties", "advertised.host.name").as_deref(),
        Some("kafka-it")
    );
    let environment =
        Environment::parse(&fs::read_to_string(deployment.path("etc/environment")).unwrap());
    let log_dir = deployment.path("var/log/kafka");
    assert_eq!(environment.get("LOG_DIR"), log_dir.to_str());
    let bin = deployment.path("opt/kafka/bin");
    assert!(
        environment
            .get("PATH")
            .is_some_and(|path| path.split(':').any(|dir| Some(dir) == bin.to_str())),
        "kafka bin dir should be on PATH"
    );
    assert!(
        deployment.service_log().is_empty(),
        "nothing may start before Zookeeper is ready"
    );
}

#[test]
fn test_connected_zookeeper_waits() {
    let deployment = Deployment::new();
    deployment.set_zookeeper("connected = true\nready = false\n");
    deployment.dispatch_ok();

    let status = deployment.status();
    assert_eq!(status.state, "waiting");
    assert_eq!(status.message, "Waiting for Zookeeper to become ready");
    assert!(deployment.service_log().is_empty());
}

#[test]
fn test_ready_zookeeper_starts_broker() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.2", "10.0.0.1"]);
    deployment.dispatch_ok();

    assert_eq!(deployment.phase(), "started");
    assert_eq!(deployment.service_log(), vec!["start"]);
    let status = deployment.status();
    assert_eq!(status.state, "active");
    assert_eq!(status.message, "Ready");

    for file in ["server.properties", "consumer.properties"] {
        assert_eq!(
            deployment.property(file, "zookeeper.connect").as_deref(),
            Some("10.0.0.1:2181,10.0.0.2:2181"),
            "{file}"
        );
    }
}

#[test]
fn test_reordered_peers_do_not_restart() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1", "10.0.0.2"]);
    deployment.dispatch_ok();
    deployment.set_zookeeper_ready(&["10.0.0.2", "10.0.0.1"]);
    deployment.dispatch_ok();

    assert_eq!(deployment.service_log(), vec!["start"]);
}

#[test]
fn test_peer_change_restarts_broker() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    deployment.set_zookeeper_ready(&["10.0.0.1", "10.0.0.3"]);
    deployment.dispatch_ok();

    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
    assert_eq!(
        deployment
            .property("server.properties", "zookeeper.connect")
            .as_deref(),
        Some("10.0.0.1:2181,10.0.0.3:2181")
    );
    assert_eq!(deployment.status().state, "active");
}

#[test]
fn test_always_policy_restarts_on_every_change() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    deployment.set_options("hostname = \"kafka-it\"\nrestart_policy = \"always\"\n");
    deployment.set_zookeeper(
        "connected = true\nready = true\njoining = [\"zookeeper/2\"]\n\n\
         [[peers]]\nhost = \"10.0.0.1\"\nport = 2181\n",
    );
    deployment.dispatch_ok();

    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
}

#[test]
fn test_losing_zookeeper_stops_broker() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    deployment.set_zookeeper("connected = true\nready = false\n");
    deployment.dispatch_ok();

    assert_eq!(deployment.phase(), "installed");
    assert_eq!(deployment.service_log(), vec!["start", "stop"]);
    assert_eq!(deployment.status().state, "waiting");

    // Readiness returning starts the broker again.
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
}

#[test]
fn test_missing_resource_blocks_and_fails() {
    let deployment = Deployment::new();
    fs::remove_dir_all(deployment.path("resources/kafka-it")).unwrap();
    let output = deployment.dispatch();

    assert!(!output.status.success(), "install without resources must fail");
    assert_eq!(deployment.phase(), "uninstalled");
    let status = deployment.status();
    assert_eq!(status.state, "blocked");
    assert!(
        status.message.starts_with("Missing Kafka resource artifacts"),
        "{}",
        status.message
    );
    assert!(!deployment.path("etc/kafka/conf").exists());
}

#[test]
fn test_clients_receive_port_and_zookeepers() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    fs::write(deployment.path("relations/client.toml"), "joined = true\n").unwrap();
    deployment.dispatch_ok();

    let published: Value = serde_json::from_str(
        &fs::read_to_string(deployment.path("relations/client.published.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(published["port"], 9092);
    assert_eq!(published["zookeepers"][0]["host"], "10.0.0.1");
    assert_eq!(published["zookeepers"][0]["port"], 2181);
}

#[test]
fn test_network_interface_binds_host_name_and_restarts() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    assert_eq!(deployment.property("server.properties", "host.name"), None);

    deployment.set_options("hostname = \"kafka-it\"\nnetwork_interface = \"lo\"\n");
    deployment.dispatch_ok();

    assert_eq!(
        deployment.property("server.properties", "host.name").as_deref(),
        Some("127.0.0.1")
    );
    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
    assert_eq!(deployment.status().state, "active");

    // Unchanged options don't rebind again.
    deployment.dispatch_ok();
    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
}

#[test]
fn test_unknown_network_interface_blocks_without_writes() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    let before = deployment.conf("server.properties");

    deployment.set_options("hostname = \"kafka-it\"\nnetwork_interface = \"nosuchif0\"\n");
    let output = deployment.dispatch();

    assert!(!output.status.success(), "unresolvable interface must fail");
    let status = deployment.status();
    assert_eq!(status.state, "blocked");
    assert!(status.message.contains("nosuchif0"), "{}", status.message);
    assert_eq!(deployment.conf("server.properties"), before);
    assert_eq!(deployment.service_log(), vec!["start"]);
    assert_eq!(deployment.phase(), "started");
}

#[test]
fn test_dead_broker_is_started_again_after_zookeeper_returns() {
    let deployment = Deployment::new();
    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    deployment.fail_stop();

    deployment.set_zookeeper("connected = true\nready = false\n");
    deployment.dispatch_ok();
    assert_eq!(deployment.phase(), "installed");
    assert_eq!(deployment.status().state, "waiting");

    deployment.set_zookeeper_ready(&["10.0.0.1"]);
    deployment.dispatch_ok();
    assert_eq!(deployment.phase(), "started");
    assert_eq!(deployment.service_log(), vec!["start", "stop", "start"]);
    assert_eq!(deployment.status().state, "active");
}
