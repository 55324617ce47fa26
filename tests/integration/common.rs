//! Common utilities for integration tests.
//!
//! A [`Deployment`] is a fake Kafka distribution plus descriptor, options and relation files in
//! a temporary directory. The distribution's start/stop scripts append to `service.log` instead
//! of running a broker.

use std::fs;
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use kafka_charm_common::find_value;
use serde::Deserialize;
use tempfile::TempDir;

pub const SERVER: &str = "\
broker.id=0
port=9092
#advertised.host.name=<hostname routable by clients>
log.dirs=/tmp/kafka-logs
zookeeper.connect=localhost:2181
#host.name=localhost
";

const CONSUMER: &str = "zookeeper.connect=127.0.0.1:2181\ngroup.id=test-consumer-group\n";
const PRODUCER: &str = "#metadata.broker.list=localhost:9092\nproducer.type=sync\n";
const LOG4J: &str = "kafka.logs.dir=logs\nlog4j.rootLogger=INFO, stdout\n";

const DIST: &str = r#"
[service]
init_system = "serviceless"

[paths]
resources = "resources"
state = "state"
relations = "relations"
environment_file = "etc/environment"

[resources]
kafka = "kafka-it"

[dirs.kafka]
path = "opt/kafka"
[dirs.kafka_conf]
path = "etc/kafka/conf"
[dirs.kafka_app_logs]
path = "var/log/kafka"
[dirs.kafka_data_logs]
path = "var/lib/kafka"

[ports.kafka]
port = 9092
exposed = true
"#;

/// Contents of `status.json`.
#[derive(Debug, Deserialize)]
pub struct StatusRecord {
    pub state: String,
    pub message: String,
    pub opened_ports: Vec<u16>,
}

pub struct Deployment {
    pub dir: TempDir,
    pub dist: PathBuf,
    pub options: PathBuf,
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn get_coordinator_bin() -> &'static str {
    env!("CARGO_BIN_EXE_kafka_coordinator")
}

impl Deployment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path();

        let resource = root.join("resources").join("kafka-it");
        let log = root.join("service.log");
        for (script, word) in [
            ("kafka-server-start.sh", "start"),
            ("kafka-server-stop.sh", "stop"),
        ] {
            let path = resource.join("bin").join(script);
            write(
                &path,
                &format!("#!/bin/sh\necho {word} >> '{}'\n", log.display()),
            );
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        for (name, content) in [
            ("server.properties", SERVER),
            ("consumer.properties", CONSUMER),
            ("producer.properties", PRODUCER),
            ("log4j.properties", LOG4J),
        ] {
            write(&resource.join("config").join(name), content);
        }
        fs::create_dir_all(root.join("etc")).unwrap();

        let dist = root.join("dist.toml");
        write(&dist, DIST);
        let options = root.join("options.toml");
        write(&options, "hostname = \"kafka-it\"\n");

        Self { dir, dist, options }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Runs the coordinator binary with this deployment's descriptor and options.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(get_coordinator_bin())
            .args(args)
            .arg("--dist")
            .arg(&self.dist)
            .arg("--options")
            .arg(&self.options)
            .args(["--unit-name", "kafka/1"])
            .env("KAFKA_CHARM_INTEGRATION_TEST", "1")
            .output()
            .expect("failed to run kafka_coordinator")
    }

    pub fn dispatch(&self) -> Output {
        self.run(&["dispatch"])
    }

    /// Dispatches and asserts success.
    pub fn dispatch_ok(&self) {
        let output = self.dispatch();
        assert!(
            output.status.success(),
            "dispatch failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    pub fn set_zookeeper(&self, relation_toml: &str) {
        write(&self.path("relations/zookeeper.toml"), relation_toml);
    }

    /// A ready relation listing `hosts` on port 2181, in the given order.
    pub fn set_zookeeper_ready(&self, hosts: &[&str]) {
        let mut relation = String::from("connected = true\nready = true\n");
        for host in hosts {
            relation.push_str(&format!("\n[[peers]]\nhost = \"{host}\"\nport = 2181\n"));
        }
        self.set_zookeeper(&relation);
    }

    /// Makes the installed stop script fail the way it does when no broker is running.
    pub fn fail_stop(&self) {
        write(
            &self.path("opt/kafka/bin/kafka-server-stop.sh"),
            &format!(
                "#!/bin/sh\necho stop >> '{}'\necho 'No kafka server to stop' >&2\nexit 1\n",
                self.path("service.log").display()
            ),
        );
    }

    pub fn set_options(&self, options_toml: &str) {
        write(&self.options, options_toml);
    }

    pub fn service_log(&self) -> Vec<String> {
        fs::read_to_string(self.path("service.log"))
            .unwrap_or_default()
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn status(&self) -> StatusRecord {
        let content = fs::read_to_string(self.path("state/status.json")).expect("no status record");
        serde_json::from_str(&content).expect("invalid status record")
    }

    pub fn phase(&self) -> String {
        let content = fs::read_to_string(self.path("state/state.json")).expect("no unit state");
        let state: serde_json::Value = serde_json::from_str(&content).unwrap();
        state["phase"].as_str().unwrap().to_owned()
    }

    pub fn conf(&self, name: &str) -> String {
        fs::read_to_string(self.path("etc/kafka/conf").join(name)).unwrap()
    }

    /// The value of `key` in a configured property file.
    pub fn property(&self, file: &str, key: &str) -> Option<String> {
        find_value(&self.conf(file), key)
    }
}
