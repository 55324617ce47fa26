//! Shared fixtures for unit tests: a fake distribution in a temporary directory.

use std::{
    collections::BTreeMap,
    fs,
    net::IpAddr,
    os::unix::fs::PermissionsExt as _,
    path::Path,
};

use kafka_charm_common::interface::{InterfaceAddr, InterfaceSource, ResolveError};
use tempfile::TempDir;

use crate::config::{
    Config, DirSpec, DistConfig, InitSystem, KafkaDirs, Options, PathsConfig, PortSpec,
    ServiceConfig,
};

pub const SERVER: &str = "\
broker.id=0
port=9092
#advertised.host.name=<hostname routable by clients>
log.dirs=/tmp/kafka-logs
zookeeper.connect=localhost:2181
#host.name=localhost
";

pub const CONSUMER: &str = "\
zookeeper.connect=127.0.0.1:2181
group.id=test-consumer-group
";

pub const PRODUCER: &str = "\
#metadata.broker.list=localhost:9092
producer.type=sync
";

pub const LOG4J: &str = "\
kafka.logs.dir=logs
log4j.rootLogger=INFO, stdout
";

/// Interface table with fixed `(name, address)` entries.
pub struct Fixed(pub Vec<(&'static str, &'static str)>);

impl InterfaceSource for Fixed {
    fn addresses(&self) -> Result<Vec<InterfaceAddr>, ResolveError> {
        Ok(self
            .0
            .iter()
            .map(|&(name, addr)| InterfaceAddr {
                name: name.to_owned(),
                addr: addr.parse::<IpAddr>().unwrap(),
            })
            .collect())
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    /// An unpacked distribution resource, nothing installed yet.
    pub fn fresh(network_interface: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let resource = root.join("resources").join("kafka-test");
        write_script(&resource, "kafka-server-start.sh");
        write_script(&resource, "kafka-server-stop.sh");
        for (name, content) in [
            ("server.properties", SERVER),
            ("consumer.properties", CONSUMER),
            ("producer.properties", PRODUCER),
            ("log4j.properties", LOG4J),
        ] {
            write(&resource.join("config").join(name), content);
        }
        write(&resource.join("libs").join("kafka.jar"), "");
        fs::create_dir_all(root.join("etc")).unwrap();

        let config = Config {
            dist: DistConfig {
                service: ServiceConfig {
                    init_system: InitSystem::Serviceless,
                    ..ServiceConfig::default()
                },
                paths: PathsConfig {
                    resources: root.join("resources"),
                    state: root.join("state"),
                    relations: root.join("relations"),
                    environment_file: root.join("etc").join("environment"),
                },
                resources: BTreeMap::from([("kafka".to_owned(), "kafka-test".to_owned())]),
                groups: Vec::new(),
                users: BTreeMap::new(),
                dirs: KafkaDirs {
                    kafka: dir_spec(root, "opt/kafka"),
                    kafka_conf: dir_spec(root, "etc/kafka/conf"),
                    kafka_app_logs: dir_spec(root, "var/log/kafka"),
                    kafka_data_logs: dir_spec(root, "var/lib/kafka"),
                },
                ports: BTreeMap::from([(
                    "kafka".to_owned(),
                    PortSpec {
                        port: 9092,
                        exposed: true,
                    },
                )]),
            },
            options: Options {
                network_interface: network_interface.map(ToOwned::to_owned),
                hostname: Some("kafka-3".to_owned()),
                ..Options::default()
            },
            unit_name: "kafka/3".to_owned(),
        };
        Self { dir, config }
    }

    /// Property files already in the conf dir, as after a successful install.
    pub fn installed(network_interface: Option<&str>) -> Self {
        let fixture = Self::fresh(network_interface);
        let conf = &fixture.config.dist.dirs.kafka_conf.path;
        for (name, content) in [
            ("server.properties", SERVER),
            ("consumer.properties", CONSUMER),
            ("producer.properties", PRODUCER),
            ("log4j.properties", LOG4J),
        ] {
            write(&conf.join(name), content);
        }
        fixture
    }
}

fn dir_spec(root: &Path, relative: &str) -> DirSpec {
    DirSpec {
        path: root.join(relative),
        owner: None,
        mode: None,
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn write_script(resource: &Path, name: &str) {
    let path = resource.join("bin").join(name);
    write(&path, "#!/bin/sh\nexit 0\n");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}
