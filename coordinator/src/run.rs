//! One coordinator invocation: load everything from disk, dispatch, persist.

use eyre::WrapErr as _;
use kafka_charm_common::interface::{self, Binding, SystemInterfaces};
use serde::Serialize;
use tracing::info;

use crate::{
    actions::{self, ActionOutput},
    cli::RuntimeArgs,
    config::{self, Config, InitSystem},
    lifecycle::{Collaborators, Coordinator},
    relations::{FileClientRelation, FileZookeeperRelation, PeerStatus},
    service::InitService,
    state::{Phase, StateStore, UnitState},
    status::{StatusFile, StatusRecord},
};

async fn load_config(args: &RuntimeArgs) -> eyre::Result<Config> {
    config::load(&args.dist, &args.options, &args.unit_name).await
}

fn init_system(args: &RuntimeArgs, config: &Config) -> InitSystem {
    args.init_system
        .unwrap_or(config.dist.service.init_system)
        .detect()
}

/// Runs the lifecycle handlers once and persists the resulting state.
///
/// The state is saved even when a handler failed, so transitions committed before the
/// failure are kept.
///
/// # Errors
///
/// Returns an error if the configuration or state can't be loaded or saved, or if a
/// handler failed.
pub async fn dispatch_once(args: &RuntimeArgs) -> eyre::Result<UnitState> {
    let config = load_config(args).await?;
    let init_system = init_system(args, &config);
    let paths = &config.dist.paths;

    let store = StateStore::new(&paths.state);
    let mut state = store.load()?;
    let mut zookeeper = FileZookeeperRelation::load(&paths.relations);
    let mut clients = FileClientRelation::load(&paths.relations);
    let mut status = StatusFile::load(&paths.state);
    let service = InitService::new(&config, init_system);

    let result = Coordinator::new(
        &config,
        init_system,
        Collaborators {
            zookeeper: &mut zookeeper,
            clients: &mut clients,
            service: &service,
            status: &mut status,
            interfaces: &SystemInterfaces,
        },
    )
    .dispatch(&mut state);

    store.save(&state)?;
    result.wrap_err("Lifecycle handler failed")?;
    info!(phase = ?state.phase, "Dispatch complete");
    Ok(state)
}

/// Runs the `get-zookeepers` lookup action.
///
/// # Errors
///
/// Returns an error if the descriptor can't be loaded or no connection string is configured.
pub async fn get_zookeepers(args: &RuntimeArgs) -> eyre::Result<ActionOutput> {
    let dist = config::load_dist(&args.dist).await?;
    actions::get_zookeepers(&dist.dirs.kafka_conf.path)
        .wrap_err("Failed to look up the Zookeeper connection string")
}

/// Resolves a bind selector against this machine's interfaces.
///
/// # Errors
///
/// Returns an error if the selector doesn't resolve.
pub fn resolve_interface(selector: &str) -> eyre::Result<Binding> {
    interface::resolve(selector).wrap_err(format!("Failed to resolve {selector:?}"))
}

/// What `status` prints.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub unit: String,
    pub phase: Phase,
    pub zookeeper: PeerStatus,
    pub flags: Vec<&'static str>,
    pub zookeeper_connect: Option<String>,
    pub status: Option<StatusRecord>,
}

/// Collects the unit's persisted state and the observed relation state.
///
/// # Errors
///
/// Returns an error if the configuration or state can't be loaded.
pub async fn status(args: &RuntimeArgs) -> eyre::Result<StatusReport> {
    let config = load_config(args).await?;
    let paths = &config.dist.paths;
    let state = StateStore::new(&paths.state).load()?;
    let zookeeper = PeerStatus::of(&FileZookeeperRelation::load(&paths.relations));
    Ok(StatusReport {
        flags: state.flags(zookeeper),
        unit: config.unit_name.clone(),
        phase: state.phase,
        zookeeper,
        zookeeper_connect: state.zookeeper_connect,
        status: StatusFile::read(&paths.state.join(StatusFile::FILE_NAME)),
    })
}
