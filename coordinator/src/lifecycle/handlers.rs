//! Executes transitions of the lifecycle machine against the collaborators.

use std::collections::VecDeque;

use kafka_charm_common::interface::InterfaceSource;
use tracing::{debug, error, info, warn};

use super::{
    HandlerError,
    machine::{self, Action, Event, Observation, READY, WAITING_FOR_READY},
};
use crate::{
    config::{Config, InitSystem, RestartPolicy},
    kafka::Kafka,
    relations::{ClientRelation, Peer, PeerError, PeerStatus, ZookeeperRelation, connection_string},
    service::ServiceControl,
    state::UnitState,
    status::{StatusSink, WorkloadState},
};

const RESTARTING: &str = "Server config changed: restarting Kafka";

/// Everything the coordinator talks to besides the Kafka installation itself.
pub struct Collaborators<'a> {
    pub zookeeper: &'a mut dyn ZookeeperRelation,
    pub clients: &'a mut dyn ClientRelation,
    pub service: &'a dyn ServiceControl,
    pub status: &'a mut dyn StatusSink,
    pub interfaces: &'a dyn InterfaceSource,
}

/// Whether the remaining actions of a transition should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Skip the rest of the transition without committing it.
    Abort,
}

/// Drives one unit through the lifecycle machine.
pub struct Coordinator<'a> {
    config: &'a Config,
    init_system: InitSystem,
    kafka: Kafka<'a>,
    collaborators: Collaborators<'a>,
}

impl<'a> Coordinator<'a> {
    /// `init_system` must already be detected, see [`InitSystem::detect`].
    pub fn new(
        config: &'a Config,
        init_system: InitSystem,
        collaborators: Collaborators<'a>,
    ) -> Self {
        Self {
            config,
            init_system,
            kafka: Kafka::new(config),
            collaborators,
        }
    }

    /// Observes the relations, derives the pending events and runs them through the machine.
    ///
    /// Each transition is applied to a copy of `state` that replaces it only when every
    /// action of the transition succeeded, so `state` always holds the last committed phase.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`HandlerError`]; the unit's status is set to blocked with its
    /// message before returning. Peer discovery failures are not fatal.
    #[tracing::instrument(skip_all, fields(unit = %self.config.unit_name, phase = ?state.phase))]
    pub fn dispatch(&mut self, state: &mut UnitState) -> Result<(), HandlerError> {
        let observation = Observation {
            peers: PeerStatus::of(&*self.collaborators.zookeeper),
        };
        let mut queue = self.pending_events(state, observation);
        debug!(?observation, ?queue, "Dispatching");

        while let Some(event) = queue.pop_front() {
            if !self.is_pending(event, state) {
                debug!(?event, "No longer pending");
                continue;
            }
            let transition = machine::transition(state.phase, &observation, event);
            let mut scratch = state.clone();
            let mut flow = Flow::Continue;
            for &action in &transition.actions {
                flow = match self.execute(action, &mut scratch) {
                    Ok(flow) => flow,
                    Err(e) => {
                        error!(?action, error = %e, "Handler failed");
                        self.collaborators
                            .status
                            .status_set(WorkloadState::Blocked, &e.to_string());
                        return Err(e);
                    }
                };
                if flow == Flow::Abort {
                    break;
                }
            }
            if flow == Flow::Abort {
                debug!(?event, "Transition skipped");
                continue;
            }
            scratch.phase = transition.next;
            if scratch.phase != state.phase {
                info!(from = ?state.phase, to = ?scratch.phase, ?event, "Phase changed");
                queue.push_back(Event::Evaluate);
            }
            *state = scratch;
        }
        Ok(())
    }

    fn pending_events(&self, state: &UnitState, observation: Observation) -> VecDeque<Event> {
        let mut queue = VecDeque::from([Event::Evaluate]);
        if observation.peers == PeerStatus::Ready {
            for event in [Event::PeersChanged, Event::ConfigChanged] {
                if self.is_pending(event, state) {
                    queue.push_back(event);
                }
            }
            if self.collaborators.clients.is_joined() {
                queue.push_back(Event::ClientJoined);
            }
        }
        queue
    }

    fn is_pending(&self, event: Event, state: &UnitState) -> bool {
        match event {
            Event::Evaluate | Event::ClientJoined => true,
            Event::PeersChanged => {
                let zookeeper = &*self.collaborators.zookeeper;
                zookeeper.has_pending_changes()
                    || zookeeper.get_peers().map_or(true, |peers| {
                        state.zookeeper_connect.as_deref() != Some(connection_string(&peers).as_str())
                    })
            }
            Event::ConfigChanged => {
                state.network_interface != self.config.options.network_interface
            }
        }
    }

    fn execute(&mut self, action: Action, state: &mut UnitState) -> Result<Flow, HandlerError> {
        debug!(?action, "Executing");
        match action {
            Action::Report(workload, message) => {
                self.collaborators.status.status_set(workload, message);
            }
            Action::Install => {
                self.kafka.install(self.init_system)?;
                for port in self.config.dist.exposed_ports() {
                    self.collaborators.status.open_port(port);
                }
            }
            Action::Configure => {
                let Some(peers) = self.discover_peers()? else {
                    self.collaborators
                        .status
                        .status_set(WorkloadState::Waiting, WAITING_FOR_READY);
                    return Ok(Flow::Abort);
                };
                self.render(&peers, state)?;
            }
            Action::Start => self
                .collaborators
                .service
                .start()
                .map_err(HandlerError::Service)?,
            // A broker that already died makes the stop command fail; it is down either way.
            Action::Stop => {
                if let Err(reason) = self.collaborators.service.stop() {
                    warn!(%reason, "Stopping Kafka failed, treating it as stopped");
                }
            }
            Action::Reconfigure => {
                info!("Checking Zookeeper configuration");
                let Some(peers) = self.discover_peers()? else {
                    return Ok(Flow::Abort);
                };
                let previous = state.server_digest.clone();
                self.render(&peers, state)?;
                let changed = previous != state.server_digest;
                if changed || self.config.options.restart_policy == RestartPolicy::Always {
                    info!(changed, policy = ?self.config.options.restart_policy, "Restarting Kafka");
                    self.collaborators
                        .status
                        .status_set(WorkloadState::Maintenance, RESTARTING);
                    self.collaborators
                        .service
                        .restart()
                        .map_err(HandlerError::Service)?;
                    self.collaborators
                        .status
                        .status_set(WorkloadState::Active, READY);
                } else {
                    debug!("Server config unchanged, not restarting");
                }
            }
            Action::ServeClients => {
                let Some(peers) = self.discover_peers()? else {
                    return Ok(Flow::Abort);
                };
                let port = self.config.dist.kafka_port().map_err(HandlerError::Config)?;
                self.collaborators.clients.send_port(port)?;
                self.collaborators.clients.send_peer_list(&peers)?;
                info!(port, "Sent Kafka configuration to client");
            }
            Action::AcknowledgePeers => {
                self.collaborators.zookeeper.notify_departing_handled()?;
                self.collaborators.zookeeper.notify_joining_handled()?;
            }
        }
        Ok(Flow::Continue)
    }

    /// The current ensemble, or `None` when discovery failed and the attempt should be skipped.
    fn discover_peers(&self) -> Result<Option<Vec<Peer>>, HandlerError> {
        match self.collaborators.zookeeper.get_peers() {
            Ok(peers) => Ok(Some(peers)),
            Err(PeerError::Discovery(reason)) => {
                warn!(%reason, "Zookeeper peers unavailable, skipping until the next event");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn render(&self, peers: &[Peer], state: &mut UnitState) -> Result<(), HandlerError> {
        let rendered = self.kafka.configure(peers, self.collaborators.interfaces)?;
        state.zookeeper_connect = Some(rendered.zookeeper_connect);
        state.network_interface.clone_from(&self.config.options.network_interface);
        state.server_digest = Some(rendered.server_digest);
        Ok(())
    }
}
