//! The lifecycle as a pure transition table.
//!
//! [`transition`] maps the persisted [`Phase`], what was observed of the relations and one
//! [`Event`] to the actions to run and the phase to commit once they all succeeded. It does no
//! I/O; the executor in [`super::handlers`] runs the actions.

use crate::{relations::PeerStatus, state::Phase, status::WorkloadState};

pub const INSTALLING: &str = "Installing Kafka";
pub const WAITING_FOR_RELATION: &str = "Waiting for relation to Zookeeper";
pub const WAITING_FOR_READY: &str = "Waiting for Zookeeper to become ready";
pub const SETTING_UP: &str = "Setting up Kafka";
pub const READY: &str = "Ready";
pub const STOPPING: &str = "Zookeeper not ready, stopping Kafka";

/// Why the coordinator is looking at the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Re-check the unit; queued on every invocation and after every phase change.
    Evaluate,
    /// The Zookeeper membership differs from what was last rendered.
    PeersChanged,
    /// The bind selector differs from what was last rendered.
    ConfigChanged,
    /// A client application is related.
    ClientJoined,
}

/// Relation state observed at the start of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub peers: PeerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Report(WorkloadState, &'static str),
    /// Verify the resource, install the distribution and open the exposed ports.
    Install,
    /// Render the configuration for the first start.
    Configure,
    Start,
    /// Render the configuration and restart the broker according to the restart policy.
    Reconfigure,
    Stop,
    /// Publish the broker port and the ensemble to related clients.
    ServeClients,
    /// Tell the Zookeeper relation its pending joins and departures were handled.
    AcknowledgePeers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub actions: Vec<Action>,
    pub next: Phase,
}

impl Transition {
    fn stay(phase: Phase, actions: Vec<Action>) -> Self {
        Self {
            actions,
            next: phase,
        }
    }
}

/// The transition table.
pub fn transition(phase: Phase, observation: &Observation, event: Event) -> Transition {
    use Action as A;
    use PeerStatus as P;
    use WorkloadState as W;

    match (phase, observation.peers, event) {
        (Phase::Uninstalled, _, _) => Transition {
            actions: vec![A::Report(W::Maintenance, INSTALLING), A::Install],
            next: Phase::Installed,
        },
        (Phase::Installed, P::Ready, _) => {
            let mut actions = vec![
                A::Report(W::Maintenance, SETTING_UP),
                A::Configure,
                A::Start,
                A::AcknowledgePeers,
                A::Report(W::Active, READY),
            ];
            if event == Event::ClientJoined {
                actions.push(A::ServeClients);
            }
            Transition {
                actions,
                next: Phase::Started,
            }
        }
        (Phase::Installed, P::Absent, Event::Evaluate) => Transition::stay(
            phase,
            vec![A::Report(W::Blocked, WAITING_FOR_RELATION)],
        ),
        (Phase::Installed, P::Connected, Event::Evaluate) => Transition::stay(
            phase,
            vec![A::Report(W::Waiting, WAITING_FOR_READY)],
        ),
        (Phase::Installed, P::Absent | P::Connected, _) => Transition::stay(phase, Vec::new()),
        (Phase::Started, P::Ready, Event::PeersChanged | Event::ConfigChanged) => {
            Transition::stay(phase, vec![A::Reconfigure, A::AcknowledgePeers])
        }
        (Phase::Started, P::Ready, Event::ClientJoined) => {
            Transition::stay(phase, vec![A::ServeClients])
        }
        (Phase::Started, P::Ready, Event::Evaluate) => {
            Transition::stay(phase, vec![A::Report(W::Active, READY)])
        }
        (Phase::Started, P::Absent | P::Connected, _) => Transition {
            actions: vec![
                A::Report(W::Maintenance, STOPPING),
                A::Stop,
                A::Report(W::Waiting, WAITING_FOR_READY),
            ],
            next: Phase::Installed,
        },
    }
}
