use kafka_charm_common::{
    LineEdit,
    interface::{self, Binding, InterfaceSource},
    re_edit_in_place,
};
use tracing::{debug, info};

use super::{CONSUMER_PROPERTIES, Kafka, SERVER_PROPERTIES};
use crate::{
    lifecycle::HandlerError,
    relations::{Peer, connection_string},
};

/// What a configuration pass wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub zookeeper_connect: String,
    pub binding: Option<Binding>,
    /// Digest of `server.properties` after the pass.
    pub server_digest: String,
}

impl Kafka<'_> {
    /// Points the broker at the given ensemble and, if a selector is configured, binds it.
    ///
    /// The selector is resolved before anything is written, so a resolver failure leaves
    /// the property files as they were.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Resolve`] if the bind selector can't be resolved, or
    /// [`HandlerError::Properties`] if a property file can't be rewritten.
    #[tracing::instrument(skip_all, fields(peers = peers.len()))]
    pub fn configure(
        &self,
        peers: &[Peer],
        interfaces: &dyn InterfaceSource,
    ) -> Result<Rendered, HandlerError> {
        let binding = self
            .config
            .options
            .network_interface
            .as_deref()
            .map(|selector| interface::resolve_with(selector, interfaces))
            .transpose()?;

        let zookeeper_connect = connection_string(peers);
        let connect = LineEdit::key("zookeeper.connect", &zookeeper_connect)?;

        let consumer = self.property_file(CONSUMER_PROPERTIES);
        let consumer_changed = re_edit_in_place(&consumer, core::slice::from_ref(&connect))?;

        let mut server_edits = vec![connect];
        if let Some(ref binding) = binding {
            server_edits.push(LineEdit::uncomment_key("host.name", binding)?);
        }
        let server = self.property_file(SERVER_PROPERTIES);
        let server_changed = re_edit_in_place(&server, &server_edits)?;

        if consumer_changed || server_changed {
            info!(%zookeeper_connect, ?binding, "Rendered Kafka configuration");
        } else {
            debug!(%zookeeper_connect, "Kafka configuration already up to date");
        }

        Ok(Rendered {
            zookeeper_connect,
            binding,
            server_digest: self.server_digest()?,
        })
    }
}
