use std::sync::{Arc, OnceLock, Weak};

use mavbridge_link::{Link, Packet, TransportError};
use tracing::trace;

use crate::subscriber::{Subscriber, SubscriberError};

/// Relays received packets onto another link.
///
/// Connect one to the [`LinkStream`](crate::LinkStream) of link A with a
/// handle to link B and every packet from A is re-sent on B. The target
/// link restamps the sequence number; source ids pass through unchanged.
///
/// Holds the target weakly so a bridge pair cannot keep each other alive.
/// A target that has no peer yet (a UDP link waiting for its first
/// datagram) silently drops the packet, and so does a forwarder whose
/// target has not been bound yet.
pub struct LinkForwarder {
    name: String,
    target: OnceLock<Weak<dyn Link>>,
}

impl LinkForwarder {
    pub fn new(target: &Arc<dyn Link>) -> Arc<Self> {
        let forwarder = Self::unbound(target.name());
        forwarder.bind(target);
        forwarder
    }

    /// A forwarder that can be connected to a stream before its target
    /// link is open. Call [`bind`](Self::bind) once the target exists.
    pub fn unbound(target_name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: format!("forward:{target_name}"),
            target: OnceLock::new(),
        })
    }

    /// Set the target link. Returns false if one was already bound.
    pub fn bind(&self, target: &Arc<dyn Link>) -> bool {
        self.target.set(Arc::downgrade(target)).is_ok()
    }
}

impl Subscriber for LinkForwarder {
    fn receive(
        &self,
        packet: &Packet,
        _system_id: u8,
        _component_id: u8,
    ) -> std::result::Result<(), SubscriberError> {
        let Some(target) = self.target.get() else {
            trace!(link = %self.name, message_id = packet.message_id(), "not bound, dropped");
            return Ok(());
        };
        let target = target
            .upgrade()
            .ok_or_else(|| TransportError::Closed(self.name.clone()))?;
        match target.send(packet) {
            Ok(()) => Ok(()),
            Err(TransportError::NotConnected(_)) => {
                trace!(link = %self.name, message_id = packet.message_id(), "no peer, dropped");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
