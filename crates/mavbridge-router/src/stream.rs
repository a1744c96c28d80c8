use std::sync::Arc;

use mavbridge_link::{Packet, PacketHandler};
use tracing::trace;

use crate::subscriber::{deliver, DispatchReport, Subscriber, SubscriberList};

/// Fan-out of every packet received on one link.
///
/// Where the [`Router`](crate::Router) selects subscribers by message id,
/// a stream hands each packet to all of its subscribers. Bridges and raw
/// taps attach here; a router attaches here too and then dispatches by id.
pub struct LinkStream {
    name: String,
    subscribers: SubscriberList,
}

impl LinkStream {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            subscribers: SubscriberList::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a subscriber; it sees every packet published after this call.
    pub fn connect(&self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    /// Remove one connection of `subscriber`. Returns `false` if absent.
    pub fn disconnect(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        self.subscribers.remove(subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver one packet to every subscriber, in connection order.
    pub fn publish(&self, packet: &Packet) -> DispatchReport {
        trace!(
            stream = %self.name,
            message_id = packet.message_id(),
            sequence = packet.sequence(),
            "publish"
        );
        deliver(
            &self.subscribers.snapshot(),
            packet,
            packet.system_id(),
            packet.component_id(),
        )
    }

    /// Receive callback for opening a link that publishes into this stream.
    pub fn handler(self: &Arc<Self>) -> PacketHandler {
        let stream = Arc::clone(self);
        Arc::new(move |packet: &Packet| {
            stream.publish(packet);
        })
    }
}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStream")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
