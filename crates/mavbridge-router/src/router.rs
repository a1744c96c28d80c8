use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mavbridge_link::Packet;
use tracing::{debug, trace};

use crate::error::{Result, RouterError};
use crate::subscriber::{deliver, DispatchReport, Subscriber, SubscriberError, SubscriberList};

/// Number of message-id slots (ids 0..=255).
pub const MESSAGE_ID_SLOTS: usize = 256;

/// Counters accumulated across all dispatches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Packets passed to [`Router::dispatch`].
    pub dispatched: u64,
    /// Packets that no subscriber was registered for.
    pub unrouted: u64,
    /// Subscriber faults caught during dispatch.
    pub faults: u64,
}

/// Per-message-id fan-out dispatcher.
///
/// Slots are allocated once at construction and each is locked
/// independently, so registering for one id never blocks dispatch of
/// another. Instances are independent; share one through `Arc`.
pub struct Router {
    slots: Box<[SubscriberList]>,
    dispatched: AtomicU64,
    unrouted: AtomicU64,
    faults: AtomicU64,
}

impl Router {
    pub fn new() -> Self {
        let slots = (0..MESSAGE_ID_SLOTS)
            .map(|_| SubscriberList::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            dispatched: AtomicU64::new(0),
            unrouted: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    /// Append `subscriber` to the list for `message_id`.
    ///
    /// Ids outside 0..=255 are rejected with [`RouterError::InvalidId`] and
    /// leave every slot untouched. Registering the same subscriber twice
    /// makes it receive each packet twice.
    pub fn register(&self, message_id: u32, subscriber: Arc<dyn Subscriber>) -> Result<()> {
        let slot = self.slot(message_id)?;
        debug!(message_id, subscriber = subscriber.name(), "registering subscriber");
        slot.push(subscriber);
        Ok(())
    }

    /// Remove one registration of `subscriber` for `message_id`.
    ///
    /// Returns `false` if it was not registered there.
    pub fn unregister(&self, message_id: u32, subscriber: &Arc<dyn Subscriber>) -> Result<bool> {
        let removed = self.slot(message_id)?.remove(subscriber);
        if removed {
            debug!(message_id, subscriber = subscriber.name(), "unregistered subscriber");
        }
        Ok(removed)
    }

    /// Subscribers currently registered for `message_id`.
    pub fn subscriber_count(&self, message_id: u32) -> Result<usize> {
        Ok(self.slot(message_id)?.len())
    }

    /// Deliver `packet` to every subscriber of its message id, in
    /// registration order.
    ///
    /// Faults are logged and returned in the report; they never stop
    /// delivery. Safe to call from any number of threads.
    pub fn dispatch(&self, packet: &Packet, system_id: u8, component_id: u8) -> DispatchReport {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let subscribers = self.slots[usize::from(packet.message_id())].snapshot();
        if subscribers.is_empty() {
            self.unrouted.fetch_add(1, Ordering::Relaxed);
            trace!(message_id = packet.message_id(), "no subscribers");
            return DispatchReport::default();
        }

        let report = deliver(&subscribers, packet, system_id, component_id);
        if !report.faults.is_empty() {
            self.faults
                .fetch_add(report.faults.len() as u64, Ordering::Relaxed);
        }
        report
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unrouted: self.unrouted.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, message_id: u32) -> Result<&SubscriberList> {
        usize::try_from(message_id)
            .ok()
            .and_then(|index| self.slots.get(index))
            .ok_or(RouterError::InvalidId(message_id))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// A router can sit on a [`LinkStream`](crate::LinkStream) so that every
/// packet of that link is dispatched by id. Faults are already reported
/// per subscriber, so this never fails.
impl Subscriber for Router {
    fn receive(
        &self,
        packet: &Packet,
        system_id: u8,
        component_id: u8,
    ) -> std::result::Result<(), SubscriberError> {
        self.dispatch(packet, system_id, component_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "router"
    }
}
