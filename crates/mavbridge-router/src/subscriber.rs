use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use mavbridge_link::Packet;
use tracing::warn;

use crate::error::RouterError;

/// Error type returned by subscriber callbacks.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Capability to receive routed packets.
///
/// Callbacks run on the delivering link's thread. A callback that fails or
/// panics is reported and skipped; it never stops delivery to the others.
pub trait Subscriber: Send + Sync {
    /// Handle one packet from `system_id`/`component_id`.
    fn receive(
        &self,
        packet: &Packet,
        system_id: u8,
        component_id: u8,
    ) -> std::result::Result<(), SubscriberError>;

    /// Name used in fault reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Packet, u8, u8) -> std::result::Result<(), SubscriberError> + Send + Sync,
{
    fn receive(
        &self,
        packet: &Packet,
        system_id: u8,
        component_id: u8,
    ) -> std::result::Result<(), SubscriberError> {
        (self.callback)(packet, system_id, component_id)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a closure as a named subscriber.
pub fn from_fn<F>(name: impl Into<String>, callback: F) -> Arc<dyn Subscriber>
where
    F: Fn(&Packet, u8, u8) -> std::result::Result<(), SubscriberError> + Send + Sync + 'static,
{
    Arc::new(FnSubscriber {
        name: name.into(),
        callback,
    })
}

/// Outcome of delivering one packet.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Subscribers that handled the packet successfully.
    pub delivered: usize,
    /// One entry per failed subscriber, in delivery order.
    pub faults: Vec<RouterError>,
}

impl DispatchReport {
    /// Number of subscribers invoked.
    pub fn invoked(&self) -> usize {
        self.delivered + self.faults.len()
    }
}

type Entries = Arc<Vec<Arc<dyn Subscriber>>>;

/// Ordered subscriber list with snapshot reads.
///
/// Dispatch clones the current `Arc` and iterates it without holding the
/// lock, so it sees either the list before or after a concurrent
/// registration, never a partial one. Registration appends in place when
/// no dispatch holds the snapshot and copies the list otherwise.
pub(crate) struct SubscriberList {
    entries: RwLock<Entries>,
}

impl SubscriberList {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub(crate) fn push(&self, subscriber: Arc<dyn Subscriber>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut entries).push(subscriber);
    }

    /// Remove the first entry that is `subscriber` (pointer identity).
    pub(crate) fn remove(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let target = Arc::as_ptr(subscriber);
        match entries
            .iter()
            .position(|entry| std::ptr::addr_eq(Arc::as_ptr(entry), target))
        {
            Some(index) => {
                Arc::make_mut(&mut entries).remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn snapshot(&self) -> Entries {
        Arc::clone(&self.entries.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Invoke every subscriber in order, isolating failures.
pub(crate) fn deliver(
    subscribers: &[Arc<dyn Subscriber>],
    packet: &Packet,
    system_id: u8,
    component_id: u8,
) -> DispatchReport {
    let mut report = DispatchReport::default();
    for subscriber in subscribers {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            subscriber.receive(packet, system_id, component_id)
        }));
        let reason = match outcome {
            Ok(Ok(())) => {
                report.delivered += 1;
                continue;
            }
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        warn!(
            message_id = packet.message_id(),
            subscriber = subscriber.name(),
            error = %reason,
            "subscriber fault"
        );
        report.faults.push(RouterError::SubscriberFault {
            message_id: packet.message_id(),
            subscriber: subscriber.name().to_string(),
            reason,
        });
    }
    report
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn Subscriber> {
        let log = Arc::clone(log);
        let tag = name.to_string();
        from_fn(name, move |_, _, _| {
            log.lock().unwrap().push(tag.clone());
            Ok(())
        })
    }

    #[test]
    fn deliver_runs_in_order_and_isolates_faults() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = from_fn("failing", |_, _, _| Err("decode failed".into()));
        let panicking = from_fn("panicking", |_, _, _| panic!("boom"));
        let subscribers = vec![
            recorder("a", &log),
            failing,
            recorder("b", &log),
            panicking,
            recorder("c", &log),
        ];

        let packet = Packet::new(0, 1, 1, 0, Vec::<u8>::new());
        let report = deliver(&subscribers, &packet, 1, 1);

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.faults.len(), 2);
        assert_eq!(report.invoked(), 5);
        match &report.faults[1] {
            RouterError::SubscriberFault {
                subscriber, reason, ..
            } => {
                assert_eq!(subscriber, "panicking");
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected fault {other:?}"),
        }
    }

    #[test]
    fn snapshot_is_unaffected_by_later_push() {
        let list = SubscriberList::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        list.push(recorder("first", &log));

        let snapshot = list.snapshot();
        list.push(recorder("second", &log));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_uses_identity() {
        let list = SubscriberList::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let keep = recorder("same-name", &log);
        let drop_me = recorder("same-name", &log);
        list.push(Arc::clone(&keep));
        list.push(Arc::clone(&drop_me));

        assert!(list.remove(&drop_me));
        assert!(!list.remove(&drop_me));
        assert_eq!(list.len(), 1);
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(&list.snapshot()[0]),
            Arc::as_ptr(&keep)
        ));
    }
}
