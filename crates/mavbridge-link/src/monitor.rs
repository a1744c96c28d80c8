use std::sync::{Arc, Weak};

use serde::Serialize;

use crate::status::LinkStatus;
use crate::traits::Link;

/// Result of one diagnostics check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkHealth {
    /// Link alive, no new drops since the previous check.
    Connected { status: LinkStatus },
    /// Link alive but packets were dropped since the previous check.
    Dropping { status: LinkStatus, new_drops: u32 },
    /// Link dropped or closed.
    Disconnected,
}

impl LinkHealth {
    pub fn summary(&self) -> String {
        match self {
            Self::Connected { .. } => "connected".to_string(),
            Self::Dropping { new_drops, .. } => {
                format!("{new_drops} packets dropped since last report")
            }
            Self::Disconnected => "not connected".to_string(),
        }
    }
}

/// Periodic status poller holding a non-owning handle to a link.
///
/// Diagnostics never extend a link's lifetime: once the owner drops or
/// closes it, checks report [`LinkHealth::Disconnected`].
pub struct LinkMonitor {
    name: String,
    link: Option<Weak<dyn Link>>,
    last_status: Option<LinkStatus>,
}

impl LinkMonitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: None,
            last_status: None,
        }
    }

    /// Watch `link` without keeping it alive.
    pub fn attach(&mut self, link: &Arc<dyn Link>) {
        self.link = Some(Arc::downgrade(link));
        self.last_status = None;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll the link once.
    pub fn check(&mut self) -> LinkHealth {
        let Some(link) = self.link.as_ref().and_then(Weak::upgrade) else {
            return LinkHealth::Disconnected;
        };
        if !link.is_open() {
            return LinkHealth::Disconnected;
        }

        let status = link.status();
        let previous = self.last_status.replace(status).unwrap_or_default();
        let new_drops = status.delta_since(&previous).rx_drop;
        if new_drops > 0 {
            LinkHealth::Dropping { status, new_drops }
        } else {
            LinkHealth::Connected { status }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Result;
    use crate::packet::Packet;

    struct FakeLink {
        status: Mutex<LinkStatus>,
        open: Mutex<bool>,
    }

    impl FakeLink {
        fn new() -> Self {
            Self {
                status: Mutex::new(LinkStatus::default()),
                open: Mutex::new(true),
            }
        }

        fn set(&self, rx_success: u32, rx_drop: u32) {
            let mut status = self.status.lock().unwrap();
            status.rx_success = rx_success;
            status.rx_drop = rx_drop;
        }
    }

    impl Link for FakeLink {
        fn name(&self) -> &str {
            "fake"
        }
        fn send(&self, _packet: &Packet) -> Result<()> {
            Ok(())
        }
        fn status(&self) -> LinkStatus {
            *self.status.lock().unwrap()
        }
        fn reset_status(&self) {
            *self.status.lock().unwrap() = LinkStatus::default();
        }
        fn is_open(&self) -> bool {
            *self.open.lock().unwrap()
        }
        fn close(&self) {
            *self.open.lock().unwrap() = false;
        }
    }

    #[test]
    fn unattached_monitor_is_disconnected() {
        let mut monitor = LinkMonitor::new("FCU connection");
        assert_eq!(monitor.check(), LinkHealth::Disconnected);
    }

    #[test]
    fn reports_only_new_drops() {
        let fake = Arc::new(FakeLink::new());
        let link: Arc<dyn Link> = fake.clone();
        let mut monitor = LinkMonitor::new("FCU connection");
        monitor.attach(&link);

        fake.set(10, 2);
        assert!(matches!(
            monitor.check(),
            LinkHealth::Dropping { new_drops: 2, .. }
        ));

        fake.set(15, 2);
        match monitor.check() {
            LinkHealth::Connected { status } => assert_eq!(status.rx_success, 15),
            other => panic!("expected connected, got {other:?}"),
        }

        fake.set(20, 5);
        assert!(matches!(
            monitor.check(),
            LinkHealth::Dropping { new_drops: 3, .. }
        ));
    }

    #[test]
    fn dropped_link_reads_as_disconnected() {
        let link: Arc<dyn Link> = Arc::new(FakeLink::new());
        let mut monitor = LinkMonitor::new("UDP bridge");
        monitor.attach(&link);
        assert!(matches!(monitor.check(), LinkHealth::Connected { .. }));

        drop(link);
        assert_eq!(monitor.check(), LinkHealth::Disconnected);
    }

    #[test]
    fn closed_link_reads_as_disconnected() {
        let link: Arc<dyn Link> = Arc::new(FakeLink::new());
        let mut monitor = LinkMonitor::new("UDP bridge");
        monitor.attach(&link);

        link.close();
        assert_eq!(monitor.check(), LinkHealth::Disconnected);
        assert_eq!(monitor.check().summary(), "not connected");
    }
}
