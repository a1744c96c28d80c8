use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::packet::Packet;
use crate::status::LinkStatus;

/// Receive callback: invoked once per decoded packet, in arrival order.
pub type PacketHandler = Arc<dyn Fn(&Packet) + Send + Sync>;

/// A transport connection carrying encoded packets.
///
/// Implementations own their I/O threads. `send` never blocks for an
/// unbounded time: it either queues, writes a datagram, or fails.
pub trait Link: Send + Sync {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Encode and send a packet.
    ///
    /// The packet is restamped with this link's next transmit sequence
    /// number; source system and component ids are kept.
    fn send(&self, packet: &Packet) -> Result<()>;

    /// Snapshot of the link counters. Safe to call during ongoing I/O.
    fn status(&self) -> LinkStatus;

    /// Zero the link counters.
    fn reset_status(&self);

    /// Whether the link is still delivering packets.
    fn is_open(&self) -> bool;

    /// Stop delivering packets and release I/O resources.
    ///
    /// Idempotent. Called automatically on drop.
    fn close(&self);
}

/// Settings shared by every link type.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// How long a blocking read waits before re-checking for shutdown.
    pub read_timeout: Duration,
    /// Packets buffered for transmission on stream links before `send` fails.
    pub tx_queue_depth: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            tx_queue_depth: 1000,
        }
    }
}
