use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;
use tracing::{debug, info, warn};

use crate::codec::{encode_packet, MAX_PACKET_SIZE};
use crate::error::{Result, TransportError};
use crate::packet::Packet;
use crate::status::{LinkStatus, StatusCounters};
use crate::traits::{Link, LinkConfig, PacketHandler};
use crate::worker::{Ingest, Worker};

/// Datagram receive buffer. A datagram filling it completely is treated as
/// truncated and counted as a buffer overrun.
const RECV_BUFFER_SIZE: usize = 4096;

/// Configuration for a UDP link.
#[derive(Debug, Clone)]
pub struct UdpLinkConfig {
    /// Local address to bind.
    pub bind: SocketAddr,
    /// Initial remote endpoint. When `None`, the first sender is adopted.
    pub remote: Option<SocketAddr>,
    /// Shared link settings.
    pub link: LinkConfig,
}

impl UdpLinkConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            remote: None,
            link: LinkConfig::default(),
        }
    }

    pub fn with_remote(mut self, remote: SocketAddr) -> Self {
        self.remote = Some(remote);
        self
    }
}

/// UDP datagram link.
///
/// Sends to the current remote endpoint, which follows whoever sent the
/// most recent datagram (ground stations come and go).
pub struct UdpLink {
    name: Arc<str>,
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote: Arc<Mutex<Option<SocketAddr>>>,
    counters: Arc<StatusCounters>,
    worker: Worker,
}

impl UdpLink {
    /// Bind the socket and start the receive thread.
    pub fn open(
        name: impl Into<String>,
        config: UdpLinkConfig,
        handler: PacketHandler,
    ) -> Result<Arc<Self>> {
        let name: Arc<str> = Arc::from(name.into());
        let socket = UdpSocket::bind(config.bind).map_err(|source| TransportError::Bind {
            addr: config.bind,
            source,
        })?;
        socket.set_read_timeout(Some(config.link.read_timeout))?;
        let local_addr = socket.local_addr()?;

        let link = Arc::new(Self {
            name: Arc::clone(&name),
            socket: socket.try_clone()?,
            local_addr,
            remote: Arc::new(Mutex::new(config.remote)),
            counters: Arc::new(StatusCounters::new()),
            worker: Worker::new(),
        });

        let running = link.worker.running();
        let mut ingest = Ingest::new(
            Arc::clone(&name),
            Arc::clone(&link.counters),
            handler,
            Arc::clone(&running),
        );
        let remote = Arc::clone(&link.remote);
        let counters = Arc::clone(&link.counters);
        let thread_name = format!("{name}-udp-rx");

        link.worker.spawn(thread_name, move || {
            receive_loop(&name, &socket, &running, &remote, &counters, &mut ingest);
        })?;

        info!(link = %link.name, bind = %local_addr, remote = ?config.remote, "udp link open");
        Ok(link)
    }

    /// The bound local address (useful after binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The endpoint packets are currently sent to.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *self.remote.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn receive_loop(
    name: &str,
    socket: &UdpSocket,
    running: &AtomicBool,
    remote: &Mutex<Option<SocketAddr>>,
    counters: &StatusCounters,
    ingest: &mut Ingest,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    while running.load(Ordering::Acquire) {
        let (len, sender) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(err) => {
                // ICMP port-unreachable from a vanished peer surfaces here on some
                // platforms; the socket itself is still usable.
                debug!(link = %name, error = %err, "udp receive error");
                continue;
            }
        };

        {
            let mut current = remote.lock().unwrap_or_else(PoisonError::into_inner);
            if *current != Some(sender) {
                info!(link = %name, remote = %sender, "remote endpoint changed");
                *current = Some(sender);
            }
        }

        if len == buf.len() {
            counters.record_buffer_overrun();
            warn!(link = %name, size = len, "datagram truncated");
        }
        ingest.feed(&buf[..len]);
    }
    debug!(link = %name, "udp receive loop stopped");
}

impl Link for UdpLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, packet: &Packet) -> Result<()> {
        if !self.worker.is_running() {
            return Err(TransportError::Closed(self.name.to_string()));
        }
        let remote = self
            .remote_addr()
            .ok_or_else(|| TransportError::NotConnected(self.name.to_string()))?;

        let stamped = packet.with_sequence(self.counters.next_tx_seq());
        let mut buf = BytesMut::with_capacity(MAX_PACKET_SIZE);
        encode_packet(&stamped, &mut buf)?;
        self.socket.send_to(&buf, remote)?;
        Ok(())
    }

    fn status(&self) -> LinkStatus {
        self.counters.snapshot()
    }

    fn reset_status(&self) {
        self.counters.reset();
    }

    fn is_open(&self) -> bool {
        self.worker.is_running()
    }

    fn close(&self) {
        if self.worker.stop() {
            info!(link = %self.name, "udp link closed");
        }
    }
}

impl Drop for UdpLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for UdpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpLink")
            .field("name", &self.name)
            .field("local_addr", &self.local_addr)
            .field("remote", &self.remote_addr())
            .finish()
    }
}
