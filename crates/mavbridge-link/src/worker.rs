use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{decode_packet, MAX_PACKET_SIZE};
use crate::status::StatusCounters;
use crate::traits::PacketHandler;

/// Receive-side decoder: turns raw bytes into delivered packets and counts
/// everything it drops.
pub(crate) struct Ingest {
    name: Arc<str>,
    buf: BytesMut,
    counters: Arc<StatusCounters>,
    handler: PacketHandler,
    running: Arc<AtomicBool>,
}

impl Ingest {
    pub(crate) fn new(
        name: Arc<str>,
        counters: Arc<StatusCounters>,
        handler: PacketHandler,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            name,
            buf: BytesMut::with_capacity(2 * MAX_PACKET_SIZE),
            counters,
            handler,
            running,
        }
    }

    /// Append received bytes and deliver every complete packet.
    pub(crate) fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        loop {
            if !self.running.load(Ordering::Acquire) {
                self.buf.clear();
                return;
            }
            match decode_packet(&mut self.buf) {
                Ok(Some(packet)) => {
                    self.counters.record_received(packet.sequence());
                    (self.handler)(&packet);
                }
                Ok(None) => return,
                Err(err) => {
                    self.counters.record_parse_error();
                    debug!(link = %self.name, error = %err, "dropping malformed bytes");
                }
            }
        }
    }
}

/// Owns a link's I/O threads and its running flag.
///
/// `running` drops to false when either side ends the link (a reader
/// seeing EOF, or `stop`). `closed` records that `stop` has been called,
/// so teardown happens once even after a hangup already cleared `running`.
pub(crate) struct Worker {
    running: Arc<AtomicBool>,
    closed: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Worker {
    pub(crate) fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            closed: AtomicBool::new(false),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn spawn<F>(&self, thread_name: String, body: F) -> std::io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = std::thread::Builder::new().name(thread_name).spawn(body)?;
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }

    /// Start a thread that `stop` never waits for.
    ///
    /// For bodies that may sit in a blocking call nothing can interrupt,
    /// such as a write to a peer that stopped reading. The body must check
    /// `running` between blocking calls and exit once it is cleared.
    pub(crate) fn spawn_detached<F>(&self, thread_name: String, body: F) -> std::io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        std::thread::Builder::new().name(thread_name).spawn(body)?;
        Ok(())
    }

    /// Clear the running flag and join every joinable thread.
    ///
    /// Returns true on the first call only. A thread asking to stop its own
    /// worker (from inside a packet callback) is detached instead of joined.
    pub(crate) fn stop(&self) -> bool {
        self.running.store(false, Ordering::Release);
        let first = !self.closed.swap(true, Ordering::AcqRel);
        let handles: Vec<_> = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let current = std::thread::current().id();
        for handle in handles {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
        first
    }
}
