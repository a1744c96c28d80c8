use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::codec::{encode_packet, MAX_PACKET_SIZE};
use crate::error::{Result, TransportError};
use crate::packet::Packet;
use crate::status::{LinkStatus, StatusCounters};
use crate::traits::{Link, LinkConfig, PacketHandler};
use crate::worker::{Ingest, Worker};

const READ_CHUNK_SIZE: usize = 1024;
const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

/// Link over a blocking byte stream (serial port, socket, pipe).
///
/// Reading happens on a dedicated thread. Writes are queued on a bounded
/// channel and drained by a writer thread, so `send` fails fast with
/// [`TransportError::QueueFull`] instead of blocking on a stalled device.
///
/// The reader should have a read timeout so shutdown is prompt; a reader
/// blocked forever keeps `close` waiting until the next byte or EOF. The
/// writer is never joined: `close` discards whatever is still queued, and a
/// writer stuck on a peer that stopped reading exits on its own once the
/// write returns.
pub struct StreamLink {
    name: Arc<str>,
    counters: Arc<StatusCounters>,
    worker: Worker,
    tx: Mutex<Option<SyncSender<Bytes>>>,
}

impl StreamLink {
    /// Start reader and writer threads over the given halves.
    pub fn spawn<R, W>(
        name: impl Into<String>,
        reader: R,
        writer: W,
        config: &LinkConfig,
        handler: PacketHandler,
    ) -> Result<Arc<Self>>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::sync_channel::<Bytes>(config.tx_queue_depth.max(1));

        let link = Arc::new(Self {
            name: Arc::clone(&name),
            counters: Arc::new(StatusCounters::new()),
            worker: Worker::new(),
            tx: Mutex::new(Some(tx)),
        });

        let running = link.worker.running();
        let mut ingest = Ingest::new(
            Arc::clone(&name),
            Arc::clone(&link.counters),
            handler,
            Arc::clone(&running),
        );
        let reader_name = Arc::clone(&name);
        link.worker.spawn(format!("{name}-rx"), move || {
            read_loop(&reader_name, reader, &running, &mut ingest);
        })?;

        let writer_name = Arc::clone(&name);
        let writer_running = link.worker.running();
        link.worker.spawn_detached(format!("{name}-tx"), move || {
            write_loop(&writer_name, writer, rx, &writer_running);
        })?;

        info!(link = %link.name, "stream link open");
        Ok(link)
    }
}

fn read_loop<R: Read>(
    name: &str,
    mut reader: R,
    running: &AtomicBool,
    ingest: &mut Ingest,
) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    while running.load(Ordering::Acquire) {
        match reader.read(&mut chunk) {
            Ok(0) => {
                info!(link = %name, "stream closed by peer");
                running.store(false, Ordering::Release);
            }
            Ok(n) => ingest.feed(&chunk[..n]),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) => {}
            Err(err) => {
                warn!(link = %name, error = %err, "stream read failed");
                running.store(false, Ordering::Release);
            }
        }
    }
    debug!(link = %name, "stream read loop stopped");
}

fn write_loop<W: Write>(name: &str, mut writer: W, rx: mpsc::Receiver<Bytes>, running: &AtomicBool) {
    for frame in rx {
        if !running.load(Ordering::Acquire) {
            break;
        }
        if let Err(err) = write_frame(&mut writer, &frame, running) {
            warn!(link = %name, error = %err, "stream write failed");
            if matches!(
                err.kind(),
                ErrorKind::BrokenPipe | ErrorKind::WriteZero | ErrorKind::TimedOut
            ) {
                break;
            }
        }
    }
    debug!(link = %name, "stream write loop stopped");
}

/// Write one whole frame. A device that keeps timing out is retried until
/// the link stops, then the timeout is returned.
fn write_frame<W: Write>(writer: &mut W, frame: &[u8], running: &AtomicBool) -> std::io::Result<()> {
    let mut offset = 0usize;
    while offset < frame.len() {
        match writer.write(&frame[offset..]) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_retryable(&err) => backoff(err, running)?,
            Err(err) => return Err(err),
        }
    }
    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_retryable(&err) => backoff(err, running)?,
            Err(err) => return Err(err),
        }
    }
}

fn is_retryable(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn backoff(err: std::io::Error, running: &AtomicBool) -> std::io::Result<()> {
    if !running.load(Ordering::Acquire) {
        return Err(std::io::Error::new(ErrorKind::TimedOut, err));
    }
    std::thread::sleep(WOULD_BLOCK_BACKOFF);
    Ok(())
}

impl Link for StreamLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, packet: &Packet) -> Result<()> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = match guard.as_ref() {
            Some(tx) if self.worker.is_running() => tx,
            _ => return Err(TransportError::Closed(self.name.to_string())),
        };

        let stamped = packet.with_sequence(self.counters.next_tx_seq());
        let mut buf = BytesMut::with_capacity(MAX_PACKET_SIZE);
        encode_packet(&stamped, &mut buf)?;

        tx.try_send(buf.freeze()).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::QueueFull(self.name.to_string()),
            TrySendError::Disconnected(_) => TransportError::Closed(self.name.to_string()),
        })
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
        // Dropping the sender ends the writer thread once the queue drains.
        drop(
            self.tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        if self.worker.stop() {
            info!(link = %self.name, "stream link closed");
        }
    }
}

impl Drop for StreamLink {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamLink")
            .field("name", &self.name)
            .field("open", &self.worker.is_running())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::sync::mpsc;

    use super::*;
    use crate::codec::decode_packet;

    fn open_pair(name: &str, config: &LinkConfig) -> (Arc<StreamLink>, UnixStream, mpsc::Receiver<Packet>) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        ours.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        theirs.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let handler: PacketHandler = Arc::new(move |packet: &Packet| {
            let _ = tx.lock().unwrap().send(packet.clone());
        });

        let reader = ours.try_clone().unwrap();
        let link = StreamLink::spawn(name, reader, ours, config, handler).unwrap();
        (link, theirs, rx)
    }

    #[test]
    fn receives_packets_from_stream() {
        let (link, mut peer, rx) = open_pair("serial-sim", &LinkConfig::default());

        let mut wire = BytesMut::new();
        encode_packet(&Packet::new(24, 1, 1, 10, &b"gps"[..]), &mut wire).unwrap();
        encode_packet(&Packet::new(30, 1, 1, 12, &b"att"[..]), &mut wire).unwrap();
        peer.write_all(&wire).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!((first.message_id(), second.message_id()), (24, 30));

        let status = link.status();
        assert_eq!(status.rx_success, 2);
        assert_eq!(status.rx_drop, 1);
    }

    #[test]
    fn send_writes_encoded_frame() {
        let (link, mut peer, _rx) = open_pair("serial-tx", &LinkConfig::default());

        link.send(&Packet::new(76, 255, 190, 99, &b"cmd"[..])).unwrap();

        let mut buf = [0u8; 64];
        let n = peer.read(&mut buf).unwrap();
        let mut wire = BytesMut::from(&buf[..n]);
        let packet = decode_packet(&mut wire).unwrap().unwrap();
        assert_eq!(packet.message_id(), 76);
        assert_eq!(packet.system_id(), 255);
        assert_eq!(packet.sequence(), 0);
    }

    #[test]
    fn peer_hangup_closes_link() {
        let (link, peer, _rx) = open_pair("hangup", &LinkConfig::default());
        drop(peer);

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while link.is_open() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(!link.is_open());
        let err = link.send(&Packet::new(0, 1, 1, 0, &b""[..])).unwrap_err();
        assert!(matches!(err, TransportError::Closed(_)));
    }

    #[test]
    fn close_returns_while_peer_is_not_reading() {
        let (link, peer, _rx) = open_pair("stalled", &LinkConfig::default());
        let payload = vec![0xa5u8; crate::codec::MAX_PAYLOAD];
        for seq in 0..1000u32 {
            let _ = link.send(&Packet::new(1, 1, 1, seq as u8, payload.clone()));
        }

        let (done_tx, done_rx) = mpsc::channel();
        let closer = Arc::clone(&link);
        std::thread::spawn(move || {
            closer.close();
            let _ = done_tx.send(());
        });

        assert!(done_rx.recv_timeout(Duration::from_secs(3)).is_ok());
        assert!(!link.is_open());
        drop(peer);
    }

    #[test]
    fn close_is_idempotent() {
        let (link, _peer, _rx) = open_pair("twice", &LinkConfig::default());
        link.close();
        link.close();
        assert!(!link.is_open());
    }
}
