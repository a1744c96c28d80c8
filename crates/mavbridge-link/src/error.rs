use std::net::SocketAddr;
use std::path::PathBuf;

/// Decode failures on the receive path (a malformed packet).
///
/// Each one is counted as a `parse_error` and the offending bytes are
/// discarded before anything reaches the router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Bytes preceding the next start marker were skipped.
    #[error("stream out of sync, skipped {skipped} bytes")]
    Desync { skipped: usize },

    /// The frame checksum does not match its contents.
    #[error("checksum mismatch (expected {expected:#06x}, received {received:#06x})")]
    BadChecksum { expected: u16, received: u16 },

    /// The payload does not fit the 8-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Errors that can occur on a transport link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local endpoint.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to open or configure a device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A packet could not be encoded or decoded.
    #[error("malformed packet: {0}")]
    Malformed(#[from] CodecError),

    /// No remote endpoint is known yet, so there is nowhere to send.
    #[error("link {0} has no remote endpoint")]
    NotConnected(String),

    /// The outgoing queue is full; the packet was not sent.
    #[error("link {0} transmit queue full")]
    QueueFull(String),

    /// The link has been closed.
    #[error("link {0} closed")]
    Closed(String),

    /// A link URL could not be parsed.
    #[error("invalid link url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;
