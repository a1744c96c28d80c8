//! Transport links carrying MAVLink-framed packets.
//!
//! One [`Link`] instance per physical or network transport:
//! - UDP sockets ([`UdpLink`])
//! - Serial devices ([`SerialLink`], Unix only)
//! - Any blocking byte stream pair ([`StreamLink`])
//!
//! Every link owns its receive thread, decodes the byte stream into
//! [`Packet`]s and hands each one to a [`PacketHandler`] exactly once, in
//! arrival order. Loss is counted in [`LinkStatus`], never retried here.
//!
//! This is the lowest layer of mavbridge. Routing and frame conversion build
//! on the types exported here.

pub mod codec;
pub mod error;
pub mod monitor;
pub mod packet;
pub mod status;
pub mod stream;
pub mod traits;
pub mod udp;
pub mod url;

mod worker;

#[cfg(unix)]
pub mod serial;

pub use codec::{decode_packet, encode_packet, x25_crc, MAX_PACKET_SIZE, MAX_PAYLOAD, STX};
pub use error::{CodecError, Result, TransportError};
pub use monitor::{LinkHealth, LinkMonitor};
pub use packet::Packet;
pub use status::{LinkStatus, StatusCounters, StatusDelta};
pub use stream::StreamLink;
pub use traits::{Link, LinkConfig, PacketHandler};
pub use udp::{UdpLink, UdpLinkConfig};
pub use url::{open_link, LinkUrl};

#[cfg(unix)]
pub use serial::{SerialLink, SerialLinkConfig};
