//! MAVLink telemetry bridge.
//!
//! mavbridge connects a flight controller to ground stations and to local
//! consumers: it moves framed packets over serial and UDP links, fans them
//! out by message id, and converts vehicle-frame data into robotics
//! conventions.
//!
//! # Crate Structure
//!
//! - [`link`]: transport links, packet codec and link diagnostics
//! - [`router`]: message-id router, per-link streams, bridging and modules
//! - [`ftf`]: NED/ENU and aircraft/base_link frame transforms

/// Re-export link types.
pub mod link {
    pub use mavbridge_link::*;
}

/// Re-export router types.
pub mod router {
    pub use mavbridge_router::*;
}

/// Re-export frame transform types.
pub mod ftf {
    pub use mavbridge_ftf::*;
}
