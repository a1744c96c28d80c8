//! Packet routing for mavbridge.
//!
//! The [`Router`] holds one subscriber list per message id (256 slots,
//! allocated once). Every packet is fanned out to the subscribers of its id
//! in registration order and then discarded; nothing is buffered.
//!
//! Around it:
//! - [`LinkStream`] fans out *every* packet of one link (bridging, raw taps)
//! - [`LinkForwarder`] relays packets onto another link
//! - [`Registry`] loads [`Module`]s and registers them for their ids

pub mod error;
pub mod forward;
pub mod registry;
pub mod router;
pub mod stream;
pub mod subscriber;

pub use error::{Result, RouterError};
pub use forward::LinkForwarder;
pub use registry::{Module, ModuleContext, Registry};
pub use router::{Router, RouterStats, MESSAGE_ID_SLOTS};
pub use stream::LinkStream;
pub use subscriber::{from_fn, DispatchReport, Subscriber, SubscriberError};
