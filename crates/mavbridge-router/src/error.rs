use mavbridge_link::TransportError;

/// Errors that can occur while registering or dispatching.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// Registration with a message id outside 0..=255.
    #[error("message id {0} outside 0..=255")]
    InvalidId(u32),

    /// A subscriber returned an error or panicked during dispatch.
    #[error("subscriber {subscriber} failed on message {message_id}: {reason}")]
    SubscriberFault {
        message_id: u8,
        subscriber: String,
        reason: String,
    },

    /// A module could not be initialized and was not loaded.
    #[error("module {module} failed to initialize: {reason}")]
    ModuleInit { module: String, reason: String },

    /// A module tried to send but no uplink was provided.
    #[error("no uplink link available")]
    NoUplink,

    /// Transport-level error while sending.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, RouterError>;
