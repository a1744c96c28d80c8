use bytes::Bytes;

/// A decoded protocol packet.
///
/// Immutable after construction. Subscribers only ever see `&Packet`, and
/// the payload is a reference-counted [`Bytes`], so sharing one packet across
/// every subscriber of a dispatch costs no copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    message_id: u8,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(
        message_id: u8,
        system_id: u8,
        component_id: u8,
        sequence: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            message_id,
            system_id,
            component_id,
            sequence,
            payload: payload.into(),
        }
    }

    /// Message id selecting the payload type (0-255).
    pub fn message_id(&self) -> u8 {
        self.message_id
    }

    /// Id of the system that produced the packet.
    pub fn system_id(&self) -> u8 {
        self.system_id
    }

    /// Id of the component within the source system.
    pub fn component_id(&self) -> u8 {
        self.component_id
    }

    /// Sequence number in the sending link's sequencing domain.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Opaque payload bytes. Decoding is left to consumers.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// A copy of this packet restamped with another sequence number.
    ///
    /// Used when relaying onto a link with its own sequencing domain.
    pub fn with_sequence(&self, sequence: u8) -> Self {
        Self {
            sequence,
            payload: self.payload.clone(),
            ..*self
        }
    }
}
