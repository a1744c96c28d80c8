use bytes::{Buf, BufMut, BytesMut};

use crate::error::CodecError;
use crate::packet::Packet;

/// Start-of-frame marker.
pub const STX: u8 = 0xFE;

/// Frame header: stx (1) + len (1) + seq (1) + sysid (1) + compid (1) + msgid (1).
pub const HEADER_SIZE: usize = 6;

/// Trailing CRC-16, little-endian.
pub const CHECKSUM_SIZE: usize = 2;

/// Largest payload the 8-bit length field can describe.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Largest complete frame on the wire.
pub const MAX_PACKET_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + CHECKSUM_SIZE;

/// CRC-16/MCRF4XX (the X.25 variant used by MAVLink), seeded with `0xFFFF`.
pub fn x25_crc(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF_u16, |crc, &byte| {
        let mut tmp = byte ^ (crc as u8);
        tmp ^= tmp << 4;
        let tmp = u16::from(tmp);
        (crc >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4)
    })
}

/// Encode a packet into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────┬─────┬───────┬────────┬───────┬──────────────┬──────────┐
/// │ STX  │ LEN │ SEQ │ SYSID │ COMPID │ MSGID │ PAYLOAD      │ CRC16    │
/// │ 0xFE │ 1B  │ 1B  │ 1B    │ 1B     │ 1B    │ (LEN bytes)  │ (2B LE)  │
/// └──────┴─────┴─────┴───────┴────────┴───────┴──────────────┴──────────┘
/// ```
///
/// The checksum covers everything after STX up to the end of the payload.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> Result<(), CodecError> {
    let payload = packet.payload();
    if payload.len() > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    dst.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    let start = dst.len();
    dst.put_u8(STX);
    dst.put_u8(payload.len() as u8);
    dst.put_u8(packet.sequence());
    dst.put_u8(packet.system_id());
    dst.put_u8(packet.component_id());
    dst.put_u8(packet.message_id());
    dst.put_slice(payload);
    let crc = x25_crc(&dst[start + 1..]);
    dst.put_u16_le(crc);
    Ok(())
}

/// Decode one packet from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
///
/// Errors always consume input, so calling again makes progress: leading
/// garbage is skipped up to the next STX, and a frame with a bad checksum
/// loses its STX byte so the scan resumes inside it.
pub fn decode_packet(src: &mut BytesMut) -> Result<Option<Packet>, CodecError> {
    match src.iter().position(|&b| b == STX) {
        Some(0) => {}
        Some(skipped) => {
            src.advance(skipped);
            return Err(CodecError::Desync { skipped });
        }
        None if src.is_empty() => return Ok(None),
        None => {
            let skipped = src.len();
            src.clear();
            return Err(CodecError::Desync { skipped });
        }
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let payload_len = src[1] as usize;
    let total = HEADER_SIZE + payload_len + CHECKSUM_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let crc_offset = HEADER_SIZE + payload_len;
    let expected = x25_crc(&src[1..crc_offset]);
    let received = u16::from_le_bytes([src[crc_offset], src[crc_offset + 1]]);
    if expected != received {
        src.advance(1);
        return Err(CodecError::BadChecksum { expected, received });
    }

    let sequence = src[2];
    let system_id = src[3];
    let component_id = src[4];
    let message_id = src[5];

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(CHECKSUM_SIZE);

    Ok(Some(Packet::new(
        message_id,
        system_id,
        component_id,
        sequence,
        payload,
    )))
}
