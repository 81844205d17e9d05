//! Wire-format definitions for protocol segments.
//!
//! Every datagram exchanged between peers is a [`Segment`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (header fields, flags, payload).
//! - Serialising a [`Segment`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Segment`], returning errors
//!   for malformed, truncated, or corrupted input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire layout
//!
//! All multi-byte fields are network byte order (big-endian):
//!
//! ```text
//!  0        4        8     10       14     16     18
//!  ├─ seqno ┼─ ackno ┼ len ┼─ flags ┼ wnd  ┼ cksum┼ data ...
//!  │  u32   │  u32   │ u16 │  u32   │ u16  │ u16  │
//! ```
//!
//! `len` counts the header plus the payload.  `cksum` is the one's-complement
//! checksum (RFC 1071) over the entire segment with the checksum field itself
//! treated as zero.

use thiserror::Error;

/// Bit-flag constants for the `flags` header field.
pub mod flags {
    /// Finish — sender has no more data to send.
    pub const FIN: u32 = 1 << 0;
    /// Acknowledgement field is valid.
    pub const ACK: u32 = 1 << 4;
}

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 18;

/// Errors that can arise when parsing a raw datagram.
///
/// The connection layer treats every variant as a silent drop; the type
/// exists so the codec has an explicit contract and the drops can be logged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    /// Buffer shorter than the fixed header size.
    #[error("datagram shorter than segment header ({0} < {HEADER_SIZE})")]
    TooShort(usize),
    /// `len` field does not match the number of bytes actually received.
    #[error("length field {claimed} does not match datagram length {actual}")]
    LengthMismatch { claimed: u16, actual: usize },
    /// Stored checksum did not match the recomputed value.
    #[error("checksum mismatch (stored {stored:#06x}, computed {computed:#06x})")]
    ChecksumMismatch { stored: u16, computed: u16 },
}

/// Classification of a validated segment by its flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Payload-bearing segment (no flags set).
    Data,
    /// Pure acknowledgement.
    Ack,
    /// FIN with a piggybacked ACK.
    FinAck,
    /// FIN without an ACK.
    Fin,
}

/// A complete protocol datagram: header fields + payload bytes.
///
/// `len` is derived from the payload on encode and validated on decode, so it
/// is not stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Byte offset of the first payload byte in the sender's stream; for
    /// control segments, the sender's current sequence number.
    pub seqno: u32,
    /// Next byte expected from the peer.
    pub ackno: u32,
    /// Bitmask of [`flags`] constants.
    pub flags: u32,
    /// Advertised receive-window size in bytes.
    pub window: u16,
    /// Payload bytes (empty for control segments).
    pub payload: Vec<u8>,
}

impl Segment {
    /// Total on-wire length of this segment.
    pub fn wire_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Classify this segment by its flag bits.
    pub fn kind(&self) -> SegmentKind {
        let fin = self.flags & flags::FIN != 0;
        let ack = self.flags & flags::ACK != 0;
        match (fin, ack) {
            (true, true) => SegmentKind::FinAck,
            (true, false) => SegmentKind::Fin,
            (false, true) => SegmentKind::Ack,
            (false, false) => SegmentKind::Data,
        }
    }

    /// Serialise this segment into a newly allocated byte vector.
    ///
    /// Writes the header with a zeroed checksum field, appends the payload,
    /// then computes the checksum over the whole buffer and patches it in.
    pub fn encode(&self) -> Vec<u8> {
        let total = self.wire_len();
        debug_assert!(total <= u16::MAX as usize, "segment exceeds len field");

        let mut buf = Vec::with_capacity(total);
        buf.extend_from_slice(&self.seqno.to_be_bytes());
        buf.extend_from_slice(&self.ackno.to_be_bytes());
        buf.extend_from_slice(&(total as u16).to_be_bytes());
        buf.extend_from_slice(&self.flags.to_be_bytes());
        buf.extend_from_slice(&self.window.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&self.payload);

        let sum = checksum(&buf);
        buf[16..18].copy_from_slice(&sum.to_be_bytes());
        buf
    }

    /// Parse and validate a [`Segment`] from a raw datagram.
    ///
    /// Validation order: header-size check, `len`-field check (rejects both
    /// truncated and padded datagrams), checksum verification with the
    /// checksum field zeroed.
    pub fn decode(buf: &[u8]) -> Result<Self, SegmentError> {
        if buf.len() < HEADER_SIZE {
            return Err(SegmentError::TooShort(buf.len()));
        }

        let claimed = u16::from_be_bytes([buf[8], buf[9]]);
        if claimed as usize != buf.len() {
            return Err(SegmentError::LengthMismatch {
                claimed,
                actual: buf.len(),
            });
        }

        let stored = u16::from_be_bytes([buf[16], buf[17]]);
        let mut scratch = buf.to_vec();
        scratch[16] = 0;
        scratch[17] = 0;
        let computed = checksum(&scratch);
        if stored != computed {
            return Err(SegmentError::ChecksumMismatch { stored, computed });
        }

        Ok(Self {
            seqno: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            ackno: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            flags: u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            payload: buf[HEADER_SIZE..].to_vec(),
        })
    }
}

/// One's-complement Internet checksum (RFC 1071) over `data`.
///
/// Odd trailing bytes are padded with a zero low byte.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Segment {
        Segment {
            seqno: 1,
            ackno: 1,
            flags: 0,
            window: 1440,
            payload: b"hello".to_vec(),
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let seg = sample();
        let wire = seg.encode();
        assert_eq!(wire.len(), HEADER_SIZE + 5);
        let decoded = Segment::decode(&wire).expect("decode");
        assert_eq!(decoded, seg);
    }

    #[test]
    fn encode_writes_len_including_header() {
        let wire = sample().encode();
        let len = u16::from_be_bytes([wire[8], wire[9]]);
        assert_eq!(len as usize, HEADER_SIZE + 5);
    }

    #[test]
    fn decode_empty_buffer_returns_too_short() {
        assert_eq!(Segment::decode(&[]), Err(SegmentError::TooShort(0)));
    }

    #[test]
    fn decode_truncated_payload_returns_length_mismatch() {
        let mut wire = sample().encode();
        wire.pop();
        assert!(matches!(
            Segment::decode(&wire),
            Err(SegmentError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn decode_padded_datagram_returns_length_mismatch() {
        let mut wire = sample().encode();
        wire.push(0);
        assert!(matches!(
            Segment::decode(&wire),
            Err(SegmentError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn single_bit_flip_fails_checksum() {
        let mut wire = sample().encode();
        wire[HEADER_SIZE] ^= 0x01;
        assert!(matches!(
            Segment::decode(&wire),
            Err(SegmentError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn header_field_corruption_fails_checksum() {
        let mut wire = sample().encode();
        wire[0] ^= 0x80; // seqno high bit
        assert!(matches!(
            Segment::decode(&wire),
            Err(SegmentError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn kind_classification() {
        let mut seg = sample();
        assert_eq!(seg.kind(), SegmentKind::Data);
        seg.flags = flags::ACK;
        assert_eq!(seg.kind(), SegmentKind::Ack);
        seg.flags = flags::FIN;
        assert_eq!(seg.kind(), SegmentKind::Fin);
        seg.flags = flags::FIN | flags::ACK;
        assert_eq!(seg.kind(), SegmentKind::FinAck);
    }

    #[test]
    fn checksum_odd_length_pads_high_byte() {
        // RFC 1071: a trailing odd byte contributes as the high byte of a
        // 16-bit word.
        assert_eq!(checksum(&[0xab]), checksum(&[0xab, 0x00]));
    }

    #[test]
    fn empty_payload_roundtrip() {
        let seg = Segment {
            seqno: 7,
            ackno: 9,
            flags: flags::FIN | flags::ACK,
            window: 0,
            payload: Vec::new(),
        };
        let wire = seg.encode();
        assert_eq!(wire.len(), HEADER_SIZE);
        assert_eq!(Segment::decode(&wire).expect("decode"), seg);
    }
}
