//! Wire-format definitions for data and acknowledgement frames.
//!
//! Every datagram exchanged between sender and receiver is either a
//! [`Packet`] or the end-of-stream sentinel.  This module is responsible for:
//! - Defining the on-wire binary layout (sequence number + payload).
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Frame`], returning errors
//!   for truncated input.
//!
//! No I/O happens here; this is pure data transformation.  There is no
//! checksum: the codec is format-only.
//!
//! # Wire format
//!
//! The sequence number is a **little-endian** signed 32-bit integer.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  Sequence Number (i32, LE)                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! ACKs reuse the same frame with an empty payload; the sequence number
//! carries the acknowledged number.  A zero-length datagram is the
//! end-of-stream sentinel.  Frames of 1–3 bytes are malformed.

use thiserror::Error;

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 4;

/// A data or acknowledgement frame: sequence number + payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub seq: i32,
    pub payload: Vec<u8>,
}

/// Result of decoding one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A frame with a valid header (data or ACK).
    Packet(Packet),
    /// The zero-length end-of-stream sentinel.
    EndOfStream,
}

/// Errors that can arise when building or parsing a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The sequence number does not fit the signed 32-bit header field.
    #[error("sequence number {0} does not fit a 32-bit signed field")]
    SequenceOutOfRange(i64),
    /// Datagram shorter than the fixed header.
    #[error("frame of {0} bytes is shorter than the {len}-byte header", len = HEADER_LEN)]
    FrameTooShort(usize),
}

impl Packet {
    /// Build a data packet, checking that `seq` fits on the wire.
    pub fn new(seq: i64, payload: Vec<u8>) -> Result<Self, PacketError> {
        let seq = i32::try_from(seq).map_err(|_| PacketError::SequenceOutOfRange(seq))?;
        Ok(Self { seq, payload })
    }

    /// Build an acknowledgement for `seq` (empty payload).
    pub fn ack(seq: i32) -> Self {
        Self {
            seq,
            payload: Vec::new(),
        }
    }

    /// Serialise this packet into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.seq.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Packet`] from a raw byte slice.
    ///
    /// Returns [`PacketError::FrameTooShort`] if `buf` is shorter than
    /// [`HEADER_LEN`], including the empty sentinel.  Use [`Frame::decode`]
    /// where the sentinel is expected.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let (header, payload) = buf
            .split_first_chunk::<HEADER_LEN>()
            .ok_or(PacketError::FrameTooShort(buf.len()))?;
        Ok(Self {
            seq: i32::from_le_bytes(*header),
            payload: payload.to_vec(),
        })
    }
}

impl Frame {
    /// Parse a datagram, treating a zero-length buffer as end-of-stream.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.is_empty() {
            return Ok(Frame::EndOfStream);
        }
        Packet::decode(buf).map(Frame::Packet)
    }
}

/// Frame `payload` under sequence number `seq`.
pub fn encode(seq: i64, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    Ok(Packet::new(seq, payload.to_vec())?.encode())
}

/// Split a frame into `(sequence_number, payload)`.
pub fn decode(frame: &[u8]) -> Result<(i32, Vec<u8>), PacketError> {
    Packet::decode(frame).map(|p| (p.seq, p.payload))
}

/// The end-of-stream sentinel: a zero-length frame.
pub fn end_of_stream_marker() -> Vec<u8> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_little_endian_on_wire() {
        let bytes = encode(0x0102_0304, b"").unwrap();
        assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn negative_seq_survives_the_wire() {
        // The receiver acknowledges -1 before the first in-order packet.
        let bytes = Packet::ack(-1).encode();
        assert_eq!(bytes, vec![0xff; 4]);
        assert_eq!(decode(&bytes).unwrap(), (-1, Vec::new()));
    }

    #[test]
    fn payload_follows_header() {
        let bytes = encode(7, b"hello").unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 5);
        assert_eq!(&bytes[HEADER_LEN..], b"hello");
        assert_eq!(decode(&bytes).unwrap(), (7, b"hello".to_vec()));
    }

    #[test]
    fn encode_rejects_seq_outside_i32() {
        let too_big = i64::from(i32::MAX) + 1;
        assert_eq!(
            encode(too_big, b"x"),
            Err(PacketError::SequenceOutOfRange(too_big))
        );
        assert!(Packet::new(i64::from(i32::MIN) - 1, vec![]).is_err());
        assert!(Packet::new(i64::from(i32::MAX), vec![]).is_ok());
    }

    #[test]
    fn decode_short_frame_returns_error() {
        assert_eq!(Packet::decode(&[]), Err(PacketError::FrameTooShort(0)));
        assert_eq!(
            Packet::decode(&[1, 2, 3]),
            Err(PacketError::FrameTooShort(3))
        );
    }

    #[test]
    fn empty_datagram_is_end_of_stream() {
        assert_eq!(Frame::decode(&end_of_stream_marker()), Ok(Frame::EndOfStream));
    }

    #[test]
    fn header_only_frame_is_not_end_of_stream() {
        // Zero-length payload with a valid header is an ordinary packet.
        let frame = Frame::decode(&Packet::ack(0).encode()).unwrap();
        assert_eq!(frame, Frame::Packet(Packet::ack(0)));
    }

    #[test]
    fn truncated_header_is_malformed_not_sentinel() {
        assert_eq!(Frame::decode(&[0, 0]), Err(PacketError::FrameTooShort(2)));
    }
}
