//! Frame type and the stateless frame codec.
//!
//! A frame is a length-prefixed binary unit carried over the socket,
//! wrapping one serialized [`Message`](super::Message). Uses `bytes::Bytes`
//! for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use webtunnel::protocol::{build_frame, decode_frame, HEADER_SIZE};
//!
//! let bytes = build_frame(b"hello");
//! assert_eq!(bytes.len(), HEADER_SIZE + 5);
//!
//! let (frame, consumed) = decode_frame(&bytes).unwrap().unwrap();
//! assert_eq!(frame.payload(), b"hello");
//! assert_eq!(consumed, bytes.len());
//! ```

use bytes::Bytes;

use super::wire::{FrameHead, HEADER_SIZE, MAX_FRAME_PAYLOAD};
use crate::error::Result;

/// A complete protocol frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded head.
    pub head: FrameHead,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from head and payload.
    pub fn new(head: FrameHead, payload: Bytes) -> Self {
        Self { head, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Build a complete frame as a single byte vector: 6-byte head followed by
/// the payload, with the head's declared length set to the payload's exact
/// byte count.
pub fn build_frame(payload: &[u8]) -> Vec<u8> {
    let head = FrameHead::for_payload(payload.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&head.encode());
    buf.extend_from_slice(payload);
    buf
}

/// Try to decode one frame from the front of `buf`.
///
/// Pure given the buffer, no side effects. Returns:
/// - `Ok(None)` if fewer than 6 head bytes are buffered, or the declared
///   payload is not yet fully buffered (the caller simply waits for more
///   bytes);
/// - `Ok(Some((frame, consumed)))` for a complete frame, where `consumed`
///   is the byte span to drop from the front of the buffer;
/// - `Err` on a fatal protocol violation (oversized declared length,
///   unknown marker).
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>> {
    let Some(head) = FrameHead::decode(buf) else {
        return Ok(None);
    };
    head.validate(MAX_FRAME_PAYLOAD)?;

    let total = HEADER_SIZE + head.payload_length as usize;
    if buf.len() < total {
        return Ok(None);
    }

    let payload = Bytes::copy_from_slice(&buf[HEADER_SIZE..total]);
    Ok(Some((Frame::new(head, payload), total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire::PROTOCOL_MARKER;

    #[test]
    fn test_build_frame_layout() {
        let bytes = build_frame(b"hello");

        assert_eq!(bytes.len(), HEADER_SIZE + 5);

        let head = FrameHead::decode(&bytes[..HEADER_SIZE]).unwrap();
        assert_eq!(head.payload_length, 5);
        assert_eq!(head.marker, PROTOCOL_MARKER);
        assert_eq!(&bytes[HEADER_SIZE..], b"hello");
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let bytes = build_frame(b"");
        assert_eq!(bytes.len(), HEADER_SIZE);

        let (frame, consumed) = decode_frame(&bytes).unwrap().unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(consumed, HEADER_SIZE);
    }

    #[test]
    fn test_decode_incomplete_head() {
        let bytes = build_frame(b"hello");
        for cut in 0..HEADER_SIZE {
            assert!(decode_frame(&bytes[..cut]).unwrap().is_none());
        }
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let bytes = build_frame(b"hello");
        for cut in HEADER_SIZE..bytes.len() {
            assert!(decode_frame(&bytes[..cut]).unwrap().is_none());
        }
    }

    #[test]
    fn test_decode_reports_consumed_span() {
        let mut bytes = build_frame(b"first");
        bytes.extend_from_slice(&build_frame(b"second!"));

        let (frame, consumed) = decode_frame(&bytes).unwrap().unwrap();
        assert_eq!(frame.payload(), b"first");

        let (frame, _) = decode_frame(&bytes[consumed..]).unwrap().unwrap();
        assert_eq!(frame.payload(), b"second!");
    }

    #[test]
    fn test_decode_oversized_length_fails() {
        let head = FrameHead::for_payload(MAX_FRAME_PAYLOAD + 1);
        let result = decode_frame(&head.encode());
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_bad_marker_fails() {
        let head = FrameHead {
            payload_length: 0,
            marker: 0x7777,
        };
        let result = decode_frame(&head.encode());
        assert!(result.is_err());
    }
}
