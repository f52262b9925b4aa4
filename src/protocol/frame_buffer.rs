//! Frame buffer for reassembling frames from arbitrary byte chunks.
//!
//! The socket delivers discrete messages with no alignment to frame
//! boundaries: one delivered chunk may hold zero, one, or several frames,
//! or a fragment of one. All inbound bytes accumulate in a single
//! `BytesMut`; complete frames are sliced off the front and the buffer
//! retains only the unconsumed prefix of a not-yet-complete frame.
//!
//! # Example
//!
//! ```
//! use webtunnel::protocol::{build_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(b"hello");
//!
//! // Data arrives in chunks from the socket.
//! let frames = buffer.push(&bytes[..4]).unwrap();
//! assert!(frames.is_empty());
//!
//! let frames = buffer.push(&bytes[4..]).unwrap();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].payload(), b"hello");
//! ```

use bytes::BytesMut;

use super::frame::Frame;
use super::wire::{FrameHead, HEADER_SIZE, MAX_FRAME_PAYLOAD};
use crate::error::Result;

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Maximum allowed declared payload length.
    max_payload: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with the protocol's 128 MiB ceiling.
    pub fn new() -> Self {
        Self::with_max_payload(MAX_FRAME_PAYLOAD)
    }

    /// Create a frame buffer with a custom payload ceiling.
    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(16 * 1024),
            max_payload,
        }
    }

    /// Push a chunk into the buffer and extract all complete frames.
    ///
    /// This is the main API for processing inbound socket data. Partial
    /// data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns a `ProtocolError` if a frame head declares a payload longer
    /// than the ceiling or carries an unknown marker. The buffer is not
    /// usable afterwards; the connection must be torn down.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }

        Ok(frames)
    }

    /// Try to slice one complete frame off the front of the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        let Some(head) = FrameHead::decode(&self.buffer) else {
            return Ok(None);
        };
        head.validate(self.max_payload)?;

        let total = HEADER_SIZE + head.payload_length as usize;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let mut taken = self.buffer.split_to(total);
        let payload = taken.split_off(HEADER_SIZE).freeze();
        Ok(Some(Frame::new(head, payload)))
    }

    /// Number of buffered, not-yet-consumed bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
