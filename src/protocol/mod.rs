//! Protocol module - wire format, framing, reassembly, and messages.
//!
//! This module implements the binary protocol carried over the tunnel:
//! - 6-byte frame head encoding/decoding
//! - stateless frame codec and the stream reassembler
//! - the Request/Response message envelope

mod frame;
mod frame_buffer;
mod message;
mod wire;

pub use frame::{build_frame, decode_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use message::{decode_message, encode_message, Message, Request, Response};
pub use wire::{FrameHead, HEADER_SIZE, MAX_FRAME_PAYLOAD, PROTOCOL_MARKER};
