//! Protocol module - wire format, framing, and the frame reader.
//!
//! This module implements the line-oriented framed protocol spoken over
//! stdin/stdout:
//! - header encoding/parsing (`TAG SPACE LENGTH NEWLINE`)
//! - [`Frame`] with typed accessors
//! - [`FrameReader`] pulling frames off any buffered input stream

mod frame;
mod reader;
mod wire_format;

pub use frame::Frame;
pub use reader::FrameReader;
pub use wire_format::{
    encode_frame, parse_header, Tag, DEFAULT_MAX_PAYLOAD_SIZE, MAX_HEADER_LINE,
};
