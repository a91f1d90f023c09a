//! Wire format encoding and parsing.
//!
//! Every frame on the wire is an ASCII header line followed by a
//! binary-safe payload:
//!
//! ```text
//! <TAG> <SPACE> <DECIMAL-LENGTH> <NEWLINE>
//! <LENGTH bytes of payload> <NEWLINE>
//! ```
//!
//! The declared length excludes the trailing newline; the payload itself
//! may contain embedded newlines. For example:
//!
//! ```text
//! event 105
//! (:@type "updateAuthorizationState" :authorization_state (:@type "authorizationStateWaitTdlibParameters"))
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::{BridgeError, Result};

/// Maximum header line length in bytes, including the newline.
pub const MAX_HEADER_LINE: usize = 64;

/// Default maximum payload size (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Frame tag.
///
/// `send` and `voip` arrive from the editor; `event` and `error` go out to
/// it. Unknown inbound tokens are kept as raw text so the error report can
/// quote them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Editor command to transcode and forward to the backend.
    Send,
    /// Backend-originated event, transcoded before framing.
    Event,
    /// Diagnostic or backend fatal error.
    Error,
    /// Voice-call extension command, payload passed through verbatim.
    Voip,
}

impl Tag {
    /// Wire token for this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Send => "send",
            Tag::Event => "event",
            Tag::Error => "error",
            Tag::Voip => "voip",
        }
    }

    /// Parse a wire token. Returns `None` for unrecognized tokens.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "send" => Some(Tag::Send),
            "event" => Some(Tag::Event),
            "error" => Some(Tag::Error),
            "voip" => Some(Tag::Voip),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a complete frame into one contiguous buffer.
///
/// The single-buffer form matters: the writer task hands the whole thing to
/// one `write_all`, so concurrent emitters can never interleave header and
/// payload bytes of different frames.
pub fn encode_frame(tag: Tag, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(MAX_HEADER_LINE + payload.len() + 1);
    buf.put_slice(tag.as_str().as_bytes());
    buf.put_u8(b' ');
    buf.put_slice(payload.len().to_string().as_bytes());
    buf.put_u8(b'\n');
    buf.put_slice(payload);
    buf.put_u8(b'\n');
    buf
}

/// Parse a header line (without its newline) into `(command, length)`.
///
/// The line must be exactly `<token> <decimal>`: one ASCII space, a
/// non-empty token, digits only in the length. Anything else is a
/// `BadHeader`.
pub fn parse_header(line: &[u8]) -> Result<(&str, usize)> {
    let text = std::str::from_utf8(line)
        .map_err(|_| BridgeError::BadHeader("header is not valid UTF-8".into()))?;
    let text = text.trim_end_matches(['\r', '\n']);

    let (command, length) = text
        .split_once(' ')
        .ok_or_else(|| BridgeError::BadHeader(format!("no length in `{text}'")))?;
    if command.is_empty() || command.contains(' ') {
        return Err(BridgeError::BadHeader(format!("bad command token in `{text}'")));
    }
    if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BridgeError::BadHeader(format!("bad length in `{text}'")));
    }
    let length: usize = length
        .parse()
        .map_err(|_| BridgeError::BadHeader(format!("length out of range in `{text}'")))?;

    Ok((command, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_token_round_trip() {
        for tag in [Tag::Send, Tag::Event, Tag::Error, Tag::Voip] {
            assert_eq!(Tag::from_token(tag.as_str()), Some(tag));
        }
        assert_eq!(Tag::from_token("frob"), None);
        assert_eq!(Tag::from_token("SEND"), None);
    }

    #[test]
    fn test_encode_frame_layout() {
        let buf = encode_frame(Tag::Event, b"(:a 1)");
        assert_eq!(&buf[..], b"event 6\n(:a 1)\n");
    }

    #[test]
    fn test_encode_frame_empty_payload() {
        let buf = encode_frame(Tag::Error, b"");
        assert_eq!(&buf[..], b"error 0\n\n");
    }

    #[test]
    fn test_encode_frame_embedded_newlines() {
        let payload = b"line1\nline2";
        let buf = encode_frame(Tag::Send, payload);
        assert_eq!(&buf[..], b"send 11\nline1\nline2\n");
    }

    #[test]
    fn test_parse_header_valid() {
        assert_eq!(parse_header(b"send 109\n").unwrap(), ("send", 109));
        assert_eq!(parse_header(b"event 0").unwrap(), ("event", 0));
        assert_eq!(parse_header(b"voip 12\r\n").unwrap(), ("voip", 12));
    }

    #[test]
    fn test_parse_header_rejects_malformed() {
        assert!(parse_header(b"send\n").is_err());
        assert!(parse_header(b" 109\n").is_err());
        assert!(parse_header(b"send abc\n").is_err());
        assert!(parse_header(b"send 10 9\n").is_err());
        assert!(parse_header(b"send -1\n").is_err());
        assert!(parse_header(b"send \n").is_err());
        assert!(parse_header(b"\n").is_err());
        assert!(parse_header(&[0xff, b' ', b'1']).is_err());
    }

    #[test]
    fn test_parse_encoded_header_round_trip() {
        let buf = encode_frame(Tag::Send, b"hello");
        let newline = buf.iter().position(|&b| b == b'\n').unwrap();
        let (cmd, len) = parse_header(&buf[..newline]).unwrap();
        assert_eq!(cmd, "send");
        assert_eq!(len, 5);
    }
}
