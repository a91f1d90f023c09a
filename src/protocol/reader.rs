//! Frame reader over a buffered input stream.
//!
//! Reads `COMMAND LENGTH\n<LENGTH bytes>\n` units. Header parsing failures
//! are recoverable: the reader has already consumed through the offending
//! newline, so the caller can log and ask for the next frame. A short read
//! inside a declared payload is fatal ([`BridgeError::TruncatedPayload`]).
//!
//! The payload scratch buffer is reused across frames.

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::wire_format::{parse_header, DEFAULT_MAX_PAYLOAD_SIZE, MAX_HEADER_LINE};
use super::Frame;
use crate::error::{BridgeError, Result};

/// Pulls frames off an input stream.
pub struct FrameReader<R> {
    reader: R,
    max_payload_size: usize,
    line: Vec<u8>,
    scratch: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    /// Create a reader with the default payload bound.
    pub fn new(reader: R) -> Self {
        Self::with_max_payload(reader, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a reader with a custom payload bound.
    pub fn with_max_payload(reader: R, max_payload_size: usize) -> Self {
        Self {
            reader,
            max_payload_size,
            line: Vec::with_capacity(MAX_HEADER_LINE),
            scratch: Vec::new(),
        }
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` on a clean end of input (at a frame boundary).
    /// `BadHeader` errors leave the stream positioned at the next line.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let at_eof = self.read_header_line().await?;
        if at_eof {
            return Ok(None);
        }

        let (command, length) = parse_header(&self.line).map(|(c, n)| (c.to_owned(), n))?;
        if length > self.max_payload_size {
            return Err(BridgeError::BadHeader(format!(
                "payload length {length} exceeds maximum {}",
                self.max_payload_size
            )));
        }

        // Payload plus its trailing newline.
        let want = length + 1;
        self.scratch.clear();
        self.scratch.resize(want, 0);
        let mut got = 0;
        while got < want {
            let n = self.reader.read(&mut self.scratch[got..]).await?;
            if n == 0 {
                return Err(BridgeError::TruncatedPayload { expected: want, got });
            }
            got += n;
        }

        let payload = Bytes::copy_from_slice(&self.scratch[..length]);
        Ok(Some(Frame::new(command, payload)))
    }

    /// Read one header line into `self.line`, bounded by [`MAX_HEADER_LINE`].
    ///
    /// Returns true on end of input before any header byte. An over-long
    /// line is consumed through its newline and reported as `BadHeader`.
    async fn read_header_line(&mut self) -> Result<bool> {
        self.line.clear();
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                // EOF, either clean or mid-header. Either way nothing more
                // can follow, so the loop is done.
                return Ok(true);
            }

            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let take = pos + 1;
                    if self.line.len() + pos > MAX_HEADER_LINE {
                        self.reader.consume(take);
                        return Err(BridgeError::BadHeader("header line too long".into()));
                    }
                    self.line.extend_from_slice(&buf[..pos]);
                    self.reader.consume(take);
                    return Ok(false);
                }
                None => {
                    let take = buf.len();
                    if self.line.len() + take > MAX_HEADER_LINE {
                        // Discard the rest of the line before reporting.
                        self.reader.consume(take);
                        self.skip_to_newline().await?;
                        return Err(BridgeError::BadHeader("header line too long".into()));
                    }
                    self.line.extend_from_slice(buf);
                    self.reader.consume(take);
                }
            }
        }
    }

    async fn skip_to_newline(&mut self) -> Result<()> {
        let mut sink = Vec::new();
        self.reader.read_until(b'\n', &mut sink).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn reader_over(bytes: &[u8]) -> FrameReader<Cursor<Vec<u8>>> {
        FrameReader::new(Cursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn test_single_frame() {
        let mut r = reader_over(b"send 6\n(:a 1)\n").await;
        let frame = r.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.command, "send");
        assert_eq!(frame.payload(), b"(:a 1)");
        assert!(r.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let mut r = reader_over(b"send 2\nab\nvoip 3\nxyz\n").await;
        let f1 = r.next_frame().await.unwrap().unwrap();
        let f2 = r.next_frame().await.unwrap().unwrap();
        assert_eq!((f1.command.as_str(), f1.payload()), ("send", &b"ab"[..]));
        assert_eq!((f2.command.as_str(), f2.payload()), ("voip", &b"xyz"[..]));
        assert!(r.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payload_with_embedded_newlines() {
        let mut r = reader_over(b"send 11\nline1\nline2\nsend 2\nok\n").await;
        let f1 = r.next_frame().await.unwrap().unwrap();
        assert_eq!(f1.payload(), b"line1\nline2");
        let f2 = r.next_frame().await.unwrap().unwrap();
        assert_eq!(f2.payload(), b"ok");
    }

    #[tokio::test]
    async fn test_bad_header_then_recovery() {
        let mut r = reader_over(b"garbage\nsend 2\nhi\n").await;
        let err = r.next_frame().await.unwrap_err();
        assert!(matches!(err, BridgeError::BadHeader(_)));
        // Reader resynced at the next line.
        let frame = r.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.payload(), b"hi");
    }

    #[tokio::test]
    async fn test_over_long_header_line_is_recoverable() {
        let mut input = vec![b'x'; MAX_HEADER_LINE * 3];
        input.push(b'\n');
        input.extend_from_slice(b"send 2\nhi\n");
        let mut r = reader_over(&input).await;

        let err = r.next_frame().await.unwrap_err();
        assert!(matches!(err, BridgeError::BadHeader(_)));
        let frame = r.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.payload(), b"hi");
    }

    #[tokio::test]
    async fn test_truncated_payload_is_fatal() {
        let mut r = reader_over(b"send 100\nshort\n").await;
        let err = r.next_frame().await.unwrap_err();
        match err {
            BridgeError::TruncatedPayload { expected, got } => {
                assert_eq!(expected, 101);
                assert_eq!(got, 6);
            }
            other => panic!("expected TruncatedPayload, got {other:?}"),
        }
        assert!(!err_recoverable(b"send 100\nshort\n").await);
    }

    async fn err_recoverable(bytes: &[u8]) -> bool {
        let mut r = reader_over(bytes).await;
        r.next_frame().await.unwrap_err().is_recoverable()
    }

    #[tokio::test]
    async fn test_declared_length_over_maximum() {
        let mut r = FrameReader::with_max_payload(Cursor::new(b"send 1000\n".to_vec()), 100);
        let err = r.next_frame().await.unwrap_err();
        assert!(matches!(err, BridgeError::BadHeader(_)));
    }

    #[tokio::test]
    async fn test_eof_mid_header_is_end_of_input() {
        let mut r = reader_over(b"send 10").await;
        assert!(r.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_length_payload() {
        let mut r = reader_over(b"send 0\n\n").await;
        let frame = r.next_frame().await.unwrap().unwrap();
        assert!(frame.payload().is_empty());
    }
}
