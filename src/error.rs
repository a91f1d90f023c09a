//! Error types for plistwire.

use thiserror::Error;

/// Main error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error on stdin/stdout.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame header line. Recoverable: skip to the next header.
    #[error("bad frame header: {0}")]
    BadHeader(String),

    /// Stream closed or short read inside a declared payload.
    /// Fatal to the reader loop.
    #[error("truncated payload: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    /// Structured-literal text that does not match the plist grammar.
    #[error("malformed plist at byte {pos}: {reason}")]
    MalformedLiteral { pos: usize, reason: &'static str },

    /// Backend JSON text that does not match the JSON grammar.
    #[error("malformed JSON at byte {pos}: {reason}")]
    MalformedJson { pos: usize, reason: &'static str },

    /// JSON value with no plist representation (`true`, `false`, `null`).
    #[error("JSON {0} has no plist representation")]
    UnsupportedJsonType(&'static str),

    /// Nesting beyond the transcoder depth limit.
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    /// Inbound command token that is neither `send` nor a registered
    /// extension. Recoverable: reported as an `error` frame.
    #[error("unknown command `{0}'")]
    UnknownCommand(String),

    /// Writer task gone; no further frames can be emitted.
    #[error("output channel closed")]
    OutputClosed,
}

impl BridgeError {
    /// Whether the reader loop may continue after this error.
    ///
    /// `BadHeader`, transcode failures and unknown commands are per-frame
    /// problems; everything else tears the loop down.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::BadHeader(_)
                | BridgeError::MalformedLiteral { .. }
                | BridgeError::MalformedJson { .. }
                | BridgeError::UnsupportedJsonType(_)
                | BridgeError::NestingTooDeep(_)
                | BridgeError::UnknownCommand(_)
        )
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(BridgeError::BadHeader("x".into()).is_recoverable());
        assert!(BridgeError::MalformedLiteral { pos: 0, reason: "eof" }.is_recoverable());
        assert!(BridgeError::UnsupportedJsonType("null").is_recoverable());
        assert!(BridgeError::NestingTooDeep(1024).is_recoverable());
        assert!(BridgeError::UnknownCommand("frob".into()).is_recoverable());

        assert!(!BridgeError::TruncatedPayload { expected: 10, got: 3 }.is_recoverable());
        assert!(!BridgeError::OutputClosed.is_recoverable());
        let io = BridgeError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let e = BridgeError::UnknownCommand("frob".into());
        assert_eq!(e.to_string(), "unknown command `frob'");

        let e = BridgeError::TruncatedPayload { expected: 5, got: 2 };
        assert!(e.to_string().contains("expected 5"));
    }
}
