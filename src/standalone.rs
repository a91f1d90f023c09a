//! One-shot standalone transcode mode.
//!
//! Reads the whole input stream to end of file, transcodes it once in the
//! selected direction, and writes the result plus a newline. Useful for
//! scripting and for poking at the transcoder without the framed protocol
//! or a backend:
//!
//! ```text
//! $ echo '{"@type":"ok"}' | plistwire -j
//! (:@type "ok")
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::transcode::{json_to_plist, plist_to_json};

/// Transcode direction for the one-shot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Input is JSON, output is plist (`-j`).
    JsonToPlist,
    /// Input is plist, output is JSON (`-p`).
    PlistToJson,
}

/// Read all of `input`, transcode per `mode`, write the result to `output`.
pub async fn run_standalone<R, W>(mode: ParseMode, mut input: R, mut output: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut src = Vec::new();
    input.read_to_end(&mut src).await?;

    let dst = match mode {
        ParseMode::JsonToPlist => json_to_plist(&src)?,
        ParseMode::PlistToJson => plist_to_json(&src)?,
    };

    output.write_all(&dst).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_json_to_plist_mode() {
        let input = Cursor::new(br#"{"@type":"ok","n":[1,2]}"#.to_vec());
        let mut out = Vec::new();
        run_standalone(ParseMode::JsonToPlist, input, &mut out)
            .await
            .unwrap();
        assert_eq!(&out[..], b"(:@type \"ok\" :n [1 2])\n");
    }

    #[tokio::test]
    async fn test_plist_to_json_mode() {
        let input = Cursor::new(b"(:@type \"ok\")\n".to_vec());
        let mut out = Vec::new();
        run_standalone(ParseMode::PlistToJson, input, &mut out)
            .await
            .unwrap();
        assert_eq!(&out[..], b"{\"@type\":\"ok\"}\n");
    }

    #[tokio::test]
    async fn test_malformed_input_is_an_error() {
        let input = Cursor::new(b"(:@type \"x\"".to_vec());
        let mut out = Vec::new();
        let err = run_standalone(ParseMode::PlistToJson, input, &mut out)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert!(out.is_empty());
    }
}
