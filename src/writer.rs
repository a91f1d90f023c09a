//! Dedicated writer task serializing all frame emission.
//!
//! Frames are written from two places at once: the foreground command loop
//! (error frames) and the background event pump (event and error frames),
//! plus the backend's fatal-error callback from whatever thread it fires
//! on. Instead of a mutex around the output stream, every emitter funnels
//! through an mpsc channel into one writer task:
//!
//! ```text
//! command loop ─┐
//! event pump   ─┼─► mpsc::UnboundedSender<WriterMessage> ─► writer task ─► stdout
//! fatal hook   ─┘
//! ```
//!
//! Each frame is assembled into a single contiguous buffer before the one
//! `write_all` call, so a reader on the other end can never observe a
//! header from one frame followed by payload bytes of another. The channel
//! is unbounded: emission is fire-and-forget and must work from
//! non-async contexts (the pump thread, the fatal-error callback).

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{BridgeError, Result};
use crate::protocol::{encode_frame, Tag};
use crate::transcode::json_to_plist;

/// A frame ready to be framed and written.
#[derive(Debug)]
pub struct OutboundFrame {
    /// Outbound tag (`event` or `error`).
    pub tag: Tag,
    /// Payload text, already in plist form.
    pub payload: Bytes,
}

enum WriterMessage {
    Frame(OutboundFrame),
    /// Flush anything queued ahead of it and exit the task.
    Shutdown,
}

/// Handle for emitting frames through the writer task.
///
/// Cheaply cloneable; usable from async tasks, blocking threads, and
/// foreign callbacks alike.
#[derive(Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl WriterHandle {
    /// Emit a frame whose payload is already literal text.
    ///
    /// Used for internally generated diagnostics that are valid in both
    /// representations (quoted strings).
    pub fn emit_raw(&self, tag: Tag, payload: impl Into<Bytes>) -> Result<()> {
        self.tx
            .send(WriterMessage::Frame(OutboundFrame {
                tag,
                payload: payload.into(),
            }))
            .map_err(|_| BridgeError::OutputClosed)
    }

    /// Transcode a JSON payload to plist form, then emit it.
    ///
    /// Used for backend events and backend fatal errors.
    pub fn emit_json(&self, tag: Tag, json: &str) -> Result<()> {
        let plist = json_to_plist(json.as_bytes())?;
        self.emit_raw(tag, plist.freeze())
    }

    /// Emit an `error` frame carrying a diagnostic message as a quoted,
    /// escaped string (the same syntax in both representations).
    pub fn emit_error_message(&self, message: &str) -> Result<()> {
        // serde_json produces exactly the quoted-and-escaped form.
        let quoted = serde_json::to_string(message).unwrap_or_else(|_| "\"?\"".to_owned());
        self.emit_raw(Tag::Error, Bytes::from(quoted))
    }

    /// Ask the writer task to flush queued frames and exit.
    ///
    /// Frames sent after this are dropped with `OutputClosed`.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WriterMessage::Shutdown);
    }
}

/// Spawn the writer task over an output stream.
pub fn spawn_writer_task<W>(writer: W) -> (WriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(writer_loop(rx, writer));
    (WriterHandle { tx }, task)
}

/// Receives frames and writes them out, one flush per frame.
async fn writer_loop<W>(
    mut rx: mpsc::UnboundedReceiver<WriterMessage>,
    mut writer: W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let frame = match msg {
            WriterMessage::Frame(f) => f,
            WriterMessage::Shutdown => break,
        };
        tracing::trace!(tag = %frame.tag, len = frame.payload.len(), "OUTPUT frame");
        let buf = encode_frame(frame.tag, &frame.payload);
        writer.write_all(&buf).await?;
        writer.flush().await?;
    }
    Ok(())
}
