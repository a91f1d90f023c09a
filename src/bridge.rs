//! Bridge lifecycle and the foreground command loop.
//!
//! The [`BridgeBuilder`] configures the backend and optional extension
//! handler; [`BridgeBuilder::start`] brings the bridge to `Running`:
//! 1. Spawn the writer task over the output stream
//! 2. Register the backend fatal-error hook (emits `error` frames)
//! 3. Set the shared running flag and spawn the event pump
//!
//! [`Bridge::run`] then drives the frame reader over the input stream,
//! dispatching `send` and `voip` commands and rejecting everything else.
//! When input ends, a read fails fatally, or a hang-up is signalled, the
//! bridge drains: running flag cleared, pump joined, writer flushed and
//! joined, backend handle released — in that order, so the backend is
//! never destroyed under an in-flight poll and no frame is written after
//! `Stopped`.
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(EchoBackend::new());
//! let bridge = Bridge::builder(backend).start(tokio::io::stdout());
//! bridge.run(tokio::io::stdin()).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::backend::{Backend, VoipHandler};
use crate::error::{BridgeError, Result};
use crate::protocol::{Frame, FrameReader, Tag, DEFAULT_MAX_PAYLOAD_SIZE};
use crate::pump::spawn_event_pump;
use crate::transcode::plist_to_json;
use crate::writer::{spawn_writer_task, WriterHandle};

/// Lifecycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BridgeState {
    Running,
    Draining,
    Stopped,
}

/// Builder for configuring and starting a bridge.
pub struct BridgeBuilder {
    backend: Arc<dyn Backend>,
    voip: Option<Arc<dyn VoipHandler>>,
    max_payload_size: usize,
}

impl BridgeBuilder {
    /// Create a builder over a backend handle.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            voip: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Register the handler for the `voip` extension command.
    ///
    /// Without one, `voip` frames are rejected like any unknown command.
    pub fn voip_handler(mut self, handler: Arc<dyn VoipHandler>) -> Self {
        self.voip = Some(handler);
        self
    }

    /// Override the maximum accepted payload length.
    pub fn max_payload_size(mut self, limit: usize) -> Self {
        self.max_payload_size = limit;
        self
    }

    /// Start the writer task and event pump over `output`.
    pub fn start<W>(self, output: W) -> Bridge
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer, writer_task) = spawn_writer_task(output);

        // Backend fatal errors surface as `error` frames from whichever
        // thread the backend fires the callback on.
        let hook_writer = writer.clone();
        self.backend.register_fatal_error_hook(Box::new(move |json| {
            tracing::error!(json, "backend fatal error");
            if let Err(err) = hook_writer.emit_json(Tag::Error, json) {
                if err.is_recoverable() {
                    let _ = hook_writer.emit_error_message(&err.to_string());
                }
            }
        }));

        let running = Arc::new(AtomicBool::new(true));
        let pump = spawn_event_pump(self.backend.clone(), writer.clone(), running.clone());
        tracing::debug!("bridge running");

        Bridge {
            backend: self.backend,
            voip: self.voip,
            writer,
            writer_task,
            pump,
            running,
            hangup: Arc::new(Notify::new()),
            max_payload_size: self.max_payload_size,
            state: BridgeState::Running,
        }
    }
}

/// A running bridge.
pub struct Bridge {
    backend: Arc<dyn Backend>,
    voip: Option<Arc<dyn VoipHandler>>,
    writer: WriterHandle,
    writer_task: JoinHandle<Result<()>>,
    pump: JoinHandle<()>,
    running: Arc<AtomicBool>,
    hangup: Arc<Notify>,
    max_payload_size: usize,
    state: BridgeState,
}

impl Bridge {
    /// Create a bridge builder.
    pub fn builder(backend: Arc<dyn Backend>) -> BridgeBuilder {
        BridgeBuilder::new(backend)
    }

    /// Handle for requesting a graceful stop from outside the loop.
    pub fn hangup_handle(&self) -> HangupHandle {
        HangupHandle {
            notify: self.hangup.clone(),
        }
    }

    /// Run the foreground command loop over `input` until end of input, a
    /// fatal read error, or a hang-up, then drain and stop.
    ///
    /// Recoverable problems (bad headers, malformed payloads, unknown
    /// commands) are logged, reported as `error` frames where the protocol
    /// calls for one, and never end the loop.
    pub async fn run<R>(mut self, input: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader =
            FrameReader::with_max_payload(BufReader::new(input), self.max_payload_size);

        let result = loop {
            tokio::select! {
                _ = self.hangup.notified() => {
                    tracing::info!("hang-up received, stopping");
                    break Ok(());
                }
                next = reader.next_frame() => match next {
                    Ok(Some(frame)) => {
                        if let Err(err) = self.dispatch(&frame) {
                            if !err.is_recoverable() {
                                break Err(err);
                            }
                            tracing::warn!(command = %frame.command, error = %err, "rejecting frame");
                            let _ = self.writer.emit_error_message(&err.to_string());
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("end of input");
                        break Ok(());
                    }
                    Err(err) if err.is_recoverable() => {
                        tracing::warn!(error = %err, "skipping to next header");
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "reader loop failed");
                        break Err(err);
                    }
                }
            }
        };

        self.drain().await;
        result
    }

    /// Decode one inbound frame and deliver it.
    fn dispatch(&self, frame: &Frame) -> Result<()> {
        match frame.tag() {
            Some(Tag::Send) => {
                let json = plist_to_json(frame.payload())?;
                let json = std::str::from_utf8(&json).map_err(|e| {
                    BridgeError::MalformedLiteral {
                        pos: e.valid_up_to(),
                        reason: "payload is not valid UTF-8",
                    }
                })?;
                tracing::trace!(json, "INPUT send");
                self.backend.send(json);
                Ok(())
            }
            Some(Tag::Voip) => match &self.voip {
                Some(handler) => {
                    let payload = std::str::from_utf8(frame.payload()).map_err(|e| {
                        BridgeError::MalformedLiteral {
                            pos: e.valid_up_to(),
                            reason: "payload is not valid UTF-8",
                        }
                    })?;
                    tracing::trace!(payload, "INPUT voip");
                    handler.handle(payload);
                    Ok(())
                }
                None => Err(BridgeError::UnknownCommand(frame.command.clone())),
            },
            _ => Err(BridgeError::UnknownCommand(frame.command.clone())),
        }
    }

    /// Draining → Stopped: pump joined before the backend handle can be
    /// released, writer flushed and joined last.
    async fn drain(&mut self) {
        self.state = BridgeState::Draining;
        tracing::debug!(state = ?self.state, "bridge draining");

        self.running.store(false, Ordering::Release);
        if let Err(err) = (&mut self.pump).await {
            tracing::error!(error = %err, "event pump panicked");
        }

        self.writer.shutdown();
        match (&mut self.writer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "writer task failed"),
            Err(err) => tracing::error!(error = %err, "writer task panicked"),
        }

        self.state = BridgeState::Stopped;
        tracing::debug!(state = ?self.state, "bridge stopped");
    }
}

/// Clonable handle that forces the command loop to stop promptly even
/// while it is blocked waiting for input.
#[derive(Clone)]
pub struct HangupHandle {
    notify: Arc<Notify>,
}

impl HangupHandle {
    /// Request a graceful stop. Idempotent.
    pub fn hangup(&self) {
        self.notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EchoBackend;

    #[tokio::test]
    async fn test_builder_defaults() {
        let backend = Arc::new(EchoBackend::new());
        let builder = Bridge::builder(backend);
        assert_eq!(builder.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
        assert!(builder.voip.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_send_reaches_backend() {
        use tokio::io::AsyncReadExt;

        let backend = Arc::new(EchoBackend::new());
        let (client, mut server) = tokio::io::duplex(4096);
        let mut bridge = Bridge::builder(backend).start(client);

        // EchoBackend loops the request back, so the pump turns it into an
        // `event` frame on the output stream.
        let frame = Frame::new("send", bytes::Bytes::from_static(b"(:@type \"ping\")"));
        bridge.dispatch(&frame).unwrap();

        let mut buf = vec![0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"event 15\n(:@type \"ping\")\n");

        bridge.drain().await;
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command() {
        let backend = Arc::new(EchoBackend::new());
        let (client, _server) = tokio::io::duplex(4096);
        let mut bridge = Bridge::builder(backend).start(client);

        let frame = Frame::new("frob", bytes::Bytes::new());
        let err = bridge.dispatch(&frame).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCommand(c) if c == "frob"));

        bridge.drain().await;
    }

    #[tokio::test]
    async fn test_dispatch_voip_without_handler_is_unknown() {
        let backend = Arc::new(EchoBackend::new());
        let (client, _server) = tokio::io::duplex(4096);
        let mut bridge = Bridge::builder(backend).start(client);

        let frame = Frame::new("voip", bytes::Bytes::from_static(b"{}"));
        let err = bridge.dispatch(&frame).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownCommand(_)));

        bridge.drain().await;
    }
}
