//! Backend event pump.
//!
//! A dedicated blocking thread drains the backend for the lifetime of the
//! bridge: poll `Backend::receive` with a bounded wait, transcode each JSON
//! event to plist form, and emit it as an `event` frame. The bounded wait
//! is what makes shutdown prompt: the loop re-checks the shared running
//! flag at least every [`POLL_INTERVAL`].
//!
//! A transcode failure on one event is reported as an `error` frame and
//! logged; it never stops the pump.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::error::BridgeError;
use crate::protocol::Tag;
use crate::writer::WriterHandle;

/// Bounded wait for one backend poll.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Spawn the pump on a blocking thread.
///
/// The loop exits once `running` goes false (observed within one poll
/// interval) or the writer task is gone.
pub fn spawn_event_pump(
    backend: Arc<dyn Backend>,
    writer: WriterHandle,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || pump_loop(backend.as_ref(), &writer, &running))
}

fn pump_loop(backend: &dyn Backend, writer: &WriterHandle, running: &AtomicBool) {
    tracing::debug!("event pump started");
    while running.load(Ordering::Acquire) {
        let Some(event) = backend.receive(POLL_INTERVAL) else {
            continue;
        };
        if let Err(err) = forward_event(writer, &event) {
            if matches!(err, BridgeError::OutputClosed) {
                tracing::error!("output closed, stopping event pump");
                break;
            }
            tracing::warn!(error = %err, "dropping backend event");
            let _ = writer.emit_error_message(&err.to_string());
        }
    }
    tracing::debug!("event pump stopped");
}

/// Transcode one backend event and frame it.
pub(crate) fn forward_event(writer: &WriterHandle, json: &str) -> crate::error::Result<()> {
    tracing::trace!(json, "OUTPUT event");
    writer.emit_json(Tag::Event, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EchoBackend;
    use crate::writer::spawn_writer_task;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_pump_forwards_events_and_stops_on_flag() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (writer, writer_task) = spawn_writer_task(client);
        let backend = Arc::new(EchoBackend::new());
        let running = Arc::new(AtomicBool::new(true));

        backend.inject_event(r#"{"@type":"ok"}"#);
        let pump = spawn_event_pump(backend.clone(), writer.clone(), running.clone());

        let mut buf = vec![0u8; 64];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"event 14\n(:@type \"ok\")\n");

        running.store(false, Ordering::Release);
        pump.await.unwrap();

        writer.shutdown();
        writer_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pump_reports_bad_event_and_continues() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (writer, _writer_task) = spawn_writer_task(client);
        let backend = Arc::new(EchoBackend::new());
        let running = Arc::new(AtomicBool::new(true));

        backend.inject_event("null"); // no plist representation
        backend.inject_event(r#"{"@type":"ok"}"#);
        let pump = spawn_event_pump(backend.clone(), writer.clone(), running.clone());

        // First an error frame for the unsupported event, then the good one.
        let mut buf = vec![0u8; 256];
        let mut got = 0;
        while !buf[..got].windows(2).any(|w| w == b")\n") {
            got += server.read(&mut buf[got..]).await.unwrap();
        }
        let text = String::from_utf8_lossy(&buf[..got]).into_owned();
        assert!(text.starts_with("error "), "unexpected output: {text}");
        assert!(text.contains("no plist representation"), "{text}");
        assert!(text.contains("event 14\n(:@type \"ok\")\n"), "{text}");

        running.store(false, Ordering::Release);
        pump.await.unwrap();
    }
}
