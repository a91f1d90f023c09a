//! Backend and extension-handler interfaces.
//!
//! The messaging backend is an opaque collaborator: it accepts JSON text,
//! hands back JSON text, and may report a fatal error through a callback
//! from any thread. The bridge never interprets the JSON it forwards.
//!
//! [`EchoBackend`] is an in-process loopback implementation used by the
//! binary (there is no real messaging library linked in) and by the
//! integration tests: every request sent to it comes back as an event.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Callback invoked with a backend fatal error, as JSON text.
pub type FatalErrorHook = Box<dyn Fn(&str) + Send + Sync>;

/// Opaque messaging backend.
///
/// `send` and `receive` must be internally thread-safe: the foreground
/// command loop calls `send` while the event pump blocks in `receive`.
pub trait Backend: Send + Sync + 'static {
    /// Queue one JSON request. Fire-and-forget.
    fn send(&self, json: &str);

    /// Wait up to `timeout` for the next pending JSON event.
    fn receive(&self, timeout: Duration) -> Option<String>;

    /// Register the fatal-error callback. May be invoked from any thread.
    fn register_fatal_error_hook(&self, hook: FatalErrorHook);
}

/// Handler for the `voip` extension command.
///
/// The payload reaches the handler exactly as it appeared on the wire,
/// with no transcoding.
pub trait VoipHandler: Send + Sync + 'static {
    fn handle(&self, payload: &str);
}

/// Loopback backend: requests echo back as events.
pub struct EchoBackend {
    queue: Mutex<VecDeque<String>>,
    ready: Condvar,
    hook: Mutex<Option<FatalErrorHook>>,
}

impl EchoBackend {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            hook: Mutex::new(None),
        }
    }

    /// Push an event for `receive` to hand out, without a matching send.
    pub fn inject_event(&self, json: impl Into<String>) {
        let mut queue = self.queue.lock().unwrap();
        queue.push_back(json.into());
        self.ready.notify_one();
    }

    /// Fire the registered fatal-error hook, as a real backend would from
    /// one of its own threads.
    pub fn raise_fatal_error(&self, json: &str) {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(json);
        }
    }
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for EchoBackend {
    fn send(&self, json: &str) {
        self.inject_event(json);
    }

    fn receive(&self, timeout: Duration) -> Option<String> {
        let queue = self.queue.lock().unwrap();
        let (mut queue, _) = self
            .ready
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .unwrap();
        queue.pop_front()
    }

    fn register_fatal_error_hook(&self, hook: FatalErrorHook) {
        *self.hook.lock().unwrap() = Some(hook);
    }
}
