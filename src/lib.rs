//! # plistwire
//!
//! Bridge process between a text-editor front end and a JSON messaging
//! backend, speaking a framed plist protocol over stdio.
//!
//! ## Architecture
//!
//! - **Inbound** (stdin): `COMMAND LENGTH\n<payload>\n` frames; `send`
//!   payloads are transcoded plist → JSON and forwarded to the backend,
//!   `voip` payloads pass through to an extension handler verbatim.
//! - **Outbound** (stdout): backend events and errors, transcoded
//!   JSON → plist and framed by a single writer task so frames from
//!   concurrent emitters never interleave.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use plistwire::{backend::EchoBackend, Bridge};
//!
//! #[tokio::main]
//! async fn main() -> plistwire::Result<()> {
//!     let backend = Arc::new(EchoBackend::new());
//!     let bridge = Bridge::builder(backend).start(tokio::io::stdout());
//!     bridge.run(tokio::io::stdin()).await
//! }
//! ```

pub mod backend;
pub mod bridge;
pub mod error;
pub mod protocol;
pub mod pump;
pub mod standalone;
pub mod transcode;
pub mod writer;

pub use bridge::{Bridge, BridgeBuilder, HangupHandle};
pub use error::{BridgeError, Result};
