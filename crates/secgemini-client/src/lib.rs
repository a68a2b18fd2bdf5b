//! # secgemini-client
//!
//! Client for the Sec-Gemini security analysis service.
//!
//! - **Entry point**: [`SecGemini`] loads settings, reports user info and
//!   opens sessions
//! - **Sessions**: [`InteractiveSession`] mirrors one server-side session
//!   over REST; every attribute read re-fetches the record
//! - **Streaming**: [`StreamEngine`] runs a reconnecting duplex stream with
//!   linear backoff, answering local tool calls transparently
//! - **Transport**: [`Transport`]/[`Connection`] abstract the websocket;
//!   [`WsTransport`] is the production implementation with heartbeats
//! - **REST**: [`NetworkClient`] turns every request into a [`Response`]
//! - **Logs**: JSONL upload to the logs processor, keyed by content hash

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod http;
pub mod logs;
pub mod names;
pub mod session;
pub mod stream;
pub mod transport;

pub use client::SecGemini;
pub use errors::{SessionError, StreamError, TransportError};
pub use http::{NetworkClient, Response};
pub use logs::LogsUpload;
pub use session::{InteractiveSession, ModelSpec, SessionOptions};
pub use stream::{MessageStream, StreamEngine, StreamState};
pub use transport::{Connection, Transport, WsConfig, WsTransport};

pub use secgemini_core as core;
pub use secgemini_tools as tools;
