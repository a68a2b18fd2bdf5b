//! # secgemini-logging
//!
//! Structured logging with `tracing`.
//!
//! Components do not reach for a global logger. Each session owns a
//! [`tracing::Span`] built by [`session_span`]; REST calls and the stream
//! engine record their events inside it, so every line carries the session id.
//!
//! - [`init_subscriber`] installs a compact stderr formatter for applications
//! - [`capture_logs`] records events in memory for test assertions

#![deny(unsafe_code)]

pub mod capture;

pub use capture::{CapturedEvent, CapturedLogs, capture_logs};

use tracing::Span;

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops. `RUST_LOG`
/// takes precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - Minimum log level to display, e.g. `"warn"` or `"secgemini_client=debug"`.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // set_global_default is a no-op if already set
    let _ = subscriber.try_init();
}

/// The logging handle a session carries for its whole life.
pub fn session_span(session_id: &str) -> Span {
    tracing::info_span!("session", session_id = %session_id)
}

/// Span for one `stream()` invocation, nested in its session span.
pub fn stream_span(parent: &Span, recv_only: bool) -> Span {
    tracing::info_span!(parent: parent, "stream", recv_only)
}
