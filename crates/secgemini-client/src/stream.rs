//! # Streaming engine
//!
//! Drives one `stream()` invocation as an explicit state machine:
//!
//! ```text
//! Connecting ──ok──▶ AwaitingPromptSend ──sent──▶ Receiving ◀──┐
//!     ▲                (skipped when listening,     │   │        │
//!     │                 or once the prompt went)    │   │ call   │ sent
//!     │ backoff                                     │   ▼        │
//!     └──────────── transport error ◀───────────────┤ DispatchingTool
//!                         │ budget spent            │
//!                         ▼                         ▼ END / non-OK
//!                       Failed                    Done
//! ```
//!
//! - `LOCAL_TOOL_CALL` messages are answered through the [`ToolRegistry`]
//!   and never reach the consumer. Tools run on the blocking pool, so a slow
//!   tool holds up its own stream and nothing else.
//! - The prompt is sent at most once per invocation: the flag is set before
//!   the first send and never cleared, so reconnects only resume listening.
//! - Up to [`Backoff::max_attempts`] connections are made. After failed
//!   attempt `n` the engine waits `n` steps; after the last one it yields
//!   [`StreamError::RetriesExhausted`] and stops.
//! - A non-OK status or an `END` state ends the stream without an error.
//!   Non-OK messages and `END` messages with content are yielded as the last
//!   item; an empty `END` marker is consumed.
//! - The connection is closed on every exit path. A consumer that drops the
//!   stream early drops the connection with it.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use secgemini_core::{Backoff, Message, MessageType, ToolOutput};
use secgemini_tools::{ToolCall, ToolRegistry};
use tracing::{Instrument, Span, debug, error, info, warn};
use url::Url;

use crate::errors::{StreamError, TransportError};
use crate::transport::{Connection, Transport, redact};

/// Messages produced by one stream invocation.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, StreamError>> + Send>>;

/// Where a stream invocation is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Opening a connection.
    Connecting,
    /// Connected, the prompt still has to go out.
    AwaitingPromptSend,
    /// Waiting for the next inbound message.
    Receiving,
    /// Running a local tool for the last inbound call.
    DispatchingTool,
    /// Ended by the service.
    Done,
    /// Ended by running out of connection attempts.
    Failed,
}

impl StreamState {
    /// Whether no further transitions happen.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Builds message streams over a [`Transport`].
#[derive(Clone)]
pub struct StreamEngine {
    transport: Arc<dyn Transport>,
    registry: Arc<ToolRegistry>,
    backoff: Backoff,
}

impl StreamEngine {
    /// Engine answering tool calls from `registry`.
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<ToolRegistry>, backoff: Backoff) -> Self {
        Self {
            transport,
            registry,
            backoff,
        }
    }

    /// Start a lazy stream against `url`.
    ///
    /// With `prompt == None` the engine only listens. Nothing happens until
    /// the stream is polled; every event is recorded inside `span`.
    pub fn stream(&self, url: Url, prompt: Option<Message>, span: Span) -> MessageStream {
        type Item = Result<Message, StreamError>;

        let mut machine = StreamMachine::new(self.clone(), url, prompt);
        Box::pin(async_stream::stream! {
            loop {
                match machine.step().instrument(span.clone()).await {
                    Step::Continue => {}
                    Step::Emit(message) => {
                        let v: Item = Ok(message);
                        yield v;
                    }
                    Step::Finished => break,
                    Step::Failed(err) => {
                        let v: Item = Err(err);
                        yield v;
                        break;
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("registry", &self.registry)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Result of one state transition.
#[derive(Debug)]
pub(crate) enum Step {
    /// Transitioned; nothing for the consumer.
    Continue,
    /// Hand this message to the consumer.
    Emit(Message),
    /// The stream ended cleanly.
    Finished,
    /// The stream ended with this error.
    Failed(StreamError),
}

pub(crate) struct StreamMachine {
    engine: StreamEngine,
    url: Url,
    prompt: Option<Message>,
    prompt_sent: bool,
    attempt: u32,
    state: StreamState,
    connection: Option<Box<dyn Connection>>,
    pending_call: Option<Message>,
}

impl StreamMachine {
    pub(crate) fn new(engine: StreamEngine, url: Url, prompt: Option<Message>) -> Self {
        Self {
            engine,
            url,
            prompt,
            prompt_sent: false,
            attempt: 0,
            state: StreamState::Connecting,
            connection: None,
            pending_call: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    pub(crate) async fn step(&mut self) -> Step {
        match self.state {
            StreamState::Connecting => self.connect().await,
            StreamState::AwaitingPromptSend => self.send_prompt().await,
            StreamState::Receiving => self.receive().await,
            StreamState::DispatchingTool => self.dispatch_tool().await,
            StreamState::Done | StreamState::Failed => Step::Finished,
        }
    }

    async fn connect(&mut self) -> Step {
        self.attempt += 1;
        debug!(attempt = self.attempt, url = %redact(&self.url), "connecting");
        match self.engine.transport.connect(&self.url).await {
            Ok(connection) => {
                info!(attempt = self.attempt, "stream connected");
                self.connection = Some(connection);
                self.state = if self.prompt.is_some() && !self.prompt_sent {
                    StreamState::AwaitingPromptSend
                } else {
                    StreamState::Receiving
                };
                Step::Continue
            }
            Err(e) => self.transport_failed(e).await,
        }
    }

    async fn send_prompt(&mut self) -> Step {
        let Some(prompt) = &self.prompt else {
            self.state = StreamState::Receiving;
            return Step::Continue;
        };
        let message_id = prompt.id.clone();
        let frame = match prompt.to_json() {
            Ok(frame) => frame,
            Err(e) => return self.transport_failed(protocol_error(&e)).await,
        };

        self.prompt_sent = true;
        match self.send_frame(frame).await {
            Ok(()) => {
                info!(message_id = %message_id, "prompt sent");
                self.state = StreamState::Receiving;
                Step::Continue
            }
            Err(e) => self.transport_failed(e).await,
        }
    }

    async fn receive(&mut self) -> Step {
        let frame = match self.connection.as_mut() {
            Some(connection) => connection.recv().await,
            None => Err(TransportError::closed("no open connection")),
        };
        let message = match frame {
            Ok(Some(frame)) => match Message::from_json(&frame) {
                Ok(message) => message,
                Err(e) => return self.transport_failed(protocol_error(&e)).await,
            },
            Ok(None) => return self.transport_failed(TransportError::closed("connection dropped")).await,
            Err(e) => return self.transport_failed(e).await,
        };

        debug!(
            message_id = %message.id,
            message_type = %message.message_type,
            state = %message.state,
            status = message.status_code.code(),
            "received message"
        );

        if message.message_type == MessageType::LocalToolCall {
            self.pending_call = Some(message);
            self.state = StreamState::DispatchingTool;
            return Step::Continue;
        }

        if !message.status_code.is_ok() {
            warn!(
                status = message.status_code.code(),
                status_message = %message.status_message,
                "stream ended with error status"
            );
            self.finish().await;
            return Step::Emit(message);
        }

        if message.is_terminal() {
            debug!("stream reached end state");
            self.finish().await;
            return if message.is_empty() {
                Step::Continue
            } else {
                Step::Emit(message)
            };
        }

        Step::Emit(message)
    }

    async fn dispatch_tool(&mut self) -> Step {
        let Some(call) = self.pending_call.take() else {
            self.state = StreamState::Receiving;
            return Step::Continue;
        };
        let reply = run_tool(Arc::clone(&self.engine.registry), &call).await;
        let frame = match reply.to_json() {
            Ok(frame) => frame,
            Err(e) => return self.transport_failed(protocol_error(&e)).await,
        };

        match self.send_frame(frame).await {
            Ok(()) => {
                debug!(call_id = %call.id, reply_id = %reply.id, "tool result sent");
                if call.is_terminal() {
                    self.finish().await;
                } else {
                    self.state = StreamState::Receiving;
                }
                Step::Continue
            }
            Err(e) => self.transport_failed(e).await,
        }
    }

    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError> {
        match self.connection.as_mut() {
            Some(connection) => connection.send(frame).await,
            None => Err(TransportError::closed("no open connection")),
        }
    }

    async fn transport_failed(&mut self, err: TransportError) -> Step {
        self.close_connection().await;
        let max_attempts = self.engine.backoff.max_attempts;
        match self.engine.backoff.delay_after(self.attempt) {
            Some(delay) => {
                warn!(
                    attempt = self.attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "stream transport error, reconnecting"
                );
                tokio::time::sleep(delay).await;
                self.state = StreamState::Connecting;
                Step::Continue
            }
            None => {
                error!(attempts = self.attempt, error = %err, "stream retries exhausted");
                self.state = StreamState::Failed;
                Step::Failed(StreamError::RetriesExhausted {
                    attempts: self.attempt,
                    last_error: err,
                })
            }
        }
    }

    async fn finish(&mut self) {
        self.state = StreamState::Done;
        self.close_connection().await;
    }

    async fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close().await;
        }
    }
}

/// Run the call on the blocking pool so a slow tool only stalls its own stream.
async fn run_tool(registry: Arc<ToolRegistry>, call: &Message) -> Message {
    let owned = call.clone();
    match tokio::task::spawn_blocking(move || registry.dispatch(&owned)).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(call_id = %call.id, error = %e, "tool dispatch task failed");
            let name = ToolCall::from_message(call).map(|c| c.name).unwrap_or_default();
            let output = ToolOutput::failure(name, format!("tool execution aborted: {e}"));
            Message::tool_result(call, &output)
        }
    }
}

fn protocol_error(err: &serde_json::Error) -> TransportError {
    TransportError::Protocol {
        message: err.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use secgemini_core::{LocalTool, MimeType, ResponseStatus, Role, State, ToolParam};
    use serde_json::{Value, json};
    use tokio::time::Instant;

    use super::*;

    // ── Scripted transport ──────────────────────────────────────────

    enum Inbound {
        Frame(String),
        Fail(TransportError),
        Hang,
    }

    enum Attempt {
        Refuse,
        Accept(Vec<Inbound>),
    }

    #[derive(Default)]
    struct Record {
        connects: Mutex<Vec<Instant>>,
        sent: Mutex<Vec<String>>,
        closed: AtomicUsize,
        dropped: AtomicUsize,
    }

    struct ScriptedTransport {
        attempts: Mutex<VecDeque<Attempt>>,
        record: Arc<Record>,
    }

    impl ScriptedTransport {
        fn new(attempts: Vec<Attempt>) -> (Arc<Self>, Arc<Record>) {
            let record = Arc::new(Record::default());
            let transport = Arc::new(Self {
                attempts: Mutex::new(attempts.into()),
                record: Arc::clone(&record),
            });
            (transport, record)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, _url: &Url) -> Result<Box<dyn Connection>, TransportError> {
            self.record.connects.lock().push(Instant::now());
            match self.attempts.lock().pop_front() {
                Some(Attempt::Accept(inbound)) => Ok(Box::new(ScriptedConnection {
                    inbound: inbound.into(),
                    record: Arc::clone(&self.record),
                })),
                Some(Attempt::Refuse) | None => Err(TransportError::Connect {
                    url: "ws://test".into(),
                    message: "connection refused".into(),
                }),
            }
        }
    }

    struct ScriptedConnection {
        inbound: VecDeque<Inbound>,
        record: Arc<Record>,
    }

    #[async_trait]
    impl Connection for ScriptedConnection {
        async fn send(&mut self, frame: String) -> Result<(), TransportError> {
            self.record.sent.lock().push(frame);
            Ok(())
        }

        async fn recv(&mut self) -> Result<Option<String>, TransportError> {
            match self.inbound.pop_front() {
                Some(Inbound::Frame(frame)) => Ok(Some(frame)),
                Some(Inbound::Fail(e)) => Err(e),
                Some(Inbound::Hang) => std::future::pending().await,
                None => Ok(None),
            }
        }

        async fn close(&mut self) {
            let _ = self.record.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Drop for ScriptedConnection {
        fn drop(&mut self) {
            let _ = self.record.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn frame(message_type: MessageType, state: State, content: &str) -> Inbound {
        let msg = Message::build(Role::Agent, message_type, MimeType::Text, content)
            .unwrap()
            .with_state(state);
        Inbound::Frame(msg.to_json().unwrap())
    }

    fn end_marker() -> Inbound {
        let msg = Message::new(Role::Agent, MessageType::Info, MimeType::Text).with_state(State::End);
        Inbound::Frame(msg.to_json().unwrap())
    }

    fn tool_call(payload: &Value) -> Inbound {
        let msg = Message::build(
            Role::Agent,
            MessageType::LocalToolCall,
            MimeType::SerializedJson,
            payload.clone(),
        )
        .unwrap()
        .with_state(State::CallingTool);
        Inbound::Frame(msg.to_json().unwrap())
    }

    fn io_error() -> Inbound {
        Inbound::Fail(TransportError::Io {
            message: "connection reset".into(),
        })
    }

    fn weather_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        let _ = registry.register_fn(
            LocalTool::new("get_weather", "Current weather for a city.")
                .param(ToolParam::string("city").describe("City name")),
            |_args| Ok(json!("27C and sunny")),
        );
        Arc::new(registry)
    }

    fn engine(transport: Arc<ScriptedTransport>) -> StreamEngine {
        StreamEngine::new(transport, weather_registry(), Backoff::default())
    }

    fn url() -> Url {
        Url::parse("ws://test/v1/session/stream?api_key=k&session_id=s1").unwrap()
    }

    async fn collect(stream: MessageStream) -> Vec<Result<Message, StreamError>> {
        stream.collect().await
    }

    fn types(items: &[Result<Message, StreamError>]) -> Vec<MessageType> {
        items
            .iter()
            .map(|item| item.as_ref().unwrap().message_type.clone())
            .collect()
    }

    fn sent_messages(record: &Record) -> Vec<Message> {
        record
            .sent
            .lock()
            .iter()
            .map(|frame| Message::from_json(frame).unwrap())
            .collect()
    }

    // ── Scenarios ───────────────────────────────────────────────────

    #[tokio::test]
    async fn tool_calls_are_answered_and_hidden() {
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            frame(MessageType::Info, State::Understanding, "looking"),
            frame(MessageType::Thinking, State::Thinking, "hmm"),
            tool_call(&json!({"tool_name": "get_weather", "tool_args": {"city": "nyc"}})),
            frame(MessageType::Result, State::Answering, "It is 27C and sunny in NYC."),
            end_marker(),
        ])]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("weather?")), Span::none())).await;

        assert_eq!(
            types(&items),
            vec![MessageType::Info, MessageType::Thinking, MessageType::Result]
        );

        let sent = sent_messages(&record);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message_type, MessageType::Query);
        let results: Vec<&Message> = sent
            .iter()
            .filter(|m| m.message_type == MessageType::LocalToolResult)
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].get_content().unwrap().unwrap().as_json(),
            Some(&json!({"name": "get_weather", "output": "27C and sunny"}))
        );
        assert_eq!(record.connects.lock().len(), 1);
        assert_eq!(record.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_tool_does_not_starve_other_tasks() {
        let mut registry = ToolRegistry::new();
        let _ = registry.register_fn(LocalTool::new("slow_scan", "Takes a while"), |_| {
            std::thread::sleep(Duration::from_millis(300));
            Ok(json!("done"))
        });
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            tool_call(&json!({"tool_name": "slow_scan", "tool_args": {}})),
            end_marker(),
        ])]);
        let engine = StreamEngine::new(transport, Arc::new(registry), Backoff::default());

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = Arc::clone(&ticks);
            async move {
                let mut interval = tokio::time::interval(Duration::from_millis(10));
                loop {
                    let _ = interval.tick().await;
                    let _ = ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let items = collect(engine.stream(url(), Some(Message::query("scan")), Span::none())).await;
        ticker.abort();

        assert!(items.is_empty());
        let ticks = ticks.load(Ordering::SeqCst);
        assert!(ticks >= 10, "ticker starved during tool call: {ticks} ticks");

        let sent = sent_messages(&record);
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1].get_content().unwrap().unwrap().as_json(),
            Some(&json!({"name": "slow_scan", "output": "done"}))
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_back_not_yielded() {
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            tool_call(&json!({"name": "rm_rf", "args": {}})),
            frame(MessageType::Result, State::End, "done"),
        ])]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("go")), Span::none())).await;

        assert_eq!(types(&items), vec![MessageType::Result]);
        let sent = sent_messages(&record);
        let reply = &sent[1];
        assert_eq!(reply.message_type, MessageType::LocalToolResult);
        assert_eq!(reply.status_code, ResponseStatus::SERVER_ERROR);
        assert_eq!(
            reply.get_content().unwrap().unwrap().as_json(),
            Some(&json!({"name": "rm_rf", "output": "Tool 'rm_rf' not found.", "is_error": true}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_sent_once_across_reconnects() {
        let (transport, record) = ScriptedTransport::new(vec![
            Attempt::Accept(vec![frame(MessageType::Info, State::Understanding, "a"), io_error()]),
            Attempt::Accept(vec![io_error()]),
            Attempt::Refuse,
            Attempt::Accept(vec![frame(MessageType::Result, State::Answering, "b"), end_marker()]),
        ]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("scan")), Span::none())).await;

        assert_eq!(types(&items), vec![MessageType::Info, MessageType::Result]);
        assert_eq!(record.connects.lock().len(), 4);
        let queries = sent_messages(&record)
            .into_iter()
            .filter(|m| m.message_type == MessageType::Query)
            .count();
        assert_eq!(queries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_and_linear_backoff() {
        let (transport, record) = ScriptedTransport::new(vec![]);
        let start = Instant::now();
        let items = collect(engine(transport).stream(url(), Some(Message::query("x")), Span::none())).await;

        assert_eq!(items.len(), 1);
        assert_matches!(
            &items[0],
            Err(StreamError::RetriesExhausted { attempts: 5, last_error: TransportError::Connect { .. } })
        );

        let connects = record.connects.lock().clone();
        assert_eq!(connects.len(), 5);
        let waits: Vec<Duration> = connects.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            waits,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(4)
            ]
        );
        // No wait after the final attempt.
        assert_eq!(Instant::now() - start, Duration::from_secs(10));
        assert!(record.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn error_status_is_last_item_without_reconnect() {
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            frame(MessageType::Info, State::Understanding, "a"),
            Inbound::Frame(
                Message::new(Role::System, MessageType::Error, MimeType::Text)
                    .with_status(ResponseStatus::QUOTA_EXCEEDED, "quota exceeded")
                    .to_json()
                    .unwrap(),
            ),
            frame(MessageType::Result, State::Answering, "never seen"),
        ])]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("x")), Span::none())).await;

        assert_eq!(types(&items), vec![MessageType::Info, MessageType::Error]);
        let last = items[1].as_ref().unwrap();
        assert_eq!(last.status_code, ResponseStatus::QUOTA_EXCEEDED);
        assert_eq!(record.connects.lock().len(), 1);
        assert_eq!(record.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_content_status_ends_stream() {
        let (transport, _) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            Inbound::Frame(
                Message::new(Role::Agent, MessageType::Result, MimeType::Text)
                    .with_status(ResponseStatus::PARTIAL_CONTENT, "partial")
                    .to_json()
                    .unwrap(),
            ),
            frame(MessageType::Result, State::Answering, "never seen"),
        ])]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("x")), Span::none())).await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn end_with_content_is_yielded() {
        let (transport, _) = ScriptedTransport::new(vec![Attempt::Accept(vec![frame(
            MessageType::Result,
            State::End,
            "final answer",
        )])]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("x")), Span::none())).await;
        assert_eq!(types(&items), vec![MessageType::Result]);
        assert_eq!(items[0].as_ref().unwrap().state, State::End);
    }

    #[tokio::test]
    async fn listen_only_sends_nothing() {
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            frame(MessageType::Result, State::Answering, "resumed"),
            end_marker(),
        ])]);
        let items = collect(engine(transport).stream(url(), None, Span::none())).await;
        assert_eq!(types(&items), vec![MessageType::Result]);
        assert!(record.sent.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_triggers_reconnect() {
        let (transport, record) = ScriptedTransport::new(vec![
            Attempt::Accept(vec![Inbound::Frame("{not json".into())]),
            Attempt::Accept(vec![frame(MessageType::Result, State::End, "ok")]),
        ]);
        let items = collect(engine(transport).stream(url(), Some(Message::query("x")), Span::none())).await;
        assert_eq!(types(&items), vec![MessageType::Result]);
        assert_eq!(record.connects.lock().len(), 2);
    }

    #[tokio::test]
    async fn dropping_stream_releases_connection() {
        let (transport, record) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            frame(MessageType::Info, State::Understanding, "first"),
            Inbound::Hang,
        ])]);
        let mut stream = engine(transport).stream(url(), Some(Message::query("x")), Span::none());
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.message_type, MessageType::Info);
        assert_eq!(record.dropped.load(Ordering::SeqCst), 0);

        drop(stream);
        assert_eq!(record.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nothing_happens_until_polled() {
        let (transport, record) = ScriptedTransport::new(vec![]);
        let stream = engine(transport).stream(url(), Some(Message::query("x")), Span::none());
        assert!(record.connects.lock().is_empty());
        drop(stream);
    }

    // ── State machine ───────────────────────────────────────────────

    #[tokio::test]
    async fn state_transitions() {
        let (transport, _) = ScriptedTransport::new(vec![Attempt::Accept(vec![
            tool_call(&json!({"name": "get_weather", "args": {"city": "nyc"}})),
            frame(MessageType::Result, State::Answering, "sunny"),
            end_marker(),
        ])]);
        let mut machine = StreamMachine::new(engine(transport), url(), Some(Message::query("x")));
        assert_eq!(machine.state(), StreamState::Connecting);

        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::AwaitingPromptSend);

        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::Receiving);

        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::DispatchingTool);

        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::Receiving);

        assert_matches!(machine.step().await, Step::Emit(m) if m.message_type == MessageType::Result);
        assert_eq!(machine.state(), StreamState::Receiving);

        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::Done);
        assert!(machine.state().is_finished());

        assert_matches!(machine.step().await, Step::Finished);
    }

    #[tokio::test]
    async fn listen_mode_skips_prompt_state() {
        let (transport, _) = ScriptedTransport::new(vec![Attempt::Accept(vec![])]);
        let mut machine = StreamMachine::new(engine(transport), url(), None);
        assert_matches!(machine.step().await, Step::Continue);
        assert_eq!(machine.state(), StreamState::Receiving);
    }

    #[tokio::test]
    async fn single_attempt_budget_fails_immediately() {
        let (transport, record) = ScriptedTransport::new(vec![]);
        let engine = StreamEngine::new(transport, weather_registry(), Backoff::with_max_attempts(1));
        let mut machine = StreamMachine::new(engine, url(), None);
        assert_matches!(machine.step().await, Step::Failed(StreamError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(machine.state(), StreamState::Failed);
        assert_eq!(record.connects.lock().len(), 1);
    }
}
