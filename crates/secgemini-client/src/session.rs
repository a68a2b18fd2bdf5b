//! Interactive sessions.
//!
//! An [`InteractiveSession`] is a handle bound to one server-side session.
//! It is only obtainable through [`InteractiveSession::register`] or
//! [`InteractiveSession::resume`], so every method can rely on a valid id.
//!
//! The handle keeps no copy of the session record. Each attribute reader
//! fetches the canonical record from the control plane before answering.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secgemini_core::constants::{DEFAULT_LANGUAGE, DEFAULT_TTL_SECS, MIN_TTL_SECS, endpoints};
use secgemini_core::{
    Attachment, DetachFileRequest, Feedback, FeedbackType, LocalTool, Message, ModelInfo, OpResult,
    PublicLogsTable, PublicSession, PublicSessionFile, PublicUser, SessionRequest, SessionResponse,
    State, Usage,
};
use secgemini_settings::ClientSettings;
use secgemini_tools::ToolRegistry;
use serde::Serialize;
use tracing::{Instrument, Span, debug, error, info};
use url::Url;

use crate::errors::SessionError;
use crate::http::{NetworkClient, Response};
use crate::logs::{self, LogsUpload};
use crate::names::generate_session_name;
use crate::stream::{MessageStream, StreamEngine};
use crate::transport::Transport;

/// Shared client plumbing every session is built from.
#[derive(Clone)]
pub(crate) struct ClientContext {
    pub(crate) settings: Arc<ClientSettings>,
    pub(crate) http: NetworkClient,
    pub(crate) transport: Arc<dyn Transport>,
}

/// How a session's model is chosen.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelSpec {
    /// A full model configuration.
    Info(ModelInfo),
    /// `name-version` or `name-version-experimental`.
    Name(String),
}

impl From<ModelInfo> for ModelSpec {
    fn from(info: ModelInfo) -> Self {
        Self::Info(info)
    }
}

impl From<&str> for ModelSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for ModelSpec {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Parameters for a new session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Model to run.
    pub model: ModelSpec,
    /// Inactivity time-to-live in seconds; at least 300.
    pub ttl: u64,
    /// Session name; a random one is generated when empty.
    pub name: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Conversation language.
    pub language: String,
    /// Whether the service may log the session.
    pub can_log: bool,
    /// Local tools the model may call.
    pub tools: ToolRegistry,
}

impl SessionOptions {
    /// Defaults for `model`.
    pub fn new(model: impl Into<ModelSpec>) -> Self {
        Self {
            model: model.into(),
            ttl: DEFAULT_TTL_SECS,
            name: None,
            description: String::new(),
            language: DEFAULT_LANGUAGE.to_owned(),
            can_log: true,
            tools: ToolRegistry::new(),
        }
    }

    /// Set the ttl.
    #[must_use]
    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Allow or forbid service-side logging.
    #[must_use]
    pub fn can_log(mut self, can_log: bool) -> Self {
        self.can_log = can_log;
        self
    }

    /// Expose local tools.
    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Check the ttl and resolve the model, without any I/O.
    pub fn resolve_model(&self) -> Result<ModelInfo, SessionError> {
        check_ttl(self.ttl)?;
        match &self.model {
            ModelSpec::Info(info) => Ok(info.clone()),
            ModelSpec::Name(name) => ModelInfo::parse(name).map_err(|e| SessionError::invalid(e.to_string())),
        }
    }
}

/// Handle to one server-side session.
pub struct InteractiveSession {
    id: String,
    ctx: ClientContext,
    engine: StreamEngine,
    local_tools: Vec<LocalTool>,
    span: Span,
}

impl InteractiveSession {
    fn bind(ctx: ClientContext, id: String, registry: ToolRegistry) -> Self {
        let local_tools = registry.definitions();
        let engine = StreamEngine::new(
            Arc::clone(&ctx.transport),
            Arc::new(registry),
            ctx.settings.stream.backoff(),
        );
        let span = secgemini_logging::session_span(&id);
        Self {
            id,
            ctx,
            engine,
            local_tools,
            span,
        }
    }

    /// Create a session owned by `user`.
    ///
    /// The ttl and model are validated before any request is made. Transport
    /// failures and non-OK statuses are errors.
    pub(crate) async fn register(
        ctx: ClientContext,
        user: &PublicUser,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let model = options.resolve_model()?;

        let mut record = PublicSession::new(user, model, options.ttl);
        record.name = options
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(generate_session_name);
        record.description = options.description;
        record.language = options.language;
        record.can_log = options.can_log;
        record.local_tools = options.tools.definitions();

        let session = Self::bind(ctx, record.id.clone(), options.tools);
        async {
            let resp = session.ctx.http.post(endpoints::REGISTER_SESSION, &record).await;
            let _ = expect_ok(resp, "register session")?;
            info!(name = %record.name, tools = record.local_tools.len(), "session registered");
            Ok::<(), SessionError>(())
        }
        .instrument(session.span.clone())
        .await?;
        Ok(session)
    }

    /// Bind to an existing session. Unknown ids are errors.
    pub(crate) async fn resume(
        ctx: ClientContext,
        session_id: &str,
        registry: ToolRegistry,
    ) -> Result<Self, SessionError> {
        let session = Self::bind(ctx, session_id.to_owned(), registry);
        let record = session.fetch_session().await?;
        session.span.in_scope(|| info!(name = %record.name, "session resumed"));
        Ok(session)
    }

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Declarations of the local tools this handle answers.
    pub fn local_tools(&self) -> &[LocalTool] {
        &self.local_tools
    }

    /// The logging span every event of this session is recorded in.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Fetch the canonical session record.
    pub async fn fetch_session(&self) -> Result<PublicSession, SessionError> {
        async {
            let resp = self
                .ctx
                .http
                .get(endpoints::GET_SESSION, &[("session_id", self.id.as_str())])
                .await;
            if !resp.ok {
                error!(error = %resp.error_message, "fetch session failed");
                return Err(SessionError::Http {
                    operation: "fetch session",
                    message: resp.error_message,
                });
            }
            resp.parse().map_err(|source| {
                error!(error = %source, "fetch session returned an unexpected body");
                SessionError::Decode {
                    operation: "fetch session",
                    source,
                }
            })
        }
        .instrument(self.span.clone())
        .await
    }

    // ── Attributes (each one re-fetches) ────────────────────────────

    /// Model configuration.
    pub async fn model(&self) -> Result<ModelInfo, SessionError> {
        Ok(self.fetch_session().await?.model)
    }

    /// Time-to-live in seconds.
    pub async fn ttl(&self) -> Result<u64, SessionError> {
        Ok(self.fetch_session().await?.ttl)
    }

    /// Conversation language.
    pub async fn language(&self) -> Result<String, SessionError> {
        Ok(self.fetch_session().await?.language)
    }

    /// Completed turns.
    pub async fn turns(&self) -> Result<u64, SessionError> {
        Ok(self.fetch_session().await?.turns)
    }

    /// Session name.
    pub async fn name(&self) -> Result<String, SessionError> {
        Ok(self.fetch_session().await?.name)
    }

    /// Session description.
    pub async fn description(&self) -> Result<String, SessionError> {
        Ok(self.fetch_session().await?.description)
    }

    /// Creation time, unix seconds.
    pub async fn create_time(&self) -> Result<f64, SessionError> {
        Ok(self.fetch_session().await?.create_time)
    }

    /// Last update time, unix seconds.
    pub async fn update_time(&self) -> Result<f64, SessionError> {
        Ok(self.fetch_session().await?.update_time)
    }

    /// Messages in causal order.
    pub async fn messages(&self) -> Result<Vec<Message>, SessionError> {
        Ok(self.fetch_session().await?.messages)
    }

    /// Accumulated usage.
    pub async fn usage(&self) -> Result<Usage, SessionError> {
        Ok(self.fetch_session().await?.usage)
    }

    /// Whether the service may log this session.
    pub async fn can_log(&self) -> Result<bool, SessionError> {
        Ok(self.fetch_session().await?.can_log)
    }

    /// Lifecycle state.
    pub async fn state(&self) -> Result<State, SessionError> {
        Ok(self.fetch_session().await?.state)
    }

    /// Attached files, addressed by position.
    pub async fn files(&self) -> Result<Vec<PublicSessionFile>, SessionError> {
        Ok(self.fetch_session().await?.files)
    }

    /// Linked logs table.
    pub async fn logs_table(&self) -> Result<Option<PublicLogsTable>, SessionError> {
        Ok(self.fetch_session().await?.logs_table)
    }

    /// Full message history.
    pub async fn history(&self) -> Result<Vec<Message>, SessionError> {
        self.messages().await
    }

    // ── Management ──────────────────────────────────────────────────

    /// Change name, description or ttl. `None` leaves a field unchanged.
    ///
    /// A ttl below the minimum is rejected before any request. Returns
    /// whether the service accepted the update.
    pub async fn update(
        &self,
        name: Option<&str>,
        description: Option<&str>,
        ttl: Option<u64>,
    ) -> Result<bool, SessionError> {
        if let Some(ttl) = ttl {
            check_ttl(ttl)?;
        }
        let mut record = self.fetch_session().await?;
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            record.name = name.to_owned();
        }
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            record.description = description.to_owned();
        }
        if let Some(ttl) = ttl {
            record.ttl = ttl;
        }
        Ok(self.post_best_effort(endpoints::UPDATE_SESSION, &record, "update session").await.is_some())
    }

    /// Delete the session. The handle is consumed either way; a failed
    /// delete can be retried through a resumed handle.
    pub async fn delete(self) -> bool {
        let record = match self.fetch_session().await {
            Ok(record) => record,
            Err(_) => return false,
        };
        let deleted = self
            .post_best_effort(endpoints::DELETE_SESSION, &record, "delete session")
            .await
            .is_some();
        if deleted {
            self.span.in_scope(|| info!("session deleted"));
        }
        deleted
    }

    /// Score a message group, or the whole session when `group_id` is empty.
    pub async fn send_feedback(&self, score: i32, comment: &str, group_id: &str) -> bool {
        self.upload_feedback(FeedbackType::UserFeedback, score, comment, group_id).await
    }

    /// Report a bug.
    pub async fn send_bug_report(&self, bug: &str, group_id: &str) -> bool {
        self.upload_feedback(FeedbackType::BugReport, 0, bug, group_id).await
    }

    async fn upload_feedback(&self, kind: FeedbackType, score: i32, comment: &str, group_id: &str) -> bool {
        let feedback = Feedback {
            session_id: self.id.clone(),
            group_id: group_id.to_owned(),
            kind,
            score,
            comment: comment.to_owned(),
        };
        self.post_best_effort(endpoints::SEND_FEEDBACK, &feedback, "send feedback")
            .await
            .is_some()
    }

    // ── Files ───────────────────────────────────────────────────────

    /// Upload a file. `None` on any failure; the cause is logged.
    pub async fn attach_file(
        &self,
        filename: &str,
        content: &[u8],
        mime_type_hint: Option<&str>,
    ) -> Option<PublicSessionFile> {
        let attachment = Attachment {
            session_id: self.id.clone(),
            filename: filename.to_owned(),
            mime_type: mime_type_hint.map(str::to_owned),
            content: BASE64.encode(content),
        };
        let op = self
            .post_best_effort(endpoints::ATTACH_FILE, &attachment, "attach file")
            .await?;
        self.span.in_scope(|| {
            let Some(data) = op.data else {
                error!(filename, "attach file returned no file descriptor");
                return None;
            };
            match serde_json::from_value::<PublicSessionFile>(data) {
                Ok(file) => {
                    debug!(filename, stored = %file.filename, "file attached");
                    Some(file)
                }
                Err(e) => {
                    error!(filename, error = %e, "attach file returned an unexpected descriptor");
                    None
                }
            }
        })
    }

    /// Upload a file from disk under its own file name.
    pub async fn attach_file_from_disk(&self, path: &Path) -> Result<Option<PublicSessionFile>, SessionError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(SessionError::invalid(format!("{} is not a file", path.display())));
        }
        let content = tokio::fs::read(path).await.map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.attach_file(&filename, &content, None).await)
    }

    /// Detach the file at `file_idx` in [`Self::files`].
    ///
    /// Later files shift down by one position. An index past the end is
    /// reported as `false` and nothing is sent.
    pub async fn detach_file(&self, file_idx: usize) -> bool {
        let files = match self.files().await {
            Ok(files) => files,
            Err(_) => return false,
        };
        if file_idx >= files.len() {
            self.span.in_scope(|| {
                error!(file_idx, files = files.len(), "detach file: index out of range");
            });
            return false;
        }
        let request = DetachFileRequest {
            session_id: self.id.clone(),
            file_idx,
        };
        let detached = self
            .post_best_effort(endpoints::DETACH_FILE, &request, "detach file")
            .await
            .is_some();
        if detached {
            self.span.in_scope(|| debug!(file_idx, "file detached"));
        }
        detached
    }

    // ── Logs ────────────────────────────────────────────────────────

    /// Link an uploaded logs table to this session.
    pub async fn attach_logs(&self, logs_hash: &str) -> bool {
        async {
            let resp = self
                .ctx
                .http
                .post_query(
                    endpoints::ATTACH_LOGS,
                    &[("session_id", self.id.as_str()), ("logs_hash", logs_hash)],
                    None,
                )
                .await;
            if resp.ok {
                debug!(logs_hash, "logs attached");
            } else {
                error!(logs_hash, error = %resp.error_message, "attach logs failed");
            }
            resp.ok
        }
        .instrument(self.span.clone())
        .await
    }

    /// Upload a JSONL log file through the logs processor and link it.
    ///
    /// `custom_fields_mapping` renames fields as `{destination: source}`.
    pub async fn upload_and_attach_logs(
        &self,
        path: &Path,
        custom_fields_mapping: Option<&HashMap<String, String>>,
    ) -> Result<LogsUpload, SessionError> {
        let Some(logs_url) = self.ctx.settings.logs_processor_api_url.as_deref() else {
            return Err(SessionError::invalid(
                "logs processor URL required: set logs_processor_api_url or SEC_GEMINI_LOGS_PROCESSOR_API_URL",
            ));
        };
        let can_log = self.can_log().await?;
        let logs_client = self.ctx.http.with_base_url(logs_url);
        let upload = logs::upload_logs(&logs_client, path, can_log, custom_fields_mapping)
            .instrument(self.span.clone())
            .await?;
        if !self.attach_logs(&upload.logs_hash).await {
            return Err(SessionError::Http {
                operation: "attach logs",
                message: format!("logs table {} could not be attached", upload.logs_hash),
            });
        }
        Ok(upload)
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Single-shot generation over REST.
    pub async fn query(&self, prompt: &str) -> Result<SessionResponse, SessionError> {
        if prompt.is_empty() {
            return Err(SessionError::invalid("prompt is required"));
        }
        let request = SessionRequest {
            id: self.id.clone(),
            messages: vec![Message::query(prompt)],
            local_tools: self.local_tools.clone(),
        };
        async {
            let resp = self.ctx.http.post(endpoints::GENERATE, &request).await;
            if !resp.ok {
                error!(error = %resp.error_message, "generate failed");
                return Err(SessionError::Http {
                    operation: "generate",
                    message: resp.error_message,
                });
            }
            let response: SessionResponse = resp.parse().map_err(|source| SessionError::Decode {
                operation: "generate",
                source,
            })?;
            if !response.status_code.is_ok() {
                error!(
                    status = response.status_code.code(),
                    status_message = %response.status_message,
                    "generate rejected"
                );
                return Err(SessionError::Status {
                    operation: "generate",
                    status: response.status_code.code(),
                    message: response.status_message,
                });
            }
            Ok(response)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Send `prompt` and stream the answer.
    ///
    /// An empty prompt is rejected before connecting. The returned stream
    /// answers local tool calls itself and never yields them.
    pub fn stream(&self, prompt: &str) -> Result<MessageStream, SessionError> {
        if prompt.is_empty() {
            return Err(SessionError::invalid("prompt is required"));
        }
        self.open_stream(Some(Message::query(prompt)))
    }

    /// Stream messages of the session without sending a prompt.
    pub fn listen(&self) -> Result<MessageStream, SessionError> {
        self.open_stream(None)
    }

    fn open_stream(&self, prompt: Option<Message>) -> Result<MessageStream, SessionError> {
        let url = self.stream_url()?;
        let span = secgemini_logging::stream_span(&self.span, prompt.is_none());
        Ok(self.engine.stream(url, prompt, span))
    }

    fn stream_url(&self) -> Result<Url, SessionError> {
        let settings = &self.ctx.settings;
        let base = format!(
            "{}{}",
            settings.base_websockets_url.trim_end_matches('/'),
            settings.stream.path
        );
        let mut url = Url::parse(&base)
            .map_err(|e| SessionError::invalid(format!("invalid websocket url {base}: {e}")))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("api_key", &settings.api_key)
            .append_pair("session_id", &self.id);
        Ok(url)
    }

    async fn post_best_effort<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        operation: &'static str,
    ) -> Option<OpResult> {
        async {
            let resp = self.ctx.http.post(path, body).await;
            expect_ok(resp, operation).ok()
        }
        .instrument(self.span.clone())
        .await
    }
}

impl std::fmt::Debug for InteractiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveSession")
            .field("id", &self.id)
            .field("local_tools", &self.local_tools.len())
            .finish_non_exhaustive()
    }
}

fn check_ttl(ttl: u64) -> Result<(), SessionError> {
    if ttl < MIN_TTL_SECS {
        return Err(SessionError::invalid(format!(
            "TTL must be greater than {MIN_TTL_SECS} seconds"
        )));
    }
    Ok(())
}

/// HTTP success plus an OK application status.
fn expect_ok(resp: Response, operation: &'static str) -> Result<OpResult, SessionError> {
    if !resp.ok {
        error!(error = %resp.error_message, "{operation} failed");
        return Err(SessionError::Http {
            operation,
            message: resp.error_message,
        });
    }
    let op: OpResult = resp.parse().map_err(|source| SessionError::Decode { operation, source })?;
    if !op.is_ok() {
        error!(status = op.status_code.code(), status_message = %op.status_message, "{operation} rejected");
        return Err(SessionError::Status {
            operation,
            status: op.status_code.code(),
            message: op.status_message,
        });
    }
    Ok(op)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
