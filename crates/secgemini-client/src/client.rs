//! Entry point: [`SecGemini`] owns the service configuration and opens
//! sessions.

use std::sync::Arc;

use secgemini_core::UserInfo;
use secgemini_core::constants::endpoints;
use secgemini_settings::{ClientSettings, load_settings};
use secgemini_tools::ToolRegistry;
use tracing::{debug, error, info};

use crate::errors::SessionError;
use crate::http::NetworkClient;
use crate::session::{ClientContext, InteractiveSession, SessionOptions};
use crate::transport::{Transport, WsConfig, WsTransport};

/// Client for the Sec-Gemini service.
#[derive(Clone)]
pub struct SecGemini {
    ctx: ClientContext,
}

impl SecGemini {
    /// Build a client from validated settings.
    pub fn new(settings: ClientSettings) -> Result<Self, SessionError> {
        let transport = WsTransport::new(WsConfig::from_settings(&settings.stream));
        Self::with_transport(settings, Arc::new(transport))
    }

    /// Build a client from `~/.secgemini/settings.json` and the environment.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::new(load_settings()?)
    }

    /// Build a client with a custom stream transport.
    pub fn with_transport(settings: ClientSettings, transport: Arc<dyn Transport>) -> Result<Self, SessionError> {
        settings.validate()?;
        debug!(base_url = %settings.base_url, websockets_url = %settings.base_websockets_url, "client configured");
        Ok(Self {
            ctx: ClientContext {
                http: NetworkClient::from_settings(&settings),
                settings: Arc::new(settings),
                transport,
            },
        })
    }

    /// Active settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.ctx.settings
    }

    /// The caller's profile, sessions and available models.
    pub async fn get_info(&self) -> Result<UserInfo, SessionError> {
        let resp = self.ctx.http.get(endpoints::USER_INFO, &[]).await;
        if !resp.ok {
            error!(error = %resp.error_message, "user info request failed");
            return Err(SessionError::Http {
                operation: "user info",
                message: resp.error_message,
            });
        }
        resp.parse().map_err(|source| SessionError::Decode {
            operation: "user info",
            source,
        })
    }

    /// Register a new session.
    ///
    /// Options are validated before the network is touched.
    pub async fn create_session(&self, options: SessionOptions) -> Result<InteractiveSession, SessionError> {
        let _ = options.resolve_model()?;
        let info = self.get_info().await?;
        let session = InteractiveSession::register(self.ctx.clone(), &info.user, options).await?;
        info!(session_id = %session.id(), "session created");
        Ok(session)
    }

    /// Bind to an existing session without local tools.
    pub async fn resume_session(&self, session_id: &str) -> Result<InteractiveSession, SessionError> {
        self.resume_session_with_tools(session_id, ToolRegistry::new()).await
    }

    /// Bind to an existing session and answer its tool calls with `tools`.
    pub async fn resume_session_with_tools(
        &self,
        session_id: &str,
        tools: ToolRegistry,
    ) -> Result<InteractiveSession, SessionError> {
        if session_id.is_empty() {
            return Err(SessionError::invalid("session id is required"));
        }
        InteractiveSession::resume(self.ctx.clone(), session_id, tools).await
    }

    /// The caller's sessions.
    pub async fn list_sessions(&self) -> Result<Vec<secgemini_core::PublicSession>, SessionError> {
        Ok(self.get_info().await?.sessions)
    }
}

impl std::fmt::Debug for SecGemini {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecGemini")
            .field("base_url", &self.ctx.settings.base_url)
            .field("base_websockets_url", &self.ctx.settings.base_websockets_url)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
