//! REST control-plane client.
//!
//! Single-shot request/response helpers. They never fail outward: transport
//! errors and non-2xx statuses come back as a [`Response`] with `ok == false`
//! and a readable `error_message`, and the caller decides what that means.

use std::time::Duration;

use reqwest::RequestBuilder;
use secgemini_core::constants::API_KEY_HEADER;
use secgemini_settings::ClientSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of one REST call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    /// 2xx and a readable body.
    pub ok: bool,
    /// Decoded JSON body; a JSON string when the body was not JSON.
    pub data: Value,
    /// Failure description; empty on success.
    pub error_message: String,
}

impl Response {
    fn success(data: Value) -> Self {
        Self {
            ok: true,
            data,
            error_message: String::new(),
        }
    }

    fn failure(error_message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: Value::Null,
            error_message: error_message.into(),
        }
    }

    /// Decode `data` into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.data)
    }
}

/// HTTP client bound to one base URL and API key.
#[derive(Clone, Debug)]
pub struct NetworkClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NetworkClient {
    /// Client for `base_url`, sending `api_key` with every request.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("secgemini-rs/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    /// Client for the control plane configured in `settings`.
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(&settings.base_url, &settings.api_key, settings.http_timeout())
    }

    /// Same connection pool and key, different base URL.
    #[must_use]
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: self.api_key.clone(),
        }
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path?query`.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Response {
        let url = self.url(path);
        self.execute(self.client.get(&url).query(query), &url).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Response {
        let url = self.url(path);
        self.execute(self.client.post(&url).json(body), &url).await
    }

    /// `POST path?query`, with an optional JSON body.
    pub async fn post_query(&self, path: &str, query: &[(&str, &str)], body: Option<&Value>) -> Response {
        let url = self.url(path);
        let mut request = self.client.post(&url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request, &url).await
    }

    async fn execute(&self, request: RequestBuilder, url: &str) -> Response {
        let response = match request.header(API_KEY_HEADER, &self.api_key).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "request failed");
                return Response::failure(format!("request to {url} failed: {e}"));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(url, error = %e, "failed to read response body");
                return Response::failure(format!("failed to read response from {url}: {e}"));
            }
        };

        if !status.is_success() {
            warn!(url, status = status.as_u16(), "request rejected");
            return Response::failure(format!("HTTP {}: {body}", status.as_u16()));
        }

        debug!(url, status = status.as_u16(), bytes = body.len(), "request ok");
        let data = if body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&body) {
                Ok(value) => value,
                Err(_) => Value::String(body),
            }
        };
        Response::success(data)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
