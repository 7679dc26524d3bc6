//! HTTP client for the trellis API.
//!
//! Used by the CLI query subcommands to read a running registry.
//! Configuration is via environment variable:
//! - `TRELLIS_URL` - Base URL (default: `http://localhost:3000/api/v1`)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::KeyTree;

/// Default URL for a locally running server.
const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// HTTP client for the trellis API.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    client: Client,
}

impl RegistryClient {
    /// Create a client from the environment.
    pub fn from_env() -> Self {
        let base_url = std::env::var("TRELLIS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    /// Create with an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    /// Handle a response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response).await
    }

    /// Node paths always start with the separator; be lenient about how
    /// the CLI user typed them.
    fn node_path(path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    }

    // ============================================================
    // Query Operations
    // ============================================================

    /// Every path in the registry.
    pub async fn keys(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/keys").await
    }

    /// Immediate child segments of a node.
    pub async fn children(&self, path: &str) -> Result<Vec<String>, ClientError> {
        self.get_json(&format!("/keys{}", Self::node_path(path))).await
    }

    /// Resolved field values of a node.
    pub async fn values(&self, path: &str) -> Result<Map<String, Value>, ClientError> {
        self.get_json(&format!("/values{}", Self::node_path(path))).await
    }

    /// The nested key hierarchy below a path, or the whole tree.
    pub async fn tree(&self, path: Option<&str>) -> Result<KeyTree, ClientError> {
        match path {
            Some(p) => self.get_json(&format!("/tree{}", Self::node_path(p))).await,
            None => self.get_json("/tree").await,
        }
    }

    /// Follow the event stream, invoking `on_event` with the JSON payload
    /// of each event as it arrives. Runs until the server closes the
    /// connection.
    pub async fn watch(&self, mut on_event: impl FnMut(&str)) -> Result<(), ClientError> {
        let url = format!("{}/events", self.base_url);
        let mut response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server(format!("{}: {}", status, body)));
        }

        let mut buffer = String::new();
        while let Some(chunk) = response.chunk().await? {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(end) = buffer.find('\n') {
                let line = buffer[..end].trim().to_string();
                buffer.drain(..=end);
                // SSE data lines carry the payload; everything else is
                // framing or keep-alive.
                if let Some(payload) = line.strip_prefix("data: ") {
                    on_event(payload);
                }
            }
        }
        Ok(())
    }
}
