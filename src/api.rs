use crate::error::VocablyError;
use crate::version::get_useragent;
use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::warn;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Base address of the Vocably backend plus the shared HTTP client.
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    base: String,
    http: Client,
}

impl ApiEndpoint {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url.trim())
            .map_err(|e| anyhow!("invalid backend url {}: {}", base_url, e))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("unsupported backend url scheme: {}", other)),
        }
        let http = Client::builder()
            .user_agent(get_useragent())
            .build()
            .map_err(|e| anyhow!("failed to build http client: {}", e))?;
        Ok(Self {
            base: parsed.as_str().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}

/// Maps a transport-level failure onto the user-visible taxonomy.
pub(crate) fn transport_error(
    e: reqwest::Error,
    unreachable: &str,
    timeout: &str,
    fallback: &str,
) -> VocablyError {
    if e.is_timeout() {
        warn!("request timed out: {}", e);
        VocablyError::Timeout(timeout.to_string())
    } else if e.is_connect() || e.is_request() {
        warn!("backend unreachable: {}", e);
        VocablyError::Unreachable(unreachable.to_string())
    } else {
        warn!("request failed: {}", e);
        VocablyError::Server {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: fallback.to_string(),
        }
    }
}
