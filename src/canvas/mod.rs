pub mod dto;
pub mod endpoints;
pub mod pagination;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL, LINK};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::config::CanvasConfig;
use crate::error::AppError;
use crate::session::Session;

/// Per-request options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestParams {
    /// Skip any HTTP-level cache between us and the server.
    pub force_network: bool,
    /// Overrides the client's configured page size.
    pub per_page: Option<u32>,
}

impl RestParams {
    pub fn new(force_network: bool) -> Self {
        Self {
            force_network,
            per_page: None,
        }
    }
}

/// One response body plus the server-supplied link to the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub body: String,
    pub next_url: Option<String>,
}

impl RawPage {
    pub fn last(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            next_url: None,
        }
    }
}

/// GET access to the course API. `url` is either relative to the API host or a
/// fully qualified next-page link.
#[async_trait]
pub trait CanvasTransport: Send + Sync {
    /// GET with the signed-in session's token.
    async fn get(&self, url: &str, params: &RestParams) -> Result<RawPage, AppError>;

    /// GET with an explicit token, used before a session exists.
    async fn get_with_token(
        &self,
        url: &str,
        params: &RestParams,
        _token: &str,
    ) -> Result<RawPage, AppError> {
        self.get(url, params).await
    }
}

pub struct CanvasHttpClient {
    client: Client,
    base_url: Url,
    per_page: u32,
    session: Arc<Session>,
}

impl CanvasHttpClient {
    pub fn new(config: &CanvasConfig, session: Arc<Session>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| AppError::BadRequest(format!("Invalid CANVAS_BASE_URL {}: {}", base, e)))?;

        Ok(Self {
            client,
            base_url,
            per_page: config.per_page,
            session,
        })
    }

    fn resolve(&self, url: &str, params: &RestParams) -> Result<Url, AppError> {
        let parsed = if url.starts_with("http://") || url.starts_with("https://") {
            Url::parse(url)
        } else {
            self.base_url.join(url.trim_start_matches('/'))
        };
        let mut resolved =
            parsed.map_err(|e| AppError::BadRequest(format!("Invalid url {}: {}", url, e)))?;

        if !resolved.query_pairs().any(|(key, _)| key == "per_page") {
            let per_page = params.per_page.unwrap_or(self.per_page);
            resolved
                .query_pairs_mut()
                .append_pair("per_page", &per_page.to_string());
        }

        Ok(resolved)
    }
}

#[async_trait]
impl CanvasTransport for CanvasHttpClient {
    async fn get(&self, url: &str, params: &RestParams) -> Result<RawPage, AppError> {
        let token = self
            .session
            .token()
            .ok_or_else(|| AppError::Auth("no active session".to_string()))?;
        self.get_with_token(url, params, &token).await
    }

    async fn get_with_token(
        &self,
        url: &str,
        params: &RestParams,
        token: &str,
    ) -> Result<RawPage, AppError> {
        let url = self.resolve(url, params)?;
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        if params.force_network {
            request = request.header(CACHE_CONTROL, "no-cache");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let next_url = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(pagination::parse_next_link);
        let body = response.text().await?;

        Ok(RawPage { body, next_url })
    }
}

fn error_for_status(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Auth(format!("Canvas API error {}: {}", status, body))
        }
        StatusCode::NOT_FOUND => AppError::NotFound,
        _ => AppError::Network(format!("Canvas API error {}: {}", status, body)),
    }
}
