pub mod summaries;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Response;
use serde::de::DeserializeOwned;
use thiserror::Error;

use types::ErrorBody;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        next_reset: Option<DateTime<Utc>>,
    },
    #[error("API error (status {status}): {detail}")]
    ApiError { status: u16, detail: String },
    #[error("deserialization error: {0}")]
    Deserialize(String),
}

/// Result shape passed through the event loop; `Arc` keeps events `Clone`.
pub type ApiResult<T> = Result<T, Arc<ApiClientError>>;

/// How a failed request should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 429: arm the countdown, show the server message.
    RateLimited,
    /// Any other non-2xx with a server message.
    Backend,
    /// Network error or a body that could not be parsed.
    Transport,
}

impl ApiClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::ApiError { .. } => FailureKind::Backend,
            Self::Http(_) | Self::Deserialize(_) => FailureKind::Transport,
        }
    }
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

pub struct SumxClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl SumxClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self.http_client.get(&url).send().await?;
        self.handle_response(resp).await
    }

    /// Check status, decode error envelopes, and deserialize the body.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: Response,
    ) -> Result<T, ApiClientError> {
        let status = resp.status();
        let body = resp.text().await?;

        if status.as_u16() == 429 {
            let err = parse_error_body(&body)?;
            let next_reset = err.next_reset.as_deref().and_then(|ts| {
                DateTime::parse_from_rfc3339(ts)
                    .map(|dt| dt.with_timezone(&Utc))
                    .inspect_err(|e| tracing::warn!("unparsable next_reset {ts:?}: {e}"))
                    .ok()
            });
            return Err(ApiClientError::RateLimited {
                message: err.error,
                next_reset,
            });
        }

        if !status.is_success() {
            let err = parse_error_body(&body)?;
            return Err(ApiClientError::ApiError {
                status: status.as_u16(),
                detail: err.error,
            });
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| ApiClientError::Deserialize(format!("{e}: {body}")))
    }

    /// Build a full API URL from a path (e.g. "/api/summaries").
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn parse_error_body(body: &str) -> Result<ErrorBody, ApiClientError> {
    serde_json::from_str::<ErrorBody>(body)
        .map_err(|e| ApiClientError::Deserialize(format!("{e}: {body}")))
}
