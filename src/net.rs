//! HTTP client for metadata requests

use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::HttpSettings;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    InvalidBody(String),
}

impl HttpError {
    /// Transport failures, rate limiting and server errors are worth retrying
    fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            Self::InvalidBody(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            user_agent: format!("chaptervault/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&HttpSettings> for HttpConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            max_retries: settings.max_retries.max(1),
            user_agent: settings.user_agent.clone(),
        }
    }
}

/// JSON-over-HTTP client with bounded retries
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| HttpError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// POST a JSON body and parse the JSON response, retrying transient failures
    pub async fn post_json(&self, url: &str, body: &Value, bearer: Option<&str>) -> Result<Value> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.post_once(url, body, bearer).await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(url, attempts, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() || attempts >= self.config.max_retries => {
                    warn!(url, attempts, error = %e, "Request failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(url, attempts, error = %e, "Request failed, retrying");

                    // Exponential backoff: 1s, 2s, 4s
                    let backoff = Duration::from_secs(2u64.pow(attempts - 1));
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    async fn post_once(&self, url: &str, body: &Value, bearer: Option<&str>) -> Result<Value> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else {
                HttpError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| HttpError::InvalidBody(e.to_string()))
    }
}
