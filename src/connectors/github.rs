//! GitHub REST client
//!
//! Reads repository metadata, topics and README content. Every request takes
//! the next token from the shared rotator and passes through the shared
//! throttle. A rate-limited response is retried once after the advertised
//! reset when that wait is within the configured cap.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::GitHubConfig;
use crate::connectors::MetadataSource;
use crate::credentials::CredentialRotator;
use crate::throttle::RequestThrottle;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub client errors
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("GitHub resource not found: {path}")]
    NotFound { path: String },

    #[error("Rate limited by GitHub API. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Build the shared HTTP client: stable User-Agent and request timeout.
pub fn http_client(config: &GitHubConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
}

/// GitHub REST client
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    credentials: Arc<CredentialRotator>,
    throttle: Arc<RequestThrottle>,
    max_rate_limit_wait: Duration,
}

impl GitHubClient {
    pub fn new(
        http: reqwest::Client,
        config: &GitHubConfig,
        credentials: Arc<CredentialRotator>,
    ) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials,
            throttle: Arc::new(RequestThrottle::disabled()),
            max_rate_limit_wait: Duration::from_secs(config.max_rate_limit_wait_secs),
        }
    }

    pub fn with_throttle(mut self, throttle: Arc<RequestThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, GitHubError> {
        Ok(Url::parse(&format!("{}{}", self.api_base, path))?)
    }

    /// GET `path`, retrying once when rate limited and the reset is near enough.
    async fn get(&self, path: &str) -> Result<reqwest::Response, GitHubError> {
        let url = self.endpoint(path)?;
        let mut retried = false;

        loop {
            self.throttle.acquire().await;

            let mut request = self
                .http
                .get(url.clone())
                .header("Accept", ACCEPT)
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(token) = self.credentials.next() {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if let Some(wait) = rate_limit_wait(&response) {
                let retry_after = wait.as_secs();
                if retried || wait > self.max_rate_limit_wait {
                    warn!(
                        path,
                        retry_after,
                        "Rate limited by GitHub API, giving up on this request"
                    );
                    return Err(GitHubError::RateLimited { retry_after });
                }

                warn!(path, retry_after, "Rate limited by GitHub API, waiting for reset");
                tokio::time::sleep(wait).await;
                retried = true;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(GitHubError::NotFound {
                    path: path.to_string(),
                });
            }

            let message = response.text().await.unwrap_or_default();
            return Err(GitHubError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
    }
}

#[async_trait]
impl MetadataSource for GitHubClient {
    #[instrument(skip(self))]
    async fn repository(&self, owner: &str, name: &str) -> Result<RemoteRepository, GitHubError> {
        let response = self.get(&format!("/repos/{owner}/{name}")).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    #[instrument(skip(self))]
    async fn topics(&self, owner: &str, name: &str) -> Result<Vec<String>, GitHubError> {
        let response = self.get(&format!("/repos/{owner}/{name}/topics")).await?;
        let body = response.text().await?;
        let topics: TopicsResponse = serde_json::from_str(&body)?;
        Ok(topics.names)
    }

    #[instrument(skip(self))]
    async fn readme(&self, owner: &str, name: &str) -> Result<Option<String>, GitHubError> {
        let response = match self.get(&format!("/repos/{owner}/{name}/readme")).await {
            Ok(response) => response,
            Err(GitHubError::NotFound { .. }) => {
                debug!(owner, name, "Repository has no README");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let body = response.text().await?;
        let readme: ReadmeResponse = serde_json::from_str(&body)?;
        Ok(readme.content.map(|content| decode_content(&content)))
    }
}

/// How long to wait before retrying, when `response` is a rate-limit rejection.
///
/// 429 is always a rate limit; 403 only when the quota headers say so.
/// `Retry-After` wins over `X-RateLimit-Reset`; the reset is padded by a second.
fn rate_limit_wait(response: &reqwest::Response) -> Option<Duration> {
    let status = response.status();
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::FORBIDDEN {
        return None;
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    if let Some(seconds) = retry_after {
        return Some(Duration::from_secs(seconds));
    }

    let info = extract_rate_limit_info(response);
    let exhausted = info.remaining == Some(0);
    if status == StatusCode::FORBIDDEN && !exhausted {
        return None;
    }

    match info.reset {
        Some(_) => Some(info.wait_until_reset(Utc::now())),
        None if status == StatusCode::TOO_MANY_REQUESTS => Some(Duration::from_secs(60)),
        None => None,
    }
}

fn extract_rate_limit_info(response: &reqwest::Response) -> RateLimitInfo {
    RateLimitInfo {
        remaining: response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok()),
        reset: response
            .headers()
            .get("X-RateLimit-Reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0)),
    }
}

/// Base64 README payloads may be wrapped; anything that does not decode is
/// returned as-is.
fn decode_content(content: &str) -> String {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8(bytes)
            .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned()),
        Err(_) => content.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// Time left until the quota resets, plus one second of slack.
    pub fn wait_until_reset(&self, now: DateTime<Utc>) -> Duration {
        let Some(reset) = self.reset else {
            return Duration::ZERO;
        };
        let seconds = (reset - now).num_seconds().max(0) as u64;
        Duration::from_secs(seconds + 1)
    }
}

/// Subset of `GET /repos/{owner}/{repo}` used for enrichment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteRepository {
    #[serde(default)]
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub license: Option<RemoteLicense>,
    pub homepage: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub archived: bool,
    pub pushed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteRepository {
    pub fn spdx_id(&self) -> Option<&str> {
        self.license
            .as_ref()
            .and_then(|license| license.spdx_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteLicense {
    pub spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopicsResponse {
    #[serde(default)]
    names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReadmeResponse {
    content: Option<String>,
}
