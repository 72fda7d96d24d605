use crate::api::types::{Profile, RawCategory, StreamContents, Subscription};
use crate::config::ClientSettings;
use crate::models::{resolve_category, Category};
use crate::util::{validate_base_url, UrlValidationError};
use futures::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Statuses retried automatically with exponential backoff.
const RETRY_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

const MAX_RESPONSE_SIZE: usize = 20 * 1024 * 1024; // 20MB

/// Errors returned by [`FeedlyClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the per-request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code, after retries
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not the JSON shape we expected
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response body exceeded the 20MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    #[error(transparent)]
    BaseUrl(#[from] UrlValidationError),
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// HTTP status of the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus(status) => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    /// Network failures and timeouts are retried like 5xx responses.
    fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout(_))
    }
}

/// Parameters of one `GET /streams/contents` call.
#[derive(Debug, Clone)]
pub struct StreamRequest<'a> {
    pub stream_id: &'a str,
    pub count: u32,
    /// Lower time bound, milliseconds since epoch.
    pub newer_than: i64,
    /// Upper time bound, milliseconds since epoch.
    pub older_than: Option<i64>,
    pub unread_only: bool,
    /// When set, replaces the time bounds.
    pub continuation: Option<&'a str>,
}

/// An unprocessed response from [`FeedlyClient::probe`].
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Authenticated session against the Feedly Cloud API.
///
/// Masks transient server conditions from callers:
///
/// - 429, 500, 502, 503 and 504 responses, network errors and timeouts are
///   retried up to `max_retries` times with exponential backoff
///   (`retry_backoff × 2^attempt`). A numeric `Retry-After` on a 429 replaces
///   the backoff, capped at `rate_limit_delay`.
/// - A request still rate limited after that waits `rate_limit_delay` and is
///   re-issued exactly once.
/// - 401 is never retried.
pub struct FeedlyClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    settings: ClientSettings,
}

impl FeedlyClient {
    pub fn new(token: SecretString, settings: ClientSettings) -> Result<Self, ApiError> {
        let base_url = validate_base_url(&settings.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("feeder/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            token,
            settings,
        })
    }

    /// Issue one authenticated GET with no retries and return whatever the
    /// server answered, error statuses included.
    pub async fn probe(&self, path: &str, timeout: Duration) -> Result<RawResponse, ApiError> {
        let url = self.endpoint(path)?;
        let response = self.send_once(&url, timeout).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    /// Get the authenticated user's profile.
    pub async fn get_user_profile(&self) -> Result<Profile, ApiError> {
        let url = self.endpoint("profile")?;
        self.get_json(&url).await
    }

    /// Get all feed subscriptions.
    pub async fn get_subscriptions(&self) -> Result<Vec<Subscription>, ApiError> {
        let url = self.endpoint("subscriptions")?;
        self.get_json(&url).await
    }

    /// Get all categories (folders), in the order the service lists them.
    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint("categories")?;
        let raw: Vec<RawCategory> = self.get_json(&url).await?;
        Ok(raw.into_iter().map(Category::from).collect())
    }

    /// Get one page of a stream (feed, folder, or the global aggregate).
    pub async fn get_stream_content(
        &self,
        request: &StreamRequest<'_>,
    ) -> Result<StreamContents, ApiError> {
        let url = self.stream_url(request)?;
        self.get_json(&url).await
    }

    /// Find a folder by label: exact case-insensitive match first, then the
    /// first case-insensitive substring match.
    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, ApiError> {
        let categories = self.get_categories().await?;
        Ok(resolve_category(&categories, name).cloned())
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    fn stream_url(&self, request: &StreamRequest<'_>) -> Result<Url, ApiError> {
        let mut url = self.endpoint("streams/contents")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("streamId", request.stream_id);
            query.append_pair("count", &request.count.to_string());
            query.append_pair(
                "unreadOnly",
                if request.unread_only { "true" } else { "false" },
            );
            match request.continuation {
                Some(continuation) => {
                    query.append_pair("continuation", continuation);
                }
                None => {
                    query.append_pair("newerThan", &request.newer_than.to_string());
                    if let Some(older_than) = request.older_than {
                        query.append_pair("olderThan", &older_than.to_string());
                    }
                }
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let response = self.send_with_retry(url).await?;
        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_with_retry(&self, url: &Url) -> Result<reqwest::Response, ApiError> {
        let mut retry_count = 0;

        let response = loop {
            match self.send_once(url, self.settings.timeout).await {
                Ok(response)
                    if RETRY_STATUS_CODES.contains(&response.status().as_u16())
                        && retry_count < self.settings.max_retries =>
                {
                    let delay = self.retry_delay(retry_count, Some(&response));
                    tracing::warn!(
                        endpoint = %url.path(),
                        status = %response.status(),
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Ok(response) => break response,
                Err(e) if e.is_transient() && retry_count < self.settings.max_retries => {
                    let delay = self.retry_delay(retry_count, None);
                    tracing::warn!(
                        endpoint = %url.path(),
                        error = %e,
                        retry = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient request failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                endpoint = %url.path(),
                delay_secs = self.settings.rate_limit_delay.as_secs(),
                "Rate limit exceeded. Waiting before retrying once"
            );
            tokio::time::sleep(self.settings.rate_limit_delay).await;

            let retried = self.send_once(url, self.settings.timeout).await?;
            if retried.status().is_success() {
                return Ok(retried);
            }
            return Err(ApiError::HttpStatus(retried.status().as_u16()));
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::error!("Authentication failed. Check your access token.");
        }

        Err(ApiError::HttpStatus(status.as_u16()))
    }

    /// Issue a single authenticated GET, with no retries.
    async fn send_once(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        let request = self
            .http
            .get(url.clone())
            .bearer_auth(self.token.expose_secret())
            .header(CONTENT_TYPE, "application/json");

        tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(timeout))?
            .map_err(ApiError::Network)
    }

    fn retry_delay(&self, retry_count: u32, response: Option<&reqwest::Response>) -> Duration {
        let retry_after = response
            .filter(|r| r.status() == StatusCode::TOO_MANY_REQUESTS)
            .and_then(|r| r.headers().get(RETRY_AFTER))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        match retry_after {
            Some(secs) => Duration::from_secs(secs).min(self.settings.rate_limit_delay),
            None => self
                .settings
                .retry_backoff
                .saturating_mul(1u32 << retry_count.min(16)),
        }
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
