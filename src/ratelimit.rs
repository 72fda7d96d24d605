//! `--check-rate-limit`: one unretried profile request, reported verbatim.
//!
//! Reports the `X-RateLimit-*` headers and `Retry-After` the service sent,
//! with reset and wait times converted to something readable.
use crate::api::{ApiError, FeedlyClient};
use chrono::{DateTime, Local, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::fmt::Write as _;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Wait assumed when a 429 carries no `Retry-After`.
const DEFAULT_WAIT_SECS: i64 = 60;

/// Parsed `Retry-After` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAfter {
    Seconds(i64),
    At(DateTime<Utc>),
    Unparsed(String),
}

impl RetryAfter {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Ok(secs) = value.parse::<i64>() {
            return RetryAfter::Seconds(secs);
        }
        match DateTime::parse_from_rfc2822(value) {
            Ok(at) => RetryAfter::At(at.with_timezone(&Utc)),
            Err(_) => RetryAfter::Unparsed(value.to_string()),
        }
    }

    /// Seconds left to wait, measured from `now`.
    pub fn wait_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            RetryAfter::Seconds(secs) => Some(*secs),
            RetryAfter::At(at) => Some((*at - now).num_seconds()),
            RetryAfter::Unparsed(_) => None,
        }
    }
}

/// Rate-limit headers captured from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub status: u16,
    pub limit: Option<String>,
    pub remaining: Option<String>,
    /// Epoch seconds.
    pub reset: Option<String>,
    pub retry_after: Option<String>,
    /// Start of the body for unexpected statuses.
    pub body_excerpt: Option<String>,
}

impl RateLimitStatus {
    pub fn from_parts(status: u16, headers: &HeaderMap, body: &[u8]) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let body_excerpt = (status != 200 && status != 429 && !body.is_empty())
            .then(|| String::from_utf8_lossy(body).chars().take(200).collect());

        Self {
            status,
            limit: header("x-ratelimit-limit"),
            remaining: header("x-ratelimit-remaining"),
            reset: header("x-ratelimit-reset"),
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body_excerpt,
        }
    }

    fn headers(&self) -> Vec<(&'static str, &str)> {
        [
            ("X-RateLimit-Limit", &self.limit),
            ("X-RateLimit-Remaining", &self.remaining),
            ("X-RateLimit-Reset", &self.reset),
            ("Retry-After", &self.retry_after),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Human-readable report, relative to `now`.
    pub fn report(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_report(&mut out, now);
        out
    }

    fn write_report(&self, out: &mut String, now: DateTime<Utc>) -> std::fmt::Result {
        match self.status {
            200 => {
                writeln!(out, "API is accessible - No rate limit issues")?;
                writeln!(out, "Status Code: {}", self.status)?;
                let headers = self.headers();
                if headers.is_empty() {
                    writeln!(out)?;
                    writeln!(out, "No rate limit headers found in response")?;
                    writeln!(out, "(Feedly may not expose rate limit information in headers)")?;
                } else {
                    writeln!(out)?;
                    writeln!(out, "Rate Limit Information:")?;
                    for (name, value) in headers {
                        writeln!(out, "  {name}: {value}")?;
                    }
                    if let Some(reset) = self.reset.as_deref().and_then(|r| r.trim().parse().ok())
                    {
                        if let Some(reset_at) = DateTime::<Utc>::from_timestamp(reset, 0) {
                            let remaining = (reset_at - now).num_seconds();
                            if remaining > 0 {
                                writeln!(
                                    out,
                                    "  Reset Time: {}",
                                    reset_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                                )?;
                                writeln!(out, "  Time Until Reset: {}", format_wait(remaining))?;
                            }
                        }
                    }
                }
            }
            429 => {
                writeln!(out, "Rate limit exceeded!")?;
                writeln!(out, "Status Code: {}", self.status)?;
                writeln!(out)?;
                match self.retry_after.as_deref().map(RetryAfter::parse) {
                    Some(RetryAfter::Seconds(secs)) => {
                        writeln!(out, "Retry-After: {secs} seconds")?;
                        let until = chrono::Duration::try_seconds(secs)
                            .and_then(|wait| now.checked_add_signed(wait));
                        if let Some(until) = until {
                            writeln!(
                                out,
                                "You can retry at: {}",
                                until.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                            )?;
                        }
                        writeln!(out, "Time to wait: {}", format_wait(secs))?;
                    }
                    Some(at @ RetryAfter::At(_)) => {
                        writeln!(out, "Retry-After: {}", self.retry_after.as_deref().unwrap_or(""))?;
                        if let Some(secs) = at.wait_secs(now) {
                            writeln!(out, "Time to wait: {}", format_wait(secs))?;
                        }
                    }
                    Some(RetryAfter::Unparsed(raw)) => {
                        writeln!(out, "Retry-After header: {raw}")?;
                        writeln!(out, "(Could not parse as seconds or HTTP date)")?;
                    }
                    None => {
                        writeln!(out, "No Retry-After header found")?;
                        writeln!(out, "Default wait time is typically {DEFAULT_WAIT_SECS} seconds")?;
                    }
                }
                let headers = self.headers();
                if !headers.is_empty() {
                    writeln!(out)?;
                    writeln!(out, "All Rate Limit Headers:")?;
                    for (name, value) in headers {
                        writeln!(out, "  {name}: {value}")?;
                    }
                }
            }
            status => {
                writeln!(out, "Unexpected status code: {status}")?;
                if let Some(body) = &self.body_excerpt {
                    writeln!(out, "Response: {body}...")?;
                }
            }
        }
        Ok(())
    }
}

/// `1h 02m 03s`, `4m 05s`, `7s`. Negative waits print as `0s`.
pub fn format_wait(secs: i64) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

/// Issue the probe request.
pub async fn check_rate_limit(client: &FeedlyClient) -> Result<RateLimitStatus, ApiError> {
    let response = client.probe("profile", PROBE_TIMEOUT).await?;
    tracing::debug!(status = response.status, "Rate limit probe answered");
    Ok(RateLimitStatus::from_parts(
        response.status,
        &response.headers,
        &response.body,
    ))
}

/// Closing advice printed after every check.
pub const TIPS: &str = "Tips:
- Feedly API typically has a rate limit of 250 requests per hour
- Rate limit resets on a rolling basis
- If rate limited, wait at least 60 seconds before retrying";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientSettings;
    use chrono::TimeZone;
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn client(server: &MockServer) -> FeedlyClient {
        let settings = ClientSettings {
            base_url: server.uri(),
            max_retries: 3,
            retry_backoff: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            ..ClientSettings::default()
        };
        FeedlyClient::new(SecretString::from("t"), settings).unwrap()
    }

    #[test]
    fn test_retry_after_forms() {
        assert_eq!(RetryAfter::parse("120"), RetryAfter::Seconds(120));
        assert_eq!(
            RetryAfter::parse("Fri, 15 Mar 2024 12:05:00 GMT").wait_secs(now()),
            Some(300)
        );
        assert!(matches!(
            RetryAfter::parse("soon"),
            RetryAfter::Unparsed(_)
        ));
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(7), "7s");
        assert_eq!(format_wait(245), "4m 05s");
        assert_eq!(format_wait(3723), "1h 02m 03s");
        assert_eq!(format_wait(-5), "0s");
    }

    #[tokio::test]
    async fn test_accessible_with_headers() {
        let server = MockServer::start().await;
        let reset = now().timestamp() + 90;
        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-RateLimit-Limit", "250")
                    .insert_header("X-RateLimit-Remaining", "12")
                    .insert_header("X-RateLimit-Reset", reset.to_string().as_str())
                    .set_body_string("{}"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let status = check_rate_limit(&client(&server)).await.unwrap();
        assert_eq!(status.status, 200);
        assert_eq!(status.remaining.as_deref(), Some("12"));

        let report = status.report(now());
        assert!(report.contains("API is accessible"));
        assert!(report.contains("X-RateLimit-Limit: 250"));
        assert!(report.contains("Time Until Reset: 1m 30s"));
    }

    #[tokio::test]
    async fn test_rate_limited_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .expect(1)
            .mount(&server)
            .await;

        let status = check_rate_limit(&client(&server)).await.unwrap();
        assert_eq!(status.status, 429);
        let report = status.report(now());
        assert!(report.contains("Rate limit exceeded"));
        assert!(report.contains("Retry-After: 30 seconds"));
        assert!(report.contains("Time to wait: 30s"));
    }

    #[test]
    fn test_oversized_retry_after_skips_retry_time() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "99999999999999".parse().unwrap());
        let status = RateLimitStatus::from_parts(429, &headers, b"");
        let report = status.report(now());
        assert!(report.contains("Retry-After: 99999999999999 seconds"));
        assert!(!report.contains("You can retry at"));
        assert!(report.contains("Time to wait: "));
    }

    #[test]
    fn test_missing_retry_after_reports_default() {
        let status = RateLimitStatus::from_parts(429, &HeaderMap::new(), b"");
        let report = status.report(now());
        assert!(report.contains("No Retry-After header found"));
        assert!(report.contains("60 seconds"));
    }

    #[test]
    fn test_unexpected_status_shows_body() {
        let status = RateLimitStatus::from_parts(403, &HeaderMap::new(), b"forbidden");
        let report = status.report(now());
        assert!(report.contains("Unexpected status code: 403"));
        assert!(report.contains("Response: forbidden..."));
    }

    #[test]
    fn test_no_headers_on_success() {
        let status = RateLimitStatus::from_parts(200, &HeaderMap::new(), b"{}");
        assert!(status.body_excerpt.is_none());
        assert!(status
            .report(now())
            .contains("No rate limit headers found"));
    }
}
