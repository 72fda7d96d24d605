use super::ExtractError;
use crate::api::{FeedlyClient, StreamRequest};
use crate::config::FetchLimits;
use crate::export::ProgressiveWriter;
use crate::models::Article;
use crate::options::TimeBounds;
use std::time::Duration;

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An empty page or no continuation token.
    EndOfStream,
    /// The caller's cap was reached; the result holds exactly that many.
    MaxArticles,
    /// The configured safety ceiling was reached.
    SafetyLimit,
    /// A 401 ended the loop; the result holds what was fetched before it.
    Unauthorized,
    /// A 429 survived the client's retries; partial result.
    RateLimited,
}

/// What to fetch.
#[derive(Debug, Clone)]
pub struct PageQuery<'a> {
    pub stream_id: &'a str,
    pub bounds: TimeBounds,
    pub unread_only: bool,
    pub max_articles: Option<usize>,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub articles: Vec<Article>,
    pub stop: StopReason,
    pub pages: usize,
}

/// Drives `/streams/contents` pagination for one stream.
pub struct Paginator<'a> {
    client: &'a FeedlyClient,
    limits: &'a FetchLimits,
    base_delay: Duration,
    quiet: bool,
}

impl<'a> Paginator<'a> {
    pub fn new(
        client: &'a FeedlyClient,
        limits: &'a FetchLimits,
        base_delay: Duration,
        quiet: bool,
    ) -> Self {
        Self {
            client,
            limits,
            base_delay,
            quiet,
        }
    }

    /// Fetch pages until the stream ends or a limit is hit.
    ///
    /// Each page is handed to `writer` (when given) before the stop checks,
    /// trimmed so the written files never exceed `max_articles`.
    pub async fn run(
        &self,
        query: &PageQuery<'_>,
        mut writer: Option<&mut ProgressiveWriter>,
    ) -> Result<FetchOutcome, ExtractError> {
        let mut articles: Vec<Article> = Vec::new();
        let mut continuation: Option<String> = None;
        let mut page = 1;

        let stop = loop {
            if !self.quiet {
                println!("   Fetching page {page}...");
            }

            let request = StreamRequest {
                stream_id: query.stream_id,
                count: self.limits.page_size,
                newer_than: query.bounds.newer_than,
                older_than: query.bounds.older_than,
                unread_only: query.unread_only,
                continuation: continuation.as_deref(),
            };

            let contents = match self.client.get_stream_content(&request).await {
                Ok(contents) => contents,
                Err(e) if e.is_unauthorized() => {
                    println!("Authentication failed. Check your access token.");
                    break StopReason::Unauthorized;
                }
                Err(e) if e.is_rate_limited() => {
                    println!("Rate limit exceeded. Try again later or reduce the date range.");
                    println!("Tip: Use --max-articles to limit the number of articles fetched");
                    break StopReason::RateLimited;
                }
                Err(e) => return Err(e.into()),
            };

            if contents.items.is_empty() {
                break StopReason::EndOfStream;
            }

            if !self.quiet {
                println!(
                    "   Found {} articles on page {page}",
                    contents.items.len()
                );
            }

            let allowance = match query.max_articles {
                Some(cap) => cap.saturating_sub(articles.len()),
                None => usize::MAX,
            };
            let batch: Vec<Article> = contents
                .items
                .iter()
                .take(allowance)
                .map(Article::from_entry)
                .collect();

            if let Some(writer) = writer.as_deref_mut() {
                writer.write_batch(&batch)?;
            }
            articles.extend(batch);

            if let Some(cap) = query.max_articles {
                if articles.len() >= cap {
                    if !self.quiet {
                        println!("   Reached maximum article limit: {cap}");
                    }
                    articles.truncate(cap);
                    break StopReason::MaxArticles;
                }
            }

            if articles.len() >= self.limits.safe_article_limit {
                if !self.quiet {
                    println!(
                        "   Approaching safe limit ({} articles)",
                        self.limits.safe_article_limit
                    );
                    println!("   Consider using --max-articles to limit extraction");
                }
                break StopReason::SafetyLimit;
            }

            continuation = contents.continuation.filter(|c| !c.is_empty());
            if continuation.is_none() {
                break StopReason::EndOfStream;
            }

            page += 1;

            let delay = page_delay(self.base_delay, articles.len(), self.limits);
            if !self.quiet && delay != self.base_delay && page % 5 == 0 {
                println!(
                    "   Using {:.1}s delay (progressive rate limiting)",
                    delay.as_secs_f64()
                );
            }
            tracing::debug!(page, delay_ms = delay.as_millis() as u64, "Waiting before next page");
            tokio::time::sleep(delay).await;
        };

        tracing::info!(
            articles = articles.len(),
            pages = page,
            stop = ?stop,
            "Pagination finished"
        );

        Ok(FetchOutcome {
            articles,
            stop,
            pages: page,
        })
    }
}

/// Delay before the next page request.
///
/// The base delay until `count` reaches the threshold, then stretched by
/// `count / threshold` (at most 3x) and capped at `max_delay`.
pub fn page_delay(base: Duration, count: usize, limits: &FetchLimits) -> Duration {
    let threshold = limits.progressive_delay_threshold.max(1);
    if count < threshold {
        return base;
    }
    let multiplier = (count as f64 / threshold as f64).min(3.0);
    base.mul_f64(multiplier).min(limits.max_delay)
}
