//! Export orchestration.
//!
//! [`Extractor`] ties the API client, the pagination driver and the file
//! writers together for one run:
//!
//! 1. Validate the date window (no network yet)
//! 2. Fetch the profile and resolve the stream (global or one folder)
//! 3. Page through the stream, writing each page as it arrives
//! 4. Finalize the files, or write them once at the end when progressive
//!    saving is off
//!
//! # Submodules
//!
//! - [`paginate`] - The continuation loop and its delay policy
//! - [`summary`] - End-of-run statistics

pub mod paginate;
pub mod summary;

pub use paginate::{FetchOutcome, PageQuery, Paginator, StopReason};
pub use summary::Summary;

use crate::api::{ApiError, FeedlyClient};
use crate::config::FetchLimits;
use crate::export::{save_articles, ExportError, OutputPaths, ProgressiveWriter, WriteReport};
use crate::models::Article;
use crate::options::{FetchOptions, OptionsError};
use crate::util::format_timestamp_short;
use chrono::Local;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error("Folder '{name}' not found")]
    CategoryNotFound { name: String, available: Vec<String> },
}

impl ExtractError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ExtractError::Api(e) if e.is_rate_limited())
    }
}

/// Result of one export run.
#[derive(Debug)]
pub struct ExportOutcome {
    pub articles: Vec<Article>,
    pub stop: StopReason,
    /// `None` when nothing was written.
    pub report: Option<WriteReport>,
}

pub struct Extractor {
    client: FeedlyClient,
    limits: FetchLimits,
    export_dir: PathBuf,
    default_days: u32,
}

impl Extractor {
    pub fn new(
        client: FeedlyClient,
        limits: FetchLimits,
        export_dir: PathBuf,
        default_days: u32,
    ) -> Self {
        Self {
            client,
            limits,
            export_dir,
            default_days,
        }
    }

    /// Fetch the articles selected by `options` and write the output files.
    pub async fn export(&self, options: &FetchOptions) -> Result<ExportOutcome, ExtractError> {
        let now = Local::now();
        let bounds = options.window.resolve(now, self.default_days)?;

        if !options.quiet {
            println!("{}", options.window.describe(self.default_days));
        }
        if let Some(days) = bounds.span_days() {
            if days > i64::from(self.limits.max_date_range_days) {
                println!("Date range spans {days} days. This may take a while...");
            }
        }

        if !options.quiet {
            println!("Fetching user profile...");
        }
        let profile = self.client.get_user_profile().await?;
        tracing::debug!(user_id = %profile.id, "Fetched profile");

        let stream_id = self
            .stream_id(&profile.id, options.category.as_deref(), options.quiet)
            .await?;

        if !options.quiet {
            println!(
                "Fetching articles from {}...",
                format_timestamp_short(bounds.newer_than)
            );
            if let Some(older_than) = bounds.older_than {
                println!("Until {}...", format_timestamp_short(older_than));
            }
        }

        let paths = OutputPaths::resolve(
            &self.export_dir,
            &options.output_prefix,
            options.output_format,
            now.date_naive(),
        );

        let query = PageQuery {
            stream_id: &stream_id,
            bounds,
            unread_only: options.unread_only,
            max_articles: options.max_articles,
        };
        let paginator = Paginator::new(&self.client, &self.limits, options.api_delay, options.quiet);

        let (fetched, report) = if options.progressive {
            let mut writer = ProgressiveWriter::create(&paths, options.quiet)?;
            let fetched = paginator.run(&query, Some(&mut writer)).await?;
            let report = writer.finalize()?;
            (fetched, Some(report))
        } else {
            let fetched = paginator.run(&query, None).await?;
            let report = if fetched.articles.is_empty() {
                None
            } else {
                if !options.quiet {
                    println!();
                    println!("Saving data...");
                }
                Some(save_articles(&paths, &fetched.articles, options.quiet)?)
            };
            (fetched, report)
        };

        Ok(ExportOutcome {
            articles: fetched.articles,
            stop: fetched.stop,
            report,
        })
    }

    /// The global stream, or the id of the folder matching `category`.
    async fn stream_id(
        &self,
        user_id: &str,
        category: Option<&str>,
        quiet: bool,
    ) -> Result<String, ExtractError> {
        let Some(name) = category else {
            if !quiet {
                println!("Using all feeds");
            }
            return Ok(format!("user/{user_id}/category/global.all"));
        };

        if !quiet {
            println!("Looking for folder...");
        }
        match self.client.find_category_by_name(name).await? {
            Some(found) => {
                if !quiet {
                    println!("Using folder: {}", found.label);
                }
                Ok(found.id)
            }
            None => {
                let categories = self.client.get_categories().await?;
                println!();
                println!("Folder '{name}' not found.");
                if categories.is_empty() {
                    println!(
                        "No custom folders found. Create folders in Feedly to organize your feeds."
                    );
                } else {
                    println!();
                    println!("Available Feedly folders:");
                    for category in &categories {
                        println!("   - {}", category.label);
                    }
                    println!();
                    println!("Tip: Folder names are case-insensitive and support partial matching");
                }
                Err(ExtractError::CategoryNotFound {
                    name: name.to_string(),
                    available: categories.into_iter().map(|c| c.label).collect(),
                })
            }
        }
    }

    /// Print every folder and how to select it.
    pub async fn list_categories(&self) -> Result<(), ExtractError> {
        println!("Available categories/folders:");
        println!("{}", "=".repeat(50));
        let categories = self.client.get_categories().await?;

        if categories.is_empty() {
            println!(
                "   No custom folders found. Create folders in Feedly to organize your feeds."
            );
        } else {
            println!("   Found {} folder(s):", categories.len());
            println!();
            for category in &categories {
                println!("   {}", category.label);
                println!("      Use: --category \"{}\"", category.label);
                println!();
            }
        }

        println!("Tip: Use --category with the folder name to fetch only from that folder");
        println!("Example: feeder --category \"Tech News\" --days 7");
        Ok(())
    }

    /// Print every subscribed feed with its folders.
    pub async fn list_subscriptions(&self) -> Result<(), ExtractError> {
        let subscriptions = self.client.get_subscriptions().await?;
        println!("Subscriptions ({}):", subscriptions.len());
        println!("{}", "=".repeat(50));

        for sub in &subscriptions {
            println!("   {}", sub.display_title());
            if let Some(website) = sub.website.as_deref().filter(|w| !w.is_empty()) {
                println!("      {website}");
            }
            let folders: Vec<&str> = sub
                .categories
                .iter()
                .filter_map(|c| c.label.as_deref())
                .collect();
            if !folders.is_empty() {
                println!("      Folders: {}", folders.join(", "));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientSettings;
    use crate::options::{DateWindow, OutputFormat};
    use secrecy::SecretString;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{any, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(server: &MockServer, export_dir: PathBuf) -> Extractor {
        let settings = ClientSettings {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries: 0,
            retry_backoff: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
        };
        let client = FeedlyClient::new(SecretString::from("t"), settings).unwrap();
        Extractor::new(client, FetchLimits::default(), export_dir, 7)
    }

    fn options(prefix: &str) -> FetchOptions {
        FetchOptions {
            api_delay: Duration::ZERO,
            output_prefix: prefix.to_string(),
            quiet: true,
            ..FetchOptions::default()
        }
    }

    async fn mount_profile(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_bad_window_fails_before_network() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let opts = FetchOptions {
            window: DateWindow::Range {
                start: "2024-02-01".into(),
                end: Some("2024-01-01".into()),
            },
            ..options("never")
        };
        let err = extractor.export(&opts).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Options(OptionsError::EndNotAfterStart)
        ));
    }

    #[tokio::test]
    async fn test_global_stream_used_without_category() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/streams/contents"))
            .and(query_param("streamId", "user/u1/category/global.all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "a", "canonicalUrl": "https://x/a"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let prefix = dir.path().join("run");
        let outcome = extractor
            .export(&options(prefix.to_str().unwrap()))
            .await
            .unwrap();
        assert_eq!(outcome.articles.len(), 1);
        assert_eq!(outcome.stop, StopReason::EndOfStream);
        let report = outcome.report.unwrap();
        assert_eq!(report.json, Some(dir.path().join("run.json")));
        assert!(dir.path().join("run_urls.txt").exists());
    }

    #[tokio::test]
    async fn test_category_resolves_to_folder_stream() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "user/u1/category/tech-news", "label": "Tech News"},
                {"id": "user/u1/category/tech", "label": "Tech"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/streams/contents"))
            .and(query_param("streamId", "user/u1/category/tech"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let opts = FetchOptions {
            category: Some("TECH".into()),
            ..options("folder")
        };
        let outcome = extractor.export(&opts).await.unwrap();
        assert!(outcome.articles.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_lists_folders() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": "c/1", "label": "Sports"}])),
            )
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/streams/contents"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let opts = FetchOptions {
            category: Some("tech".into()),
            ..options("missing")
        };
        match extractor.export(&opts).await.unwrap_err() {
            ExtractError::CategoryNotFound { name, available } => {
                assert_eq!(name, "tech");
                assert_eq!(available, vec!["Sports".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_bulk_mode_writes_nothing_for_empty_result() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/streams/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let prefix = dir.path().join("bulk");
        let opts = FetchOptions {
            progressive: false,
            output_format: OutputFormat::Csv,
            ..options(prefix.to_str().unwrap())
        };
        let outcome = extractor.export(&opts).await.unwrap();
        assert!(outcome.report.is_none());
        assert!(!dir.path().join("bulk.csv").exists());
    }

    #[tokio::test]
    async fn test_relative_prefix_lands_in_dated_export_dir() {
        let server = MockServer::start().await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/streams/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "a"}]
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let extractor = extractor(&server, dir.path().to_path_buf());

        let opts = FetchOptions {
            output_format: OutputFormat::Json,
            ..options("rel")
        };
        let outcome = extractor.export(&opts).await.unwrap();
        let json_path = outcome.report.unwrap().json.unwrap();
        assert!(json_path.starts_with(dir.path()));
        assert!(json_path.ends_with("rel.json"));
        assert!(json_path.exists());
    }

    #[test]
    fn test_rate_limited_detection() {
        assert!(ExtractError::Api(ApiError::HttpStatus(429)).is_rate_limited());
        assert!(!ExtractError::Api(ApiError::HttpStatus(401)).is_rate_limited());
    }
}
