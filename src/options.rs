//! Per-run fetch options.
//!
//! [`FetchOptions`] is built once by the CLI and handed to the extractor by
//! reference. The date window is validated up front by
//! [`DateWindow::resolve`] so bad input fails before any network call.
use crate::util::{days_ago_ms, local_midnight_ms, parse_date};
use chrono::{DateTime, Local};
use std::time::Duration;
use thiserror::Error;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("Invalid date format: {0}. Use YYYY-MM-DD format.")]
    InvalidDate(String),

    #[error("End date must be after start date")]
    EndNotAfterStart,

    #[error("--end-date requires --start-date")]
    EndWithoutStart,

    #[error("Cannot look back {0} days: date out of range")]
    DaysOutOfRange(u32),
}

/// Which files to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    All,
    Csv,
    Json,
    Urls,
}

impl OutputFormat {
    pub fn includes_csv(self) -> bool {
        matches!(self, OutputFormat::All | OutputFormat::Csv)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::All | OutputFormat::Json)
    }

    pub fn includes_urls(self) -> bool {
        matches!(self, OutputFormat::All | OutputFormat::Urls)
    }
}

/// The time window to fetch. The two forms are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateWindow {
    /// Look back this many days from now. Zero falls back to the default.
    LastDays(u32),
    /// `YYYY-MM-DD` bounds, local midnight.
    Range { start: String, end: Option<String> },
}

/// Millisecond bounds sent as `newerThan` / `olderThan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub newer_than: i64,
    pub older_than: Option<i64>,
}

impl TimeBounds {
    /// Whole days between the bounds, when both are set.
    pub fn span_days(&self) -> Option<i64> {
        self.older_than
            .map(|older| (older - self.newer_than) / MS_PER_DAY)
    }
}

impl DateWindow {
    /// Build the window from the raw CLI values.
    pub fn from_args(
        days: Option<u32>,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Self, OptionsError> {
        match (start, end) {
            (Some(start), end) => Ok(DateWindow::Range { start, end }),
            (None, Some(_)) => Err(OptionsError::EndWithoutStart),
            (None, None) => Ok(DateWindow::LastDays(days.unwrap_or(0))),
        }
    }

    pub fn resolve(
        &self,
        now: DateTime<Local>,
        default_days: u32,
    ) -> Result<TimeBounds, OptionsError> {
        match self {
            DateWindow::LastDays(days) => {
                let days = if *days == 0 { default_days } else { *days };
                let newer_than =
                    days_ago_ms(days, now).ok_or(OptionsError::DaysOutOfRange(days))?;
                Ok(TimeBounds {
                    newer_than,
                    older_than: None,
                })
            }
            DateWindow::Range { start, end } => {
                let newer_than = date_ms(start)?;
                let older_than = end.as_deref().map(date_ms).transpose()?;
                if let Some(older) = older_than {
                    if older <= newer_than {
                        return Err(OptionsError::EndNotAfterStart);
                    }
                }
                Ok(TimeBounds {
                    newer_than,
                    older_than,
                })
            }
        }
    }

    /// Human description for the progress banner.
    pub fn describe(&self, default_days: u32) -> String {
        match self {
            DateWindow::LastDays(0) => format!("Looking back {default_days} days"),
            DateWindow::LastDays(days) => format!("Looking back {days} days"),
            DateWindow::Range { start, end: None } => format!("Using start date: {start}"),
            DateWindow::Range {
                start,
                end: Some(end),
            } => format!("Using date range: {start} to {end}"),
        }
    }
}

fn date_ms(value: &str) -> Result<i64, OptionsError> {
    parse_date(value)
        .map(local_midnight_ms)
        .map_err(|_| OptionsError::InvalidDate(value.to_string()))
}

/// Everything one export run needs besides the client and policy limits.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub window: DateWindow,
    /// Folder name to resolve; `None` fetches the global stream.
    pub category: Option<String>,
    pub unread_only: bool,
    /// Result cap. `Some(0)` is allowed and yields an empty result.
    pub max_articles: Option<usize>,
    /// Base delay between page requests.
    pub api_delay: Duration,
    pub output_prefix: String,
    pub output_format: OutputFormat,
    /// Write each page as it arrives instead of once at the end.
    pub progressive: bool,
    pub quiet: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            window: DateWindow::LastDays(0),
            category: None,
            unread_only: false,
            max_articles: None,
            api_delay: Duration::from_millis(500),
            output_prefix: String::new(),
            output_format: OutputFormat::All,
            progressive: true,
            quiet: false,
        }
    }
}
