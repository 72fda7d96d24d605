//! Writing articles to CSV, JSON and plain URL lists.
//!
//! - [`OutputPaths`] - Where each selected format goes
//! - [`ProgressiveWriter`] - Incremental, flushed batch writes
//! - [`save_articles`] - One-shot write of a complete result
//!
//! Both the progressive and the one-shot path go through the same writer,
//! so the files are byte-identical either way.

mod csv;
mod progressive;

pub use csv::escape_field;
pub use progressive::{ProgressiveWriter, WriteReport};

use crate::models::Article;
use crate::options::OutputFormat;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode article as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Output file per selected format; `None` for formats not requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub urls: Option<PathBuf>,
}

impl OutputPaths {
    /// `<prefix>.csv`, `<prefix>.json`, `<prefix>_urls.txt`.
    ///
    /// A relative prefix is placed under `<export_dir>/<YYYY-MM-DD>/`; an
    /// absolute prefix is used as given.
    pub fn resolve(
        export_dir: &Path,
        prefix: &str,
        format: OutputFormat,
        today: NaiveDate,
    ) -> Self {
        let base = if Path::new(prefix).is_absolute() {
            PathBuf::from(prefix)
        } else {
            export_dir
                .join(today.format("%Y-%m-%d").to_string())
                .join(prefix)
        };
        let with_suffix = |suffix: &str| {
            let mut name = base.clone().into_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };

        Self {
            csv: format.includes_csv().then(|| with_suffix(".csv")),
            json: format.includes_json().then(|| with_suffix(".json")),
            urls: format.includes_urls().then(|| with_suffix("_urls.txt")),
        }
    }
}

/// Write a complete result in one go, overwriting any existing files.
pub fn save_articles(
    paths: &OutputPaths,
    articles: &[Article],
    quiet: bool,
) -> Result<WriteReport, ExportError> {
    let mut writer = ProgressiveWriter::create(paths, true)?;
    writer.write_batch(articles)?;
    let report = writer.finalize()?;

    if !quiet {
        if let Some(path) = &report.csv {
            println!("Saved {} articles to {}", report.articles, path.display());
        }
        if let Some(path) = &report.json {
            println!("Saved {} articles to {}", report.articles, path.display());
        }
        if let Some(path) = &report.urls_file {
            println!("Saved {} URLs to {}", report.urls, path.display());
        }
    }
    Ok(report)
}
