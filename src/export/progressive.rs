use super::{csv, ExportError, OutputPaths};
use crate::models::Article;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One open output file plus the path used in error messages.
struct Sink {
    path: PathBuf,
    out: BufWriter<File>,
}

impl Sink {
    fn create(path: &Path) -> Result<Self, ExportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.out
            .write_all(bytes)
            .map_err(|e| ExportError::io(&self.path, e))
    }

    fn flush(&mut self) -> Result<(), ExportError> {
        self.out.flush().map_err(|e| ExportError::io(&self.path, e))
    }
}

/// Summary of a finished write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub articles: usize,
    pub urls: usize,
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub urls_file: Option<PathBuf>,
}

/// Appends article batches to the selected output files as they arrive.
///
/// Every file is created (truncated) once in [`ProgressiveWriter::create`].
/// The JSON file always holds a valid prefix of an array, each batch is
/// flushed, and [`ProgressiveWriter::finalize`] closes the array. Since
/// `finalize` takes `self`, nothing can be written afterwards.
pub struct ProgressiveWriter {
    csv: Option<Sink>,
    json: Option<Sink>,
    urls: Option<Sink>,
    csv_header_written: bool,
    saved: usize,
    urls_saved: usize,
    quiet: bool,
}

impl ProgressiveWriter {
    pub fn create(paths: &OutputPaths, quiet: bool) -> Result<Self, ExportError> {
        let csv = paths.csv.as_deref().map(Sink::create).transpose()?;
        let urls = paths.urls.as_deref().map(Sink::create).transpose()?;
        let json = match paths.json.as_deref() {
            Some(path) => {
                let mut sink = Sink::create(path)?;
                sink.write_all(b"[\n")?;
                sink.flush()?;
                Some(sink)
            }
            None => None,
        };

        Ok(Self {
            csv,
            json,
            urls,
            csv_header_written: false,
            saved: 0,
            urls_saved: 0,
            quiet,
        })
    }

    /// Articles written so far.
    pub fn saved(&self) -> usize {
        self.saved
    }

    pub fn write_batch(&mut self, articles: &[Article]) -> Result<(), ExportError> {
        if articles.is_empty() {
            return Ok(());
        }

        if let Some(sink) = self.csv.as_mut() {
            if !self.csv_header_written {
                csv::write_header(&mut sink.out).map_err(|e| ExportError::io(&sink.path, e))?;
                self.csv_header_written = true;
            }
            for article in articles {
                csv::write_record(&mut sink.out, article)
                    .map_err(|e| ExportError::io(&sink.path, e))?;
            }
            sink.flush()?;
        }

        if let Some(sink) = self.json.as_mut() {
            for (i, article) in articles.iter().enumerate() {
                if self.saved > 0 || i > 0 {
                    sink.write_all(b",\n")?;
                }
                let record = serde_json::to_string_pretty(article)?;
                sink.write_all(record.as_bytes())?;
            }
            sink.flush()?;
        }

        if let Some(sink) = self.urls.as_mut() {
            for article in articles.iter().filter(|a| !a.url.is_empty()) {
                sink.write_all(article.url.as_bytes())?;
                sink.write_all(b"\n")?;
                self.urls_saved += 1;
            }
            sink.flush()?;
        }

        self.saved += articles.len();
        if !self.quiet {
            println!(
                "   Saved batch: {} articles (total saved: {})",
                articles.len(),
                self.saved
            );
        }
        Ok(())
    }

    /// Close the JSON array and flush everything.
    pub fn finalize(mut self) -> Result<WriteReport, ExportError> {
        if let Some(sink) = self.json.as_mut() {
            let close: &[u8] = if self.saved > 0 { b"\n]" } else { b"]" };
            sink.write_all(close)?;
        }
        for sink in [&mut self.csv, &mut self.json, &mut self.urls]
            .into_iter()
            .flatten()
        {
            sink.flush()?;
        }

        let report = WriteReport {
            articles: self.saved,
            urls: self.urls_saved,
            csv: self.csv.map(|s| s.path),
            json: self.json.map(|s| s.path),
            urls_file: self.urls.map(|s| s.path),
        };

        if !self.quiet && report.articles > 0 {
            println!();
            println!("Progressive save complete: {} articles saved", report.articles);
            if let Some(path) = &report.csv {
                println!("   CSV: {}", path.display());
            }
            if let Some(path) = &report.json {
                println!("   JSON: {}", path.display());
            }
            if let Some(path) = &report.urls_file {
                println!("   URLs: {}", path.display());
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::Entry;
    use pretty_assertions::assert_eq;

    fn article(n: usize, url: &str) -> Article {
        let entry: Entry = serde_json::from_value(serde_json::json!({
            "id": format!("entry-{n}"),
            "title": format!("Title {n}"),
            "canonicalUrl": url,
        }))
        .unwrap();
        Article::from_entry(&entry)
    }

    fn batch(start: usize, len: usize) -> Vec<Article> {
        (start..start + len)
            .map(|n| article(n, &format!("https://example.com/{n}")))
            .collect()
    }

    fn paths(dir: &Path) -> OutputPaths {
        OutputPaths {
            csv: Some(dir.join("out.csv")),
            json: Some(dir.join("out.json")),
            urls: Some(dir.join("out_urls.txt")),
        }
    }

    #[test]
    fn test_batches_produce_one_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ProgressiveWriter::create(&paths(dir.path()), true).unwrap();

        let mut next = 0;
        for len in [2, 3, 0, 1] {
            writer.write_batch(&batch(next, len)).unwrap();
            next += len;
        }
        let report = writer.finalize().unwrap();
        assert_eq!(report.articles, 6);

        let json = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[5]["id"], "entry-5");

        let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(csv.lines().count(), 7); // header + 6 rows
        assert!(csv.starts_with("id,title,"));

        let urls = std::fs::read_to_string(dir.path().join("out_urls.txt")).unwrap();
        assert_eq!(urls.lines().count(), 6);
    }

    #[test]
    fn test_empty_run_leaves_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ProgressiveWriter::create(&paths(dir.path()), true).unwrap();
        let report = writer.finalize().unwrap();
        assert_eq!(report.articles, 0);

        let json = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        assert_eq!(json, "[\n]");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_empty());

        // Header is written lazily
        let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        assert_eq!(csv, "");
    }

    #[test]
    fn test_partial_file_readable_before_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ProgressiveWriter::create(&paths(dir.path()), true).unwrap();
        writer.write_batch(&batch(0, 2)).unwrap();

        let json = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
        let closed = format!("{json}\n]");
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&closed).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(writer.saved(), 2);
    }

    #[test]
    fn test_empty_urls_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ProgressiveWriter::create(&paths(dir.path()), true).unwrap();
        writer
            .write_batch(&[article(0, ""), article(1, "https://example.com/1")])
            .unwrap();
        let report = writer.finalize().unwrap();
        assert_eq!(report.urls, 1);

        let urls = std::fs::read_to_string(dir.path().join("out_urls.txt")).unwrap();
        assert_eq!(urls, "https://example.com/1\n");
    }

    #[test]
    fn test_only_selected_formats_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths {
            csv: None,
            json: Some(dir.path().join("nested").join("only.json")),
            urls: None,
        };
        let mut writer = ProgressiveWriter::create(&paths, true).unwrap();
        writer.write_batch(&batch(0, 1)).unwrap();
        let report = writer.finalize().unwrap();

        assert!(report.csv.is_none());
        assert!(dir.path().join("nested").join("only.json").exists());
        assert!(!dir.path().join("only.csv").exists());
    }

    #[test]
    fn test_create_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("out.csv"), "stale contents\n").unwrap();
        let writer = ProgressiveWriter::create(&paths(dir.path()), true).unwrap();
        writer.finalize().unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.csv")).unwrap(),
            ""
        );
    }
}
