//! Domain records exported by the tool.
//!
//! [`Article`] is the flat, immutable record every output format is built
//! from. It is derived once from a wire [`Entry`] and never mutated.
use crate::api::types::{Entry, Label, RawCategory, TextContent};
use crate::util::{count_words, format_timestamp_ms, strip_html_tags};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Article
// ============================================================================

/// A single exported article.
///
/// Field order here is the export order: JSON objects are serialized in this
/// order and [`Article::FIELD_NAMES`] / [`Article::fields`] follow it for CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: String,
    pub published_date: String,
    pub crawled_date: String,
    pub source_title: String,
    pub source_url: String,
    pub source_stream_id: String,
    pub summary: String,
    pub content: String,
    pub engagement: i64,
    pub language: String,
    pub keywords: String,
    pub categories: String,
    pub tags: String,
    pub read: bool,
    pub visual_url: String,
    pub word_count: usize,
}

/// A typed export value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Article {
    pub const FIELD_NAMES: [&'static str; 19] = [
        "id",
        "title",
        "url",
        "author",
        "published_date",
        "crawled_date",
        "source_title",
        "source_url",
        "source_stream_id",
        "summary",
        "content",
        "engagement",
        "language",
        "keywords",
        "categories",
        "tags",
        "read",
        "visual_url",
        "word_count",
    ];

    /// Values in [`Article::FIELD_NAMES`] order.
    pub fn fields(&self) -> [FieldValue<'_>; 19] {
        use FieldValue::{Bool, Int, Text};
        [
            Text(&self.id),
            Text(&self.title),
            Text(&self.url),
            Text(&self.author),
            Text(&self.published_date),
            Text(&self.crawled_date),
            Text(&self.source_title),
            Text(&self.source_url),
            Text(&self.source_stream_id),
            Text(&self.summary),
            Text(&self.content),
            Int(self.engagement),
            Text(&self.language),
            Text(&self.keywords),
            Text(&self.categories),
            Text(&self.tags),
            Bool(self.read),
            Text(&self.visual_url),
            Int(i64::try_from(self.word_count).unwrap_or(i64::MAX)),
        ]
    }

    /// Build an article from a stream item.
    ///
    /// An item without an `unread` flag is treated as unread.
    pub fn from_entry(entry: &Entry) -> Self {
        let url = entry
            .canonical_url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| entry.alternate.first().and_then(|link| link.href.clone()))
            .unwrap_or_default();

        let origin = entry.origin.as_ref();
        let html = |t: &Option<TextContent>| {
            t.as_ref()
                .and_then(|c| c.content.as_deref())
                .map(strip_html_tags)
                .unwrap_or_default()
        };
        let content = html(&entry.content);

        Self {
            id: entry.id.clone(),
            title: entry
                .title
                .as_deref()
                .map(strip_html_tags)
                .unwrap_or_default(),
            url,
            author: entry.author.clone().unwrap_or_default(),
            published_date: format_timestamp_ms(entry.published.unwrap_or(0)),
            crawled_date: format_timestamp_ms(entry.crawled.unwrap_or(0)),
            source_title: origin.and_then(|o| o.title.clone()).unwrap_or_default(),
            source_url: origin.and_then(|o| o.html_url.clone()).unwrap_or_default(),
            source_stream_id: origin.and_then(|o| o.stream_id.clone()).unwrap_or_default(),
            summary: html(&entry.summary),
            word_count: count_words(&content),
            content,
            engagement: entry.engagement.unwrap_or(0),
            language: entry.language.clone().unwrap_or_default(),
            keywords: entry.keywords.join(", "),
            categories: join_labels(&entry.categories),
            tags: join_labels(&entry.tags),
            read: !entry.unread.unwrap_or(true),
            visual_url: entry
                .visual
                .as_ref()
                .and_then(|v| v.url.clone())
                .unwrap_or_default(),
        }
    }
}

fn join_labels(labels: &[Label]) -> String {
    labels
        .iter()
        .map(|l| l.label.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Category
// ============================================================================

/// A user folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub label: String,
}

impl From<RawCategory> for Category {
    fn from(raw: RawCategory) -> Self {
        Self {
            id: raw.id,
            label: raw.label.unwrap_or_else(|| "Unnamed".to_string()),
        }
    }
}

/// Resolve a folder by name.
///
/// An exact case-insensitive label match wins; otherwise the first
/// case-insensitive substring match in listing order.
pub fn resolve_category<'a>(categories: &'a [Category], query: &str) -> Option<&'a Category> {
    let needle = query.to_lowercase();
    categories
        .iter()
        .find(|c| c.label.to_lowercase() == needle)
        .or_else(|| {
            categories
                .iter()
                .find(|c| c.label.to_lowercase().contains(&needle))
        })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry_json() -> Entry {
        serde_json::from_str(
            r#"{
                "id": "entry-1",
                "title": "Rust &amp; <b>You</b>",
                "alternate": [{"href": "https://example.com/alt"}],
                "author": "Ann",
                "published": 1700000000000,
                "origin": {"title": "Example", "htmlUrl": "https://example.com", "streamId": "feed/ex"},
                "summary": {"content": "<p>Short</p>"},
                "content": {"content": "<div>one two <i>three</i></div>"},
                "engagement": 42,
                "language": "en",
                "keywords": ["rust", "cli"],
                "categories": [{"label": "Tech"}, {"id": "x"}],
                "tags": [{"label": "saved"}],
                "unread": true,
                "visual": {"url": "https://example.com/img.png"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_entry_maps_fields() {
        let article = Article::from_entry(&entry_json());
        assert_eq!(article.id, "entry-1");
        assert_eq!(article.title, "Rust & You");
        assert_eq!(article.url, "https://example.com/alt");
        assert_eq!(article.source_title, "Example");
        assert_eq!(article.source_url, "https://example.com");
        assert_eq!(article.source_stream_id, "feed/ex");
        assert_eq!(article.summary, "Short");
        assert_eq!(article.content, "one two three");
        assert_eq!(article.word_count, 3);
        assert_eq!(article.engagement, 42);
        assert_eq!(article.keywords, "rust, cli");
        assert_eq!(article.categories, "Tech, ");
        assert_eq!(article.tags, "saved");
        assert!(!article.read);
        assert_eq!(article.visual_url, "https://example.com/img.png");
        assert!(!article.published_date.is_empty());
        assert_eq!(article.crawled_date, "");
    }

    #[test]
    fn test_canonical_url_preferred() {
        let mut entry = entry_json();
        entry.canonical_url = Some("https://example.com/canonical".to_string());
        assert_eq!(
            Article::from_entry(&entry).url,
            "https://example.com/canonical"
        );
    }

    #[test]
    fn test_missing_unread_means_unread() {
        let entry: Entry = serde_json::from_str(r#"{"id":"e"}"#).unwrap();
        let article = Article::from_entry(&entry);
        assert!(!article.read);
        assert_eq!(article.word_count, 0);
        assert_eq!(article.url, "");

        let entry: Entry = serde_json::from_str(r#"{"id":"e","unread":false}"#).unwrap();
        assert!(Article::from_entry(&entry).read);
    }

    #[test]
    fn test_json_keys_match_field_names() {
        let article = Article::from_entry(&entry_json());
        let value = serde_json::to_value(&article).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), Article::FIELD_NAMES.len());

        for (name, field) in Article::FIELD_NAMES.iter().zip(article.fields()) {
            let expected = match field {
                FieldValue::Text(s) => serde_json::Value::from(s),
                FieldValue::Int(n) => serde_json::Value::from(n),
                FieldValue::Bool(b) => serde_json::Value::from(b),
            };
            assert_eq!(object[*name], expected, "field {name}");
        }
    }

    #[test]
    fn test_json_serialization_order() {
        let article = Article::from_entry(&entry_json());
        let json = serde_json::to_string(&article).unwrap();
        let mut last = 0;
        for name in Article::FIELD_NAMES {
            let pos = json.find(&format!("\"{name}\":")).unwrap();
            assert!(pos >= last, "{name} out of order");
            last = pos;
        }
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(FieldValue::Int(-3).to_string(), "-3");
        assert_eq!(FieldValue::Text("a,b").to_string(), "a,b");
    }

    #[test]
    fn test_category_label_defaults_to_unnamed() {
        let category = Category::from(RawCategory {
            id: "c/1".to_string(),
            label: None,
        });
        assert_eq!(category.label, "Unnamed");

        let blank = Category::from(RawCategory {
            id: "c/2".to_string(),
            label: Some(String::new()),
        });
        assert_eq!(blank.label, "");
    }

    fn cats(labels: &[&str]) -> Vec<Category> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| Category {
                id: format!("c/{i}"),
                label: l.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_resolve_exact_match_wins() {
        let categories = cats(&["Tech News", "Tech"]);
        assert_eq!(
            resolve_category(&categories, "tech").map(|c| c.label.as_str()),
            Some("Tech")
        );
    }

    #[test]
    fn test_resolve_first_substring_match() {
        let categories = cats(&["Tech News", "Technology"]);
        assert_eq!(
            resolve_category(&categories, "TECH").map(|c| c.label.as_str()),
            Some("Tech News")
        );
    }

    #[test]
    fn test_resolve_no_match() {
        assert!(resolve_category(&cats(&["Sports"]), "tech").is_none());
        assert!(resolve_category(&[], "tech").is_none());
    }
}
