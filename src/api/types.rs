//! Serde mirrors of the Feedly Cloud API JSON shapes.
//!
//! Only the fields this tool reads are modelled. Everything is optional or
//! defaulted because the service omits keys freely.
use serde::Deserialize;

/// `GET /profile`
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
}

/// Element of `GET /categories`, and of a subscription's `categories`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Element of `GET /subscriptions`
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub categories: Vec<RawCategory>,
}

impl Subscription {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// `GET /streams/contents`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamContents {
    #[serde(default)]
    pub items: Vec<Entry>,
    #[serde(default)]
    pub continuation: Option<String>,
}

/// A single stream item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub alternate: Vec<Link>,
    #[serde(default)]
    pub author: Option<String>,
    /// Milliseconds since epoch.
    #[serde(default)]
    pub published: Option<i64>,
    /// Milliseconds since epoch.
    #[serde(default)]
    pub crawled: Option<i64>,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub summary: Option<TextContent>,
    #[serde(default)]
    pub content: Option<TextContent>,
    #[serde(default)]
    pub engagement: Option<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub categories: Vec<Label>,
    #[serde(default)]
    pub tags: Vec<Label>,
    /// Absent means unread.
    #[serde(default)]
    pub unread: Option<bool>,
    #[serde(default)]
    pub visual: Option<Visual>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub stream_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Visual {
    #[serde(default)]
    pub url: Option<String>,
}
