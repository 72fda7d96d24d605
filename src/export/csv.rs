//! Minimal RFC 4180 CSV encoding of [`Article`] rows.
use crate::models::Article;
use std::borrow::Cow;
use std::io::{self, Write};

/// Quotes a field only when it contains a delimiter, quote, or line break.
/// Embedded quotes are doubled.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn write_header<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", Article::FIELD_NAMES.join(","))
}

pub fn write_record<W: Write>(out: &mut W, article: &Article) -> io::Result<()> {
    let mut line = String::new();
    for (i, value) in article.fields().iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_field(&value.to_string()));
    }
    writeln!(out, "{line}")
}
