use crate::models::Article;
use std::collections::{HashMap, HashSet};
use std::fmt;

const TOP_SOURCES: usize = 5;

/// End-of-run statistics over the exported articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub unique_sources: usize,
    /// Earliest and latest non-empty `published_date`.
    pub date_range: Option<(String, String)>,
    pub read: usize,
    pub unread: usize,
    /// Per-language counts in first-seen order.
    pub languages: Vec<(String, usize)>,
    /// Most frequent sources, ties in first-seen order.
    pub top_sources: Vec<(String, usize)>,
    /// Rounded mean over articles with a non-zero word count.
    pub average_words: Option<usize>,
    pub max_words: Option<usize>,
}

impl Summary {
    pub fn from_articles(articles: &[Article]) -> Self {
        let sources = count_in_order(
            articles
                .iter()
                .map(|a| a.source_title.as_str())
                .filter(|s| !s.is_empty()),
        );
        let unique_sources = sources.len();

        let mut top_sources = sources;
        // Stable sort keeps first-seen order among equal counts
        top_sources.sort_by(|a, b| b.1.cmp(&a.1));
        top_sources.truncate(TOP_SOURCES);

        let dates: Vec<&str> = articles
            .iter()
            .map(|a| a.published_date.as_str())
            .filter(|d| !d.is_empty())
            .collect();
        let date_range = match (dates.iter().min(), dates.iter().max()) {
            (Some(min), Some(max)) => Some((min.to_string(), max.to_string())),
            _ => None,
        };

        let read = articles.iter().filter(|a| a.read).count();

        let languages = count_in_order(
            articles
                .iter()
                .map(|a| a.language.as_str())
                .filter(|l| !l.is_empty()),
        );

        let word_counts: Vec<usize> = articles
            .iter()
            .map(|a| a.word_count)
            .filter(|&w| w > 0)
            .collect();
        let average_words = (!word_counts.is_empty()).then(|| {
            let sum: usize = word_counts.iter().sum();
            (sum as f64 / word_counts.len() as f64).round() as usize
        });

        Self {
            total: articles.len(),
            unique_sources,
            date_range,
            read,
            unread: articles.len() - read,
            languages,
            top_sources,
            average_words,
            max_words: word_counts.iter().copied().max(),
        }
    }
}

fn count_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for value in values {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value.to_string(), 1));
            }
        }
    }
    counts
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary:")?;
        writeln!(f, "   Total articles: {}", self.total)?;
        writeln!(f, "   Unique sources: {}", self.unique_sources)?;
        if let Some((first, last)) = &self.date_range {
            writeln!(f, "   Date range: {first} to {last}")?;
        }
        writeln!(f, "   Read: {}, Unread: {}", self.read, self.unread)?;
        if !self.languages.is_empty() {
            let langs: Vec<String> = self
                .languages
                .iter()
                .map(|(lang, n)| format!("{lang}: {n}"))
                .collect();
            writeln!(f, "   Languages: {}", langs.join(", "))?;
        }

        if !self.top_sources.is_empty() {
            writeln!(f)?;
            writeln!(f, "Top {TOP_SOURCES} sources:")?;
            for (source, n) in &self.top_sources {
                writeln!(f, "   {source}: {n} articles")?;
            }
        }

        if let (Some(avg), Some(max)) = (self.average_words, self.max_words) {
            writeln!(f)?;
            writeln!(f, "Content stats:")?;
            writeln!(f, "   Average word count: {avg}")?;
            writeln!(f, "   Longest article: {max} words")?;
        }
        Ok(())
    }
}
