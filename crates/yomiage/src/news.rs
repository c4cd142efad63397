use std::collections::HashSet;

use crate::config::NewsConfig;
use crate::extractor::html_to_text;
use crate::feed::FeedItem;
use crate::models::Article;
use crate::policy::Language;
use crate::segment::SentenceBoundary;

/// Naive extractive summary: leading sentences that fit in `max_len` characters.
///
/// Feed bodies may be HTML and are rendered to plain text first. Falls back
/// to the first `max_len` characters plus `...` when even the first sentence
/// is too long.
pub fn summarize_text(text: &str, max_len: usize, language: Language) -> String {
    let clean = html_to_text(text).unwrap_or_else(|e| {
        tracing::debug!("Using feed text as-is: {:#}", e);
        text.to_string()
    });
    let terminators = language.terminators();
    let (joiner, end) = match language {
        Language::Ja => ("。", '。'),
        Language::En => (". ", '.'),
    };

    let mut summary = String::new();
    let mut current_len = 0;
    for sentence in clean
        .split(|c: char| c == '\n' || terminators.is_terminal(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let len = sentence.chars().count();
        if current_len + len + 1 > max_len {
            break;
        }
        if !summary.is_empty() {
            summary.push_str(joiner);
        }
        summary.push_str(sentence);
        current_len += len + 1;
    }

    if summary.is_empty() {
        let clean = clean.trim();
        if clean.is_empty() {
            return String::new();
        }
        let head: String = clean.chars().take(max_len).collect();
        return format!("{}...", head);
    }

    if !summary.ends_with(end) {
        summary.push(end);
    }
    summary
}

/// Case-insensitive match of any keyword in `text`
pub fn contains_keywords(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// Picks relevant feed items and turns them into summarized articles
#[derive(Debug, Clone)]
pub struct NewsFilter {
    pub keywords: Vec<String>,
    pub max_articles: usize,
    pub summary_length: usize,
    pub language: Language,
}

impl NewsFilter {
    pub fn from_config(config: &NewsConfig) -> Self {
        Self {
            keywords: config.keywords.clone(),
            max_articles: config.max_articles,
            summary_length: config.summary_length,
            language: config.language,
        }
    }

    /// Keyword filter, de-duplicate by title (first wins), limit, summarize
    pub fn select(&self, items: Vec<FeedItem>) -> Vec<Article> {
        let mut seen_titles = HashSet::new();

        items
            .into_iter()
            .filter(|item| {
                let haystack = format!("{} {} {}", item.title, item.description, item.content);
                contains_keywords(&haystack, &self.keywords)
            })
            .filter(|item| seen_titles.insert(item.title.clone()))
            .take(self.max_articles)
            .map(|item| {
                let summary = summarize_text(item.body(), self.summary_length, self.language);
                Article {
                    title: item.title,
                    summary,
                    source: item.source,
                    pub_date: item.pub_date,
                    link: item.link,
                }
            })
            .collect()
    }
}
