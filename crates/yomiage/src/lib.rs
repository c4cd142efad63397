//! Turns news articles and website summaries into text-to-speech ready
//! reading files and Markdown reports.
//!
//! The core is the sentence-aware [`Segmenter`]: text is cut at sentence
//! terminators and greedily packed into chunks no longer than a character
//! limit. [`ReadingFileWriter`] applies a [`SegmentationPolicy`] to a list of
//! [`Article`]s and writes one numbered file per chunk.

// Public modules
pub mod config;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod models;
pub mod news;
pub mod policy;
pub mod ratelimit;
pub mod report;
pub mod segment;
pub mod site;
pub mod summarizer;
pub mod writer;

// Re-export commonly used types
pub use config::{Config, NewsConfig, ReadingConfig, Secrets, WebsitesConfig};
pub use error::{Error, Result};
pub use extractor::{ContentExtractor, PageContent};
pub use feed::{FeedClient, FeedItem};
pub use models::Article;
pub use news::NewsFilter;
pub use policy::{IndexWidth, Language, SegmentationPolicy};
pub use ratelimit::TokenRateLimiter;
pub use report::{write_report, ReportGenerator, ReportHeader, SiteDigestEntry};
pub use segment::{segment, Segmenter, SentenceBoundary, Terminators};
pub use site::url_subdir;
pub use summarizer::{ClaudeSummarizer, SummaryLength};
pub use writer::{create_reading_files, PlannedFile, ReadingFileWriter};
