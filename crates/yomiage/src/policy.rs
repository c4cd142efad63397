use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::segment::Terminators;

/// Language of the generated text; picks default terminators and labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
}

impl Language {
    pub fn terminators(&self) -> Terminators {
        match self {
            Language::Ja => Terminators::japanese(),
            Language::En => Terminators::latin(),
        }
    }

    /// Spoken prefix for the `index`-th article (1-based)
    pub fn item_label(&self, index: usize) -> String {
        match self {
            Language::Ja => format!("記事{}。", index),
            Language::En => format!("Article {}. ", index),
        }
    }

    /// Run-level header for merged output
    pub fn run_header(&self, count: usize) -> String {
        match self {
            Language::Ja => format!("ニュース要約。{}件の記事があります。", count),
            Language::En => format!("News summary. {} articles. ", count),
        }
    }

    /// Goes after text that already ends with a terminator
    pub fn sentence_gap(&self) -> &'static str {
        match self {
            Language::Ja => "",
            Language::En => " ",
        }
    }

    /// Goes between a title and its summary, and after each summary in merged output
    pub fn separator(&self) -> &'static str {
        match self {
            Language::Ja => "。",
            Language::En => ". ",
        }
    }
}

/// Zero-padding width for article and chunk indices in file names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexWidth {
    /// `max(2, digits of the largest index in the run)`
    #[default]
    Dynamic,
    Fixed(usize),
}

impl IndexWidth {
    pub fn resolve(&self, largest_index: usize) -> usize {
        match self {
            IndexWidth::Dynamic => digits(largest_index).max(2),
            IndexWidth::Fixed(width) => *width,
        }
    }
}

fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// How summaries are cut into reading files. Resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationPolicy {
    pub split_files: bool,
    pub max_chars_per_file: usize,
    pub include_metadata: bool,
    pub output_prefix: String,
    pub language: Language,
    pub terminators: Terminators,
    pub index_width: IndexWidth,
}

impl SegmentationPolicy {
    pub fn new(max_chars_per_file: usize, output_prefix: impl Into<String>) -> Self {
        let language = Language::default();
        Self {
            split_files: true,
            max_chars_per_file,
            include_metadata: false,
            output_prefix: output_prefix.into(),
            language,
            terminators: language.terminators(),
            index_width: IndexWidth::default(),
        }
    }

    /// Build a policy from a signed limit as read from configuration.
    /// Zero and negative limits are rejected rather than clamped.
    pub fn from_signed_limit(
        max_chars_per_file: i64,
        output_prefix: impl Into<String>,
    ) -> Result<Self> {
        let limit = usize::try_from(max_chars_per_file)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                Error::InvalidPolicy(format!(
                    "max_chars_per_file must be positive, got {}",
                    max_chars_per_file
                ))
            })?;
        Ok(Self::new(limit, output_prefix))
    }

    pub fn split_files(mut self, split: bool) -> Self {
        self.split_files = split;
        self
    }

    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    /// Switch language and reset terminators to that language's defaults
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self.terminators = language.terminators();
        self
    }

    pub fn terminators(mut self, terminators: Terminators) -> Self {
        self.terminators = terminators;
        self
    }

    pub fn index_width(mut self, width: IndexWidth) -> Self {
        self.index_width = width;
        self
    }

    /// Check the policy and return the chunk bound
    pub fn validate(&self) -> Result<NonZeroUsize> {
        let limit = NonZeroUsize::new(self.max_chars_per_file).ok_or_else(|| {
            Error::InvalidPolicy("max_chars_per_file must be positive, got 0".to_string())
        })?;
        if self.terminators.is_empty() {
            return Err(Error::InvalidPolicy(
                "terminator set must not be empty".to_string(),
            ));
        }
        if let IndexWidth::Fixed(0) = self.index_width {
            return Err(Error::InvalidPolicy(
                "fixed index width must be at least 1".to_string(),
            ));
        }
        Ok(limit)
    }
}
