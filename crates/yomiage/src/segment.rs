//! Sentence-respecting text segmentation
//!
//! Long text is cut into chunks of at most `max_len` characters. Cuts happen
//! at sentence boundaries whenever possible:
//!
//! ```text
//! "これは一文目。これは二文目。これは三文目。"  (max 10)
//!   -> ["これは一文目。", "これは二文目。", "これは三文目。"]
//! ```
//!
//! A single sentence longer than `max_len` is force-split by characters, so
//! the length bound always holds. Lengths are counted in `char`s.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Classifies a character as sentence-terminal punctuation
pub trait SentenceBoundary {
    fn is_terminal(&self, c: char) -> bool;
}

impl<F> SentenceBoundary for F
where
    F: Fn(char) -> bool,
{
    fn is_terminal(&self, c: char) -> bool {
        self(c)
    }
}

/// A set of sentence-terminal characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Terminators {
    chars: Vec<char>,
}

impl Terminators {
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();
        Self { chars }
    }

    /// Full-width Japanese terminators: `。．！？`
    pub fn japanese() -> Self {
        Self::new(['。', '．', '！', '？'])
    }

    /// ASCII terminators: `.!?`
    pub fn latin() -> Self {
        Self::new(['.', '!', '?'])
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }
}

impl Default for Terminators {
    fn default() -> Self {
        Self::new(['.', '!', '?', '。', '．', '！', '？'])
    }
}

impl SentenceBoundary for Terminators {
    fn is_terminal(&self, c: char) -> bool {
        self.chars.binary_search(&c).is_ok()
    }
}

impl From<&str> for Terminators {
    fn from(s: &str) -> Self {
        Self::new(s.chars().filter(|c| !c.is_whitespace()))
    }
}

impl From<String> for Terminators {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Terminators> for String {
    fn from(t: Terminators) -> Self {
        t.chars.into_iter().collect()
    }
}

/// Splits text into bounded chunks using a pluggable sentence boundary
#[derive(Debug, Clone, Default)]
pub struct Segmenter<B = Terminators> {
    boundary: B,
}

impl<B: SentenceBoundary> Segmenter<B> {
    pub fn new(boundary: B) -> Self {
        Self { boundary }
    }

    /// Split `text` into sentences, each keeping the run of terminators that ends it.
    /// Trailing text without a terminator forms the last sentence.
    pub fn sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if !self.boundary.is_terminal(c) {
                continue;
            }

            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if !self.boundary.is_terminal(next) {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }

            sentences.push(&text[start..end]);
            start = end;
        }

        if start < text.len() {
            sentences.push(&text[start..]);
        }

        sentences
    }

    /// Greedily pack sentences into chunks of at most `max_len` characters.
    ///
    /// Returned chunks are trimmed and never empty. Empty or whitespace-only
    /// input yields no chunks.
    pub fn segment(&self, text: &str, max_len: NonZeroUsize) -> Vec<String> {
        let max_len = max_len.get();
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for sentence in self.sentences(text) {
            // Leading whitespace never opens a chunk
            let sentence = if current.is_empty() {
                sentence.trim_start()
            } else {
                sentence
            };
            if sentence.is_empty() {
                continue;
            }

            let len = sentence.chars().count();
            if current_len + len <= max_len {
                current.push_str(sentence);
                current_len += len;
                continue;
            }

            if !current.is_empty() {
                chunks.push(current.trim().to_string());
                current.clear();
                current_len = 0;
            }

            let sentence = sentence.trim_start();
            let len = sentence.chars().count();
            if len > max_len {
                chunks.extend(force_split(sentence, max_len));
            } else {
                current.push_str(sentence);
                current_len = len;
            }
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks.retain(|chunk| !chunk.is_empty());
        chunks
    }
}

/// Segment with the default (Latin + Japanese) terminators
pub fn segment(text: &str, max_len: NonZeroUsize) -> Vec<String> {
    Segmenter::new(Terminators::default()).segment(text, max_len)
}

/// Cut a sentence into consecutive pieces of `max_len` characters
fn force_split(sentence: &str, max_len: usize) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    chars
        .chunks(max_len)
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}
