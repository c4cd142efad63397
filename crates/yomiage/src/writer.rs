use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Article;
use crate::policy::SegmentationPolicy;
use crate::segment::{Segmenter, SentenceBoundary, Terminators};

/// A reading file that has been named and filled but not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub file_name: String,
    pub content: String,
}

/// Turns articles into numbered, bounded-length reading files
pub struct ReadingFileWriter {
    policy: SegmentationPolicy,
    segmenter: Segmenter<Terminators>,
    limit: NonZeroUsize,
}

impl ReadingFileWriter {
    /// Fails with `InvalidPolicy` before anything touches the filesystem
    pub fn new(policy: SegmentationPolicy) -> Result<Self> {
        let limit = policy.validate()?;
        let segmenter = Segmenter::new(policy.terminators.clone());
        Ok(Self {
            policy,
            segmenter,
            limit,
        })
    }

    pub fn policy(&self) -> &SegmentationPolicy {
        &self.policy
    }

    /// Compute every file name and chunk without writing anything
    pub fn plan(&self, articles: &[Article]) -> Vec<PlannedFile> {
        if articles.is_empty() {
            return Vec::new();
        }

        if self.policy.split_files {
            self.plan_split(articles)
        } else {
            self.plan_merged(articles)
        }
    }

    /// Write the planned files into `output_dir`, creating it when needed.
    ///
    /// Files are written in order; a failure part-way leaves the earlier files in place.
    pub fn write(&self, articles: &[Article], output_dir: &Path) -> Result<Vec<PathBuf>> {
        let planned = self.plan(articles);
        if planned.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

        let mut written = Vec::with_capacity(planned.len());
        for file in planned {
            let path = output_dir.join(&file.file_name);
            fs::write(&path, &file.content).map_err(|e| Error::io(&path, e))?;
            written.push(path);
        }

        Ok(written)
    }

    fn plan_split(&self, articles: &[Article]) -> Vec<PlannedFile> {
        let per_article: Vec<Vec<String>> = articles
            .iter()
            .enumerate()
            .map(|(i, article)| {
                let mut content = String::new();
                if self.policy.include_metadata {
                    content.push_str(&self.policy.language.item_label(i + 1));
                }
                self.push_sentence(&mut content, &article.title);
                content.push_str(article.summary.trim());
                self.segmenter.segment(&content, self.limit)
            })
            .collect();

        let largest_chunk = per_article.iter().map(Vec::len).max().unwrap_or(0);
        let item_width = self.policy.index_width.resolve(articles.len());
        let chunk_width = self.policy.index_width.resolve(largest_chunk);

        let mut planned = Vec::new();
        for (i, chunks) in per_article.into_iter().enumerate() {
            for (j, chunk) in chunks.into_iter().enumerate() {
                planned.push(PlannedFile {
                    file_name: format!(
                        "{}{:0iw$}_{:0cw$}.txt",
                        self.policy.output_prefix,
                        i + 1,
                        j + 1,
                        iw = item_width,
                        cw = chunk_width
                    ),
                    content: chunk,
                });
            }
        }
        planned
    }

    fn plan_merged(&self, articles: &[Article]) -> Vec<PlannedFile> {
        let mut content = String::new();
        if self.policy.include_metadata {
            content.push_str(&self.policy.language.run_header(articles.len()));
        }
        for (i, article) in articles.iter().enumerate() {
            if self.policy.include_metadata {
                content.push_str(&self.policy.language.item_label(i + 1));
            }
            self.push_sentence(&mut content, &article.title);
            self.push_sentence(&mut content, &article.summary);
        }

        let chunks = self.segmenter.segment(&content, self.limit);
        let width = self.policy.index_width.resolve(chunks.len());

        chunks
            .into_iter()
            .enumerate()
            .map(|(j, chunk)| PlannedFile {
                file_name: format!(
                    "{}{:0w$}.txt",
                    self.policy.output_prefix,
                    j + 1,
                    w = width
                ),
                content: chunk,
            })
            .collect()
    }

    /// Append `text` as a sentence, adding the language separator unless it
    /// already ends with a terminator
    fn push_sentence(&self, out: &mut String, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        out.push_str(text);

        let terminated = text
            .chars()
            .last()
            .is_some_and(|c| self.policy.terminators.is_terminal(c));
        if terminated {
            out.push_str(self.policy.language.sentence_gap());
        } else {
            out.push_str(self.policy.language.separator());
        }
    }
}

/// Segment `articles` per `policy` and write one file per chunk into `output_dir`.
///
/// Returns the written paths in (article, chunk) order. An empty article list
/// writes nothing and does not create the directory.
pub fn create_reading_files(
    articles: &[Article],
    policy: &SegmentationPolicy,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    ReadingFileWriter::new(policy.clone())?.write(articles, output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{IndexWidth, Language};
    use crate::segment::segment;
    use tempfile::tempdir;

    fn article(title: &str, summary: &str) -> Article {
        Article::new(title, summary)
            .with_source("Test Feed")
            .with_pub_date("Mon, 02 Feb 2026")
            .with_link("https://example.com")
    }

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    // ==================== Split Mode Tests ====================

    #[test]
    fn test_split_mode_names_and_order() {
        let dir = tempdir().unwrap();
        let policy = SegmentationPolicy::new(10, "news_reading_").index_width(IndexWidth::Fixed(2));
        let articles = vec![
            article("一つ目", "これは一文目。これは二文目。"),
            article("二つ目", "短い。"),
        ];

        let paths = create_reading_files(&articles, &policy, dir.path()).unwrap();

        assert_eq!(
            file_names(&paths),
            vec![
                "news_reading_01_01.txt",
                "news_reading_01_02.txt",
                "news_reading_01_03.txt",
                "news_reading_02_01.txt",
            ]
        );
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "一つ目。");
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "これは一文目。");
        assert_eq!(fs::read_to_string(&paths[3]).unwrap(), "二つ目。短い。");
    }

    #[test]
    fn test_split_mode_file_count_is_sum_of_chunks() {
        let dir = tempdir().unwrap();
        let policy = SegmentationPolicy::new(20, "p_");
        let articles = vec![
            article("Alpha", &"あ".repeat(45)),
            article("Beta", "短い要約。"),
            article("Gamma", &"これは文です。".repeat(6)),
        ];

        let expected: usize = articles
            .iter()
            .map(|a| segment(&format!("{}。{}", a.title, a.summary), NonZeroUsize::new(20).unwrap()).len())
            .sum();

        let paths = create_reading_files(&articles, &policy, dir.path()).unwrap();
        assert_eq!(paths.len(), expected);
        for path in &paths {
            let content = fs::read_to_string(path).unwrap();
            assert!(!content.is_empty());
            assert!(content.chars().count() <= 20);
        }
    }

    #[test]
    fn test_split_mode_metadata_prefix() {
        let dir = tempdir().unwrap();
        let policy = SegmentationPolicy::new(100, "p_").include_metadata(true);
        let articles = vec![article("見出し", "本文。"), article("次の見出し", "次の本文。")];

        let paths = create_reading_files(&articles, &policy, dir.path()).unwrap();

        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "記事1。見出し。本文。");
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "記事2。次の見出し。次の本文。");
    }

    #[test]
    fn test_split_mode_dynamic_width_over_99_articles() {
        let policy = SegmentationPolicy::new(50, "p_");
        let articles: Vec<Article> = (0..120).map(|i| article(&format!("T{}", i), "S。")).collect();

        let planned = ReadingFileWriter::new(policy).unwrap().plan(&articles);

        assert_eq!(planned.len(), 120);
        assert_eq!(planned[0].file_name, "p_001_01.txt");
        assert_eq!(planned[119].file_name, "p_120_01.txt");
        let mut sorted: Vec<_> = planned.iter().map(|f| f.file_name.clone()).collect();
        sorted.sort();
        assert_eq!(sorted, planned.iter().map(|f| f.file_name.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn test_english_title_separator() {
        let policy = SegmentationPolicy::new(200, "en_")
            .language(Language::En)
            .include_metadata(true);
        let articles = vec![
            article("Rust 2.0 released", "It is fast."),
            article("Is AI here?", "Maybe."),
        ];

        let planned = ReadingFileWriter::new(policy).unwrap().plan(&articles);

        assert_eq!(planned[0].content, "Article 1. Rust 2.0 released. It is fast.");
        assert_eq!(planned[1].content, "Article 2. Is AI here? Maybe.");
    }

    // ==================== Merged Mode Tests ====================

    #[test]
    fn test_merged_mode_single_stream() {
        let dir = tempdir().unwrap();
        let policy = SegmentationPolicy::new(30, "all_")
            .split_files(false)
            .include_metadata(true);
        let articles = vec![
            article("一つ目", "これは一文目。これは二文目。"),
            article("二つ目", "最後の文"),
        ];

        let paths = create_reading_files(&articles, &policy, dir.path()).unwrap();

        let combined = "ニュース要約。2件の記事があります。記事1。一つ目。これは一文目。これは二文目。記事2。二つ目。最後の文。";
        let expected = segment(combined, NonZeroUsize::new(30).unwrap());
        assert_eq!(paths.len(), expected.len());
        assert_eq!(file_names(&paths)[0], "all_01.txt");

        let written: Vec<String> = paths.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
        assert_eq!(written, expected);
    }

    #[test]
    fn test_merged_mode_count_independent_of_article_count() {
        let policy = SegmentationPolicy::new(1000, "all_").split_files(false);
        let articles: Vec<Article> = (0..10).map(|i| article(&format!("記事{}", i), "短い。")).collect();

        let planned = ReadingFileWriter::new(policy).unwrap().plan(&articles);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].file_name, "all_01.txt");
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_empty_articles_writes_nothing() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("never-created");
        let policy = SegmentationPolicy::new(100, "p_");

        let paths = create_reading_files(&[], &policy, &output).unwrap();

        assert!(paths.is_empty());
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_policy_before_filesystem() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out");
        let policy = SegmentationPolicy::new(0, "p_");

        let result = create_reading_files(&[article("t", "s")], &policy, &output);

        assert!(matches!(result, Err(Error::InvalidPolicy(_))));
        assert!(!output.exists());
    }

    #[test]
    fn test_creates_nested_directory_and_overwrites() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a").join("b");
        let policy = SegmentationPolicy::new(100, "p_");

        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("p_01_01.txt"), "stale content that is much longer").unwrap();

        let paths = create_reading_files(&[article("題", "新しい。")], &policy, &output).unwrap();

        assert_eq!(paths, vec![output.join("p_01_01.txt")]);
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "題。新しい。");
    }

    #[test]
    fn test_io_error_propagated() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let policy = SegmentationPolicy::new(100, "p_");

        let result = create_reading_files(&[article("t", "s")], &policy, &blocker.join("sub"));

        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
