use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Article;
use crate::policy::Language;

/// What goes above the article sections of a report
#[derive(Debug, Clone)]
pub struct ReportHeader {
    pub title: String,
    pub keywords: Vec<String>,
    pub language: Language,
}

impl Default for ReportHeader {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl ReportHeader {
    pub fn new(language: Language) -> Self {
        let title = match language {
            Language::Ja => "ニュース要約レポート",
            Language::En => "News Summary Report",
        };
        Self {
            title: title.to_string(),
            keywords: Vec::new(),
            language,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn keywords(mut self, keywords: &[String]) -> Self {
        self.keywords = keywords.to_vec();
        self
    }
}

struct Labels {
    generated: &'static str,
    keywords: &'static str,
    count: &'static str,
    source: &'static str,
    published: &'static str,
    url: &'static str,
    summary: &'static str,
    digest_title: &'static str,
    processed: &'static str,
    sites: &'static str,
    summaries: &'static str,
    full_report: &'static str,
}

fn labels(language: Language) -> Labels {
    match language {
        Language::Ja => Labels {
            generated: "生成日時",
            keywords: "検索キーワード",
            count: "記事数",
            source: "ソース",
            published: "公開日",
            url: "URL",
            summary: "要約",
            digest_title: "ウェブサイト要約まとめ",
            processed: "処理日時",
            sites: "処理したサイト",
            summaries: "各サイトの要約",
            full_report: "詳細レポート",
        },
        Language::En => Labels {
            generated: "Generated",
            keywords: "Keywords",
            count: "Articles",
            source: "Source",
            published: "Published",
            url: "URL",
            summary: "Summary",
            digest_title: "Website Summary Digest",
            processed: "Processed",
            sites: "Sites",
            summaries: "Summaries",
            full_report: "Full report",
        },
    }
}

/// One processed site in a multi-site digest
#[derive(Debug, Clone)]
pub struct SiteDigestEntry {
    pub url: String,
    pub summary: String,
    pub report_path: PathBuf,
}

pub struct ReportGenerator;

impl ReportGenerator {
    /// Render the full, unsegmented report as Markdown
    pub fn generate(articles: &[Article], header: &ReportHeader, generated_at: DateTime<Local>) -> String {
        let l = labels(header.language);
        let mut md = String::new();

        md.push_str(&format!("# {}\n", header.title));
        md.push_str(&format!(
            "{}: {}\n",
            l.generated,
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        if !header.keywords.is_empty() {
            md.push_str(&format!("{}: {}\n", l.keywords, header.keywords.join(", ")));
        }
        md.push_str(&format!("{}: {}\n\n", l.count, articles.len()));

        for (index, article) in articles.iter().enumerate() {
            md.push_str(&format!("## {}. {}\n", index + 1, article.title));
            md.push_str(&format!("**{}**: {}\n", l.source, article.source));
            md.push_str(&format!("**{}**: {}\n", l.published, article.pub_date));
            md.push_str(&format!("**{}**: {}\n\n", l.url, article.link));
            md.push_str(&format!("**{}**:\n{}\n\n", l.summary, article.summary));
            md.push_str("---\n\n");
        }

        md
    }

    /// Render the digest that links every per-site report
    pub fn generate_digest(
        entries: &[SiteDigestEntry],
        language: Language,
        generated_at: DateTime<Local>,
    ) -> String {
        let l = labels(language);
        let mut md = String::new();

        md.push_str(&format!("# {}\n\n", l.digest_title));
        md.push_str(&format!(
            "{}: {}\n\n",
            l.processed,
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        md.push_str(&format!("## {}\n\n", l.sites));
        for (index, entry) in entries.iter().enumerate() {
            md.push_str(&format!("{}. [{}]({})\n", index + 1, entry.url, entry.url));
        }

        md.push_str(&format!("\n## {}\n\n", l.summaries));
        for entry in entries {
            md.push_str(&format!("### {}\n\n", entry.url));
            md.push_str(&format!("{}\n\n", entry.summary));
            md.push_str(&format!(
                "[{}]({})\n\n",
                l.full_report,
                entry.report_path.display()
            ));
        }

        md
    }

    pub fn save(content: &str, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

        let filepath = output_dir.join(file_name);
        fs::write(&filepath, content).map_err(|e| Error::io(&filepath, e))?;

        Ok(filepath)
    }
}

/// Write a report for `articles` with the default header, timestamped now
pub fn write_report(articles: &[Article], output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    let content = ReportGenerator::generate(articles, &ReportHeader::default(), Local::now());
    ReportGenerator::save(&content, output_dir, file_name)
}
