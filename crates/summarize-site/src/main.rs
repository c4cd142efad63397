use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use yomiage::{
    create_reading_files, url_subdir, Article, ClaudeSummarizer, Config, ContentExtractor,
    Language, ReportGenerator, ReportHeader, SegmentationPolicy, Secrets, SiteDigestEntry,
    SummaryLength,
};

const SITE_REPORT_FILE: &str = "website_summary_report.md";
const DIGEST_DIR: &str = "all_summaries";
const DIGEST_FILE: &str = "all_websites_summary.md";

#[derive(Parser)]
#[command(name = "summarize-site")]
#[command(about = "Summarize web pages with Claude and write reading files")]
struct Args {
    /// Page to summarize
    #[arg(short, long, required_unless_present = "from_config")]
    url: Option<String>,

    /// Output directory
    #[arg(short, long, required_unless_present = "from_config")]
    output: Option<PathBuf>,

    /// Summary length: short, medium, long, or a character count
    #[arg(short, long)]
    length: Option<String>,

    /// Summarize every URL listed under `websites.urls` in the config
    #[arg(long, conflicts_with = "url")]
    from_config: bool,

    /// Path to config.json
    #[arg(short, long)]
    config: Option<PathBuf>,
}

struct SiteJob<'a> {
    extractor: &'a ContentExtractor,
    summarizer: &'a ClaudeSummarizer,
    policy: &'a SegmentationPolicy,
    length: SummaryLength,
    language: Language,
}

impl SiteJob<'_> {
    /// Fetch, summarize, and write everything for one URL under
    /// `output_dir/<url subdir>`
    async fn run(&self, url: &str, output_dir: &Path) -> Result<SiteDigestEntry> {
        let subdir = url_subdir(url)?;
        let site_dir = output_dir.join(&subdir);

        println!("\n🌐 Fetching {}...", url);
        let page = self
            .extractor
            .fetch_page(url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;
        println!("✓ Extracted {} characters", page.text.chars().count());

        println!("🤖 Summarizing with Claude AI...");
        let summary = self
            .summarizer
            .summarize(&page.text, self.length, self.language)
            .await
            .with_context(|| format!("Failed to summarize {}", url))?;

        let title = page.title.clone().unwrap_or_else(|| match self.language {
            Language::Ja => format!("ウェブサイト要約: {}", url),
            Language::En => format!("Website summary: {}", url),
        });
        let article = Article::new(title, summary.clone())
            .with_source(url)
            .with_pub_date(Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
            .with_link(url);
        let articles = [article];

        let files = create_reading_files(&articles, self.policy, &site_dir)
            .context("Failed to create reading files")?;
        println!("✓ Created {} reading files in {}", files.len(), site_dir.display());

        let header = ReportHeader::new(self.language).title(match self.language {
            Language::Ja => "ウェブサイト要約レポート",
            Language::En => "Website Summary Report",
        });
        let content = ReportGenerator::generate(&articles, &header, Local::now());
        let report_path = ReportGenerator::save(&content, &site_dir, SITE_REPORT_FILE)
            .context("Failed to save report")?;
        println!("✓ Report saved to: {}", report_path.display());

        Ok(SiteDigestEntry {
            url: url.to_string(),
            summary,
            // Relative to the digest directory
            report_path: Path::new("..").join(&subdir).join(SITE_REPORT_FILE),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let websites = &config.websites;

    let (urls, output_dir) = if args.from_config {
        if websites.urls.is_empty() {
            anyhow::bail!("No URLs configured under websites.urls");
        }
        let output = args
            .output
            .unwrap_or_else(|| websites.output_dir.clone());
        (websites.urls.clone(), output)
    } else {
        let url = args.url.context("--url is required")?;
        let output = args.output.context("--output is required")?;
        (vec![url], output)
    };

    let policy = websites
        .reading
        .policy(websites.language)
        .context("Invalid reading file settings")?;
    let length = SummaryLength::parse(args.length.as_deref().unwrap_or(&websites.summary_length));

    let secrets = Secrets::from_env()?;
    let extractor = ContentExtractor::new()?;
    let summarizer = ClaudeSummarizer::new(secrets.anthropic_api_key)?;
    let job = SiteJob {
        extractor: &extractor,
        summarizer: &summarizer,
        policy: &policy,
        length,
        language: websites.language,
    };

    let mut entries = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        println!("\n[{}/{}] {}", i + 1, urls.len(), url);
        match job.run(url, &output_dir).await {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Skipping {}: {:#}", url, e);
                println!("  ✗ Failed: {}", url);
            }
        }
    }

    println!("\n✓ Summarized {}/{} sites", entries.len(), urls.len());

    if args.from_config && !entries.is_empty() {
        let digest = ReportGenerator::generate_digest(&entries, websites.language, Local::now());
        let digest_path = ReportGenerator::save(&digest, &output_dir.join(DIGEST_DIR), DIGEST_FILE)
            .context("Failed to save digest")?;
        println!("\n✅ Digest saved to: {}", digest_path.display());
    }

    if entries.is_empty() {
        anyhow::bail!("No site could be summarized");
    }

    Ok(())
}
