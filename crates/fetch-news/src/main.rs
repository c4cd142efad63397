use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use yomiage::{create_reading_files, Config, FeedClient, NewsFilter, ReportGenerator, ReportHeader};

#[derive(Parser)]
#[command(name = "fetch-news")]
#[command(about = "Fetch news feeds, summarize matching articles, and write reading files")]
struct Args {
    /// Path to config.json (defaults to ./config.json or ~/.config/yomiage/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the report and reading files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated keywords, replacing the configured ones
    #[arg(short, long, value_delimiter = ',')]
    keywords: Option<Vec<String>>,

    /// Maximum number of articles to keep
    #[arg(short, long)]
    max_articles: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;

    if let Some(keywords) = args.keywords {
        config.news.keywords = keywords;
    }
    if let Some(max_articles) = args.max_articles {
        config.news.max_articles = max_articles;
    }
    let output_dir = args.output.unwrap_or_else(|| config.output.dir.clone());
    let news = &config.news;

    // Validate before any network work so a bad limit fails fast
    let policy = news
        .reading
        .policy(news.language)
        .context("Invalid reading file settings")?;

    println!("\n📰 Fetching {} news feeds...", news.feeds.len());
    let client = FeedClient::new()?;
    let items = client.fetch_all(&news.feeds).await;
    println!("✓ Fetched {} items", items.len());

    println!("\n🔍 Filtering by keywords: {}", news.keywords.join(", "));
    let articles = NewsFilter::from_config(news).select(items);

    if articles.is_empty() {
        println!("No articles matched the keywords.");
        return Ok(());
    }
    println!("✓ Selected {} articles", articles.len());

    println!("\n📝 Writing report...");
    let header = ReportHeader::new(news.language).keywords(&news.keywords);
    let content = ReportGenerator::generate(&articles, &header, Local::now());
    let report_path = ReportGenerator::save(&content, &output_dir, &news.output_file)
        .context("Failed to save report")?;
    println!("✓ Report saved to: {}", report_path.display());

    println!("\n🔊 Creating reading files...");
    let files = create_reading_files(&articles, &policy, &output_dir)
        .context("Failed to create reading files")?;

    println!(
        "\n✅ Created {} reading files in {}",
        files.len(),
        output_dir.display()
    );
    for file in &files {
        println!("  • {}", file.display());
    }

    Ok(())
}
