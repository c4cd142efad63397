use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::policy::{IndexWidth, Language, SegmentationPolicy};
use crate::segment::Terminators;

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR: &str = "yomiage";

/// How summaries are written out as reading files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub split_files: bool,
    /// Signed so that a bad value is reported instead of wrapping
    pub max_chars_per_file: i64,
    pub include_metadata: bool,
    pub output_prefix: String,
    /// Overrides the language's default terminators, e.g. `"。！？"`
    pub terminators: Option<Terminators>,
    pub index_width: IndexWidth,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            split_files: true,
            max_chars_per_file: 300,
            include_metadata: false,
            output_prefix: "news_reading_".to_string(),
            terminators: None,
            index_width: IndexWidth::Dynamic,
        }
    }
}

impl ReadingConfig {
    /// Defaults for per-site reading files: shorter chunks with item labels
    pub fn website() -> Self {
        Self {
            max_chars_per_file: 100,
            include_metadata: true,
            output_prefix: "website_summary_".to_string(),
            ..Self::default()
        }
    }

    pub fn policy(&self, language: Language) -> crate::Result<SegmentationPolicy> {
        let mut policy =
            SegmentationPolicy::from_signed_limit(self.max_chars_per_file, &self.output_prefix)?
                .language(language)
                .split_files(self.split_files)
                .include_metadata(self.include_metadata)
                .index_width(self.index_width);
        if let Some(terminators) = &self.terminators {
            policy = policy.terminators(terminators.clone());
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// A `reading` section as written in the file. Only the keys present
/// override the section's own defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReadingOverrides {
    split_files: Option<bool>,
    max_chars_per_file: Option<i64>,
    include_metadata: Option<bool>,
    output_prefix: Option<String>,
    terminators: Option<Terminators>,
    index_width: Option<IndexWidth>,
}

impl ReadingOverrides {
    fn apply(self, base: ReadingConfig) -> ReadingConfig {
        ReadingConfig {
            split_files: self.split_files.unwrap_or(base.split_files),
            max_chars_per_file: self.max_chars_per_file.unwrap_or(base.max_chars_per_file),
            include_metadata: self.include_metadata.unwrap_or(base.include_metadata),
            output_prefix: self.output_prefix.unwrap_or(base.output_prefix),
            terminators: self.terminators.or(base.terminators),
            index_width: self.index_width.unwrap_or(base.index_width),
        }
    }
}

fn news_reading<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<ReadingConfig, D::Error> {
    ReadingOverrides::deserialize(deserializer).map(|o| o.apply(ReadingConfig::default()))
}

fn website_reading<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<ReadingConfig, D::Error> {
    ReadingOverrides::deserialize(deserializer).map(|o| o.apply(ReadingConfig::website()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub keywords: Vec<String>,
    pub max_articles: usize,
    /// Character budget for each naive article summary
    pub summary_length: usize,
    pub output_file: String,
    pub language: Language,
    pub feeds: Vec<String>,
    #[serde(deserialize_with = "news_reading")]
    pub reading: ReadingConfig,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "AI".to_string(),
                "人工知能".to_string(),
                "テクノロジー".to_string(),
            ],
            max_articles: 5,
            summary_length: 200,
            output_file: "news_summary.md".to_string(),
            language: Language::Ja,
            feeds: vec![
                "https://news.yahoo.co.jp/rss/topics/it.xml".to_string(),
                "https://feeds.feedburner.com/itmedia/news".to_string(),
                "https://rss.cnn.com/rss/edition.rss".to_string(),
                "https://feeds.bbci.co.uk/news/technology/rss.xml".to_string(),
            ],
            reading: ReadingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsitesConfig {
    pub urls: Vec<String>,
    pub output_dir: PathBuf,
    /// `short`, `medium`, `long`, or a character count
    pub summary_length: String,
    pub language: Language,
    #[serde(deserialize_with = "website_reading")]
    pub reading: ReadingConfig,
}

impl Default for WebsitesConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            output_dir: PathBuf::from("website_summaries"),
            summary_length: "medium".to_string(),
            language: Language::Ja,
            reading: ReadingConfig::website(),
        }
    }
}

/// Settings from `config.json`. Every field falls back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub news: NewsConfig,
    pub output: OutputConfig,
    pub websites: WebsitesConfig,
}

impl Config {
    /// Load from `path` if given, otherwise search the standard locations.
    /// No file at all means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        match Self::find_config_file() {
            Some(found) => Self::load_from(&found),
            None => {
                tracing::info!("No {} found, using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse config JSON from {}. Check the file for syntax errors.",
                path.display()
            )
        })?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        // 1. Current directory
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }

        // 2. ~/.config/yomiage/config.json
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }
}

/// API credentials, read from the environment after loading any `.env` file
#[derive(Debug, Clone)]
pub struct Secrets {
    pub anthropic_api_key: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::try_load_dotenv();

        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").context(
            "ANTHROPIC_API_KEY not found.\n\n\
            To fix this, create ~/.config/yomiage/.env with:\n  \
            ANTHROPIC_API_KEY=your_key_here\n\n\
            Get your Anthropic API key from: https://console.anthropic.com/settings/keys",
        )?;

        Ok(Self { anthropic_api_key })
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/yomiage/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.news.max_articles, 5);
        assert_eq!(config.news.reading.max_chars_per_file, 300);
        assert_eq!(config.news.reading.output_prefix, "news_reading_");
        assert_eq!(config.news.output_file, "news_summary.md");
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(config.websites.reading.max_chars_per_file, 100);
        assert!(config.websites.reading.include_metadata);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let json = r#"{
            "news": {
                "keywords": ["Rust"],
                "language": "en",
                "reading": { "split_files": false, "terminators": ".!?" }
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.news.keywords, vec!["Rust"]);
        assert_eq!(config.news.language, Language::En);
        assert_eq!(config.news.summary_length, 200);
        assert!(!config.news.reading.split_files);
        assert_eq!(config.news.reading.max_chars_per_file, 300);
        assert_eq!(config.news.feeds.len(), 4);
    }

    #[test]
    fn test_partial_website_reading_keeps_site_defaults() {
        let json = r#"{ "websites": { "reading": { "max_chars_per_file": 150 } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let reading = &config.websites.reading;

        assert_eq!(reading.max_chars_per_file, 150);
        assert_eq!(reading.output_prefix, "website_summary_");
        assert!(reading.include_metadata);
        assert!(reading.split_files);
        assert_eq!(config.news.reading.output_prefix, "news_reading_");
    }

    #[test]
    fn test_partial_news_reading_keeps_news_defaults() {
        let json = r#"{ "news": { "reading": { "include_metadata": true } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let reading = &config.news.reading;

        assert!(reading.include_metadata);
        assert_eq!(reading.max_chars_per_file, 300);
        assert_eq!(reading.output_prefix, "news_reading_");
    }

    #[test]
    fn test_reading_policy_conversion() {
        let reading = ReadingConfig {
            terminators: Some(Terminators::from("。")),
            index_width: IndexWidth::Fixed(2),
            ..ReadingConfig::default()
        };
        let policy = reading.policy(Language::Ja).unwrap();

        assert_eq!(policy.max_chars_per_file, 300);
        assert_eq!(policy.terminators, Terminators::from("。"));
        assert_eq!(policy.index_width, IndexWidth::Fixed(2));
    }

    #[test]
    fn test_negative_limit_is_invalid_policy() {
        let json = r#"{ "news": { "reading": { "max_chars_per_file": -1 } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        let result = config.news.reading.policy(config.news.language);
        assert!(matches!(result, Err(Error::InvalidPolicy(_))));
    }

    #[test]
    fn test_fixed_index_width_from_json() {
        let json = r#"{ "split_files": true, "index_width": { "fixed": 2 } }"#;
        let reading: ReadingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(reading.index_width, IndexWidth::Fixed(2));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "websites": { "urls": ["https://example.com"] } }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.websites.urls, vec!["https://example.com"]);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config JSON"));
    }
}
