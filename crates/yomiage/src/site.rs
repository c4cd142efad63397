use anyhow::{Context, Result};
use url::Url;

/// Longest subdirectory name derived from a URL
const MAX_SUBDIR_CHARS: usize = 50;

/// Directory name for one site's output: host and path with separators
/// replaced by `_`, cut to 50 characters
pub fn url_subdir(url: &str) -> Result<String> {
    let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("URL has no host: {}", url))?;

    let raw = format!("{}{}", host, parsed.path());
    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SUBDIR_CHARS)
        .collect();

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_path() {
        assert_eq!(
            url_subdir("https://www.example.com/news/a.html").unwrap(),
            "www_example_com_news_a_html"
        );
    }

    #[test]
    fn test_root_path() {
        assert_eq!(url_subdir("https://example.com").unwrap(), "example_com_");
    }

    #[test]
    fn test_query_is_ignored() {
        assert_eq!(
            url_subdir("https://example.com/search?q=rust").unwrap(),
            "example_com_search"
        );
    }

    #[test]
    fn test_truncated_to_fifty_chars() {
        let url = format!("https://example.com/{}", "segment/".repeat(20));
        let name = url_subdir(&url).unwrap();
        assert_eq!(name.chars().count(), 50);
        assert!(name.starts_with("example_com_segment_"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(url_subdir("not a url").is_err());
    }
}
