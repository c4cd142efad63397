use anyhow::{Context, Result};
use html2text::render::text_renderer::TrivialDecorator;
use reqwest::Client;
use scraper::{Html, Selector};

/// Text pulled out of a fetched page
#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

/// Widest line html2text may produce; wide enough that paragraphs are never wrapped
const RENDER_WIDTH: usize = 10_000;

/// Render HTML (a full page or a fragment) as plain text without markup.
///
/// `<script>`, `<style>` and `<head>` are dropped, entities are decoded, and
/// block elements end up on their own lines.
pub fn html_to_text(html: &str) -> Result<String> {
    html2text::config::with_decorator(TrivialDecorator::new())
        .no_table_borders()
        .allow_width_overflow()
        .string_from_read(html.as_bytes(), RENDER_WIDTH)
        .context("Failed to convert HTML to text")
}

/// Remove model tokens like `<|endoftext|>` and NULs, then collapse runs of
/// whitespace to one space
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<|") {
        match rest[start + 2..].find("|>") {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push(' ');
                rest = &rest[start + 2 + end + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);

    out.split(|c: char| c.is_whitespace() || c == '\0')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; Yomiage/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch a page and extract its title and readable text.
    ///
    /// Retries twice with backoff; an empty page is an error.
    pub async fn fetch_page(&self, url: &str) -> Result<PageContent> {
        let mut last_error = None;

        for attempt in 0..3 {
            match self.try_fetch_page(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::debug!("Attempt {} for {} failed: {}", attempt + 1, url, e);
                    last_error = Some(e);
                    if attempt < 2 {
                        let backoff = std::time::Duration::from_millis(500 * (2_u64.pow(attempt)));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed to fetch {}", url)))
    }

    async fn try_fetch_page(&self, url: &str) -> Result<PageContent> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send HTTP request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP error: {}", status);
        }

        let html = response.text().await.context("Failed to read response body")?;
        let page = extract_page(url, &html)?;

        if page.text.is_empty() {
            anyhow::bail!("No readable text found at {}", url);
        }

        Ok(page)
    }
}

/// Turn raw HTML into a `PageContent`
pub fn extract_page(url: &str, html: &str) -> Result<PageContent> {
    let document = Html::parse_document(html);
    let title = Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
        })
        .filter(|title| !title.is_empty());

    let text = html_to_text(html)?;

    Ok(PageContent {
        url: url.to_string(),
        title,
        text: clean_text(&text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_removes_special_tokens() {
        let raw = "Hello<|endoftext|> world <|startoftext|>again\0";
        assert_eq!(clean_text(raw), "Hello world again");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\n\tb   c  "), "a b c");
    }

    #[test]
    fn test_clean_text_keeps_angle_brackets() {
        assert_eq!(clean_text("a < b and c > d"), "a < b and c > d");
        assert_eq!(clean_text("unclosed <|token"), "unclosed <|token");
    }

    #[test]
    fn test_html_to_text_drops_script_and_style() {
        let html = "<style>p{color:red;}</style><script>var a = 1 > 0;</script><p>本文です。</p>";
        assert_eq!(html_to_text(html).unwrap().trim(), "本文です。");
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        let text = html_to_text("<p>A&#12354;B &amp; <b>C</b>&nbsp;D</p>").unwrap();
        assert_eq!(clean_text(&text), "AあB & C D");
    }

    #[test]
    fn test_html_to_text_has_no_markup() {
        let text = html_to_text("<h2>Head</h2><p><em>a</em> <a href=\"/x\">link</a></p>").unwrap();
        assert!(!text.contains('*'));
        assert!(!text.contains('['));
        assert!(!text.contains('#'));
        assert_eq!(clean_text(&text), "Head a link");
    }

    #[test]
    fn test_extract_page_title_and_text() {
        let html = "<html><head><title> Example Page </title></head>\
                    <body><h1>Heading</h1><p>Body paragraph text.</p></body></html>";
        let page = extract_page("https://example.com", html).unwrap();

        assert_eq!(page.title.as_deref(), Some("Example Page"));
        assert!(page.text.contains("Heading"));
        assert!(page.text.contains("Body paragraph text."));
    }

    #[test]
    fn test_extract_page_without_title() {
        let page = extract_page("https://example.com", "<p>Only text</p>").unwrap();
        assert_eq!(page.title, None);
        assert!(page.text.contains("Only text"));
    }
}
