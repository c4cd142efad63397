use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reqwest::Client;

/// One entry from an RSS 2.0 or Atom feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    /// `content:encoded` (RSS) or `content` (Atom); may hold HTML
    pub content: String,
    pub link: String,
    pub pub_date: String,
    /// Title of the feed the item came from
    pub source: String,
}

impl FeedItem {
    /// Full content if present, otherwise the description
    pub fn body(&self) -> &str {
        if self.content.trim().is_empty() {
            &self.description
        } else {
            &self.content
        }
    }
}

/// Parse RSS 2.0 `<item>`s or Atom `<entry>`s out of a feed document
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_str(xml);

    let mut feed_title = String::new();
    let mut items = Vec::new();
    let mut current: Option<FeedItem> = None;
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event().context("Malformed feed XML")? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "item" || name == "entry" {
                    current = Some(FeedItem::default());
                }
                if name == "link" {
                    take_link_href(&e, current.as_mut())?;
                }
                // Markup nested inside a field (Atom xhtml content) keeps accumulating
                if is_field(&name) {
                    text.clear();
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if local_name(&e) == "link" {
                    take_link_href(&e, current.as_mut())?;
                }
            }
            Event::Text(t) => text.push_str(&t.decode()?),
            Event::CData(c) => text.push_str(&c.decode()?),
            Event::GeneralRef(r) => {
                if let Some(ch) = r.resolve_char_ref()? {
                    text.push(ch);
                } else {
                    let entity = r.decode()?;
                    match resolve_predefined_entity(&entity) {
                        Some(resolved) => text.push_str(resolved),
                        None => {
                            text.push('&');
                            text.push_str(&entity);
                            text.push(';');
                        }
                    }
                }
            }
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();

                if name == "item" || name == "entry" {
                    if let Some(done) = current.take() {
                        items.push(done);
                    }
                    text.clear();
                    continue;
                }
                if !is_field(&name) {
                    continue;
                }

                let value = text.trim().to_string();
                text.clear();

                match current.as_mut() {
                    Some(item) => match name.as_str() {
                        "title" => item.title = value,
                        "description" | "summary" => item.description = value,
                        "encoded" | "content" => item.content = value,
                        "link" if item.link.is_empty() => item.link = value,
                        "pubDate" | "published" | "updated" | "date" if item.pub_date.is_empty() => {
                            item.pub_date = value
                        }
                        _ => {}
                    },
                    None => {
                        let parent = path.last().map(String::as_str);
                        if name == "title"
                            && feed_title.is_empty()
                            && matches!(parent, Some("channel") | Some("feed"))
                        {
                            feed_title = value;
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let source = if feed_title.is_empty() {
        "Unknown".to_string()
    } else {
        feed_title
    };
    for item in &mut items {
        item.source = source.clone();
    }

    Ok(items)
}

/// Elements whose text is collected into a `FeedItem` or the feed title
fn is_field(name: &str) -> bool {
    matches!(
        name,
        "title"
            | "description"
            | "summary"
            | "encoded"
            | "content"
            | "link"
            | "pubDate"
            | "published"
            | "updated"
            | "date"
    )
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Atom links carry the URL in `href`; keep the first non-`self` one
fn take_link_href(e: &BytesStart, item: Option<&mut FeedItem>) -> Result<()> {
    let Some(item) = item else {
        return Ok(());
    };
    if !item.link.is_empty() {
        return Ok(());
    }

    let rel = e
        .try_get_attribute("rel")?
        .map(|a| String::from_utf8_lossy(&a.value).into_owned());
    if matches!(rel.as_deref(), Some(r) if r != "alternate") {
        return Ok(());
    }

    if let Some(href) = e.try_get_attribute("href")? {
        let raw = String::from_utf8_lossy(&href.value).into_owned();
        item.link = unescape(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
    }
    Ok(())
}

pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (compatible; Yomiage/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Fetch and parse one feed, retrying transient failures
    pub async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        let mut last_error = None;

        for attempt in 0..3 {
            match self.try_fetch(url).await {
                Ok(items) => return Ok(items),
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

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Failed to fetch feed: {}", url)))
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
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

        let body = response.text().await.context("Failed to read response body")?;
        parse_feed(&body)
    }

    /// Fetch every feed, keeping feed order. A feed that fails contributes no items.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FeedItem> {
        let results: Vec<(String, Result<Vec<FeedItem>>)> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let result = self.fetch(&url).await;
                (url, result)
            })
            .buffered(4)
            .collect()
            .await;

        let mut all = Vec::new();
        for (url, result) in results {
            match result {
                Ok(items) => {
                    tracing::info!("Fetched {} items from {}", items.len(), url);
                    all.extend(items);
                }
                Err(e) => tracing::warn!("Failed to fetch feed {}: {:#}", url, e),
            }
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Tech &amp; Science</title>
    <image><title>Logo title</title></image>
    <item>
      <title>AI beats humans at Go</title>
      <link>https://example.com/go</link>
      <description>Short &lt;b&gt;teaser&lt;/b&gt;</description>
      <content:encoded><![CDATA[<p>Full article body.</p>]]></content:encoded>
      <pubDate>Mon, 02 Feb 2026 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>人工知能の新時代</title>
      <link>https://example.jp/ai</link>
      <description>説明文です。</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Blog</title>
  <link href="https://blog.example.com/" rel="alternate"/>
  <entry>
    <title>Hello Atom</title>
    <link rel="self" href="https://blog.example.com/self"/>
    <link href="https://blog.example.com/hello?a=1&amp;b=2"/>
    <updated>2026-02-01T00:00:00Z</updated>
    <summary>Atom summary</summary>
    <content type="html">&lt;p&gt;Atom body&lt;/p&gt;</content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "AI beats humans at Go");
        assert_eq!(items[0].link, "https://example.com/go");
        assert_eq!(items[0].description, "Short <b>teaser</b>");
        assert_eq!(items[0].content, "<p>Full article body.</p>");
        assert_eq!(items[0].pub_date, "Mon, 02 Feb 2026 10:00:00 GMT");
        assert_eq!(items[0].source, "Tech & Science");
        assert_eq!(items[1].title, "人工知能の新時代");
        assert_eq!(items[1].body(), "説明文です。");
    }

    #[test]
    fn test_parse_atom_entries() {
        let items = parse_feed(ATOM).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Hello Atom");
        assert_eq!(items[0].link, "https://blog.example.com/hello?a=1&b=2");
        assert_eq!(items[0].pub_date, "2026-02-01T00:00:00Z");
        assert_eq!(items[0].description, "Atom summary");
        assert_eq!(items[0].content, "<p>Atom body</p>");
        assert_eq!(items[0].source, "Atom Blog");
    }

    #[test]
    fn test_atom_xhtml_content_keeps_all_text() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Blog</title>
  <entry>
    <title>Nested</title>
    <content type="xhtml">
      <div xmlns="http://www.w3.org/1999/xhtml"><p>First part.</p><p>Second part.</p></div>
    </content>
  </entry>
</feed>"#;
        let items = parse_feed(xml).unwrap();

        assert_eq!(items[0].title, "Nested");
        assert!(items[0].content.contains("First part."));
        assert!(items[0].content.contains("Second part."));
    }

    #[test]
    fn test_feed_without_title_is_unknown() {
        let xml = "<rss><channel><item><title>x</title></item></channel></rss>";
        let items = parse_feed(xml).unwrap();
        assert_eq!(items[0].source, "Unknown");
    }

    #[test]
    fn test_malformed_feed_is_error() {
        assert!(parse_feed("<rss><channel><item></channel>").is_err());
    }
}
