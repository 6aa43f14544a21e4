//! Link exploration
//!
//! Components extracted from a design document often carry links to product
//! pages or standards documents. The explorer fetches each link, strips the
//! HTML down to readable text, and records a short snippet (or the fetch
//! error) on the component for use as mapping context.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use crate::ingest::{ComponentMap, LinkInfo};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("quantgpt/", env!("CARGO_PKG_VERSION"));

/// Maximum characters kept from a fetched page.
pub const SNIPPET_CHARS: usize = 2000;

pub struct LinkExplorer {
    http_client: reqwest::Client,
}

impl LinkExplorer {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http_client })
    }

    /// Fetch every link attached to the components, filling in `link_info`.
    ///
    /// Each URL is fetched once even if several components reference it.
    /// Failures are recorded per link and never abort the pass.
    pub async fn explore(&self, components: &mut ComponentMap) {
        let urls: BTreeSet<String> = components
            .values()
            .flat_map(|component| component.links.iter().cloned())
            .collect();
        if urls.is_empty() {
            return;
        }
        debug!("exploring {} linked pages", urls.len());

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            let info = self.fetch_link(&url).await;
            results.push((url, info));
        }

        for component in components.values_mut() {
            component.link_info = component
                .links
                .iter()
                .map(|link| {
                    results
                        .iter()
                        .find(|(url, _)| url == link)
                        .map(|(_, info)| info.clone())
                        .unwrap_or_else(|| LinkInfo {
                            url: link.clone(),
                            text: None,
                            error: Some("link was not fetched".to_string()),
                        })
                })
                .collect();
        }
    }

    async fn fetch_link(&self, url: &str) -> LinkInfo {
        match self.fetch_text(url).await {
            Ok(text) => LinkInfo {
                url: url.to_string(),
                text: Some(text),
                error: None,
            },
            Err(err) => {
                warn!("failed to fetch {url}: {err:#}");
                LinkInfo {
                    url: url.to_string(),
                    text: None,
                    error: Some(format!("{err:#}")),
                }
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("unsupported URL scheme: {}", parsed.scheme());
        }

        let response = self.http_client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status}");
        }
        let body = response.text().await?;
        Ok(clip_snippet(html_to_text(&body)))
    }
}

/// Cap a snippet at `SNIPPET_CHARS` characters, not bytes.
fn clip_snippet(mut text: String) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((offset, _)) => {
            text.truncate(offset);
            text
        }
        None => text,
    }
}

/// Flatten an HTML document into whitespace-normalized text.
fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text: Vec<&str> = document.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Component;

    #[test]
    fn test_html_to_text_normalizes_whitespace() {
        let html = "<html><body><h1>Title</h1>\n<p>Some   text\nhere.</p></body></html>";
        assert_eq!(html_to_text(html), "Title Some text here.");
    }

    #[test]
    fn test_snippet_cap_counts_characters_not_bytes() {
        let long = "é".repeat(SNIPPET_CHARS + 100);
        let clipped = clip_snippet(long);
        assert_eq!(clipped.chars().count(), SNIPPET_CHARS);

        let short = "plain ascii".to_string();
        assert_eq!(clip_snippet(short.clone()), short);
    }

    #[test]
    fn test_html_to_text_skips_markup() {
        let html = "<p>Uses <b>RSA-2048</b> keys</p>";
        assert_eq!(html_to_text(html), "Uses RSA-2048 keys");
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_recorded_as_error() {
        let explorer = LinkExplorer::new().unwrap();
        let mut components = ComponentMap::new();
        components.insert(
            "VPN Gateway".to_string(),
            Component {
                links: vec!["ftp://example.com/spec".to_string()],
                ..Component::default()
            },
        );

        explorer.explore(&mut components).await;

        let info = &components["VPN Gateway"].link_info[0];
        assert!(info.text.is_none());
        assert!(info.error.as_deref().unwrap().contains("scheme"));
    }

    #[tokio::test]
    async fn test_explore_without_links_is_a_noop() {
        let explorer = LinkExplorer::new().unwrap();
        let mut components = ComponentMap::new();
        components.insert("Database".to_string(), Component::default());

        explorer.explore(&mut components).await;
        assert!(components["Database"].link_info.is_empty());
    }
}
