//! HTTP-backed page source built on reqwest and scraper
//!
//! Fetches a page, tallies the Unicode word tokens in its text (lowercased,
//! so word keys are case-normalized), and collects the `a[href]` links with
//! relative references resolved against the page URL. Only `http` and
//! `https` links are kept, and fragments are stripped so `page#top` and
//! `page` count as the same URL.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::SourceError;
use crate::profiler::Capability;
use crate::source::{PageResult, PageSource};

fn word_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+").expect("static word pattern compiles"))
}

/// Page source that fetches over HTTP
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl Default for HttpPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageSource {
    /// Create a source with a default reqwest client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Create a source reusing an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Parse an already-fetched document body
    fn parse_document(base: &Url, html: &str) -> PageResult {
        let document = Html::parse_document(html);

        let mut word_counts = HashMap::new();
        for segment in document.root_element().text() {
            for token in word_token().find_iter(segment) {
                let word = token.as_str().to_lowercase();
                *word_counts.entry(word).or_insert(0) += 1;
            }
        }

        let mut links = Vec::new();
        if let Ok(anchors) = Selector::parse("a[href]") {
            for element in document.select(&anchors) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                let Ok(mut resolved) = base.join(href) else {
                    continue;
                };
                if resolved.scheme() != "http" && resolved.scheme() != "https" {
                    continue;
                }
                resolved.set_fragment(None);
                links.push(resolved.to_string());
            }
        }

        PageResult::new(word_counts, links)
    }
}

#[async_trait::async_trait]
impl PageSource for HttpPageSource {
    async fn parse(&self, url: &str) -> Result<PageResult, SourceError> {
        let base = Url::parse(url).map_err(|source| SourceError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let response = self
            .client
            .get(base.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(Self::parse_document(&base, &body))
    }
}

impl Capability for HttpPageSource {
    const INTERFACE: &'static str = "PageSource";
    const PROFILED_METHODS: &'static [&'static str] = &["parse"];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/index.html").unwrap()
    }

    #[test]
    fn counts_words_case_normalized() {
        let html = "<html><body><p>Rust and rust AND RuSt</p></body></html>";
        let page = HttpPageSource::parse_document(&base(), html);

        assert_eq!(page.word_counts.get("rust"), Some(&3));
        assert_eq!(page.word_counts.get("and"), Some(&2));
        assert_eq!(page.word_counts.get("Rust"), None);
    }

    #[test]
    fn counts_span_element_boundaries() {
        let html = "<p>one two</p><div>two three</div>";
        let page = HttpPageSource::parse_document(&base(), html);

        assert_eq!(page.word_counts.get("one"), Some(&1));
        assert_eq!(page.word_counts.get("two"), Some(&2));
        assert_eq!(page.word_counts.get("three"), Some(&1));
    }

    #[test]
    fn resolves_relative_links_against_page_url() {
        let html = r#"<a href="other.html">o</a><a href="/root.html">r</a>"#;
        let page = HttpPageSource::parse_document(&base(), html);

        assert_eq!(
            page.links,
            vec![
                "https://example.com/docs/other.html",
                "https://example.com/root.html",
            ]
        );
    }

    #[test]
    fn skips_non_http_links_and_strips_fragments() {
        let html = concat!(
            r#"<a href="mailto:a@b.c">m</a>"#,
            r#"<a href="javascript:void(0)">j</a>"#,
            r#"<a href="https://example.com/page#section">f</a>"#,
        );
        let page = HttpPageSource::parse_document(&base(), html);

        assert_eq!(page.links, vec!["https://example.com/page"]);
    }

    #[test]
    fn empty_document_yields_empty_result() {
        let page = HttpPageSource::parse_document(&base(), "");
        assert!(page.word_counts.is_empty());
        assert!(page.links.is_empty());
    }
}
