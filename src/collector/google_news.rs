//! Google News RSS search.
//!
//! Each keyword becomes one request to the Google News search feed. Negative
//! operators and a `when:1d` hint are appended to the query so the feed
//! already leans towards fresh, non-market stories before the local filters
//! run.
//!
//! # URL Pattern
//!
//! ```text
//! https://news.google.com/rss/search?q=<keyword -주식 ... when:1d>&hl=ko&gl=KR&ceid=KR:ko
//! ```
//!
//! Responses are RSS 2.0. Atom is accepted as a fallback so the parser can be
//! pointed at other search feeds.

use super::{CollectError, FeedSource};
use crate::models::FeedEntry;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Google News search feed endpoint.
pub const SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Search operator restricting results to the last day.
pub const RECENCY_HINT: &str = "when:1d";

/// Google News search client.
#[derive(Debug)]
pub struct GoogleNewsClient {
    client: Client,
    negative_terms: Vec<String>,
}

impl GoogleNewsClient {
    /// Create a client that appends `negative_terms` to every query.
    pub fn new(negative_terms: Vec<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(concat!("daily_briefing/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
            negative_terms,
        }
    }
}

impl FeedSource for GoogleNewsClient {
    #[instrument(level = "info", skip(self))]
    async fn search(&self, keyword: &str) -> Result<Vec<FeedEntry>, CollectError> {
        let query = build_query(keyword, &self.negative_terms);
        let url = search_url(&query)?;
        debug!(%url, "Fetching Google News RSS");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CollectError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;

        let entries = parse_feed(&body)?;
        info!(count = entries.len(), "Google News returned entries");
        Ok(entries)
    }
}

/// Compose the search query: keyword, negative operators, recency hint.
pub fn build_query(keyword: &str, negative_terms: &[String]) -> String {
    let mut query = keyword.trim().to_string();
    for term in negative_terms {
        query.push(' ');
        query.push_str(term);
    }
    query.push(' ');
    query.push_str(RECENCY_HINT);
    query
}

/// Build the Korean-locale search URL for a query.
pub fn search_url(query: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        SEARCH_URL,
        &[("q", query), ("hl", "ko"), ("gl", "KR"), ("ceid", "KR:ko")],
    )
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// The `alternate` link, or the first link when none is marked.
    fn primary_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

/// Parse an RSS 2.0 document, falling back to Atom.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, CollectError> {
    let rss_err = match quick_xml::de::from_str::<RssDocument>(xml) {
        Ok(doc) => {
            return Ok(doc
                .channel
                .items
                .into_iter()
                .map(|item| FeedEntry {
                    title: non_empty(item.title),
                    link: non_empty(item.link),
                    published: non_empty(item.pub_date),
                })
                .collect());
        }
        Err(e) => e,
    };

    match quick_xml::de::from_str::<AtomFeed>(xml) {
        Ok(feed) if !feed.entries.is_empty() => Ok(feed
            .entries
            .into_iter()
            .map(|entry| {
                let link = non_empty(entry.primary_link());
                FeedEntry {
                    title: non_empty(entry.title),
                    link,
                    published: non_empty(entry.published.or(entry.updated)),
                }
            })
            .collect()),
        _ => Err(CollectError::Parse(rss_err.to_string())),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
