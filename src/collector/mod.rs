//! News collection: one feed search per keyword, then filtering.
//!
//! The collector walks the configured keywords in order and, for each one,
//! asks a [`FeedSource`] for matching entries. Only the first few entries of
//! every response are considered. Each candidate then passes three filters:
//!
//! 1. **Recency**: dropped if its timestamp parses and falls outside the window.
//!    Missing or unparseable timestamps are kept.
//! 2. **Noise**: dropped if the title contains an excluded substring.
//! 3. **Dedup**: dropped if its link was already accepted in this run.
//!
//! A failing keyword is logged and skipped; the rest of the run continues.
//!
//! # Sources
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | Google News | [`google_news`] | RSS search endpoint |

pub mod google_news;

use crate::config::Settings;
use crate::models::{FeedEntry, NewsItem};
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Errors from a single keyword search.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned status {0}")]
    Status(u16),

    #[error("failed to build search url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

/// Something that can answer a keyword search with feed entries.
pub trait FeedSource {
    /// Search the feed for `keyword`, returning entries in feed order.
    async fn search(&self, keyword: &str) -> Result<Vec<FeedEntry>, CollectError>;
}

/// Collect filtered, deduplicated news items for every configured keyword.
///
/// # Arguments
///
/// * `settings` - Keywords, exclusions, window and per-keyword limit
/// * `source` - The feed to query
/// * `now` - The instant the recency window is measured from
///
/// # Returns
///
/// Items in keyword order, then feed order. Possibly empty.
#[instrument(level = "info", skip_all, fields(keywords = settings.keywords.len()))]
pub async fn collect<S: FeedSource>(
    settings: &Settings,
    source: &S,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let window = settings.recency_window();
    let mut items: Vec<NewsItem> = Vec::new();
    info!("Starting news collection");

    for keyword in &settings.keywords {
        let entries = match source.search(keyword).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(%keyword, error = %e, "Feed search failed; skipping keyword");
                continue;
            }
        };

        let before = items.len();
        for entry in entries.into_iter().take(settings.per_keyword_limit) {
            if let Some(item) = admit(entry, keyword, settings, now, window, &items) {
                items.push(item);
            }
        }
        debug!(%keyword, added = items.len() - before, "Processed keyword");
    }

    info!(count = items.len(), "Collected news items");
    items
}

/// Apply the recency, noise and duplicate filters to one entry.
fn admit(
    entry: FeedEntry,
    keyword: &str,
    settings: &Settings,
    now: DateTime<Utc>,
    window: Duration,
    accepted: &[NewsItem],
) -> Option<NewsItem> {
    let (Some(title), Some(link)) = (entry.title, entry.link) else {
        debug!(%keyword, "Entry missing title or link; skipping");
        return None;
    };

    if !is_recent(entry.published.as_deref(), now, window) {
        debug!(%title, "Outside recency window");
        return None;
    }
    if is_noise(&title, &settings.exclude_keywords) {
        debug!(%title, "Excluded as market noise");
        return None;
    }
    if accepted.iter().any(|item| item.link == link) {
        debug!(%link, "Duplicate link");
        return None;
    }

    Some(NewsItem {
        title,
        link,
        keyword: keyword.to_string(),
        published_at: entry.published,
    })
}

/// Parse a feed timestamp: RFC 2822 (RSS `pubDate`), then RFC 3339 (Atom).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Whether an entry falls inside the recency window.
///
/// Fail-open: an absent or unparseable timestamp counts as recent.
pub fn is_recent(published: Option<&str>, now: DateTime<Utc>, window: Duration) -> bool {
    match published.and_then(parse_published) {
        Some(at) => match now.checked_sub_signed(window) {
            Some(cutoff) => at > cutoff,
            // a window reaching past the representable range covers everything
            None => true,
        },
        None => true,
    }
}

/// Whether a title contains any excluded substring (case-sensitive).
pub fn is_noise(title: &str, excluded: &[String]) -> bool {
    excluded.iter().any(|word| title.contains(word.as_str()))
}
