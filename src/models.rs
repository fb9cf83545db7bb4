//! Data models flowing through the briefing pipeline.
//!
//! This module defines the values handed from one stage to the next:
//! - [`FeedEntry`]: A raw entry as parsed from an RSS `<item>` or Atom `<entry>`
//! - [`NewsItem`]: A filtered, deduplicated article candidate
//! - [`DigestDocument`]: The HTML fragment produced by the summarizer
//! - [`Attachment`]: A rendered document attached to the outgoing mail
//!
//! Nothing here outlives a single run.

use std::path::PathBuf;

/// A single entry from a search feed, before any filtering.
///
/// Every field is optional because feeds in the wild omit them freely.
/// The collector decides what to do with incomplete entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Headline text.
    pub title: Option<String>,
    /// Article URL.
    pub link: Option<String>,
    /// Publication timestamp exactly as the feed provided it.
    pub published: Option<String>,
}

/// One collected article candidate.
///
/// `link` is the deduplication key within a run. `published_at` is kept
/// verbatim; it is parsed only by the recency filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Display headline.
    pub title: String,
    /// Canonical article URL.
    pub link: String,
    /// The search keyword that surfaced this item.
    pub keyword: String,
    /// Source-provided publication timestamp, if any.
    pub published_at: Option<String>,
}

/// The summarizer's output: an HTML fragment meant to be embedded verbatim.
///
/// The pipeline never looks inside it beyond stripping the fenced-code
/// delimiters the model tends to wrap around its answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestDocument {
    /// The markup fragment.
    pub html: String,
}

impl DigestDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }
}

/// A rendered document to attach to the briefing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient.
    pub filename: String,
    /// Where the renderer wrote the file.
    pub path: PathBuf,
}

impl Attachment {
    /// Build an attachment from a path on disk, naming it after the file.
    pub fn from_path(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "briefing.pdf".to_string());
        Self { filename, path }
    }
}
