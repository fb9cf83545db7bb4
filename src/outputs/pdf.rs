//! PDF attachment rendering.
//!
//! The PDF repeats the digest as plain text and lists every collected article
//! with a clickable title. It is a convenience copy: any failure here is
//! reported to the caller, which sends the mail without an attachment.
//!
//! # Feature Flag
//!
//! Drawing is done with `printpdf` and only compiled with `--features pdf`.
//! Without it [`render`] always returns [`RenderError::Unavailable`]. The
//! layout itself ([`layout`]) is plain data and always available.
//!
//! # Font
//!
//! Hangul needs an embedded TrueType font. The first run downloads NanumGothic
//! to the configured path; later runs reuse the file as-is.

use crate::config::RenderConfig;
use crate::models::{Attachment, DigestDocument, NewsItem};
use crate::utils::{ensure_writable_dir, iso_date};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Where the font is fetched from when it is not on disk yet.
pub const FONT_URL: &str =
    "https://github.com/google/fonts/raw/main/ofl/nanumgothic/NanumGothic-Regular.ttf";

pub const DOCUMENT_TITLE: &str = "Daily Market & Risk Briefing";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

#[derive(Debug, Error)]
pub enum RenderError {
    /// Built without the `pdf` feature.
    #[error("PDF rendering is not available in this build")]
    Unavailable,

    #[error("font download failed: {0}")]
    FontDownload(#[from] reqwest::Error),

    #[error("font download returned status {0}")]
    FontStatus(u16),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf generation failed: {0}")]
    Pdf(String),
}

/// One visual element of the document, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Timestamp(String),
    Paragraph(String),
    /// De-emphasized keyword label above an article.
    Label(String),
    /// Article title linking to its URL.
    Link { text: String, url: String },
}

/// File name for the attachment of a run dated `date` (`YYYY-MM-DD`).
pub fn pdf_filename(date: &str) -> String {
    format!("daily_briefing_{date}.pdf")
}

/// Remove markup tags and blank lines from the digest.
///
/// This is a permissive pattern match, not an HTML parser.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Greedy word wrap on character count; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

/// Lay out the document: title, timestamp, summary, then one section per item.
pub fn layout(
    items: &[NewsItem],
    digest: &DigestDocument,
    generated_at: &NaiveDateTime,
) -> Vec<Block> {
    let mut blocks = vec![
        Block::Title(DOCUMENT_TITLE.to_string()),
        Block::Timestamp(format!(
            "생성 시각: {} (KST)",
            generated_at.format("%Y-%m-%d %H:%M")
        )),
    ];

    blocks.extend(
        strip_tags(digest.as_str())
            .lines()
            .map(|l| Block::Paragraph(l.to_string())),
    );

    for item in items {
        blocks.push(Block::Label(format!("[{}]", item.keyword)));
        blocks.push(Block::Link {
            text: item.title.clone(),
            url: item.link.clone(),
        });
    }
    blocks
}

/// Download the font to `path` unless it is already there.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_font(path: &Path, url: &str) -> Result<(), RenderError> {
    if fs::try_exists(path).await.unwrap_or(false) {
        return Ok(());
    }

    info!(%url, "Downloading font");
    let response = reqwest::get(url).await?;
    if !response.status().is_success() {
        return Err(RenderError::FontStatus(response.status().as_u16()));
    }
    let bytes = response.bytes().await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, &bytes).await?;
    info!(bytes = bytes.len(), "Font saved");
    Ok(())
}

/// Render the PDF attachment for this run.
///
/// # Returns
///
/// The written [`Attachment`], or a [`RenderError`] the caller should log and
/// otherwise ignore.
#[instrument(level = "info", skip_all, fields(items = items.len()))]
pub async fn render(
    items: &[NewsItem],
    digest: &DigestDocument,
    config: &RenderConfig,
    now: &NaiveDateTime,
) -> Result<Attachment, RenderError> {
    if !cfg!(feature = "pdf") {
        return Err(RenderError::Unavailable);
    }

    ensure_writable_dir(&config.output_dir).await?;
    ensure_font(&config.font_path, FONT_URL).await?;

    let blocks = layout(items, digest, now);
    let path: PathBuf = config.output_dir.join(pdf_filename(&iso_date(now)));
    backend::write_pdf(&blocks, &config.font_path, &path)?;

    info!(path = %path.display(), blocks = blocks.len(), "Rendered PDF");
    Ok(Attachment::from_path(path))
}

#[cfg(feature = "pdf")]
mod backend {
    use super::{Block, RenderError, wrap_text};
    use printpdf::{
        Actions, Color, IndirectFontRef, LinkAnnotation, Mm, PdfDocument, PdfDocumentReference,
        PdfLayerReference, Rect, Rgb,
    };
    use std::fs::File;
    use std::io::BufWriter;
    use std::path::Path;
    use tracing::debug;

    const PAGE_W: f32 = 210.0;
    const PAGE_H: f32 = 297.0;
    const MARGIN: f32 = 20.0;
    const PT_TO_MM: f32 = 0.3528;

    fn pdf_err(e: printpdf::Error) -> RenderError {
        RenderError::Pdf(e.to_string())
    }

    struct PageWriter {
        doc: PdfDocumentReference,
        layer: PdfLayerReference,
        font: IndirectFontRef,
        y: f32,
        pages: usize,
    }

    impl PageWriter {
        fn line_height(size: f32) -> f32 {
            size * PT_TO_MM * 1.5
        }

        fn ensure_space(&mut self, needed: f32) {
            if self.y - needed < MARGIN {
                let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
                self.layer = self.doc.get_page(page).get_layer(layer);
                self.y = PAGE_H - MARGIN;
                self.pages += 1;
            }
        }

        fn gap(&mut self, mm: f32) {
            self.y -= mm;
        }

        /// Write wrapped text; returns the rectangle it covered.
        fn text(&mut self, text: &str, size: f32, max_chars: usize, grey: f32) -> Rect {
            let height = Self::line_height(size);
            let top = self.y;
            self.layer
                .set_fill_color(Color::Rgb(Rgb::new(grey, grey, grey, None)));
            for line in wrap_text(text, max_chars) {
                self.ensure_space(height);
                self.y -= height;
                self.layer
                    .use_text(line, size, Mm(MARGIN), Mm(self.y), &self.font);
            }
            let bottom = self.y.min(top);
            Rect::new(Mm(MARGIN), Mm(bottom), Mm(PAGE_W - MARGIN), Mm(top))
        }
    }

    fn new_document() -> (PdfDocumentReference, PdfLayerReference) {
        let (doc, page, layer) =
            PdfDocument::new(super::DOCUMENT_TITLE, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        (doc, layer)
    }

    /// Draw every block, adding pages as needed. Returns the document and its page count.
    fn draw(
        doc: PdfDocumentReference,
        layer: PdfLayerReference,
        font: IndirectFontRef,
        blocks: &[Block],
    ) -> (PdfDocumentReference, usize) {
        let mut writer = PageWriter {
            doc,
            layer,
            font,
            y: PAGE_H - MARGIN,
            pages: 1,
        };

        for block in blocks {
            match block {
                Block::Title(text) => {
                    writer.text(text, 20.0, 30, 0.0);
                    writer.gap(2.0);
                }
                Block::Timestamp(text) => {
                    writer.text(text, 9.0, 80, 0.45);
                    writer.gap(6.0);
                }
                Block::Paragraph(text) => {
                    writer.text(text, 10.0, 48, 0.15);
                    writer.gap(1.5);
                }
                Block::Label(text) => {
                    writer.gap(3.0);
                    writer.text(text, 8.0, 60, 0.55);
                }
                Block::Link { text, url } => {
                    let rect = writer.text(text, 11.0, 44, 0.0);
                    writer.layer.add_link_annotation(LinkAnnotation::new(
                        rect,
                        None,
                        None,
                        Actions::uri(url.clone()),
                        None,
                    ));
                }
            }
        }

        (writer.doc, writer.pages)
    }

    fn save(doc: PdfDocumentReference, out: &Path) -> Result<(), RenderError> {
        let mut file = BufWriter::new(File::create(out)?);
        doc.save(&mut file).map_err(pdf_err)
    }

    /// Write `blocks` to `out`, embedding the TrueType font at `font_path`.
    pub fn write_pdf(blocks: &[Block], font_path: &Path, out: &Path) -> Result<(), RenderError> {
        let (doc, layer) = new_document();
        let font = doc
            .add_external_font(File::open(font_path)?)
            .map_err(pdf_err)?;
        let (doc, pages) = draw(doc, layer, font, blocks);
        debug!(pages, path = %out.display(), "Saving PDF");
        save(doc, out)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use printpdf::BuiltinFont;

        fn link_blocks(count: usize) -> Vec<Block> {
            let mut blocks = vec![
                Block::Title(super::super::DOCUMENT_TITLE.to_string()),
                Block::Timestamp("2025-05-06 07:30 (KST)".to_string()),
                Block::Paragraph("Steel prices rose again this week".to_string()),
            ];
            for i in 0..count {
                blocks.push(Block::Label(format!("[keyword {i}]")));
                blocks.push(Block::Link {
                    text: format!("Headline number {i} about construction materials"),
                    url: format!("https://news.example.com/article-{i:03}"),
                });
            }
            blocks
        }

        fn count(haystack: &[u8], needle: &[u8]) -> usize {
            haystack.windows(needle.len()).filter(|w| *w == needle).count()
        }

        #[test]
        fn test_draw_writes_one_link_per_item_across_pages() {
            let items = 60;
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("briefing.pdf");

            let (doc, layer) = new_document();
            let font = doc.add_builtin_font(BuiltinFont::Helvetica).unwrap();
            let (doc, pages) = draw(doc, layer, font, &link_blocks(items));
            assert!(pages > 1, "sixty sections should not fit on one page");
            save(doc, &out).unwrap();

            let bytes = std::fs::read(&out).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
            for i in 0..items {
                let url = format!("https://news.example.com/article-{i:03}");
                assert_eq!(count(&bytes, url.as_bytes()), 1, "link for item {i}");
            }
        }

        #[test]
        fn test_write_pdf_requires_font_file() {
            let dir = tempfile::tempdir().unwrap();
            let err = write_pdf(
                &link_blocks(1),
                &dir.path().join("missing.ttf"),
                &dir.path().join("out.pdf"),
            )
            .unwrap_err();
            assert!(matches!(err, RenderError::Io(_)));
            assert!(!dir.path().join("out.pdf").exists());
        }
    }
}

#[cfg(not(feature = "pdf"))]
mod backend {
    use super::{Block, RenderError};
    use std::path::Path;

    pub fn write_pdf(_blocks: &[Block], _font_path: &Path, _out: &Path) -> Result<(), RenderError> {
        Err(RenderError::Unavailable)
    }
}

/// Render, logging and swallowing any failure.
pub async fn render_optional(
    items: &[NewsItem],
    digest: &DigestDocument,
    config: &RenderConfig,
    now: &NaiveDateTime,
) -> Option<Attachment> {
    match render(items, digest, config, now).await {
        Ok(attachment) => Some(attachment),
        Err(RenderError::Unavailable) => {
            info!("PDF feature not enabled; sending without attachment");
            None
        }
        Err(e) => {
            warn!(error = %e, "PDF rendering failed; sending without attachment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 6)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    }

    fn item(title: &str, link: &str, keyword: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: link.to_string(),
            keyword: keyword.to_string(),
            published_at: None,
        }
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("2025-05-06"), "daily_briefing_2025-05-06.pdf");
    }

    #[test]
    fn test_strip_tags() {
        let html = "<div style=\"x\">\n  <h3>Today's Market Weather</h3>\n\n<p>☀️ 안정적</p></div>";
        assert_eq!(strip_tags(html), "Today's Market Weather\n☀️ 안정적");
    }

    #[test]
    fn test_strip_tags_inline_and_void_tags() {
        assert_eq!(
            strip_tags("<p>a<br/>b</p><span class='x'>c</span><a href=\"https://n.com\">d</a>"),
            "abcd"
        );
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("가나다라마바", 4), vec!["가나다라", "마바"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_layout_order() {
        let items = vec![
            item("철근 가격 인상", "https://n.com/1", "건설 원자재 가격"),
            item("노조 파업", "https://n.com/2", "건설 노조 파업 노란봉투법"),
        ];
        let digest = DigestDocument::new("<div><h3>요약</h3><p>내용</p></div>");
        let blocks = layout(&items, &digest, &generated_at());

        assert_eq!(blocks[0], Block::Title(DOCUMENT_TITLE.to_string()));
        assert_eq!(
            blocks[1],
            Block::Timestamp("생성 시각: 2025-05-06 07:30 (KST)".to_string())
        );
        assert_eq!(blocks[2], Block::Paragraph("요약내용".to_string()));
        assert_eq!(blocks[3], Block::Label("[건설 원자재 가격]".to_string()));
        assert_eq!(
            blocks[4],
            Block::Link {
                text: "철근 가격 인상".to_string(),
                url: "https://n.com/1".to_string()
            }
        );
        assert_eq!(blocks.len(), 7);
    }

    #[tokio::test]
    async fn test_ensure_font_skips_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"cached").unwrap();

        // an unroutable URL proves no download is attempted
        ensure_font(&font, "http://127.0.0.1:9/font.ttf").await.unwrap();
        assert_eq!(std::fs::read(&font).unwrap(), b"cached");
    }

    #[cfg(not(feature = "pdf"))]
    #[tokio::test]
    async fn test_render_unavailable_without_feature() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            output_dir: dir.path().to_path_buf(),
            font_path: dir.path().join("font.ttf"),
        };
        let err = render(&[], &DigestDocument::new(""), &config, &generated_at())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Unavailable));
        assert!(render_optional(&[], &DigestDocument::new(""), &config, &generated_at())
            .await
            .is_none());
    }
}
