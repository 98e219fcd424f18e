//! Page text extraction.
//!
//! Pulls the title, `h1`..`h6` headings, paragraphs and table captions out
//! of a page and folds them into one text blob with a fixed layout:
//!
//! ```text
//! Title: <title>
//!
//! Headings:
//! H1:
//! <one heading per line>
//!
//! H2:
//! ...
//!
//! Paragraphs:
//! <blank-line separated>
//!
//! Captions:
//! <blank-line separated>
//! ```
//!
//! The blob is then cut to the configured character limit.

use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ExtractConfig;
use crate::context::truncate_chars;
use crate::errors::ExtractionError;
use crate::render::{PageRenderer, RenderedPage};

/// Structured text of a single page. Folded into a string right away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    /// Index 0 holds `h1` texts, index 5 holds `h6` texts.
    pub headings: [Vec<String>; 6],
    pub paragraphs: Vec<String>,
    pub captions: Vec<String>,
}

impl ExtractedContent {
    /// Parse an HTML document. Lenient: malformed markup yields best-effort text.
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);

        let mut headings: [Vec<String>; 6] = Default::default();
        for (idx, level) in headings.iter_mut().enumerate() {
            *level = select_texts(&document, &format!("h{}", idx + 1));
        }

        Self {
            title: select_texts(&document, "title")
                .into_iter()
                .next()
                .unwrap_or_default(),
            headings,
            paragraphs: select_texts(&document, "p"),
            captions: select_texts(&document, "caption"),
        }
    }

    /// Fold into the stable text layout.
    pub fn flatten(&self) -> String {
        let headings = self
            .headings
            .iter()
            .enumerate()
            .map(|(idx, texts)| format!("H{}:\n{}", idx + 1, texts.join("\n")))
            .collect::<Vec<_>>()
            .join("\n\n");

        let text = format!(
            "Title: {}\n\nHeadings:\n{}\n\nParagraphs:\n{}\n\nCaptions:\n{}",
            self.title,
            headings,
            self.paragraphs.join("\n\n"),
            self.captions.join("\n\n"),
        );
        text.trim_end().to_string()
    }
}

/// Visible text of every element matching `selector`, in document order.
///
/// Whitespace runs collapse to a single space; elements with no text are
/// dropped.
fn select_texts(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flatten a rendered page and cut it to `max_chars`.
pub fn page_to_context(page: &RenderedPage, max_chars: usize) -> String {
    let flattened = ExtractedContent::from_html(&page.html).flatten();
    truncate_chars(&flattened, max_chars).to_string()
}

/// Drives a [`PageRenderer`] for one URL at a time.
pub struct ContentExtractor {
    renderer: Arc<dyn PageRenderer>,
    timeout: Duration,
    max_chars: usize,
}

impl ContentExtractor {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &ExtractConfig) -> Self {
        Self {
            renderer,
            timeout: Duration::from_secs(config.timeout_secs),
            max_chars: config.max_context_chars,
        }
    }

    /// Fetch `url` and return its flattened, truncated text.
    ///
    /// The render session is closed whether navigation succeeds, fails, or
    /// runs past the timeout.
    pub async fn extract(&self, url: &str) -> Result<String, ExtractionError> {
        tracing::debug!(url, backend = self.renderer.name(), "opening render session");
        let mut session = self.renderer.open().await?;

        let navigated = tokio::time::timeout(self.timeout, session.navigate(url, self.timeout)).await;
        session.close().await;

        let page = match navigated {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExtractionError::Timeout {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let context = page_to_context(&page, self.max_chars);
        tracing::info!(
            url,
            final_url = %page.url,
            html_bytes = page.html.len(),
            context_chars = context.chars().count(),
            "page extracted"
        );
        Ok(context)
    }
}
