//! State Extractor: converts a live page into a compact, indexable,
//! LLM-readable element listing plus page statistics.
//!
//! The extraction algorithm itself runs inside the page (it is shipped as a
//! self-contained JavaScript snippet, see [`script::EXTRACTION_SCRIPT`]); this
//! module owns the Rust-side contract around invoking it, decoding its
//! result, and applying the truncation/screenshot rules that are not
//! properly DOM concerns.

mod script;
mod types;

pub use script::EXTRACTION_SCRIPT;
pub use types::{BrowserStateSummary, PageStats, ScrollInfo, StateExtractorError};

use crate::browser_host::{BrowserHostError, PageProvider};
use serde::Deserialize;

/// The raw shape returned by [`script::EXTRACTION_SCRIPT`], before the
/// screenshot (a host-side capability, not a DOM one) is attached.
#[derive(Debug, Deserialize)]
struct RawExtraction {
    url: String,
    title: String,
    stats: PageStats,
    scroll: ScrollInfo,
    elements_text: String,
    element_count: usize,
}

/// Runs the extraction algorithm against the host's active page and
/// assembles a [`BrowserStateSummary`], per the contract in 4.1:
/// `extract(maxElementsLength, useVision) -> BrowserStateSummary`.
pub async fn extract(
    provider: &dyn PageProvider,
    max_elements_length: usize,
    use_vision: bool,
) -> Result<BrowserStateSummary, StateExtractorError> {
    let page = provider
        .active_page()
        .await
        .ok_or(StateExtractorError::NoActiveTab)?;

    let raw_value = page
        .evaluate(script::EXTRACTION_SCRIPT)
        .await
        .map_err(StateExtractorError::from)?;

    if raw_value.is_null() {
        return Err(StateExtractorError::ExtractionEmpty);
    }

    let raw: RawExtraction =
        serde_json::from_value(raw_value).map_err(|_| StateExtractorError::ExtractionEmpty)?;

    let elements_text = truncate_elements(&raw.elements_text, max_elements_length);

    let screenshot = if use_vision {
        match page.screenshot_png_base64().await {
            Ok(shot) => shot,
            // Capture is best-effort; a failure here never fails extraction.
            Err(BrowserHostError::ScreenshotError(ref msg)) => {
                tracing::warn!(error = %msg, "screenshot capture failed, continuing without vision");
                None
            }
            Err(other) => return Err(StateExtractorError::from(other)),
        }
    } else {
        None
    };

    Ok(BrowserStateSummary {
        url: raw.url,
        title: raw.title,
        stats: raw.stats,
        scroll: raw.scroll,
        elements_text,
        element_count: raw.element_count,
        screenshot,
    })
}

fn truncate_elements(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{truncated}\n... [truncated]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser_host::{MockPageHandle, SinglePageProvider};
    use serde_json::json;
    use std::sync::Arc;

    fn raw_json() -> serde_json::Value {
        json!({
            "url": "https://example.com",
            "title": "Example",
            "stats": {"links": 3, "interactive": 5, "iframes": 0, "images": 2, "total_elements": 40},
            "scroll": {"pages_above": 0.0, "pages_below": 1.2, "pixels_above": 0, "pixels_below": 900},
            "elements_text": "[1]<a href='/x'>Home</a>",
            "element_count": 1,
        })
    }

    #[tokio::test]
    async fn extracts_and_attaches_screenshot_when_vision_enabled() {
        let page = Arc::new(MockPageHandle {
            extraction_result: raw_json(),
            screenshot: Some("data:image/png;base64,AAA".into()),
            url: "https://example.com".into(),
        });
        let provider = SinglePageProvider::new(page);
        let summary = extract(&provider, 40_000, true).await.unwrap();
        assert_eq!(summary.url, "https://example.com");
        assert_eq!(summary.element_count, 1);
        assert!(summary.screenshot.is_some());
    }

    #[tokio::test]
    async fn skips_screenshot_when_vision_disabled() {
        let page = Arc::new(MockPageHandle {
            extraction_result: raw_json(),
            screenshot: Some("data:image/png;base64,AAA".into()),
            url: "https://example.com".into(),
        });
        let provider = SinglePageProvider::new(page);
        let summary = extract(&provider, 40_000, false).await.unwrap();
        assert!(summary.screenshot.is_none());
    }

    #[tokio::test]
    async fn no_active_tab_is_an_error() {
        let provider = SinglePageProvider::empty();
        let err = extract(&provider, 40_000, true).await.unwrap_err();
        assert!(matches!(err, StateExtractorError::NoActiveTab));
    }

    #[tokio::test]
    async fn null_extraction_result_is_empty_error() {
        let page = Arc::new(MockPageHandle {
            extraction_result: serde_json::Value::Null,
            screenshot: None,
            url: "https://example.com".into(),
        });
        let provider = SinglePageProvider::new(page);
        let err = extract(&provider, 40_000, true).await.unwrap_err();
        assert!(matches!(err, StateExtractorError::ExtractionEmpty));
    }

    #[test]
    fn truncates_and_appends_marker() {
        let text = "a".repeat(10);
        let truncated = truncate_elements(&text, 4);
        assert_eq!(truncated, "aaaa\n... [truncated]");
    }

    #[test]
    fn leaves_short_text_untouched() {
        let text = "short";
        assert_eq!(truncate_elements(text, 40_000), "short");
    }
}
