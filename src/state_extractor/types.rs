use crate::browser_host::BrowserHostError;
use serde::{Deserialize, Serialize};

/// Counts of tag categories over the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageStats {
    pub links: usize,
    pub interactive: usize,
    pub iframes: usize,
    pub images: usize,
    pub total_elements: usize,
}

/// Scroll position as both a fraction of viewport heights and raw pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScrollInfo {
    /// `scrollY / viewportHeight`, rounded to one decimal.
    pub pages_above: f64,
    /// `max(0, scrollHeight - scrollY - viewportHeight) / viewportHeight`, rounded to one decimal.
    pub pages_below: f64,
    pub pixels_above: u64,
    pub pixels_below: u64,
}

/// The full per-step snapshot of a page, as consumed by the Message Manager
/// and Loop Detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BrowserStateSummary {
    pub url: String,
    pub title: String,
    pub stats: PageStats,
    pub scroll: ScrollInfo,
    /// The indexed element listing, already truncated to `maxElementsLength`.
    pub elements_text: String,
    pub element_count: usize,
    /// Present only when vision was requested and capture succeeded.
    pub screenshot: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StateExtractorError {
    #[error("no active tab")]
    NoActiveTab,
    #[error("extraction returned no result")]
    ExtractionEmpty,
    #[error("browser host error: {0}")]
    Host(#[from] BrowserHostError),
}
