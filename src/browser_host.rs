//! The Browser Host: tab scripting, screenshot capture, and (eventually)
//! event delivery. Deliberately out of the core's scope per the
//! specification — the core only ever depends on [`PageHandle`]/[`PageProvider`].

use async_trait::async_trait;
use serde_json::Value;

/// Errors the Browser Host can report back to the core.
#[derive(Debug, thiserror::Error)]
pub enum BrowserHostError {
    #[error("no active tab")]
    NoActiveTab,

    #[error("script execution failed: {0}")]
    ScriptError(String),

    #[error("screenshot capture failed: {0}")]
    ScreenshotError(String),
}

/// A single active tab, scriptable from the host side.
///
/// Implementations run arbitrary JavaScript in the page's own context and
/// return its JSON-serialisable result; the core never touches the DOM
/// directly.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Evaluate `script` in the page and decode its return value as JSON.
    async fn evaluate(&self, script: &str) -> Result<Value, BrowserHostError>;

    /// Capture the current viewport as a PNG, base64-encoded as a data URL.
    ///
    /// Capture is best-effort: implementations should return `Ok(None)`
    /// rather than an error for the common case of a privileged URL (e.g.
    /// `chrome://...`) where screenshotting is simply unavailable.
    async fn screenshot_png_base64(&self) -> Result<Option<String>, BrowserHostError>;

    /// The tab's current URL, as known to the host (not re-derived from script).
    async fn current_url(&self) -> Result<String, BrowserHostError>;
}

/// Resolves the tab the agent is currently controlling.
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Returns `None` when there is no active tab (the caller maps this to
    /// [`BrowserHostError::NoActiveTab`]).
    async fn active_page(&self) -> Option<std::sync::Arc<dyn PageHandle>>;
}

/// An in-memory [`PageHandle`] returning canned data, for tests.
pub struct MockPageHandle {
    pub extraction_result: Value,
    pub screenshot: Option<String>,
    pub url: String,
}

#[async_trait]
impl PageHandle for MockPageHandle {
    async fn evaluate(&self, _script: &str) -> Result<Value, BrowserHostError> {
        Ok(self.extraction_result.clone())
    }

    async fn screenshot_png_base64(&self) -> Result<Option<String>, BrowserHostError> {
        Ok(self.screenshot.clone())
    }

    async fn current_url(&self) -> Result<String, BrowserHostError> {
        Ok(self.url.clone())
    }
}

/// A [`PageProvider`] that always resolves to (or never has) one fixed page.
pub struct SinglePageProvider {
    page: Option<std::sync::Arc<dyn PageHandle>>,
}

impl SinglePageProvider {
    pub fn new(page: std::sync::Arc<dyn PageHandle>) -> Self {
        Self { page: Some(page) }
    }

    pub fn empty() -> Self {
        Self { page: None }
    }
}

#[async_trait]
impl PageProvider for SinglePageProvider {
    async fn active_page(&self) -> Option<std::sync::Arc<dyn PageHandle>> {
        self.page.clone()
    }
}

#[cfg(feature = "chromium")]
pub mod chromium {
    //! A real [`PageHandle`] backed by `chromiumoxide`, following the
    //! `page.evaluate()` / parallel-extraction pattern used by the teacher's
    //! `page_extractor::page_info::extract_page_info`.
    use super::*;
    use base64::Engine;
    use chromiumoxide::Page;

    pub struct ChromiumPageHandle {
        page: Page,
    }

    impl ChromiumPageHandle {
        pub fn new(page: Page) -> Self {
            Self { page }
        }
    }

    #[async_trait]
    impl PageHandle for ChromiumPageHandle {
        async fn evaluate(&self, script: &str) -> Result<Value, BrowserHostError> {
            let value = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| BrowserHostError::ScriptError(e.to_string()))?
                .into_value()
                .map_err(|e| BrowserHostError::ScriptError(e.to_string()))?;
            Ok(value)
        }

        async fn screenshot_png_base64(&self) -> Result<Option<String>, BrowserHostError> {
            match self
                .page
                .screenshot(chromiumoxide::page::ScreenshotParams::builder().build())
                .await
            {
                Ok(bytes) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                    Ok(Some(format!("data:image/png;base64,{encoded}")))
                }
                // Screenshotting fails on privileged URLs; this is routine, not fatal.
                Err(_) => Ok(None),
            }
        }

        async fn current_url(&self) -> Result<String, BrowserHostError> {
            self.page
                .url()
                .await
                .map_err(|e| BrowserHostError::ScriptError(e.to_string()))?
                .ok_or(BrowserHostError::NoActiveTab)
        }
    }
}
