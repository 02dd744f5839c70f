//! Browser abstraction consumed by the enrollment state machine.
//!
//! Two implementations: the chromiumoxide CDP backend for real runs, and
//! scripted in-memory sessions in the test suite. The machine never touches
//! a concrete driver, which is also what keeps the session-count cleanup
//! invariant testable.

use std::time::Duration;

use async_trait::async_trait;

use super::fingerprint::SessionFingerprint;
use crate::error::Result;

/// Launches browser sessions. Exactly one session per enrollment job;
/// sessions are never pooled or reused across jobs.
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    /// Acquire a fresh session. The fingerprint, countermeasure scripts,
    /// and request block patterns must all be active before the first
    /// navigation.
    async fn launch(
        &self,
        fingerprint: &SessionFingerprint,
        block_patterns: &[String],
    ) -> Result<Box<dyn BrowserSession>>;
}

/// One live browser session.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    // --- Navigation ---

    /// Navigate and wait for a structurally-loaded document (not full
    /// resource completion), bounded by `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Redirect subsequent field operations to the child frame whose URL
    /// contains `url_fragment`. Returns false when no such frame exists.
    async fn enter_frame(&self, url_fragment: &str) -> Result<bool>;

    // --- Queries ---

    /// First selector in `candidates` that matches a visible, enabled
    /// element in the current document scope.
    async fn first_visible(&self, candidates: &[String]) -> Result<Option<String>>;

    /// Whether a fillable form is present in the current document scope.
    async fn form_present(&self) -> Result<bool>;

    /// Visible text content of the first element matching `selector`.
    async fn extract_text(&self, selector: &str) -> Result<Option<String>>;

    /// Page body text, truncated to `max_chars`.
    async fn body_text(&self, max_chars: usize) -> Result<String>;

    async fn title(&self) -> Result<String>;
    async fn current_url(&self) -> Result<String>;

    // --- Interaction ---

    async fn click(&self, selector: &str) -> Result<()>;

    /// Click the first button/link whose exact text matches one of `texts`.
    /// Returns the matched text, or None when nothing matched.
    async fn click_by_text(&self, texts: &[String]) -> Result<Option<String>>;

    /// Fill a field with human-paced keystrokes.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    /// Send a confirm keystroke (Enter) to the element.
    async fn press_enter(&self, selector: &str) -> Result<()>;

    /// Race a page navigation against a fixed settle delay; returns when
    /// either occurs. Tolerates both full-reload and SPA submissions.
    async fn await_navigation_or_settle(&self, settle: Duration) -> Result<()>;

    // --- Artifacts / lifecycle ---

    /// Viewport screenshot as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Tear the session down. Must be called on every exit path.
    async fn close(&self) -> Result<()>;
}
