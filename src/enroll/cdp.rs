//! Chromium-backed browser sessions via CDP.
//!
//! Countermeasure scripts are installed with
//! `Page.addScriptToEvaluateOnNewDocument` and tracker blocking with
//! `Network.setBlockedURLs` while the session still sits on `about:blank`,
//! so both are active before the first request to the target. Keystrokes go
//! through `Input.dispatchKeyEvent` with randomized inter-key delays.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::backend::{BrowserBackend, BrowserSession};
use super::fingerprint::SessionFingerprint;
use crate::error::{PaneError, Result};

/// Launches isolated Chromium instances, one per enrollment job.
pub struct CdpBackend {
    headless: bool,
}

impl CdpBackend {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl BrowserBackend for CdpBackend {
    async fn launch(
        &self,
        fingerprint: &SessionFingerprint,
        block_patterns: &[String],
    ) -> Result<Box<dyn BrowserSession>> {
        let (width, height) = fingerprint.viewport;

        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--no-default-browser-check")
            .arg("--no-first-run");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(PaneError::LaunchFailed)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PaneError::LaunchFailed(e.to_string()))?;

        // Drive the CDP event loop; when it ends Chrome has disconnected.
        tokio::spawn(async move {
            while handler.next().await.is_some() {}
            debug!("browser event handler ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PaneError::LaunchFailed(e.to_string()))?;

        // Everything below happens on about:blank, before the target is
        // ever requested.
        page.execute(SetBlockedUrLsParams::new(block_patterns.to_vec()))
            .await
            .map_err(|e| PaneError::LaunchFailed(format!("block rules: {e}")))?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            fingerprint.countermeasure_script(),
        ))
        .await
        .map_err(|e| PaneError::LaunchFailed(format!("countermeasures: {e}")))?;

        let mut ua = SetUserAgentOverrideParams::new(fingerprint.user_agent.clone());
        ua.platform = Some(fingerprint.platform.clone());
        ua.accept_language = Some(fingerprint.locale.clone());
        page.execute(ua)
            .await
            .map_err(|e| PaneError::LaunchFailed(format!("user agent: {e}")))?;

        page.execute(SetTimezoneOverrideParams::new(fingerprint.timezone.clone()))
            .await
            .map_err(|e| PaneError::LaunchFailed(format!("timezone: {e}")))?;

        Ok(Box::new(CdpSession {
            browser: Mutex::new(Some(browser)),
            page,
            frame_scope: StdMutex::new(None),
        }))
    }
}

/// One live Chromium session.
pub struct CdpSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    /// URL substring of the child frame that field operations are scoped
    /// to, once an embedded-frame flow has entered it.
    frame_scope: StdMutex<Option<String>>,
}

impl CdpSession {
    /// JS prelude binding `__doc` to the scoped document: the matching
    /// child frame's document when a frame scope is set and same-origin,
    /// the top document otherwise.
    fn doc_prelude(&self) -> String {
        let fragment = self
            .frame_scope
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None);
        let fragment_json = serde_json::to_string(&fragment).unwrap_or_else(|_| "null".into());
        format!(
            r#"const __doc = (() => {{
    const frag = {fragment_json};
    if (frag) {{
        for (const f of document.querySelectorAll('iframe')) {{
            try {{
                if ((f.src || '').includes(frag) && f.contentDocument) return f.contentDocument;
            }} catch (e) {{}}
        }}
    }}
    return document;
}})();"#
        )
    }

    async fn eval_json(&self, body: &str) -> Result<serde_json::Value> {
        let script = format!("(() => {{ {} {} }})()", self.doc_prelude(), body);
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PaneError::BrowserOperation(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn dispatch_key(&self, params: DispatchKeyEventParams) -> Result<()> {
        self.page
            .execute(params)
            .await
            .map_err(|e| PaneError::BrowserOperation(format!("key event: {e}")))?;
        Ok(())
    }

    /// Type one character as a keyDown/keyUp pair.
    async fn type_char(&self, c: char) -> Result<()> {
        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .text(c.to_string())
            .build()
            .map_err(PaneError::BrowserOperation)?;
        self.dispatch_key(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .build()
            .map_err(PaneError::BrowserOperation)?;
        self.dispatch_key(up).await
    }
}

#[async_trait]
impl BrowserSession for CdpSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let nav = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| PaneError::BrowserOperation(format!("goto {url}: {e}")))?;
            // Structurally loaded is enough; full resource completion is
            // not awaited.
            loop {
                let state = self
                    .page
                    .evaluate("document.readyState")
                    .await
                    .map_err(|e| PaneError::BrowserOperation(e.to_string()))?;
                match state.value().and_then(|v| v.as_str()) {
                    Some("interactive") | Some("complete") => break,
                    _ => tokio::time::sleep(Duration::from_millis(100)).await,
                }
            }
            Ok::<_, PaneError>(())
        };

        tokio::time::timeout(timeout, nav)
            .await
            .map_err(|_| PaneError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    async fn enter_frame(&self, url_fragment: &str) -> Result<bool> {
        let fragment_json = serde_json::to_string(url_fragment)?;
        let found = self
            .eval_json(&format!(
                r#"for (const f of document.querySelectorAll('iframe')) {{
                    try {{
                        if ((f.src || '').includes({fragment_json}) && f.contentDocument) return true;
                    }} catch (e) {{}}
                }}
                return false;"#
            ))
            .await?
            .as_bool()
            .unwrap_or(false);

        if found {
            if let Ok(mut guard) = self.frame_scope.lock() {
                *guard = Some(url_fragment.to_string());
            }
        }
        Ok(found)
    }

    async fn first_visible(&self, candidates: &[String]) -> Result<Option<String>> {
        let candidates_json = serde_json::to_string(candidates)?;
        let value = self
            .eval_json(&format!(
                r#"const visible = el => {{
                    if (!el || el.disabled) return false;
                    const r = el.getClientRects();
                    return r.length > 0 && r[0].width > 0 && r[0].height > 0;
                }};
                for (const sel of {candidates_json}) {{
                    let el = null;
                    try {{ el = __doc.querySelector(sel); }} catch (e) {{ continue; }}
                    if (visible(el)) return sel;
                }}
                return null;"#
            ))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn form_present(&self) -> Result<bool> {
        let value = self
            .eval_json(
                r#"const fields = __doc.querySelectorAll('input:not([type=hidden]), textarea, select');
                for (const el of fields) {
                    if (el.getClientRects().length > 0) return true;
                }
                return false;"#,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn extract_text(&self, selector: &str) -> Result<Option<String>> {
        let selector_json = serde_json::to_string(selector)?;
        let value = self
            .eval_json(&format!(
                r#"const el = __doc.querySelector({selector_json});
                return el ? (el.textContent || el.value || '').trim() : null;"#
            ))
            .await?;
        Ok(value.as_str().filter(|s| !s.is_empty()).map(String::from))
    }

    async fn body_text(&self, max_chars: usize) -> Result<String> {
        let value = self
            .eval_json(&format!(
                "return (__doc.body ? __doc.body.innerText : '').slice(0, {max_chars});"
            ))
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn title(&self) -> Result<String> {
        let value = self
            .page
            .evaluate("document.title")
            .await
            .map_err(|e| PaneError::BrowserOperation(e.to_string()))?;
        Ok(value
            .value()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| PaneError::BrowserOperation(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let selector_json = serde_json::to_string(selector)?;
        let clicked = self
            .eval_json(&format!(
                r#"const el = __doc.querySelector({selector_json});
                if (!el) return false;
                el.click();
                return true;"#
            ))
            .await?
            .as_bool()
            .unwrap_or(false);
        if clicked {
            Ok(())
        } else {
            Err(PaneError::ElementNotFound(selector.to_string()))
        }
    }

    async fn click_by_text(&self, texts: &[String]) -> Result<Option<String>> {
        let texts_json = serde_json::to_string(texts)?;
        let value = self
            .eval_json(&format!(
                r#"const buttons = __doc.querySelectorAll("button, a, [role='button'], input[type='button']");
                for (const wanted of {texts_json}) {{
                    for (const el of buttons) {{
                        if ((el.textContent || el.value || '').trim() === wanted) {{
                            el.click();
                            return wanted;
                        }}
                    }}
                }}
                return null;"#
            ))
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let selector_json = serde_json::to_string(selector)?;
        let focused = self
            .eval_json(&format!(
                r#"const el = __doc.querySelector({selector_json});
                if (!el) return false;
                el.focus();
                return true;"#
            ))
            .await?
            .as_bool()
            .unwrap_or(false);
        if !focused {
            return Err(PaneError::ElementNotFound(selector.to_string()));
        }

        for c in value.chars() {
            self.type_char(c).await?;
            // Human pacing between keystrokes.
            let delay = rand::thread_rng().gen_range(40..140);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<()> {
        let selector_json = serde_json::to_string(selector)?;
        self.eval_json(&format!(
            r#"const el = __doc.querySelector({selector_json});
            if (el) el.focus();
            return true;"#
        ))
        .await?;

        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::RawKeyDown)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .map_err(PaneError::BrowserOperation)?;
        self.dispatch_key(down).await?;

        let ch = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text("\r")
            .build()
            .map_err(PaneError::BrowserOperation)?;
        self.dispatch_key(ch).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key("Enter")
            .code("Enter")
            .windows_virtual_key_code(13)
            .native_virtual_key_code(13)
            .build()
            .map_err(PaneError::BrowserOperation)?;
        self.dispatch_key(up).await
    }

    async fn await_navigation_or_settle(&self, settle: Duration) -> Result<()> {
        tokio::select! {
            result = self.page.wait_for_navigation() => {
                if let Err(e) = result {
                    debug!("post-submit navigation wait: {e}");
                }
            }
            _ = tokio::time::sleep(settle) => {
                debug!("post-submit settle delay elapsed");
            }
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| PaneError::BrowserOperation(format!("screenshot: {e}")))
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                warn!("graceful browser close failed: {e}");
            }
            // Force kill so no Chrome child process outlives the job.
            let _ = browser.kill().await;
        }
        Ok(())
    }
}
