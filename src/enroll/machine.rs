//! Enrollment state machine.
//!
//! One run owns one browser session for its whole lifetime:
//! launch → navigate → dismiss-consent → detect-frame (optional) →
//! fill-fields → submit → classify-outcome, with no-form flows skipping the
//! fill/submit pair for a single generate action. The session is torn down
//! on every exit path, and every blocking wait races the run's cancellation
//! token.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{BrowserBackend, BrowserSession};
use super::classify::{classify, Outcome, PageEvidence};
use super::detect::{FieldKind, CONSENT_SELECTORS, CONSENT_TEXTS, SUBMIT_SELECTORS};
use super::fingerprint::SessionFingerprint;
use super::flavor::{registration_domain, EnrollmentFlavor, FieldStep, FlavorRegistry};
use super::interceptor;
use super::progress::{EnrollmentResult, ProgressEvent, ProgressSink, Step};
use crate::identity::Identity;
use crate::providers::{AliasResult, CardResult};
use crate::error::{PaneError, Result};

/// Input bundle for one enrollment run. Immutable for the run's duration.
#[derive(Debug, Clone)]
pub struct EnrollmentContext {
    pub identity: Identity,
    pub alias: AliasResult,
    pub card: CardResult,
}

/// Run timing and artifact settings.
#[derive(Debug, Clone)]
pub struct EnrollSettings {
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    pub screenshot_dir: PathBuf,
}

impl Default for EnrollSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(4),
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

/// How many characters of body text the classifier sees.
const CLASSIFY_TEXT_CHARS: usize = 1000;

pub struct EnrollmentMachine {
    backend: Arc<dyn BrowserBackend>,
    flavors: Arc<FlavorRegistry>,
    settings: EnrollSettings,
}

/// Mutable state threaded through one run.
struct RunState<'a> {
    session: &'a dyn BrowserSession,
    flavor: Arc<dyn EnrollmentFlavor>,
    domain: String,
    cancel: CancellationToken,
    sink: &'a dyn ProgressSink,
    screenshots: Vec<String>,
    /// Logical field name → (selector, value) for every filled field, in
    /// fill order. Drives derived values and the keystroke fallback.
    filled: Vec<(String, String, String)>,
}

impl EnrollmentMachine {
    pub fn new(
        backend: Arc<dyn BrowserBackend>,
        flavors: Arc<FlavorRegistry>,
        settings: EnrollSettings,
    ) -> Self {
        Self {
            backend,
            flavors,
            settings,
        }
    }

    /// Run one enrollment to completion. Never returns an error: failures
    /// are folded into the result so the job boundary always resolves.
    pub async fn run(
        &self,
        target_url: &str,
        ctx: &EnrollmentContext,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> EnrollmentResult {
        let domain = match registration_domain(target_url) {
            Ok(domain) => domain,
            Err(e) => {
                sink.emit(ProgressEvent::new(Step::Error, e.to_string()));
                return EnrollmentResult::failed(e.to_string(), Vec::new());
            }
        };
        let flavor = self.flavors.resolve(&domain);
        info!(%domain, flavor = flavor.name(), "starting enrollment");

        let fingerprint = SessionFingerprint::draw(&ctx.identity.timezone);
        sink.emit(ProgressEvent::new(
            Step::Launch,
            format!("launching browser ({}x{})", fingerprint.viewport.0, fingerprint.viewport.1),
        ));

        let session = match self
            .backend
            .launch(&fingerprint, &interceptor::block_patterns())
            .await
        {
            Ok(session) => session,
            Err(e) => {
                let message = format!("browser launch failed: {e}");
                sink.emit(ProgressEvent::new(Step::Error, message.clone()));
                return EnrollmentResult::failed(message, Vec::new());
            }
        };

        let mut state = RunState {
            session: session.as_ref(),
            flavor,
            domain,
            cancel,
            sink,
            screenshots: Vec::new(),
            filled: Vec::new(),
        };

        let outcome = self.drive(target_url, ctx, &mut state).await;

        let result = match outcome {
            Ok(result) => {
                let mut event = ProgressEvent::new(Step::Complete, "enrollment complete");
                if let Some(shot) = result.screenshots.last() {
                    event = event.with_screenshot(shot.clone());
                }
                sink.emit(event);
                result
            }
            Err(e) => {
                // Best-effort diagnostic screenshot before teardown.
                if let Ok(bytes) = state.session.screenshot().await {
                    if let Some(path) = self.save_screenshot(&state.domain, "failure", &bytes).await
                    {
                        state.screenshots.push(path);
                    }
                }
                let message = e.to_string();
                let mut event = ProgressEvent::new(Step::Error, message.clone());
                if let Some(shot) = state.screenshots.last() {
                    event = event.with_screenshot(shot.clone());
                }
                sink.emit(event);
                EnrollmentResult::failed(message, state.screenshots.clone())
            }
        };

        if let Err(e) = session.close().await {
            warn!("session close failed: {e}");
        }
        result
    }

    /// The sequential state transitions. Any error returned here routes
    /// through the failure path in `run`.
    async fn drive(
        &self,
        target_url: &str,
        ctx: &EnrollmentContext,
        state: &mut RunState<'_>,
    ) -> Result<EnrollmentResult> {
        let nav_url = state.flavor.navigation_url(target_url).to_string();
        state.sink.emit(ProgressEvent::new(
            Step::Navigate,
            format!("navigating to {nav_url}"),
        ));
        with_cancel(
            &state.cancel,
            state.session.navigate(&nav_url, self.settings.navigation_timeout),
        )
        .await?;

        self.dismiss_consent(state).await?;

        if let Some(fragment) = state.flavor.frame_url_fragment().map(String::from) {
            state.sink.emit(ProgressEvent::new(
                Step::Form,
                "locating embedded signup frame",
            ));
            let entered =
                with_cancel(&state.cancel, state.session.enter_frame(&fragment)).await?;
            if !entered {
                warn!(%fragment, "declared signup frame not found, staying on top document");
            }
        }

        if let Some(no_form) = state.flavor.no_form_flow().cloned() {
            return self.run_generate_flow(&no_form, state).await;
        }

        state.sink.emit(ProgressEvent::new(Step::Form, "detecting signup fields"));
        self.fill_fields(ctx, state).await?;

        if state.filled.is_empty() {
            return Err(PaneError::NoFormDetected(nav_url));
        }
        state.sink.emit(ProgressEvent::new(
            Step::Fill,
            format!("filled {} field(s)", state.filled.len()),
        ));

        self.submit(state).await?;
        self.verify(state).await
    }

    /// Best-effort consent dismissal: exact text matches first, then
    /// structural selectors. Absence of any match is not an error.
    async fn dismiss_consent(&self, state: &mut RunState<'_>) -> Result<()> {
        state.sink.emit(ProgressEvent::new(Step::Consent, "dismissing consent banners"));
        let texts: Vec<String> = CONSENT_TEXTS.iter().map(|t| t.to_string()).collect();
        match with_cancel(&state.cancel, state.session.click_by_text(&texts)).await {
            Ok(Some(text)) => {
                debug!(%text, "consent dismissed by text");
                return Ok(());
            }
            Ok(None) => {}
            Err(PaneError::Cancelled) => return Err(PaneError::Cancelled),
            Err(e) => debug!("consent text pass: {e}"),
        }

        let selectors: Vec<String> = CONSENT_SELECTORS.iter().map(|s| s.to_string()).collect();
        match with_cancel(&state.cancel, state.session.first_visible(&selectors)).await {
            Ok(Some(selector)) => {
                if let Err(e) = state.session.click(&selector).await {
                    debug!(%selector, "consent click: {e}");
                }
            }
            Ok(None) => debug!("no consent banner found"),
            Err(PaneError::Cancelled) => return Err(PaneError::Cancelled),
            Err(e) => debug!("consent selector pass: {e}"),
        }
        Ok(())
    }

    /// Fill fields from the override recipe when one exists, otherwise via
    /// generic detection. Unresolved fields are skipped silently.
    async fn fill_fields(&self, ctx: &EnrollmentContext, state: &mut RunState<'_>) -> Result<()> {
        if let Some(steps) = state.flavor.field_steps().map(<[FieldStep]>::to_vec) {
            for step in &steps {
                let value = if let Some(source) = &step.derive_from {
                    match state.filled.iter().find(|(field, _, _)| field == source) {
                        Some((_, _, value)) => value.clone(),
                        None => {
                            warn!(field = %step.field, %source, "derive source not filled yet, skipping");
                            continue;
                        }
                    }
                } else {
                    match self.context_value(&step.field, ctx) {
                        Some(value) => value,
                        None => {
                            warn!(field = %step.field, "no context value for override step, skipping");
                            continue;
                        }
                    }
                };
                self.fill_one(state, &step.field, &step.selector, &value).await?;
            }
            return Ok(());
        }

        for kind in FieldKind::detection_order() {
            // Full name only when no split name fields resolved.
            if *kind == FieldKind::FullName
                && state.filled.iter().any(|(field, _, _)| {
                    field == FieldKind::FirstName.as_str() || field == FieldKind::LastName.as_str()
                })
            {
                continue;
            }
            let candidates: Vec<String> =
                kind.selectors().iter().map(|s| s.to_string()).collect();
            let resolved =
                with_cancel(&state.cancel, state.session.first_visible(&candidates)).await?;
            let Some(selector) = resolved else {
                debug!(field = kind.as_str(), "no match, skipping");
                continue;
            };
            let Some(value) = self.context_value(kind.as_str(), ctx) else {
                continue;
            };
            self.fill_one(state, kind.as_str(), &selector, &value).await?;
        }
        Ok(())
    }

    async fn fill_one(
        &self,
        state: &mut RunState<'_>,
        field: &str,
        selector: &str,
        value: &str,
    ) -> Result<()> {
        pace(&state.cancel).await?;
        with_cancel(&state.cancel, state.session.fill(selector, value)).await?;
        debug!(%field, %selector, "field filled");
        state
            .filled
            .push((field.to_string(), selector.to_string(), value.to_string()));
        Ok(())
    }

    /// Value for a logical field from the enrollment context.
    fn context_value(&self, field: &str, ctx: &EnrollmentContext) -> Option<String> {
        match field {
            "email" => Some(ctx.alias.email.clone()),
            "first_name" => Some(ctx.identity.first_name.clone()),
            "last_name" => Some(ctx.identity.last_name.clone()),
            "full_name" | "name" => Some(ctx.identity.full_name.clone()),
            "username" => Some(ctx.identity.username.clone()),
            "password" => Some(ctx.identity.password.clone()),
            "phone" => Some(ctx.identity.phone.clone()),
            "dob" => Some(ctx.identity.dob.clone()),
            "address" => Some(ctx.identity.address.clone()),
            "card_token" => Some(ctx.card.token.clone()),
            _ => None,
        }
    }

    /// Submit via the override selector, generic matchers, or a confirm
    /// keystroke in the last-filled field.
    async fn submit(&self, state: &mut RunState<'_>) -> Result<()> {
        state.sink.emit(ProgressEvent::new(Step::Submit, "submitting signup form"));
        pace(&state.cancel).await?;

        let submitted = if let Some(selector) = state.flavor.submit_selector() {
            with_cancel(&state.cancel, state.session.click(selector)).await.is_ok()
        } else {
            let candidates: Vec<String> =
                SUBMIT_SELECTORS.iter().map(|s| s.to_string()).collect();
            match with_cancel(&state.cancel, state.session.first_visible(&candidates)).await? {
                Some(selector) => state.session.click(&selector).await.is_ok(),
                None => false,
            }
        };

        if !submitted {
            // Not fatal: degrade to a confirm keystroke.
            let last_selector = state
                .filled
                .last()
                .map(|(_, selector, _)| selector.clone())
                .unwrap_or_default();
            debug!(%last_selector, "no submit control resolved, sending Enter");
            with_cancel(&state.cancel, state.session.press_enter(&last_selector)).await?;
        }

        with_cancel(
            &state.cancel,
            state.session.await_navigation_or_settle(self.settings.settle_delay),
        )
        .await
    }

    /// Gather page evidence and classify the outcome.
    async fn verify(&self, state: &mut RunState<'_>) -> Result<EnrollmentResult> {
        state.sink.emit(ProgressEvent::new(Step::Verify, "classifying outcome"));

        if let Ok(bytes) = state.session.screenshot().await {
            if let Some(path) = self.save_screenshot(&state.domain, "submitted", &bytes).await {
                state.screenshots.push(path);
            }
        }

        let evidence = PageEvidence {
            body_text: with_cancel(
                &state.cancel,
                state.session.body_text(CLASSIFY_TEXT_CHARS),
            )
            .await?,
            title: state.session.title().await.unwrap_or_default(),
            url: state.session.current_url().await.unwrap_or_default(),
            form_still_present: state.session.form_present().await.unwrap_or(false),
        };

        match classify(&evidence, &state.flavor.success_signals()) {
            Outcome::Confirmed { signal } => {
                info!(%signal, "enrollment confirmed");
                Ok(EnrollmentResult {
                    success: true,
                    matched_signal: Some(signal),
                    extracted_token: None,
                    screenshots: state.screenshots.clone(),
                    error: None,
                })
            }
            Outcome::Unconfirmed => {
                info!("no success signal matched; treating as unconfirmed success");
                Ok(EnrollmentResult {
                    success: true,
                    matched_signal: None,
                    extracted_token: None,
                    screenshots: state.screenshots.clone(),
                    error: None,
                })
            }
            Outcome::Rejected { detail } => Err(PaneError::SubmissionRejected(detail)),
        }
    }

    /// No-form flow: a single generate action, then token extraction.
    async fn run_generate_flow(
        &self,
        no_form: &super::flavor::NoFormFlow,
        state: &mut RunState<'_>,
    ) -> Result<EnrollmentResult> {
        state.sink.emit(ProgressEvent::new(Step::Submit, "triggering generate action"));
        pace(&state.cancel).await?;
        with_cancel(&state.cancel, state.session.click(&no_form.action_selector)).await?;
        with_cancel(
            &state.cancel,
            state.session.await_navigation_or_settle(self.settings.settle_delay),
        )
        .await?;

        state.sink.emit(ProgressEvent::new(Step::Verify, "extracting issued token"));
        let token =
            with_cancel(&state.cancel, state.session.extract_text(&no_form.token_selector))
                .await?;

        if let Ok(bytes) = state.session.screenshot().await {
            if let Some(path) = self.save_screenshot(&state.domain, "generated", &bytes).await {
                state.screenshots.push(path);
            }
        }

        match token {
            Some(token) => Ok(EnrollmentResult {
                success: true,
                matched_signal: None,
                extracted_token: Some(token),
                screenshots: state.screenshots.clone(),
                error: None,
            }),
            None => Err(PaneError::ElementNotFound(format!(
                "issued token at {}",
                no_form.token_selector
            ))),
        }
    }

    /// Write a screenshot as `<domain>-<unix-secs>-<label>.png`. Artifact
    /// loss is logged, never fatal.
    async fn save_screenshot(&self, domain: &str, label: &str, bytes: &[u8]) -> Option<String> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = self
            .settings
            .screenshot_dir
            .join(format!("{domain}-{stamp}-{label}.png"));
        if let Err(e) = tokio::fs::create_dir_all(&self.settings.screenshot_dir).await {
            warn!("screenshot dir: {e}");
            return None;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Some(path.to_string_lossy().to_string()),
            Err(e) => {
                warn!("screenshot write: {e}");
                None
            }
        }
    }
}

/// Race a suspension point against the run's cancellation token.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PaneError::Cancelled),
        result = fut => result,
    }
}

/// Human-like inter-step pacing delay, cancellable like every other wait.
async fn pace(cancel: &CancellationToken) -> Result<()> {
    let delay = rand::thread_rng().gen_range(250..750);
    with_cancel(cancel, async {
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(())
    })
    .await
}
