//! Progress event vocabulary and reporting.
//!
//! The step names and their completion percentages are owned here, next to
//! the state machine that emits them, so callers cannot drift their own
//! step→percent mapping.

use serde::{Deserialize, Serialize};

/// Fixed step vocabulary for enrollment progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Launch,
    Navigate,
    Consent,
    Form,
    Fill,
    Submit,
    Verify,
    Error,
    Complete,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Launch => "launch",
            Step::Navigate => "navigate",
            Step::Consent => "consent",
            Step::Form => "form",
            Step::Fill => "fill",
            Step::Submit => "submit",
            Step::Verify => "verify",
            Step::Error => "error",
            Step::Complete => "complete",
        }
    }

    /// Completion percentage for this step. Monotonically increasing along
    /// the happy path; both terminal steps report 100.
    pub fn percent(&self) -> u8 {
        match self {
            Step::Launch => 5,
            Step::Navigate => 15,
            Step::Consent => 25,
            Step::Form => 35,
            Step::Fill => 55,
            Step::Submit => 75,
            Step::Verify => 90,
            Step::Error | Step::Complete => 100,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One progress event emitted by the enrollment state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub step: Step,
    pub message: String,
    pub percent_complete: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
}

impl ProgressEvent {
    pub fn new(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
            percent_complete: step.percent(),
            screenshot_url: None,
        }
    }

    pub fn with_screenshot(mut self, path: impl Into<String>) -> Self {
        self.screenshot_url = Some(path.into());
        self
    }
}

/// Receiver of progress events. The job supervisor implements this to
/// buffer and broadcast; synchronous callers can implement it to print.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event, for callers that only want the result.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Terminal value of one enrollment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResult {
    pub success: bool,
    /// Success signal that matched during outcome classification, if any.
    /// `None` with `success = true` means the signup is unconfirmed and
    /// likely gated on an email the engine cannot inspect.
    pub matched_signal: Option<String>,
    /// Provider-issued token extracted on no-form flows.
    pub extracted_token: Option<String>,
    pub screenshots: Vec<String>,
    pub error: Option<String>,
}

impl EnrollmentResult {
    pub fn failed(error: impl Into<String>, screenshots: Vec<String>) -> Self {
        Self {
            success: false,
            matched_signal: None,
            extracted_token: None,
            screenshots,
            error: Some(error.into()),
        }
    }
}
