//! Error types for pane

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaneError {
    #[error("Browser could not start: {0}")]
    LaunchFailed(String),

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("No signup form detected at {0}: zero fields filled")]
    NoFormDetected(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Enrollment cancelled")]
    Cancelled,

    #[error("Browser operation failed: {0}")]
    BrowserOperation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Unknown job: {0}")]
    JobNotFound(String),

    #[error("Alias provider error: {0}")]
    AliasProvider(String),

    #[error("Card provider error: {0}")]
    CardProvider(String),

    #[error("Context '{0}' not found")]
    ContextNotFound(String),

    #[error("Context '{0}' already exists")]
    ContextExists(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PaneError>;
