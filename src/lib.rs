//! Pane - alias-identity signup automation.
//!
//! Pane signs up for third-party services with a synthetic (alias)
//! identity so no real personal data reaches the target: a deterministic
//! identity generator, disposable email and virtual card providers, and a
//! browser-driven enrollment engine with bot-detection countermeasures.
//! Enrollments run as cancelable background jobs whose progress streams to
//! any number of subscribers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod enroll;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod providers;
pub mod store;

pub use config::Config;
pub use enroll::{
    EnrollmentContext, EnrollmentMachine, EnrollmentResult, ProgressEvent, Step,
};
pub use error::{PaneError, Result};
pub use jobs::{JobId, JobSupervisor};
pub use store::{ContextStore, Envelope};
