//! Per-domain enrollment flavors.
//!
//! Known targets get an override descriptor: an explicit field recipe that
//! fully replaces generic detection for that run. Everything else falls
//! through to the generic flavor. The state machine only ever talks to the
//! `EnrollmentFlavor` trait, so adding a flavor never touches the machine.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::enroll::classify::DEFAULT_SUCCESS_SIGNALS;
use crate::error::{PaneError, Result};

/// One scripted fill step in an override descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStep {
    /// Logical field name ("email", "password", ...).
    pub field: String,
    pub selector: String,
    /// Take the value from an already-filled logical field instead of the
    /// enrollment context (confirmation fields mirroring a password).
    #[serde(default)]
    pub derive_from: Option<String>,
}

/// Declared generate-action for targets that expose no fillable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoFormFlow {
    /// Selector of the single "generate" action to click.
    pub action_selector: String,
    /// Selector holding the provider-issued token on the resulting page.
    pub token_selector: String,
}

/// Per-domain recipe overriding generic detection. Static configuration,
/// keyed by registration domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideDescriptor {
    pub domain: String,
    #[serde(default)]
    pub navigation_url: Option<String>,
    #[serde(default)]
    pub steps: Vec<FieldStep>,
    #[serde(default)]
    pub submit_selector: Option<String>,
    #[serde(default)]
    pub success_signals: Vec<String>,
    #[serde(default)]
    pub no_form: Option<NoFormFlow>,
    /// Signup form lives in a child frame located by this URL substring.
    #[serde(default)]
    pub frame_url_fragment: Option<String>,
}

/// Strategy interface for one enrollment flavor.
pub trait EnrollmentFlavor: Send + Sync {
    fn name(&self) -> &str;

    /// URL to load; defaults to whatever the caller asked for.
    fn navigation_url<'a>(&'a self, requested: &'a str) -> &'a str {
        requested
    }

    /// Explicit fill steps. `None` means generic detection applies.
    fn field_steps(&self) -> Option<&[FieldStep]> {
        None
    }

    fn submit_selector(&self) -> Option<&str> {
        None
    }

    fn success_signals(&self) -> Vec<String> {
        DEFAULT_SUCCESS_SIGNALS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn no_form_flow(&self) -> Option<&NoFormFlow> {
        None
    }

    fn frame_url_fragment(&self) -> Option<&str> {
        None
    }
}

/// Default flavor: generic detection, generic submit matchers, default
/// success signals.
pub struct GenericFlavor;

impl EnrollmentFlavor for GenericFlavor {
    fn name(&self) -> &str {
        "generic"
    }
}

/// Flavor backed by an override descriptor. Override precedence is total:
/// when steps are declared, generic detection is not consulted at all.
pub struct OverrideFlavor {
    descriptor: OverrideDescriptor,
}

impl OverrideFlavor {
    pub fn new(descriptor: OverrideDescriptor) -> Self {
        Self { descriptor }
    }
}

impl EnrollmentFlavor for OverrideFlavor {
    fn name(&self) -> &str {
        &self.descriptor.domain
    }

    fn navigation_url<'a>(&'a self, requested: &'a str) -> &'a str {
        self.descriptor
            .navigation_url
            .as_deref()
            .unwrap_or(requested)
    }

    fn field_steps(&self) -> Option<&[FieldStep]> {
        if self.descriptor.steps.is_empty() {
            None
        } else {
            Some(&self.descriptor.steps)
        }
    }

    fn submit_selector(&self) -> Option<&str> {
        self.descriptor.submit_selector.as_deref()
    }

    fn success_signals(&self) -> Vec<String> {
        if self.descriptor.success_signals.is_empty() {
            GenericFlavor.success_signals()
        } else {
            self.descriptor.success_signals.clone()
        }
    }

    fn no_form_flow(&self) -> Option<&NoFormFlow> {
        self.descriptor.no_form.as_ref()
    }

    fn frame_url_fragment(&self) -> Option<&str> {
        self.descriptor.frame_url_fragment.as_deref()
    }
}

/// Registry of flavors keyed by registration domain, with the generic
/// flavor as fallback. Built once at startup from configuration.
pub struct FlavorRegistry {
    overrides: HashMap<String, Arc<dyn EnrollmentFlavor>>,
    generic: Arc<dyn EnrollmentFlavor>,
}

impl FlavorRegistry {
    pub fn new(descriptors: Vec<OverrideDescriptor>) -> Self {
        let mut overrides: HashMap<String, Arc<dyn EnrollmentFlavor>> = HashMap::new();
        for descriptor in descriptors {
            let domain = descriptor.domain.to_ascii_lowercase();
            overrides.insert(domain, Arc::new(OverrideFlavor::new(descriptor)));
        }
        Self {
            overrides,
            generic: Arc::new(GenericFlavor),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Flavor for the given registration domain; generic if unknown.
    pub fn resolve(&self, domain: &str) -> Arc<dyn EnrollmentFlavor> {
        self.overrides
            .get(&domain.to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.generic))
    }
}

/// Registration domain for a target URL: host with any `www.` prefix
/// stripped, lowercased.
pub fn registration_domain(target_url: &str) -> Result<String> {
    let parsed =
        url::Url::parse(target_url).map_err(|e| PaneError::InvalidUrl(format!("{target_url}: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| PaneError::InvalidUrl(format!("{target_url}: no host")))?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Ok(host.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> OverrideDescriptor {
        OverrideDescriptor {
            domain: "example.com".into(),
            navigation_url: Some("https://example.com/join".into()),
            steps: vec![
                FieldStep {
                    field: "email".into(),
                    selector: "#email".into(),
                    derive_from: None,
                },
                FieldStep {
                    field: "password_confirm".into(),
                    selector: "#confirm".into(),
                    derive_from: Some("password".into()),
                },
            ],
            submit_selector: Some("#join".into()),
            success_signals: vec!["welcome aboard".into()],
            no_form: None,
            frame_url_fragment: None,
        }
    }

    #[test]
    fn registry_resolves_override_case_insensitively() {
        let registry = FlavorRegistry::new(vec![descriptor()]);
        assert_eq!(registry.resolve("Example.COM").name(), "example.com");
        assert_eq!(registry.resolve("other.org").name(), "generic");
    }

    #[test]
    fn override_replaces_generic_detection_entirely() {
        let flavor = OverrideFlavor::new(descriptor());
        let steps = flavor.field_steps().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].derive_from.as_deref(), Some("password"));
        assert_eq!(flavor.navigation_url("https://example.com"), "https://example.com/join");
        assert_eq!(flavor.success_signals(), vec!["welcome aboard".to_string()]);
    }

    #[test]
    fn override_without_signals_inherits_defaults() {
        let mut d = descriptor();
        d.success_signals.clear();
        let flavor = OverrideFlavor::new(d);
        assert!(flavor
            .success_signals()
            .iter()
            .any(|s| s == "check your email"));
    }

    #[test]
    fn registration_domain_strips_www() {
        assert_eq!(
            registration_domain("https://www.Example.com/signup?x=1").unwrap(),
            "example.com"
        );
        assert_eq!(
            registration_domain("https://app.example.com/join").unwrap(),
            "app.example.com"
        );
        assert!(registration_domain("not a url").is_err());
    }

    #[test]
    fn descriptor_deserializes_from_toml_fragment() {
        let raw = r##"
            domain = "signup.test"
            submit_selector = "#go"
            [[steps]]
            field = "email"
            selector = "input.email"
            [no_form]
            action_selector = "#generate"
            token_selector = ".account-number"
        "##;
        let d: OverrideDescriptor = toml::from_str(raw).unwrap();
        assert_eq!(d.domain, "signup.test");
        assert!(d.no_form.is_some());
        assert_eq!(d.steps.len(), 1);
    }
}
