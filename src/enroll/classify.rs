//! Post-submission outcome classification.
//!
//! Success signals are tested as substrings of the page body, title, and
//! URL. No match is not failure by itself: many targets defer confirmation
//! to an email the engine cannot inspect. A re-displayed form carrying
//! visible validation-error text is the one case reported as rejected.

/// Generic success signals, tried when the flavor declares none.
pub const DEFAULT_SUCCESS_SIGNALS: &[&str] = &[
    "welcome",
    "dashboard",
    "confirm",
    "verify",
    "check your email",
    "success",
    "sent",
    "inbox",
];

/// Validation-error phrasings that mark a rejected submission when the
/// form is still on screen.
const REJECTION_SIGNALS: &[&str] = &[
    "error",
    "invalid",
    "required",
    "already taken",
    "already in use",
    "already exists",
    "try again",
    "must be",
];

/// Page evidence gathered after submission.
#[derive(Debug, Clone)]
pub struct PageEvidence {
    /// First ~1000 characters of body text, case-folded by the caller.
    pub body_text: String,
    pub title: String,
    pub url: String,
    /// Whether a fillable form is still present on the page.
    pub form_still_present: bool,
}

/// Classification verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A success signal matched.
    Confirmed { signal: String },
    /// Nothing matched, nothing rejected: treated as success pending
    /// out-of-band (email) confirmation.
    Unconfirmed,
    /// The form re-displayed with visible validation-error text.
    Rejected { detail: String },
}

/// Classify the submitted page. First matching signal wins; signals are
/// checked against body text, title, and URL, all case-folded.
pub fn classify(evidence: &PageEvidence, signals: &[String]) -> Outcome {
    let body = evidence.body_text.to_lowercase();
    let title = evidence.title.to_lowercase();
    let url = evidence.url.to_lowercase();

    for signal in signals {
        let needle = signal.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if body.contains(&needle) || title.contains(&needle) || url.contains(&needle) {
            return Outcome::Confirmed {
                signal: signal.clone(),
            };
        }
    }

    if evidence.form_still_present {
        if let Some(rejection) = REJECTION_SIGNALS.iter().find(|s| body.contains(**s)) {
            return Outcome::Rejected {
                detail: format!("form re-displayed with validation text '{rejection}'"),
            };
        }
    }

    Outcome::Unconfirmed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(body: &str, form_still_present: bool) -> PageEvidence {
        PageEvidence {
            body_text: body.to_string(),
            title: "Sign up".to_string(),
            url: "https://example.com/signup".to_string(),
            form_still_present,
        }
    }

    fn default_signals() -> Vec<String> {
        DEFAULT_SUCCESS_SIGNALS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_matching_signal_wins() {
        let outcome = classify(
            &evidence("Almost done! Check your email to finish.", false),
            &default_signals(),
        );
        assert_eq!(
            outcome,
            Outcome::Confirmed {
                signal: "check your email".to_string()
            }
        );
    }

    #[test]
    fn signal_matches_url_and_title_too() {
        let mut e = evidence("nothing interesting here", false);
        e.url = "https://example.com/dashboard".to_string();
        let outcome = classify(&e, &default_signals());
        assert_eq!(
            outcome,
            Outcome::Confirmed {
                signal: "dashboard".to_string()
            }
        );
    }

    #[test]
    fn no_match_without_form_is_unconfirmed() {
        let outcome = classify(&evidence("thanks for signing up with us", false), &default_signals());
        // "thanks" is not in the signal list and no form remains.
        assert_eq!(outcome, Outcome::Unconfirmed);
    }

    #[test]
    fn redisplayed_form_with_error_text_is_rejected() {
        let outcome = classify(
            &evidence("that email address is invalid", true),
            &default_signals(),
        );
        assert!(matches!(outcome, Outcome::Rejected { .. }));
    }

    #[test]
    fn redisplayed_form_without_error_text_stays_unconfirmed() {
        let outcome = classify(&evidence("join our community today", true), &default_signals());
        assert_eq!(outcome, Outcome::Unconfirmed);
    }

    #[test]
    fn override_signals_take_priority_order() {
        let signals = vec!["account created".to_string(), "welcome".to_string()];
        let outcome = classify(&evidence("welcome! account created", false), &signals);
        assert_eq!(
            outcome,
            Outcome::Confirmed {
                signal: "account created".to_string()
            }
        );
    }
}
