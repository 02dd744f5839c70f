//! Generic field detection tables.
//!
//! For each logical signup field we keep an ordered list of structural
//! matchers, most specific first: attribute matches, then placeholder text,
//! then autocomplete hints, then broad fallbacks. Matching stops at the
//! first visible, enabled element. A per-domain override descriptor fully
//! replaces these tables for its run.

/// Logical signup fields, in the order generic detection attempts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Email,
    FirstName,
    LastName,
    FullName,
    Username,
    Password,
    Phone,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::FirstName => "first_name",
            FieldKind::LastName => "last_name",
            FieldKind::FullName => "full_name",
            FieldKind::Username => "username",
            FieldKind::Password => "password",
            FieldKind::Phone => "phone",
        }
    }

    /// Parse a logical field name as used in override descriptors.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(FieldKind::Email),
            "first_name" => Some(FieldKind::FirstName),
            "last_name" => Some(FieldKind::LastName),
            "full_name" | "name" => Some(FieldKind::FullName),
            "username" => Some(FieldKind::Username),
            "password" => Some(FieldKind::Password),
            "phone" => Some(FieldKind::Phone),
            _ => None,
        }
    }

    /// Detection order. `FullName` comes after `FirstName`/`LastName` and
    /// is only attempted when neither of those resolved, so a name is
    /// never written under two semantically different fields.
    pub fn detection_order() -> &'static [FieldKind] {
        &[
            FieldKind::Email,
            FieldKind::FirstName,
            FieldKind::LastName,
            FieldKind::FullName,
            FieldKind::Username,
            FieldKind::Password,
            FieldKind::Phone,
        ]
    }

    /// Ordered selector matchers for this field, most specific first.
    pub fn selectors(&self) -> &'static [&'static str] {
        match self {
            FieldKind::Email => &[
                "input[type='email']",
                "input[name='email']",
                "input[id='email']",
                "input[name*='email' i]",
                "input[autocomplete='email']",
                "input[placeholder*='email' i]",
            ],
            FieldKind::FirstName => &[
                "input[name='first_name']",
                "input[name='firstName']",
                "input[name='fname']",
                "input[id*='first' i][id*='name' i]",
                "input[autocomplete='given-name']",
                "input[placeholder*='first name' i]",
            ],
            FieldKind::LastName => &[
                "input[name='last_name']",
                "input[name='lastName']",
                "input[name='lname']",
                "input[id*='last' i][id*='name' i]",
                "input[autocomplete='family-name']",
                "input[placeholder*='last name' i]",
            ],
            FieldKind::FullName => &[
                "input[name='name']",
                "input[name='full_name']",
                "input[name='fullName']",
                "input[autocomplete='name']",
                "input[placeholder*='full name' i]",
                "input[placeholder*='your name' i]",
            ],
            FieldKind::Username => &[
                "input[name='username']",
                "input[id='username']",
                "input[autocomplete='username']:not([type='email'])",
                "input[placeholder*='username' i]",
            ],
            FieldKind::Password => &[
                "input[type='password'][name*='password' i]",
                "input[type='password'][id*='password' i]",
                "input[autocomplete='new-password']",
                // Broadest: first password-typed input on the page.
                "input[type='password']",
            ],
            FieldKind::Phone => &[
                "input[type='tel']",
                "input[name='phone']",
                "input[name*='phone' i]",
                "input[autocomplete='tel']",
                "input[placeholder*='phone' i]",
            ],
        }
    }
}

/// Exact button texts tried first when dismissing consent banners,
/// highest priority first.
pub const CONSENT_TEXTS: &[&str] = &[
    "Accept all",
    "Accept All",
    "Allow all",
    "I agree",
    "Agree",
    "Accept",
    "Got it",
    "OK",
];

/// Structural consent selectors tried after text matching fails.
pub const CONSENT_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button[id*='accept' i][id*='cookie' i]",
    "button[aria-label*='accept' i]",
    "[data-testid='cookie-accept']",
    ".cc-allow",
];

/// Generic submit-button matchers, most specific first. When none resolves
/// the machine degrades to a confirm keystroke in the last-filled field.
pub const SUBMIT_SELECTORS: &[&str] = &[
    "button[type='submit']",
    "input[type='submit']",
    "form button:not([type='button'])",
    "button[id*='submit' i]",
    "button[id*='signup' i]",
    "button[id*='register' i]",
    "[role='button'][data-testid*='submit' i]",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_order_defers_full_name() {
        let order = FieldKind::detection_order();
        let pos = |k| order.iter().position(|f| *f == k).unwrap();
        assert!(pos(FieldKind::FirstName) < pos(FieldKind::FullName));
        assert!(pos(FieldKind::LastName) < pos(FieldKind::FullName));
    }

    #[test]
    fn password_falls_back_to_any_password_input() {
        let selectors = FieldKind::Password.selectors();
        assert_eq!(*selectors.last().unwrap(), "input[type='password']");
        assert!(selectors.len() > 1, "narrower matchers must come first");
    }

    #[test]
    fn parse_round_trips_field_names() {
        for kind in FieldKind::detection_order() {
            assert_eq!(FieldKind::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(FieldKind::parse("name"), Some(FieldKind::FullName));
        assert_eq!(FieldKind::parse("captcha"), None);
    }
}
