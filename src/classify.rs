//! Outcome classification from signup-page state
//!
//! GitHub's signup form validates the email client-side and the result is
//! only observable in rendered text and DOM state. Rule order is load-bearing:
//! a page can show a stale success icon next to fresh "already been taken"
//! text, and the text match must win.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Classification result for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The address already has a GitHub account
    Registered,
    /// The signup form accepted the address
    Available,
    /// The form rejected the address as malformed
    Invalid,
    /// Ambiguous page state or a probe fault - catch-all, not necessarily a failure
    Error,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Registered => write!(f, "registered"),
            Outcome::Available => write!(f, "available"),
            Outcome::Invalid => write!(f, "invalid"),
            Outcome::Error => write!(f, "error"),
        }
    }
}

/// Text fragments that mean the address already has an account.
const REGISTERED_PATTERNS: [&str; 2] = ["already associated", "already been taken"];

/// Text fragments that mean the form rejected the address outright.
const INVALID_PATTERNS: [&str; 2] = ["not a valid email", "not valid"];

/// Selectors for the green-check success indicator next to the email field.
const SUCCESS_SELECTORS: [&str; 4] = [
    "svg.color-fg-success",
    ".color-fg-success",
    "[class*='success'] svg",
    ".octicon-check",
];

/// Classify one signup attempt from the rendered page.
///
/// `password_visible` is the live visibility of the password input, gathered
/// by the probe - GitHub only reveals that field after accepting the email.
pub fn classify(html: &str, password_visible: bool) -> Outcome {
    let lower = html.to_lowercase();

    if REGISTERED_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Outcome::Registered;
    }

    if has_success_indicator(html) {
        return Outcome::Available;
    }

    if password_visible {
        return Outcome::Available;
    }

    if INVALID_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Outcome::Invalid;
    }

    Outcome::Error
}

/// Detect the success checkmark / success-colored element in the HTML.
fn has_success_indicator(html: &str) -> bool {
    let doc = Html::parse_document(html);

    for sel_str in SUCCESS_SELECTORS {
        if let Ok(sel) = Selector::parse(sel_str) {
            if doc.select(&sel).next().is_some() {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Registered.to_string(), "registered");
        assert_eq!(Outcome::Available.to_string(), "available");
        assert_eq!(Outcome::Invalid.to_string(), "invalid");
        assert_eq!(Outcome::Error.to_string(), "error");
    }

    #[test]
    fn test_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&Outcome::Registered).unwrap(),
            r#""registered""#
        );
        let parsed: Outcome = serde_json::from_str(r#""available""#).unwrap();
        assert_eq!(parsed, Outcome::Available);
    }

    #[test]
    fn test_registered_by_text() {
        let html = "<div>Email is already associated with an account</div>";
        assert_eq!(classify(html, false), Outcome::Registered);

        let html = "<p>email has already been taken</p>";
        assert_eq!(classify(html, false), Outcome::Registered);
    }

    #[test]
    fn test_registered_case_insensitive() {
        let html = "<div>Already Been Taken</div>";
        assert_eq!(classify(html, false), Outcome::Registered);
    }

    #[test]
    fn test_available_by_success_icon() {
        let html = r#"<svg class="octicon octicon-check"></svg>"#;
        assert_eq!(classify(html, false), Outcome::Available);

        let html = r#"<span class="color-fg-success">looks good</span>"#;
        assert_eq!(classify(html, false), Outcome::Available);
    }

    #[test]
    fn test_available_by_password_field() {
        let html = "<form><input type='email'></form>";
        assert_eq!(classify(html, true), Outcome::Available);
    }

    #[test]
    fn test_invalid_by_text() {
        let html = "<div>Email is not a valid email address</div>";
        assert_eq!(classify(html, false), Outcome::Invalid);
    }

    #[test]
    fn test_ambiguous_is_error() {
        assert_eq!(classify("<html><body></body></html>", false), Outcome::Error);
    }

    #[test]
    fn test_registered_text_beats_success_icon() {
        // Stale checkmark alongside fresh error text: the text match must win.
        let html = r#"
            <svg class="octicon-check"></svg>
            <div class="error">email has already been taken</div>
        "#;
        assert_eq!(classify(html, false), Outcome::Registered);
    }

    #[test]
    fn test_registered_text_beats_password_visibility() {
        let html = "<div>already associated</div>";
        assert_eq!(classify(html, true), Outcome::Registered);
    }

    #[test]
    fn test_success_icon_beats_invalid_text() {
        let html = r#"<svg class="color-fg-success"></svg><div>not valid</div>"#;
        assert_eq!(classify(html, false), Outcome::Available);
    }
}
