//! Single-address signup probe
//!
//! Drives one address through the GitHub signup form and classifies the
//! result. Faults (navigation errors, timeouts, missing elements) never
//! escape a check: they are logged with a truncated message and come back
//! as `Outcome::Error`.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use crate::browser::CheckerSession;
use crate::classify::{classify, Outcome};

/// Email-field locator strategies, tried in order; first match wins.
const EMAIL_FIELD_SELECTORS: [&str; 3] =
    ["input#email", "input[name='user[login]']", "input[type='email']"];

/// Polling interval while waiting for the email field to become visible.
const FIELD_POLL_MS: u64 = 250;

/// Probes one address against the signup form.
///
/// The batch loop is written against this trait so tests can script
/// outcomes without a browser. An `Err` from an implementation lands in the
/// error bucket; the live implementation never returns one.
#[async_trait]
pub trait SignupProbe: Send {
    async fn check(&mut self, email: &str) -> Result<Outcome>;
}

/// Timing and target configuration for the live probe.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Signup form URL.
    pub signup_url: String,
    /// Navigation timeout.
    pub nav_timeout_ms: u64,
    /// Settle delay after navigation, for client-side script execution.
    pub settle_ms: u64,
    /// How long to wait for the email field to become visible.
    pub field_timeout_ms: u64,
    /// Per-character typing delay. Simulates human input.
    pub type_delay_ms: u64,
    /// Pause after typing, before blurring the field.
    pub post_type_ms: u64,
    /// Settle delay after blur, for the async validation round trip.
    pub blur_settle_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            signup_url: "https://github.com/signup".to_string(),
            nav_timeout_ms: 30_000,
            settle_ms: 2_000,
            field_timeout_ms: 10_000,
            type_delay_ms: 50,
            post_type_ms: 1_000,
            blur_settle_ms: 3_000,
        }
    }
}

/// Live probe driving a [`CheckerSession`].
pub struct BrowserProbe {
    session: CheckerSession,
    config: ProbeConfig,
}

impl BrowserProbe {
    pub fn new(session: CheckerSession, config: ProbeConfig) -> Self {
        Self { session, config }
    }

    /// Give the session back for teardown.
    pub fn into_session(self) -> CheckerSession {
        self.session
    }

    /// The full check procedure for one address. Step order mirrors the
    /// provider's observable behavior contract and must not be reordered.
    async fn run_check(&self, email: &str) -> Result<Outcome> {
        // Fresh signup form, then let client-side scripts boot
        self.session
            .goto(&self.config.signup_url, self.config.nav_timeout_ms)
            .await?;
        sleep_ms(self.config.settle_ms).await;

        let selector = self.wait_for_email_field().await?;
        let field = self.session.page().find_element(selector).await?;

        // Clear any previous value, then type like a human would
        self.clear_field(selector).await?;
        field.click().await?;
        for ch in email.chars() {
            field.type_str(ch.to_string()).await?;
            sleep_ms(self.config.type_delay_ms).await;
        }
        sleep_ms(self.config.post_type_ms).await;

        // Blur triggers the async validation; give the round trip time
        field.press_key("Tab").await?;
        sleep_ms(self.config.blur_settle_ms).await;

        let html = self.session.content().await?;
        let password_visible = self.password_visible().await.unwrap_or(false);

        Ok(classify(&html, password_visible))
    }

    /// Wait for any email-field selector to match a visible element.
    /// Returns the winning selector.
    async fn wait_for_email_field(&self) -> Result<&'static str> {
        let deadline = Instant::now() + Duration::from_millis(self.config.field_timeout_ms);

        loop {
            for selector in EMAIL_FIELD_SELECTORS {
                if self.is_visible(selector).await.unwrap_or(false) {
                    return Ok(selector);
                }
            }

            if Instant::now() >= deadline {
                anyhow::bail!(
                    "email input not visible within {}ms",
                    self.config.field_timeout_ms
                );
            }
            sleep_ms(FIELD_POLL_MS).await;
        }
    }

    /// Element visibility check: present and laid out.
    async fn is_visible(&self, selector: &str) -> Result<bool> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({}); \
             return !!el && el.offsetParent !== null; }})()",
            js_string(selector)
        );
        self.session.eval_bool(&expr).await
    }

    /// Reset the field value and notify the form's listeners.
    async fn clear_field(&self, selector: &str) -> Result<()> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({}); if (el) {{ \
             el.value = ''; \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); }} }})()",
            js_string(selector)
        );
        self.session.page().evaluate(expr).await?;
        Ok(())
    }

    /// GitHub reveals the password field only after accepting the email.
    async fn password_visible(&self) -> Result<bool> {
        self.session
            .eval_bool(
                "(() => { const el = document.querySelector('input[type=password]'); \
                 return !!el && el.offsetParent !== null; })()",
            )
            .await
    }
}

#[async_trait]
impl SignupProbe for BrowserProbe {
    async fn check(&mut self, email: &str) -> Result<Outcome> {
        match self.run_check(email).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(
                    email,
                    error = %truncate(&e.to_string(), 100),
                    "check failed"
                );
                Ok(Outcome::Error)
            }
        }
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Encode a selector as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_provider_contract() {
        let cfg = ProbeConfig::default();
        assert_eq!(cfg.signup_url, "https://github.com/signup");
        assert_eq!(cfg.nav_timeout_ms, 30_000);
        assert_eq!(cfg.field_timeout_ms, 10_000);
        assert_eq!(cfg.blur_settle_ms, 3_000);
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("input#email"), r#""input#email""#);
        assert_eq!(
            js_string("input[name='user[login]']"),
            r#""input[name='user[login]']""#
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate(&"x".repeat(200), 100).chars().count(), 100);
        assert!(truncate(&"x".repeat(200), 100).ends_with("..."));
    }

    #[test]
    fn test_selector_order_is_id_name_type() {
        assert_eq!(EMAIL_FIELD_SELECTORS[0], "input#email");
        assert_eq!(EMAIL_FIELD_SELECTORS[1], "input[name='user[login]']");
        assert_eq!(EMAIL_FIELD_SELECTORS[2], "input[type='email']");
    }
}
