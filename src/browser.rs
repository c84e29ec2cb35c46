//! Headless Chrome session management via chromiumoxide
//!
//! One browser, one page, reused for a whole batch. GitHub's signup flow is
//! stateful per page, so concurrent checks against a shared page would
//! corrupt results - the session is exclusively owned by one batch run.

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;

/// Desktop Chrome user agent; headless defaults advertise automation.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Hides `navigator.webdriver` before any page script runs.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

/// A headless Chrome session holding the single page used for checks.
pub struct CheckerSession {
    browser: Browser,
    page: Page,
}

impl CheckerSession {
    /// Launch Chrome and prepare one page with a realistic fingerprint.
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--headless=new")
            .viewport(Viewport {
                width: 1280,
                height: 900,
                ..Default::default()
            })
            .build()
            .map_err(|e| anyhow::anyhow!("Browser config error: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chrome. Is Chrome/Chromium installed?")?;

        // Drive CDP events in the background for the life of the session
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = browser.new_page("about:blank").await?;

        page.execute(SetUserAgentOverrideParams::new(USER_AGENT))
            .await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await?;

        Ok(Self { browser, page })
    }

    /// Navigate the page and wait for the load to finish, bounded by
    /// `timeout_ms`. Client-side settling is the caller's concern.
    pub async fn goto(&self, url: &str, timeout_ms: u64) -> Result<()> {
        tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("Navigation timeout")??;

        Ok(())
    }

    /// Full rendered HTML of the current page.
    pub async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .context("Failed to get page content")
    }

    /// Evaluate a JS expression and deserialize its boolean result.
    pub async fn eval_bool(&self, expr: &str) -> Result<bool> {
        let value = self.page.evaluate(expr).await?.into_value()?;
        Ok(value)
    }

    /// The session's page, for element-level interaction.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Close the browser. Always called at the end of a batch, success or
    /// failure.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
