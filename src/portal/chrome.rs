//! chromiumoxide implementation of the portal traits

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{PortalDriver, PortalPage, PortalScope};
use crate::browser::page_guard::PageGuard;
use crate::browser::session::{BrowserSession, BrowsingContext};
use crate::browser::wait::{self, WaitCondition, document_root, js_string};
use crate::error::LookupError;

/// Opens one browsing context per scope on a shared session
#[derive(Clone)]
pub struct ChromeDriver {
    session: Arc<BrowserSession>,
}

impl ChromeDriver {
    #[must_use]
    pub fn new(session: Arc<BrowserSession>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }
}

#[async_trait]
impl PortalDriver for ChromeDriver {
    type Scope = ChromeScope;

    async fn open_scope(&self) -> Result<ChromeScope> {
        let context = self.session.new_context().await?;
        Ok(ChromeScope { context })
    }
}

/// Browsing context scope; disposed on close or drop
pub struct ChromeScope {
    context: BrowsingContext,
}

#[async_trait]
impl PortalScope for ChromeScope {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage> {
        let guard = self.context.new_page().await?;
        Ok(ChromePage::new(guard))
    }

    async fn close(self) -> Result<()> {
        self.context.dispose().await
    }
}

pub struct ChromePage {
    page: PageGuard,
    /// JS expression of the document element operations run against
    root: String,
}

impl ChromePage {
    #[must_use]
    pub fn new(page: PageGuard) -> Self {
        Self {
            page,
            root: document_root(None),
        }
    }

    /// Run a script that returns `false` when the selector matched nothing
    async fn run_on_element(&self, selector: &str, body: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const el = {}.querySelector({}); if (!el) return false; {body} return true; }})()",
            self.root,
            js_string(selector)
        );
        let found: bool = self
            .page
            .evaluate(script)
            .await
            .with_context(|| format!("Script on '{selector}' failed"))?
            .into_value()?;
        if found {
            Ok(())
        } else {
            Err(LookupError::ElementNotFound {
                selector: selector.to_string(),
            }
            .into())
        }
    }
}

#[async_trait]
impl PortalPage for ChromePage {
    async fn navigate(&mut self, url: &str, condition: WaitCondition) -> Result<()> {
        self.root = document_root(None);
        let response = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .with_context(|| format!("Navigation command to {url} failed"))?;

        if let Some(message) = response.result.error_text.clone() {
            return Err(LookupError::Navigation {
                url: url.to_string(),
                message,
            }
            .into());
        }

        wait::wait_for_condition(&self.page, condition).await?;
        trace!(url, %condition, "Navigation settled");
        Ok(())
    }

    async fn wait_for_load_state(&self, condition: WaitCondition) -> Result<()> {
        wait::wait_for_condition(&self.page, condition).await
    }

    async fn focus_frame(&mut self, name: Option<&str>) -> Result<bool> {
        let Some(name) = name else {
            self.root = document_root(None);
            return Ok(true);
        };
        if wait::frame_exists(&self.page, name).await? {
            debug!(frame = name, "Focused frame");
            self.root = document_root(Some(name));
            Ok(true)
        } else {
            self.root = document_root(None);
            Ok(false)
        }
    }

    async fn wait_for_element(&self, selector: &str) -> Result<()> {
        wait::wait_for_element(&self.page, &self.root, selector).await
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let body = format!(
            "el.focus(); el.value = {}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            js_string(value)
        );
        self.run_on_element(selector, &body).await
    }

    async fn click_trigger(&self, selector: &str) -> Result<()> {
        // Deferred so the evaluation returns before a form post tears the
        // execution context down
        self.run_on_element(selector, "setTimeout(() => el.click(), 0);")
            .await
    }

    async fn wait_for_url(&self, suffix: &str) -> Result<String> {
        wait::wait_for_url(&self.page, suffix).await
    }

    async fn element_html(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = {}.querySelector({}); return el ? el.outerHTML : ''; }})()",
            self.root,
            js_string(selector)
        );
        // Empty string instead of null; a null result has no value to decode
        let html: String = self.page.evaluate(script).await?.into_value()?;
        Ok((!html.is_empty()).then_some(html))
    }

    async fn document_html(&self) -> Result<String> {
        let script = format!("{}.documentElement.outerHTML", self.root);
        let html: String = self.page.evaluate(script).await?.into_value()?;
        Ok(html)
    }

    async fn close(self) -> Result<()> {
        self.page.close().await
    }
}
