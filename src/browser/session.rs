//! Browser process and browsing-context lifecycle
//!
//! One [`BrowserSession`] owns one Chromium process for a whole batch.
//! Lookups get isolated [`BrowsingContext`]s (incognito-like: no shared
//! cookies or cache) instead of relaunching the browser per attempt.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, SetBlockedUrLsParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::page_guard::PageGuard;
use super::setup::launch_browser;
use crate::config::BrowserSettings;
use crate::error::LookupError;

/// Browser plus its CDP handler task
///
/// The handler must be aborted once the browser is gone or it keeps polling
/// a dead websocket.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    /// Temp profile to remove after exit. `None` for caller-owned profiles.
    user_data_dir: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn new(
        browser: Browser,
        handler: JoinHandle<()>,
        user_data_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            browser,
            handler,
            user_data_dir,
        }
    }

    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close the process and wait for it to exit. Errors are logged only.
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {e}");
        }
        self.cleanup_temp_dir();
    }

    /// Remove the temp profile. Must run after the process exited or
    /// Windows refuses to delete locked files.
    pub fn cleanup_temp_dir(&mut self) {
        if let Some(path) = self.user_data_dir.take() {
            debug!("Cleaning up temp directory: {}", path.display());
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(
                    "Failed to clean up temp directory {}: {e}. Manual cleanup may be required.",
                    path.display()
                );
            }
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.is_some() {
            debug!("BrowserWrapper dropped without shutdown, removing temp dir");
            self.cleanup_temp_dir();
        }
    }
}

struct OpenBrowser {
    wrapper: BrowserWrapper,
    default_context: Option<BrowserContextId>,
}

/// Lazily launched, mutex-guarded browser shared by every lookup in a batch
pub struct BrowserSession {
    settings: BrowserSettings,
    state: Mutex<Option<OpenBrowser>>,
}

impl BrowserSession {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Launch the browser and its default context. No-op when already open
    /// and healthy; a crashed browser is torn down and relaunched.
    pub async fn open(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        self.ensure_open(&mut guard).await
    }

    async fn ensure_open(&self, guard: &mut Option<OpenBrowser>) -> Result<()> {
        if let Some(open) = guard.as_ref() {
            match open.wrapper.browser().version().await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    warn!("Browser health check failed: {e}. Relaunching");
                    if let Some(crashed) = guard.take() {
                        crashed.wrapper.shutdown().await;
                    }
                }
            }
        }

        let wrapper = launch_browser(&self.settings).await?;
        let default_context = create_context(wrapper.browser()).await?;
        *guard = Some(OpenBrowser {
            wrapper,
            default_context: Some(default_context),
        });
        Ok(())
    }

    /// New configured page in the default context
    pub async fn new_page(&self) -> Result<PageGuard> {
        self.page_in(None).await
    }

    /// New isolated browsing context sharing this browser process
    pub async fn new_context(self: &Arc<Self>) -> Result<BrowsingContext> {
        let mut guard = self.state.lock().await;
        self.ensure_open(&mut guard).await?;
        let open = guard
            .as_ref()
            .ok_or_else(|| LookupError::Browser("browser closed while creating context".to_string()))?;
        let id = create_context(open.wrapper.browser()).await?;
        debug!(context = ?id, "Created browsing context");
        Ok(BrowsingContext {
            session: Arc::clone(self),
            id: Some(id),
        })
    }

    async fn page_in(&self, context: Option<&BrowserContextId>) -> Result<PageGuard> {
        let page = {
            let mut guard = self.state.lock().await;
            self.ensure_open(&mut guard).await?;
            let open = guard
                .as_ref()
                .ok_or_else(|| LookupError::Browser("browser closed while creating page".to_string()))?;

            let context_id = context.or(open.default_context.as_ref()).cloned();
            let mut params = CreateTargetParams::new("about:blank");
            params.browser_context_id = context_id;

            open.wrapper
                .browser()
                .new_page(params)
                .await
                .context("Failed to create page")?
        };

        // Guard first so a failed setup still closes the tab
        let guard = PageGuard::new(page);
        configure_page(&guard, &self.settings).await?;
        Ok(guard)
    }

    async fn dispose_context(&self, id: BrowserContextId) -> Result<()> {
        let guard = self.state.lock().await;
        if let Some(open) = guard.as_ref() {
            open.wrapper
                .browser()
                .execute(DisposeBrowserContextParams::new(id))
                .await
                .context("Failed to dispose browsing context")?;
        }
        Ok(())
    }

    /// Dispose the default context and shut the browser down.
    /// Safe to call repeatedly and on a session that never opened.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        if let Some(open) = guard.take() {
            info!("Shutting down browser");
            if let Some(id) = open.default_context
                && let Err(e) = open
                    .wrapper
                    .browser()
                    .execute(DisposeBrowserContextParams::new(id))
                    .await
            {
                debug!("Default context already gone: {e}");
            }
            open.wrapper.shutdown().await;
        }
        Ok(())
    }
}

async fn create_context(browser: &Browser) -> Result<BrowserContextId> {
    let response = browser
        .execute(CreateBrowserContextParams::default())
        .await
        .context("Failed to create browsing context")?;
    Ok(response.result.browser_context_id)
}

/// Apply the portal profile to a fresh page: user agent and
/// Accept-Language, viewport, locale, blocked resource patterns
async fn configure_page(page: &Page, settings: &BrowserSettings) -> Result<()> {
    let mut user_agent = SetUserAgentOverrideParams::new(settings.user_agent.clone());
    user_agent.accept_language = Some(settings.accept_language.clone());
    page.execute(user_agent)
        .await
        .context("Failed to set user agent")?;

    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(settings.viewport_width),
        i64::from(settings.viewport_height),
        1.0,
        false,
    ))
    .await
    .context("Failed to set viewport")?;

    // Locale emulation is best effort; older Chromium builds reject it
    if let Err(e) = page
        .execute(SetLocaleOverrideParams {
            locale: Some(settings.locale.clone()),
        })
        .await
    {
        debug!("Locale override rejected: {e}");
    }

    if !settings.blocked_resource_patterns.is_empty() {
        page.execute(EnableParams::default())
            .await
            .context("Failed to enable network domain")?;
        page.execute(SetBlockedUrLsParams::new(
            settings.blocked_resource_patterns.clone(),
        ))
        .await
        .context("Failed to set blocked URL patterns")?;
    }
    Ok(())
}

/// Isolated context inside a [`BrowserSession`]
///
/// Dropping without [`dispose`](Self::dispose) schedules disposal on the
/// runtime, so cancelled lookups do not pile up contexts.
pub struct BrowsingContext {
    session: Arc<BrowserSession>,
    id: Option<BrowserContextId>,
}

impl BrowsingContext {
    /// New configured page inside this context
    pub async fn new_page(&self) -> Result<PageGuard> {
        let id = self
            .id
            .as_ref()
            .ok_or_else(|| LookupError::Browser("browsing context already disposed".to_string()))?;
        self.session.page_in(Some(id)).await
    }

    /// Dispose the context and every page still open in it
    pub async fn dispose(mut self) -> Result<()> {
        match self.id.take() {
            Some(id) => self.session.dispose_context(id).await,
            None => Ok(()),
        }
    }
}

impl Drop for BrowsingContext {
    fn drop(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let session = Arc::clone(&self.session);
            handle.spawn(async move {
                if let Err(e) = session.dispose_context(id).await {
                    debug!("Context disposal on drop failed: {e:#}");
                }
            });
        }
    }
}
