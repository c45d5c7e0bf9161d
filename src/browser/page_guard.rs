//! RAII guard for chromiumoxide pages

use anyhow::{Context, Result};
use chromiumoxide::Page;
use std::ops::Deref;
use tracing::debug;

/// Closes the wrapped page when dropped, unless [`close`](Self::close) ran
///
/// A lookup that is cancelled mid-attempt (deadline expiry drops the future)
/// would otherwise leak a tab in the shared browser.
pub struct PageGuard {
    page: Page,
    closed: bool,
}

impl PageGuard {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page,
            closed: false,
        }
    }

    /// Close the page and wait for the target to go away
    pub async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.page
            .clone()
            .close()
            .await
            .context("Failed to close page")
    }
}

impl Deref for PageGuard {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.page
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // No runtime means the browser is going away with it
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let page = self.page.clone();
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    debug!("Page close on drop failed: {e}");
                }
            });
        }
    }
}
