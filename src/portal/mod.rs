//! Page adapter seam between the lookup logic and the browser
//!
//! Orchestrators only talk to these traits, so the retry and classification
//! logic runs unchanged against Chromium ([`chrome`]) or a scripted test
//! double. Methods carry no deadlines of their own; callers bound every call
//! with [`with_page_timeout`](crate::browser::timeout::with_page_timeout).

pub mod chrome;

use anyhow::Result;
use async_trait::async_trait;

use crate::browser::wait::WaitCondition;

pub use chrome::{ChromeDriver, ChromePage, ChromeScope};

/// Hands out isolated scopes (browsing contexts)
#[async_trait]
pub trait PortalDriver: Send + Sync {
    type Scope: PortalScope;

    async fn open_scope(&self) -> Result<Self::Scope>;
}

/// One isolated browsing context. Pages opened here share cookies with each
/// other and nothing else.
#[async_trait]
pub trait PortalScope: Send + Sync {
    type Page: PortalPage;

    async fn new_page(&self) -> Result<Self::Page>;

    /// Dispose the scope and anything still open in it
    async fn close(self) -> Result<()>;
}

/// A single tab
#[async_trait]
pub trait PortalPage: Send + Sync {
    /// Load `url` and wait until `condition` holds
    async fn navigate(&mut self, url: &str, condition: WaitCondition) -> Result<()>;

    /// Wait for `condition` on the already loaded document
    async fn wait_for_load_state(&self, condition: WaitCondition) -> Result<()>;

    /// Scope element operations to the named child frame. Returns `false` and
    /// stays on the main document when the frame does not exist; `None`
    /// always returns to the main document.
    async fn focus_frame(&mut self, name: Option<&str>) -> Result<bool>;

    async fn wait_for_element(&self, selector: &str) -> Result<()>;

    /// Replace an input's value, firing `input` and `change`
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    async fn click_trigger(&self, selector: &str) -> Result<()>;

    /// Wait until the page URL path ends with `suffix`; returns the URL
    async fn wait_for_url(&self, suffix: &str) -> Result<String>;

    /// Outer HTML of the first match, `None` when nothing matches
    async fn element_html(&self, selector: &str) -> Result<Option<String>>;

    /// Serialized HTML of the focused document
    async fn document_html(&self) -> Result<String>;

    async fn close(self) -> Result<()>;
}
