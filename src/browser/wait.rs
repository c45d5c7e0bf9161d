//! Load-state and element polling over CDP
//!
//! chromiumoxide has no notion of "DOM parsed" or "network idle", so these
//! helpers poll the page with small script evaluations. None of them has its
//! own deadline; callers bound them with
//! [`with_page_timeout`](super::timeout::with_page_timeout).

use anyhow::Result;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tracing::trace;

use crate::utils::constants::{NETWORK_IDLE_WINDOW, POLL_INTERVAL};

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    /// The document has been parsed
    DomContentLoaded,
    /// The load event fired
    Load,
    /// Loaded, and no new resource requests for a short quiet window
    NetworkIdle,
}

impl WaitCondition {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomContentLoaded => "domcontentloaded",
            Self::Load => "load",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Whether a `document.readyState` value satisfies the condition.
    /// For `NetworkIdle` this is only the precondition.
    #[must_use]
    pub fn is_ready_state_satisfied(&self, ready_state: &str) -> bool {
        match self {
            Self::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            Self::Load | Self::NetworkIdle => ready_state == "complete",
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// about:blank reports "complete" immediately; treat it as not loaded yet
const LOAD_PROBE_JS: &str = r"(() => ({
    state: document.URL === 'about:blank' ? 'blank' : document.readyState,
    resources: performance.getEntriesByType('resource').length
}))()";

#[derive(Debug, Deserialize)]
struct LoadProbe {
    state: String,
    resources: u64,
}

async fn probe_load(page: &Page) -> Option<LoadProbe> {
    // Evaluation fails while the execution context is being replaced
    match page.evaluate(LOAD_PROBE_JS).await {
        Ok(result) => result.into_value::<LoadProbe>().ok(),
        Err(e) => {
            trace!("load probe failed mid-navigation: {e}");
            None
        }
    }
}

/// Poll until `condition` holds on the current document
pub async fn wait_for_condition(page: &Page, condition: WaitCondition) -> Result<()> {
    let mut last_resources: Option<u64> = None;
    let mut quiet_since = Instant::now();

    loop {
        if let Some(probe) = probe_load(page).await
            && condition.is_ready_state_satisfied(&probe.state)
        {
            if condition != WaitCondition::NetworkIdle {
                return Ok(());
            }
            if last_resources == Some(probe.resources) {
                if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                    return Ok(());
                }
            } else {
                last_resources = Some(probe.resources);
                quiet_since = Instant::now();
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// JavaScript expression for the document the form lives in
#[must_use]
pub fn document_root(frame: Option<&str>) -> String {
    match frame {
        Some(name) => format!("window.frames[{}].document", js_string(name)),
        None => "document".to_string(),
    }
}

/// Quote a value as a JavaScript string literal
#[must_use]
pub fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Whether a same-origin frame with this name is present and readable
pub async fn frame_exists(page: &Page, name: &str) -> Result<bool> {
    let script = format!(
        "(() => {{ try {{ const f = window.frames[{}]; return !!(f && f.document && f.document.body); }} catch (e) {{ return false; }} }})()",
        js_string(name)
    );
    Ok(page.evaluate(script).await?.into_value::<bool>()?)
}

/// Poll until `selector` matches in `root`
pub async fn wait_for_element(page: &Page, root: &str, selector: &str) -> Result<()> {
    let script = format!(
        "(() => {{ try {{ return !!{root}.querySelector({}); }} catch (e) {{ return false; }} }})()",
        js_string(selector)
    );
    loop {
        let found = match page.evaluate(script.as_str()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                trace!(selector, "element probe failed: {e}");
                false
            }
        };
        if found {
            return Ok(());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Whether a URL's path ends with `suffix` (query and fragment ignored)
#[must_use]
pub fn url_path_ends_with(url: &str, suffix: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with(suffix),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).ends_with(suffix),
    }
}

/// Poll until the page URL path ends with `suffix`
pub async fn wait_for_url(page: &Page, suffix: &str) -> Result<String> {
    loop {
        if let Ok(Some(current)) = page.url().await
            && url_path_ends_with(&current, suffix)
        {
            return Ok(current);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
