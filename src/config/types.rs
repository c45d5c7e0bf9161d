//! Core configuration types for portal lookups
//!
//! [`LookupConfig`] is split into one section per concern. Every field has a
//! default, so a JSON config file only needs the values it changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::invalid_codes::KnownInvalidCodeSet;
use crate::browser::navigation::NavigationPolicy;
use crate::lookup::backoff::{BackoffPolicy, JitterRange};
use crate::utils::constants::{
    ACCEPT_LANGUAGE, BLOCKED_RESOURCE_PATTERNS, BROWSER_LOCALE, DESKTOP_USER_AGENT,
    MINING_KEYWORDS, REINFO_CODE_COLUMN, REINFO_RESULTS_TABLE, REINFO_RUC_INPUT,
    REINFO_SEARCH_BUTTON, REINFO_URL, SUNAT_FORM_FRAME, SUNAT_RESULTS_PANEL,
    SUNAT_RESULTS_ROUTE, SUNAT_RUC_INPUT, SUNAT_SUBMIT_BUTTON, SUNAT_URL, VIEWPORT_HEIGHT,
    VIEWPORT_WIDTH,
};

/// Main configuration for a lookup run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub(crate) browser: BrowserSettings,
    pub(crate) reinfo: ReinfoSettings,
    pub(crate) sunat: SunatSettings,
    pub(crate) batch: BatchSettings,
}

impl LookupConfig {
    #[must_use]
    pub fn browser(&self) -> &BrowserSettings {
        &self.browser
    }

    #[must_use]
    pub fn reinfo(&self) -> &ReinfoSettings {
        &self.reinfo
    }

    #[must_use]
    pub fn sunat(&self) -> &SunatSettings {
        &self.sunat
    }

    #[must_use]
    pub fn batch(&self) -> &BatchSettings {
        &self.batch
    }
}

/// Browser process and page profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,

    /// Explicit Chrome/Chromium binary. Falls back to discovery when unset.
    pub chrome_executable: Option<PathBuf>,

    /// Profile directory. A per-process temp dir is used (and removed) when unset.
    pub user_data_dir: Option<PathBuf>,

    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub accept_language: String,

    /// URL patterns aborted on every page
    pub blocked_resource_patterns: Vec<String>,

    /// CDP request timeout
    pub request_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            user_data_dir: None,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            locale: BROWSER_LOCALE.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            blocked_resource_patterns: BLOCKED_RESOURCE_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect(),
            request_timeout_secs: 30,
        }
    }
}

impl BrowserSettings {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// DOM hooks of the REINFO search form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinfoSelectors {
    pub ruc_input: String,
    pub search_button: String,
    pub results_table: String,
}

impl Default for ReinfoSelectors {
    fn default() -> Self {
        Self {
            ruc_input: REINFO_RUC_INPUT.to_string(),
            search_button: REINFO_SEARCH_BUTTON.to_string(),
            results_table: REINFO_RESULTS_TABLE.to_string(),
        }
    }
}

/// REINFO lookup tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinfoSettings {
    pub url: String,
    pub max_attempts: u32,

    /// Attempt `n` gets `timeout_base_secs + timeout_step_secs * n`
    pub timeout_base_secs: u64,
    pub timeout_step_secs: u64,

    pub probe_timeout_secs: u64,
    pub navigation: NavigationPolicy,
    pub backoff: BackoffPolicy,

    /// Pause after the page settles, before touching the form
    pub settle_cooldown: JitterRange,
    /// Pause between filling the RUC and clicking search
    pub typing_pause: JitterRange,

    pub input_wait_secs: u64,
    pub button_wait_secs: u64,
    pub results_wait_secs: u64,

    pub selectors: ReinfoSelectors,

    /// Flattened header label of the unique-code column
    pub code_column: String,

    pub known_invalid_codes: KnownInvalidCodeSet,
}

impl Default for ReinfoSettings {
    fn default() -> Self {
        Self {
            url: REINFO_URL.to_string(),
            max_attempts: 4,
            timeout_base_secs: 25,
            timeout_step_secs: 5,
            probe_timeout_secs: 5,
            navigation: NavigationPolicy::default(),
            backoff: BackoffPolicy::default(),
            settle_cooldown: JitterRange::new(1.0, 2.0),
            typing_pause: JitterRange::new(0.5, 1.5),
            input_wait_secs: 10,
            button_wait_secs: 5,
            results_wait_secs: 12,
            selectors: ReinfoSelectors::default(),
            code_column: REINFO_CODE_COLUMN.to_string(),
            known_invalid_codes: KnownInvalidCodeSet::default(),
        }
    }
}

impl ReinfoSettings {
    /// Timeout budget of a 1-based attempt
    #[must_use]
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        Duration::from_secs(
            self.timeout_base_secs
                .saturating_add(self.timeout_step_secs.saturating_mul(u64::from(attempt))),
        )
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    #[must_use]
    pub fn input_wait(&self) -> Duration {
        Duration::from_secs(self.input_wait_secs)
    }

    #[must_use]
    pub fn button_wait(&self) -> Duration {
        Duration::from_secs(self.button_wait_secs)
    }

    #[must_use]
    pub fn results_wait(&self) -> Duration {
        Duration::from_secs(self.results_wait_secs)
    }
}

/// DOM hooks of the SUNAT consultation form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunatSelectors {
    pub ruc_input: String,
    pub submit_button: String,
    pub results_panel: String,
}

impl Default for SunatSelectors {
    fn default() -> Self {
        Self {
            ruc_input: SUNAT_RUC_INPUT.to_string(),
            submit_button: SUNAT_SUBMIT_BUTTON.to_string(),
            results_panel: SUNAT_RESULTS_PANEL.to_string(),
        }
    }
}

/// SUNAT lookup tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SunatSettings {
    pub url: String,
    pub attempts: u32,
    pub navigation_timeout_secs: u64,
    pub input_wait_secs: u64,

    /// Path suffix of the results page
    pub results_route: String,
    pub route_wait_secs: u64,
    pub panel_wait_secs: u64,

    /// Upper bound for single page actions (fill, click, reads)
    pub action_timeout_secs: u64,

    pub typing_pause: JitterRange,
    pub retry_cooldown: JitterRange,

    /// Frame the form may live in. `None` always uses the main document.
    pub form_frame: Option<String>,

    pub selectors: SunatSelectors,

    /// Lowercase substrings that mark an activity as mining related
    pub mining_keywords: Vec<String>,
}

impl Default for SunatSettings {
    fn default() -> Self {
        Self {
            url: SUNAT_URL.to_string(),
            attempts: 3,
            navigation_timeout_secs: 20,
            input_wait_secs: 10,
            results_route: SUNAT_RESULTS_ROUTE.to_string(),
            route_wait_secs: 15,
            panel_wait_secs: 10,
            action_timeout_secs: 30,
            typing_pause: JitterRange::new(1.0, 2.0),
            retry_cooldown: JitterRange::new(5.0, 10.0),
            form_frame: Some(SUNAT_FORM_FRAME.to_string()),
            selectors: SunatSelectors::default(),
            mining_keywords: MINING_KEYWORDS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl SunatSettings {
    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn input_wait(&self) -> Duration {
        Duration::from_secs(self.input_wait_secs)
    }

    #[must_use]
    pub fn route_wait(&self) -> Duration {
        Duration::from_secs(self.route_wait_secs)
    }

    #[must_use]
    pub fn panel_wait(&self) -> Duration {
        Duration::from_secs(self.panel_wait_secs)
    }

    #[must_use]
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

/// Batch pacing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Pause between consecutive identifiers
    pub inter_record_delay: JitterRange,

    /// Wall-clock cap for one identifier's lookup. `None` disables it.
    pub record_deadline_secs: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            inter_record_delay: JitterRange::new(0.5, 1.5),
            record_deadline_secs: Some(600),
        }
    }
}

impl BatchSettings {
    #[must_use]
    pub fn record_deadline(&self) -> Option<Duration> {
        self.record_deadline_secs.map(Duration::from_secs)
    }
}
