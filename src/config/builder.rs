//! Fluent builder for `LookupConfig`
//!
//! Every field has a default, so unlike a typestate builder there is nothing
//! to enforce at compile time; `build()` runs [`LookupConfig::validate`].

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use super::invalid_codes::KnownInvalidCodeSet;
use super::types::{BatchSettings, BrowserSettings, LookupConfig, ReinfoSettings, SunatSettings};
use crate::lookup::backoff::{BackoffPolicy, JitterRange};

#[derive(Debug, Clone, Default)]
pub struct LookupConfigBuilder {
    config: LookupConfig,
}

impl LookupConfig {
    #[must_use]
    pub fn builder() -> LookupConfigBuilder {
        LookupConfigBuilder::default()
    }
}

impl LookupConfigBuilder {
    /// Start from an existing config instead of the defaults
    #[must_use]
    pub fn from_config(config: LookupConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn browser(mut self, browser: BrowserSettings) -> Self {
        self.config.browser = browser;
        self
    }

    #[must_use]
    pub fn reinfo(mut self, reinfo: ReinfoSettings) -> Self {
        self.config.reinfo = reinfo;
        self
    }

    #[must_use]
    pub fn sunat(mut self, sunat: SunatSettings) -> Self {
        self.config.sunat = sunat;
        self
    }

    #[must_use]
    pub fn batch(mut self, batch: BatchSettings) -> Self {
        self.config.batch = batch;
        self
    }

    /// Run with or without a visible window
    ///
    /// Headed mode needs a display server and is only useful when watching a
    /// portal misbehave.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.browser.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.browser.chrome_executable = Some(path.into());
        self
    }

    #[must_use]
    pub fn reinfo_url(mut self, url: impl Into<String>) -> Self {
        self.config.reinfo.url = url.into();
        self
    }

    #[must_use]
    pub fn sunat_url(mut self, url: impl Into<String>) -> Self {
        self.config.sunat.url = url.into();
        self
    }

    #[must_use]
    pub fn reinfo_max_attempts(mut self, attempts: u32) -> Self {
        self.config.reinfo.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn sunat_attempts(mut self, attempts: u32) -> Self {
        self.config.sunat.attempts = attempts;
        self
    }

    #[must_use]
    pub fn reinfo_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.reinfo.backoff = backoff;
        self
    }

    #[must_use]
    pub fn known_invalid_codes(mut self, codes: KnownInvalidCodeSet) -> Self {
        self.config.reinfo.known_invalid_codes = codes;
        self
    }

    #[must_use]
    pub fn inter_record_delay(mut self, delay: JitterRange) -> Self {
        self.config.batch.inter_record_delay = delay;
        self
    }

    /// Cap on one identifier's lookup; `None` lets it run to completion
    #[must_use]
    pub fn record_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.config.batch.record_deadline_secs = deadline.map(|d| d.as_secs().max(1));
        self
    }

    /// Zero every randomized pause and cooldown. Backoff is left alone.
    #[must_use]
    pub fn without_pauses(mut self) -> Self {
        self.config.reinfo.settle_cooldown = JitterRange::zero();
        self.config.reinfo.typing_pause = JitterRange::zero();
        self.config.reinfo.navigation.retry_pause_secs = 0.0;
        self.config.sunat.typing_pause = JitterRange::zero();
        self.config.sunat.retry_cooldown = JitterRange::zero();
        self.config.batch.inter_record_delay = JitterRange::zero();
        self
    }

    pub fn build(self) -> Result<LookupConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
