//! REINFO unique-code lookup
//!
//! One browsing context per identifier: a reachability probe, then up to
//! `max_attempts` attempts with a growing timeout budget and exponential
//! backoff in between. The lookup is total; every failure ends in one of the
//! [`ReinfoOutcome`] sentinels.

use anyhow::Result;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::state::{LookupState, LookupTrace, Traced};
use crate::browser::navigation::NavigationRetrier;
use crate::browser::probe::SiteAvailabilityProbe;
use crate::browser::timeout::with_page_timeout;
use crate::browser::wait::WaitCondition;
use crate::config::ReinfoSettings;
use crate::error::{LookupError, is_timeout_error};
use crate::extract::table::parse_table;
use crate::portal::{PortalDriver, PortalPage, PortalScope};
use crate::utils::constants::{
    GENERIC_ERROR, INVALID_RESULT, NO_REINFO, SITE_UNAVAILABLE, TIMEOUT_ERROR,
};
use crate::utils::ruc::normalize_ruc;

/// Terminal answer of a REINFO lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinfoOutcome {
    /// Distinct unique codes in first-seen order
    Codes(Vec<String>),
    /// The results table has no unique-code column
    NotRegistered,
    /// The stale default set came back on every attempt
    InvalidResult,
    /// The probe failed; no attempt was made
    SiteUnavailable,
    /// Every attempt failed
    TimedOut,
    /// The lookup could not start
    Error,
}

impl ReinfoOutcome {
    /// Rendered value: codes joined with `", "` or the sentinel string
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Codes(codes) => codes.join(", "),
            Self::NotRegistered => NO_REINFO.to_string(),
            Self::InvalidResult => INVALID_RESULT.to_string(),
            Self::SiteUnavailable => SITE_UNAVAILABLE.to_string(),
            Self::TimedOut => TIMEOUT_ERROR.to_string(),
            Self::Error => GENERIC_ERROR.to_string(),
        }
    }

    /// The lookup failed to produce an answer (as opposed to a negative one)
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidResult | Self::SiteUnavailable | Self::TimedOut | Self::Error
        )
    }

    #[must_use]
    pub fn codes(&self) -> Option<&[String]> {
        match self {
            Self::Codes(codes) => Some(codes),
            _ => None,
        }
    }
}

impl fmt::Display for ReinfoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for ReinfoOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// What a single successful attempt read from the portal
enum AttemptAnswer {
    Codes(Vec<String>),
    NotRegistered,
    /// Poisoned set on the final attempt
    Invalid,
}

pub struct ReinfoLookup<D: PortalDriver> {
    driver: D,
    settings: ReinfoSettings,
}

impl<D: PortalDriver> ReinfoLookup<D> {
    pub fn new(driver: D, settings: ReinfoSettings) -> Self {
        Self { driver, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &ReinfoSettings {
        &self.settings
    }

    /// Look up the unique codes registered for `ruc`
    pub async fn lookup(&self, ruc: &str) -> ReinfoOutcome {
        self.lookup_traced(ruc).await.outcome
    }

    /// Like [`lookup`](Self::lookup), also returning the state path taken
    pub async fn lookup_traced(&self, ruc: &str) -> Traced<ReinfoOutcome> {
        let ruc = normalize_ruc(ruc);
        let mut trace = LookupTrace::new();
        info!(ruc = %ruc, "Looking up REINFO unique code");
        let outcome = self.run(&ruc, &mut trace).await;
        info!(ruc = %ruc, outcome = %outcome, "REINFO lookup finished");
        Traced { outcome, trace }
    }

    async fn run(&self, ruc: &str, trace: &mut LookupTrace) -> ReinfoOutcome {
        let scope = match self.driver.open_scope().await {
            Ok(scope) => scope,
            Err(e) => {
                error!(ruc, "Could not open browsing context: {e:#}");
                trace.push(LookupState::Terminal);
                return ReinfoOutcome::Error;
            }
        };

        trace.push(LookupState::Probing);
        let outcome = if SiteAvailabilityProbe::is_reachable(
            &scope,
            &self.settings.url,
            self.settings.probe_timeout(),
        )
        .await
        {
            self.attempts(&scope, ruc, trace).await
        } else {
            error!(ruc, url = %self.settings.url, "REINFO site unavailable");
            trace.push(LookupState::Terminal);
            ReinfoOutcome::SiteUnavailable
        };

        if let Err(e) = scope.close().await {
            debug!(ruc, "Browsing context close failed: {e:#}");
        }
        outcome
    }

    async fn attempts(&self, scope: &D::Scope, ruc: &str, trace: &mut LookupTrace) -> ReinfoOutcome {
        let max_attempts = self.settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let timeout = self.settings.attempt_timeout(attempt);
            trace.push(LookupState::Attempting { attempt, timeout });
            info!(
                ruc,
                attempt,
                max_attempts,
                timeout_secs = timeout.as_secs(),
                "REINFO attempt"
            );

            match self.attempt(scope, ruc, attempt, max_attempts, timeout).await {
                Ok(AttemptAnswer::Codes(codes)) => {
                    info!(ruc, codes = %codes.join(", "), "REINFO codes found");
                    trace.push(LookupState::Success);
                    return ReinfoOutcome::Codes(codes);
                }
                Ok(AttemptAnswer::NotRegistered) => {
                    warn!(ruc, column = %self.settings.code_column, "Unique-code column not found");
                    trace.push(LookupState::Terminal);
                    return ReinfoOutcome::NotRegistered;
                }
                Ok(AttemptAnswer::Invalid) => {
                    warn!(ruc, attempt, "Known invalid result set on final attempt");
                    trace.push(LookupState::Terminal);
                    return ReinfoOutcome::InvalidResult;
                }
                Err(e) => {
                    error!(
                        ruc,
                        attempt,
                        timed_out = is_timeout_error(&e),
                        "REINFO attempt failed: {e:#}"
                    );
                    if attempt < max_attempts {
                        let delay = self.settings.backoff.delay(attempt);
                        trace.push(LookupState::Backoff { attempt, delay });
                        info!(
                            ruc,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying after backoff"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        error!(ruc, max_attempts, "Max attempts reached");
        trace.push(LookupState::Terminal);
        ReinfoOutcome::TimedOut
    }

    /// One attempt on a fresh page; the page is closed whatever happens
    async fn attempt(
        &self,
        scope: &D::Scope,
        ruc: &str,
        attempt: u32,
        max_attempts: u32,
        timeout: Duration,
    ) -> Result<AttemptAnswer> {
        let mut page = with_page_timeout(scope.new_page(), timeout, "New page").await?;
        let result = self
            .drive(&mut page, ruc, attempt, max_attempts, timeout)
            .await;
        if let Err(e) = with_page_timeout(page.close(), timeout, "Page close").await {
            debug!(ruc, attempt, "Page close failed: {e:#}");
        }
        result
    }

    async fn drive(
        &self,
        page: &mut <D::Scope as PortalScope>::Page,
        ruc: &str,
        attempt: u32,
        max_attempts: u32,
        timeout: Duration,
    ) -> Result<AttemptAnswer> {
        let settings = &self.settings;
        let selectors = &settings.selectors;

        NavigationRetrier::new(&settings.navigation)
            .navigate(page, &settings.url)
            .await?;
        self.settle(page, timeout).await?;

        with_page_timeout(page.wait_for_element(&selectors.ruc_input), settings.input_wait(), "RUC input")
            .await?;
        with_page_timeout(page.fill_field(&selectors.ruc_input, ruc), timeout, "Fill RUC").await?;
        settings.typing_pause.sleep().await;

        with_page_timeout(
            page.wait_for_element(&selectors.search_button),
            settings.button_wait(),
            "Search button",
        )
        .await?;
        with_page_timeout(page.click_trigger(&selectors.search_button), timeout, "Search click")
            .await?;

        with_page_timeout(
            page.wait_for_element(&selectors.results_table),
            settings.results_wait(),
            "Results table",
        )
        .await?;

        let html = with_page_timeout(
            page.element_html(&selectors.results_table),
            timeout,
            "Results table read",
        )
        .await?
        .ok_or_else(|| LookupError::MissingTable {
            selector: selectors.results_table.clone(),
        })?;

        let table = parse_table(&html)?;
        let Some(codes) = table.distinct_values(&settings.code_column) else {
            return Ok(AttemptAnswer::NotRegistered);
        };

        if settings.known_invalid_codes.matches(&codes) {
            warn!(ruc, attempt, "Known invalid result set returned");
            if attempt < max_attempts {
                return Err(LookupError::PoisonedResultSet { attempt }.into());
            }
            return Ok(AttemptAnswer::Invalid);
        }

        Ok(AttemptAnswer::Codes(codes))
    }

    /// Wait for network idle, falling back to DOM-parsed, then cool down
    async fn settle(&self, page: &<D::Scope as PortalScope>::Page, timeout: Duration) -> Result<()> {
        if let Err(e) = with_page_timeout(
            page.wait_for_load_state(WaitCondition::NetworkIdle),
            timeout,
            "Network idle",
        )
        .await
        {
            debug!("Network idle not reached ({e:#}), falling back to DOM parsed");
            with_page_timeout(
                page.wait_for_load_state(WaitCondition::DomContentLoaded),
                timeout,
                "DOM parsed",
            )
            .await?;
        }
        self.settings.settle_cooldown.sleep().await;
        Ok(())
    }
}
