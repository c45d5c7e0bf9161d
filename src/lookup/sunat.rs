//! SUNAT economic-activity lookup
//!
//! Every attempt runs in its own browsing context so a half-submitted form
//! or a throttled session never leaks into the retry.

use anyhow::Result;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, error, info, warn};

use super::state::{LookupState, LookupTrace, Traced};
use crate::browser::timeout::with_page_timeout;
use crate::browser::wait::WaitCondition;
use crate::config::SunatSettings;
use crate::error::is_timeout_error;
use crate::extract::activity::{ACTIVITY_SEPARATOR, extract_activities, is_mining_activity};
use crate::portal::{PortalDriver, PortalPage, PortalScope};
use crate::utils::constants::{ACTIVITY_ERROR, ACTIVITY_NOT_FOUND, ALERT_NON_MINING, ALERT_NORMAL};
use crate::utils::ruc::normalize_ruc;

/// Classification of the declared activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAlert {
    Normal,
    NonMining,
    RetriesExhausted { attempts: u32 },
}

impl ActivityAlert {
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Normal => ALERT_NORMAL.to_string(),
            Self::NonMining => ALERT_NON_MINING.to_string(),
            Self::RetriesExhausted { attempts } => {
                format!("❌ No se pudo consultar tras {attempts} intentos")
            }
        }
    }
}

impl fmt::Display for ActivityAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for ActivityAlert {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

/// Terminal record of a SUNAT lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SunatRecord {
    pub ruc: String,
    /// `"; "`-joined activity lines, `"No encontrado"` or `"Error"`
    pub economic_activity: String,
    pub alert: ActivityAlert,
}

impl SunatRecord {
    /// Sentinel record once every attempt failed
    #[must_use]
    pub fn exhausted(ruc: impl Into<String>, attempts: u32) -> Self {
        Self {
            ruc: ruc.into(),
            economic_activity: ACTIVITY_ERROR.to_string(),
            alert: ActivityAlert::RetriesExhausted { attempts },
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self.alert, ActivityAlert::RetriesExhausted { .. })
    }
}

/// Build a record from the activity lines read off the results page
#[must_use]
pub fn classify(ruc: &str, activities: &[String], keywords: &[String]) -> SunatRecord {
    let joined = activities.join(ACTIVITY_SEPARATOR);
    let alert = if is_mining_activity(&joined, keywords) {
        ActivityAlert::Normal
    } else {
        ActivityAlert::NonMining
    };
    SunatRecord {
        ruc: ruc.to_string(),
        economic_activity: if joined.is_empty() {
            ACTIVITY_NOT_FOUND.to_string()
        } else {
            joined
        },
        alert,
    }
}

pub struct SunatLookup<D: PortalDriver> {
    driver: D,
    settings: SunatSettings,
}

impl<D: PortalDriver> SunatLookup<D> {
    pub fn new(driver: D, settings: SunatSettings) -> Self {
        Self { driver, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &SunatSettings {
        &self.settings
    }

    pub async fn lookup(&self, ruc: &str) -> SunatRecord {
        self.lookup_traced(ruc).await.outcome
    }

    pub async fn lookup_traced(&self, ruc: &str) -> Traced<SunatRecord> {
        let ruc = normalize_ruc(ruc);
        let attempts = self.settings.attempts.max(1);
        let mut trace = LookupTrace::new();
        info!(ruc = %ruc, "Looking up SUNAT activity");

        for attempt in 1..=attempts {
            let timeout = self.settings.navigation_timeout();
            trace.push(LookupState::Attempting { attempt, timeout });
            info!(ruc = %ruc, attempt, "SUNAT attempt");

            match self.attempt(&ruc).await {
                Ok(record) => {
                    info!(
                        ruc = %ruc,
                        alert = %record.alert,
                        "Activity: {}",
                        record.economic_activity.chars().take(60).collect::<String>()
                    );
                    trace.push(LookupState::Success);
                    return Traced {
                        outcome: record,
                        trace,
                    };
                }
                Err(e) => {
                    error!(
                        ruc = %ruc,
                        attempt,
                        timed_out = is_timeout_error(&e),
                        "SUNAT attempt failed: {e:#}"
                    );
                    // Cools down after the last failure too, to keep the
                    // next identifier off a throttled portal
                    let delay = self.settings.retry_cooldown.sample();
                    trace.push(LookupState::Backoff { attempt, delay });
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!(ruc = %ruc, attempts, "SUNAT retries exhausted");
        trace.push(LookupState::Terminal);
        Traced {
            outcome: SunatRecord::exhausted(ruc, attempts),
            trace,
        }
    }

    /// One attempt in a fresh scope; page and scope are closed either way
    async fn attempt(&self, ruc: &str) -> Result<SunatRecord> {
        let scope = self.driver.open_scope().await?;
        let result = match with_page_timeout(
            scope.new_page(),
            self.settings.action_timeout(),
            "New page",
        )
        .await
        {
            Ok(mut page) => {
                let result = self.drive(&mut page, ruc).await;
                if let Err(e) =
                    with_page_timeout(page.close(), self.settings.action_timeout(), "Page close")
                        .await
                {
                    debug!(ruc, "Page close failed: {e:#}");
                }
                result
            }
            Err(e) => Err(e),
        };
        if let Err(e) = scope.close().await {
            debug!(ruc, "Browsing context close failed: {e:#}");
        }
        result
    }

    async fn drive(&self, page: &mut <D::Scope as PortalScope>::Page, ruc: &str) -> Result<SunatRecord> {
        let settings = &self.settings;
        let selectors = &settings.selectors;
        let action_timeout = settings.action_timeout();

        with_page_timeout(
            page.navigate(&settings.url, WaitCondition::Load),
            settings.navigation_timeout(),
            "Navigation",
        )
        .await?;

        let in_frame = with_page_timeout(
            page.focus_frame(settings.form_frame.as_deref()),
            action_timeout,
            "Frame lookup",
        )
        .await?;
        debug!(ruc, in_frame, "Form document selected");

        with_page_timeout(page.wait_for_element(&selectors.ruc_input), settings.input_wait(), "RUC input")
            .await?;
        with_page_timeout(page.fill_field(&selectors.ruc_input, ruc), action_timeout, "Fill RUC").await?;
        settings.typing_pause.sleep().await;
        with_page_timeout(page.click_trigger(&selectors.submit_button), action_timeout, "Submit click")
            .await?;

        with_page_timeout(page.wait_for_url(&settings.results_route), settings.route_wait(), "Results URL")
            .await?;
        with_page_timeout(page.focus_frame(None), action_timeout, "Main document").await?;
        with_page_timeout(
            page.wait_for_element(&selectors.results_panel),
            settings.panel_wait(),
            "Results panel",
        )
        .await?;

        let html = with_page_timeout(page.document_html(), action_timeout, "Results read").await?;
        let activities = extract_activities(&html);
        Ok(classify(ruc, &activities, &settings.mining_keywords))
    }
}
