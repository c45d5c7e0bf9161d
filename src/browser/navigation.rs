//! Navigation with escalating wait conditions
//!
//! A slow portal often never reaches "network idle" but does finish parsing,
//! so the first attempt asks for the least and later attempts relax the
//! timeout while asking for more.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::timeout::with_page_timeout;
use super::wait::WaitCondition;
use crate::lookup::backoff::pause_duration;
use crate::portal::PortalPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStep {
    pub condition: WaitCondition,
    pub timeout_secs: u64,
}

impl NavigationStep {
    #[must_use]
    pub const fn new(condition: WaitCondition, timeout_secs: u64) -> Self {
        Self {
            condition,
            timeout_secs,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationPolicy {
    pub max_attempts: u32,
    /// Attempt `k` uses `steps[min(k, len) - 1]`
    pub steps: Vec<NavigationStep>,
    /// Pause between failed attempts
    pub retry_pause_secs: f64,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            steps: vec![
                NavigationStep::new(WaitCondition::DomContentLoaded, 20),
                NavigationStep::new(WaitCondition::NetworkIdle, 25),
                NavigationStep::new(WaitCondition::Load, 30),
            ],
            retry_pause_secs: crate::utils::constants::NAVIGATION_RETRY_PAUSE.as_secs_f64(),
        }
    }
}

impl NavigationPolicy {
    /// Step for a 1-based attempt; the last step repeats past the end
    #[must_use]
    pub fn step(&self, attempt: u32) -> NavigationStep {
        let last = self.steps.len().saturating_sub(1);
        let index = (attempt.max(1) as usize - 1).min(last);
        self.steps
            .get(index)
            .copied()
            .unwrap_or(NavigationStep::new(WaitCondition::Load, 30))
    }

    #[must_use]
    pub fn retry_pause(&self) -> Duration {
        pause_duration(self.retry_pause_secs)
    }
}

/// Navigates a page, retrying with the policy's escalating steps
pub struct NavigationRetrier<'a> {
    policy: &'a NavigationPolicy,
}

impl<'a> NavigationRetrier<'a> {
    #[must_use]
    pub fn new(policy: &'a NavigationPolicy) -> Self {
        Self { policy }
    }

    /// Returns on the first successful attempt; re-raises the last error
    /// once every attempt failed
    pub async fn navigate<P: PortalPage>(&self, page: &mut P, url: &str) -> Result<()> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let step = self.policy.step(attempt);
            debug!(url, attempt, condition = %step.condition, "Navigating");

            let operation = format!("Navigation ({})", step.condition);
            match with_page_timeout(page.navigate(url, step.condition), step.timeout(), &operation)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(url, attempt, "Navigation attempt failed: {e:#}");
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_pause()).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Navigation to {url} never attempted")))
    }
}
