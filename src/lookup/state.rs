//! Retry state machine shared by both orchestrators
//!
//! ```text
//! Probing -> Attempting(1) -> { Success | Terminal | Backoff(1) -> Attempting(2) -> ... }
//! ```
//!
//! `Terminal` covers both a definitive answer (no registration, poisoned
//! set on the last attempt) and exhaustion.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LookupState {
    /// Reachability check before any attempt
    Probing,
    Attempting {
        attempt: u32,
        #[serde(with = "duration_secs")]
        timeout: Duration,
    },
    Backoff {
        attempt: u32,
        #[serde(with = "duration_secs")]
        delay: Duration,
    },
    /// A valid answer was read from the portal
    Success,
    /// The lookup ended without a usable answer, or with a definitive negative
    Terminal,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

/// Ordered record of the states a lookup passed through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LookupTrace {
    states: Vec<LookupState>,
}

impl LookupTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: LookupState) {
        self.states.push(state);
    }

    #[must_use]
    pub fn states(&self) -> &[LookupState] {
        &self.states
    }

    /// Number of attempts started
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.states
            .iter()
            .filter(|state| matches!(state, LookupState::Attempting { .. }))
            .count()
    }

    /// Backoff delays in order
    #[must_use]
    pub fn backoffs(&self) -> Vec<Duration> {
        self.states
            .iter()
            .filter_map(|state| match state {
                LookupState::Backoff { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<&LookupState> {
        self.states.last()
    }

    /// Whether the lookup reached `Success` or `Terminal`
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.last(), Some(LookupState::Success | LookupState::Terminal))
    }
}

/// A lookup outcome together with the path that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Traced<T> {
    pub outcome: T,
    pub trace: LookupTrace,
}
