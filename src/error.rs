//! Error types for portal lookups
//!
//! Browser plumbing reports through `anyhow` with context; the variants here
//! name the failures the orchestrators reason about. Both orchestrators are
//! total, so none of these ever reaches a batch caller.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// A bounded wait ran out
    #[error("{operation} timeout after {} seconds", .timeout.as_secs_f64())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    /// The browser reported a navigation failure (DNS, TLS, aborted)
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// Expected form element never showed up
    #[error("Element '{selector}' not found")]
    ElementNotFound { selector: String },

    /// Results table selector matched but no HTML came back
    #[error("Could not extract results table '{selector}'")]
    MissingTable { selector: String },

    /// The portal answered with the known stale default table
    #[error("Known invalid result set returned on attempt {attempt}")]
    PoisonedResultSet { attempt: u32 },

    /// Browser process or CDP channel failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LookupError {
    /// True for failures caused by a bounded wait running out
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, LookupError::Timeout { .. })
    }
}

/// Find a [`LookupError`] anywhere in an `anyhow` chain
#[must_use]
pub fn find_lookup_error(error: &anyhow::Error) -> Option<&LookupError> {
    error.chain().find_map(|cause| cause.downcast_ref::<LookupError>())
}

/// True when any cause in the chain is a [`LookupError::Timeout`]
#[must_use]
pub fn is_timeout_error(error: &anyhow::Error) -> bool {
    find_lookup_error(error).is_some_and(LookupError::is_timeout)
}
