//! Loading, environment overrides and validation

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::invalid_codes::KnownInvalidCodeSet;
use crate::error::LookupError;
use crate::lookup::backoff::{MAX_JITTER_FRACTION, MAX_PAUSE_SECS};
use super::types::LookupConfig;

pub const ENV_HEADLESS: &str = "VETA_HEADLESS";
pub const ENV_CHROME_PATH: &str = "VETA_CHROME_PATH";
pub const ENV_INVALID_CODES_FILE: &str = "VETA_INVALID_CODES_FILE";
pub const ENV_RECORD_DEADLINE_SECS: &str = "VETA_RECORD_DEADLINE_SECS";

impl LookupConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: LookupConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded lookup config");
        Ok(config)
    }

    /// Apply `VETA_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable lookup, so tests do not touch the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(&value)
                .with_context(|| format!("{ENV_HEADLESS} must be a boolean, got '{value}'"))?;
        }

        if let Some(value) = lookup(ENV_CHROME_PATH) {
            let path = PathBuf::from(value);
            if !path.exists() {
                warn!(path = %path.display(), "{ENV_CHROME_PATH} points to a missing file");
            }
            self.browser.chrome_executable = Some(path);
        }

        if let Some(value) = lookup(ENV_INVALID_CODES_FILE) {
            self.reinfo.known_invalid_codes = KnownInvalidCodeSet::from_json_file(Path::new(&value))?;
        }

        if let Some(value) = lookup(ENV_RECORD_DEADLINE_SECS) {
            let secs: u64 = value.trim().parse().with_context(|| {
                format!("{ENV_RECORD_DEADLINE_SECS} must be a number of seconds, got '{value}'")
            })?;
            self.batch.record_deadline_secs = (secs > 0).then_some(secs);
        }

        self.validate()
    }

    /// Reject budgets and ranges no lookup could run with
    pub fn validate(&self) -> Result<()> {
        if self.reinfo.max_attempts == 0 {
            return Err(invalid("reinfo.max_attempts must be at least 1"));
        }
        if self.sunat.attempts == 0 {
            return Err(invalid("sunat.attempts must be at least 1"));
        }
        if self.reinfo.navigation.max_attempts == 0 {
            return Err(invalid("reinfo.navigation.max_attempts must be at least 1"));
        }
        if self.reinfo.navigation.steps.is_empty() {
            return Err(invalid("reinfo.navigation.steps must not be empty"));
        }
        if !self.reinfo.backoff.is_valid() {
            return Err(invalid(format!(
                "reinfo.backoff needs finite delays up to {MAX_PAUSE_SECS} seconds and jitter within 0 to {MAX_JITTER_FRACTION}"
            )));
        }

        let retry_pause = self.reinfo.navigation.retry_pause_secs;
        if !retry_pause.is_finite() || !(0.0..=MAX_PAUSE_SECS).contains(&retry_pause) {
            return Err(invalid(format!(
                "reinfo.navigation.retry_pause_secs must be between 0 and {MAX_PAUSE_SECS}, got {retry_pause}"
            )));
        }

        let ranges = [
            ("reinfo.settle_cooldown", &self.reinfo.settle_cooldown),
            ("reinfo.typing_pause", &self.reinfo.typing_pause),
            ("sunat.typing_pause", &self.sunat.typing_pause),
            ("sunat.retry_cooldown", &self.sunat.retry_cooldown),
            ("batch.inter_record_delay", &self.batch.inter_record_delay),
        ];
        for (name, range) in ranges {
            if !range.is_valid() {
                return Err(invalid(format!(
                    "{name} is not a valid range ({} to {} seconds)",
                    range.min_secs, range.max_secs
                )));
            }
        }

        if self.reinfo.url.is_empty() || self.sunat.url.is_empty() {
            return Err(invalid("portal URLs must not be empty"));
        }
        Ok(())
    }
}

/// Validation failures surface as [`LookupError::Config`]
fn invalid(message: impl Into<String>) -> anyhow::Error {
    LookupError::Config(message.into()).into()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
