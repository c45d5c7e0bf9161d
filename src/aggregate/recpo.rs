//! RECPO cross-reference: RUC to registration number
//!
//! The registry is maintained by hand and refreshed monthly as
//! `recpo_YYYY-MM.json`, a JSON object keyed by RUC.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::utils::ruc::normalize_ruc;

#[derive(Debug, Clone, Default)]
pub struct RecpoIndex {
    entries: HashMap<String, String>,
}

impl RecpoIndex {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(ruc, registration)| (normalize_ruc(ruc.as_ref()), registration.into()))
                .collect(),
        }
    }

    /// Parse a JSON object of `ruc -> registration`. Numeric registrations
    /// are accepted; nulls and empty strings count as no entry.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).context("RECPO file is not valid JSON")?;
        let Value::Object(map) = value else {
            bail!("RECPO file must be a JSON object keyed by RUC");
        };

        let entries = map.into_iter().filter_map(|(ruc, registration)| {
            let registration = match registration {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!registration.is_empty()).then_some((ruc, registration))
        });
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read RECPO file {}", path.display()))?;
        let index = Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse RECPO file {}", path.display()))?;
        info!(path = %path.display(), entries = index.len(), "RECPO loaded");
        Ok(index)
    }

    /// `dir/recpo_YYYY-MM.json` for the month of `date`
    #[must_use]
    pub fn monthly_path(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("recpo_{:04}-{:02}.json", date.year(), date.month()))
    }

    /// Load this month's file from `dir`. A missing file gives an empty
    /// index (every row is then flagged), matching a month not yet published.
    pub fn load_monthly(dir: &Path, date: NaiveDate) -> Result<Self> {
        let path = Self::monthly_path(dir, date);
        if !path.exists() {
            warn!(path = %path.display(), "RECPO file for this month does not exist");
            return Ok(Self::empty());
        }
        Self::from_json_file(&path)
    }

    #[must_use]
    pub fn get(&self, ruc: &str) -> Option<&str> {
        self.entries.get(ruc).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
