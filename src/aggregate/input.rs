//! Identifier lists

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::utils::ruc::{is_well_formed_ruc, normalize_ruc};

/// One identifier to verify, with an optional display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub ruc: String,
    pub name: Option<String>,
}

impl BatchEntry {
    #[must_use]
    pub fn new(ruc: &str) -> Self {
        Self {
            ruc: normalize_ruc(ruc),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.trim().is_empty()).then(|| name.trim().to_string());
        self
    }
}

/// Parse one identifier per line: `RUC` or `RUC<sep>NAME` where the
/// separator is a comma, semicolon or tab. Blank lines and `#` comments are
/// skipped.
#[must_use]
pub fn parse_identifier_list(text: &str) -> Vec<BatchEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once([',', ';', '\t']) {
            Some((ruc, name)) => BatchEntry::new(ruc).with_name(name),
            None => BatchEntry::new(line),
        })
        .filter(|entry| !entry.ruc.is_empty())
        .collect()
}

pub fn read_identifier_file(path: &Path) -> Result<Vec<BatchEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifier file {}", path.display()))?;
    Ok(parse_identifier_list(&text))
}

/// Keep the first occurrence of each RUC, preserving order
#[must_use]
pub fn dedupe(entries: &[BatchEntry]) -> Vec<BatchEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| !entry.ruc.is_empty())
        .filter(|entry| seen.insert(entry.ruc.clone()))
        .inspect(|entry| {
            if !is_well_formed_ruc(&entry.ruc) {
                warn!(ruc = %entry.ruc, "Identifier is not an 11-digit RUC; looking it up anyway");
            }
        })
        .cloned()
        .collect()
}
