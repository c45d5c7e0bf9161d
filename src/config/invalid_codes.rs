//! The stale result set REINFO serves instead of a real answer

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::utils::constants::KNOWN_INVALID_CODES;

/// Set of unique codes that, returned together, mean the answer is poisoned
///
/// A result set is poisoned only when its distinct codes equal this set
/// exactly. A real registrant that happens to hold one of these codes is
/// still a valid answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownInvalidCodeSet(BTreeSet<String>);

impl Default for KnownInvalidCodeSet {
    fn default() -> Self {
        Self::new(KNOWN_INVALID_CODES)
    }
}

impl KnownInvalidCodeSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    /// Load a JSON array of strings
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read invalid codes file {}", path.display()))?;
        let codes: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid codes file {} is not a JSON string array", path.display()))?;
        Ok(Self::new(codes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the distinct values of `codes` are exactly this set
    #[must_use]
    pub fn matches(&self, codes: &[String]) -> bool {
        if self.0.is_empty() {
            return false;
        }
        let distinct: BTreeSet<&str> = codes.iter().map(String::as_str).collect();
        distinct.len() == self.0.len() && self.0.iter().all(|code| distinct.contains(code.as_str()))
    }
}
