//! Verification rows and anomaly flags

use serde::Serialize;

use crate::lookup::reinfo::ReinfoOutcome;
use crate::lookup::sunat::SunatRecord;
use crate::utils::constants::{GENERIC_ERROR, NO_RECPO, NO_REINFO};

/// Activity substrings that count as mining for flagging (matched
/// case-insensitively)
const MINING_MARKERS: [&str; 2] = ["minera", "extracción"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyFlags {
    pub non_mining_activity: bool,
    pub missing_reinfo: bool,
    pub missing_recpo: bool,
    pub scrape_error: bool,
}

impl AnomalyFlags {
    #[must_use]
    pub fn any(&self) -> bool {
        self.non_mining_activity || self.missing_reinfo || self.missing_recpo || self.scrape_error
    }
}

/// One identifier after both lookups and the RECPO cross-reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRow {
    pub ruc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub economic_activity: String,
    pub alert: String,
    pub unique_code: String,
    pub recpo: String,
    pub flags: AnomalyFlags,
}

impl VerificationRow {
    #[must_use]
    pub fn new(
        name: Option<String>,
        sunat: &SunatRecord,
        reinfo: &ReinfoOutcome,
        recpo: Option<&str>,
    ) -> Self {
        let unique_code = reinfo.render();
        let activity = sunat.economic_activity.to_lowercase();

        let flags = AnomalyFlags {
            non_mining_activity: !MINING_MARKERS.iter().any(|marker| activity.contains(marker)),
            missing_reinfo: matches!(unique_code.trim(), NO_REINFO | GENERIC_ERROR),
            missing_recpo: recpo.is_none(),
            scrape_error: reinfo.is_error() || sunat.is_exhausted(),
        };

        Self {
            ruc: sunat.ruc.clone(),
            name,
            economic_activity: sunat.economic_activity.clone(),
            alert: sunat.alert.render(),
            unique_code,
            recpo: recpo.unwrap_or(NO_RECPO).to_string(),
            flags,
        }
    }

    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flags.any()
    }
}

/// All rows of a batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub rows: Vec<VerificationRow>,
}

impl BatchReport {
    /// Rows with at least one anomaly, one per RUC
    #[must_use]
    pub fn flagged(&self) -> Vec<&VerificationRow> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .filter(|row| row.is_flagged())
            .filter(|row| seen.insert(row.ruc.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::sunat::ActivityAlert;

    fn mining_record() -> SunatRecord {
        SunatRecord {
            ruc: "20606564016".to_string(),
            economic_activity: "Principal - 0729 - EXTRACCIÓN DE MINERALES".to_string(),
            alert: ActivityAlert::Normal,
        }
    }

    #[test]
    fn test_clean_row_is_not_flagged() {
        let row = VerificationRow::new(
            Some("VETA SAC".to_string()),
            &mining_record(),
            &ReinfoOutcome::Codes(vec!["750012345".to_string()]),
            Some("R-1"),
        );
        assert_eq!(row.unique_code, "750012345");
        assert_eq!(row.recpo, "R-1");
        assert!(!row.is_flagged());
    }

    #[test]
    fn test_missing_registrations_are_flagged() {
        let row = VerificationRow::new(None, &mining_record(), &ReinfoOutcome::NotRegistered, None);
        assert!(row.flags.missing_reinfo);
        assert!(row.flags.missing_recpo);
        assert!(!row.flags.scrape_error);
        assert_eq!(row.recpo, "⚠️ No tiene RECPO");
    }

    #[test]
    fn test_non_mining_and_errors() {
        let record = SunatRecord::exhausted("20606564016", 3);
        let row = VerificationRow::new(None, &record, &ReinfoOutcome::TimedOut, Some("R-1"));
        assert!(row.flags.non_mining_activity);
        assert!(row.flags.scrape_error);
        assert!(!row.flags.missing_reinfo);
    }

    #[test]
    fn test_flagged_dedupes_by_ruc() {
        let row = VerificationRow::new(None, &mining_record(), &ReinfoOutcome::Error, None);
        let report = BatchReport {
            rows: vec![row.clone(), row],
        };
        assert_eq!(report.flagged().len(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let row = VerificationRow::new(None, &mining_record(), &ReinfoOutcome::NotRegistered, None);
        let json = serde_json::to_value(&row).expect("json");
        assert_eq!(json["uniqueCode"], "No tiene REINFO");
        assert_eq!(json["economicActivity"], "Principal - 0729 - EXTRACCIÓN DE MINERALES");
        assert!(json.get("name").is_none());
        assert_eq!(json["flags"]["missingRecpo"], true);
    }
}
