//! Batch verification
//!
//! Runs the SUNAT pass over every distinct identifier, then the REINFO pass,
//! strictly one identifier at a time with a randomized pause in between, and
//! joins both with the RECPO registry into one [`VerificationRow`] per input
//! entry. Repeated identifiers are looked up once and share the result.

pub mod input;
pub mod recpo;
pub mod report;

use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::LookupConfig;
use crate::lookup::backoff::JitterRange;
use crate::lookup::reinfo::{ReinfoLookup, ReinfoOutcome};
use crate::lookup::sunat::{SunatLookup, SunatRecord};
use crate::portal::PortalDriver;

pub use input::{BatchEntry, dedupe, parse_identifier_list, read_identifier_file};
pub use recpo::RecpoIndex;
pub use report::{AnomalyFlags, BatchReport, VerificationRow};

pub struct BatchRunner<D: PortalDriver> {
    sunat: SunatLookup<D>,
    reinfo: ReinfoLookup<D>,
    inter_record_delay: JitterRange,
    record_deadline: Option<Duration>,
}

impl<D: PortalDriver + Clone> BatchRunner<D> {
    pub fn new(driver: D, config: &LookupConfig) -> Self {
        Self {
            sunat: SunatLookup::new(driver.clone(), config.sunat().clone()),
            reinfo: ReinfoLookup::new(driver, config.reinfo().clone()),
            inter_record_delay: config.batch().inter_record_delay,
            record_deadline: config.batch().record_deadline(),
        }
    }
}

impl<D: PortalDriver> BatchRunner<D> {
    /// Verify `entries`, one row per entry in input order
    pub async fn run(&self, entries: &[BatchEntry], recpo: &RecpoIndex) -> BatchReport {
        let unique = dedupe(entries);
        info!(entries = entries.len(), identifiers = unique.len(), "Starting batch");

        let mut sunat_records = Vec::with_capacity(unique.len());
        for (index, entry) in unique.iter().enumerate() {
            if index > 0 {
                self.inter_record_delay.sleep().await;
            }
            sunat_records.push(self.sunat_record(&entry.ruc).await);
        }

        let mut reinfo_outcomes = Vec::with_capacity(unique.len());
        for (index, entry) in unique.iter().enumerate() {
            if index > 0 {
                self.inter_record_delay.sleep().await;
            }
            reinfo_outcomes.push(self.reinfo_outcome(&entry.ruc).await);
        }

        let results: HashMap<&str, (SunatRecord, ReinfoOutcome)> = unique
            .iter()
            .map(|entry| entry.ruc.as_str())
            .zip(sunat_records.into_iter().zip(reinfo_outcomes))
            .collect();

        // entries with a blank RUC were never looked up and get no row
        let rows: Vec<VerificationRow> = entries
            .iter()
            .filter_map(|entry| {
                let (sunat, reinfo) = results.get(entry.ruc.as_str())?;
                Some(VerificationRow::new(
                    entry.name.clone(),
                    sunat,
                    reinfo,
                    recpo.get(&entry.ruc),
                ))
            })
            .collect();

        let report = BatchReport { rows };
        info!(
            rows = report.rows.len(),
            flagged = report.flagged().len(),
            "Batch finished"
        );
        report
    }

    /// SUNAT lookup bounded by the record deadline
    pub async fn sunat_record(&self, ruc: &str) -> SunatRecord {
        let lookup = self.sunat.lookup(ruc);
        match self.record_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, lookup).await {
                Ok(record) => record,
                Err(_) => {
                    warn!(ruc, deadline_secs = deadline.as_secs(), "SUNAT lookup hit the record deadline");
                    SunatRecord::exhausted(ruc, self.sunat.settings().attempts)
                }
            },
            None => lookup.await,
        }
    }

    /// REINFO lookup bounded by the record deadline
    pub async fn reinfo_outcome(&self, ruc: &str) -> ReinfoOutcome {
        let lookup = self.reinfo.lookup(ruc);
        match self.record_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, lookup).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(ruc, deadline_secs = deadline.as_secs(), "REINFO lookup hit the record deadline");
                    ReinfoOutcome::TimedOut
                }
            },
            None => lookup.await,
        }
    }
}
