//! Verify mining-related business registrations (RUC) against the SUNAT
//! taxpayer registry and the REINFO informal-mining registry with a headless
//! Chromium, then cross-reference the monthly RECPO list.
//!
//! The two lookups are [`ReinfoLookup`] and [`SunatLookup`]; both are generic
//! over the [`portal`] traits and never fail, returning sentinel values
//! instead. [`BatchRunner`] strings them together over a list of RUCs.

pub mod aggregate;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod lookup;
pub mod portal;
pub mod utils;

pub use aggregate::{BatchEntry, BatchReport, BatchRunner, RecpoIndex, VerificationRow};
pub use browser::{BrowserSession, WaitCondition};
pub use config::LookupConfig;
pub use error::LookupError;
pub use lookup::{
    ActivityAlert, LookupState, LookupTrace, ReinfoLookup, ReinfoOutcome, SunatLookup,
    SunatRecord, Traced,
};
pub use portal::{ChromeDriver, PortalDriver, PortalPage, PortalScope};
pub use utils::{is_well_formed_ruc, normalize_ruc};
