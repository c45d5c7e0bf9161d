//! Portal lookup orchestration
//!
//! [`ReinfoLookup`] and [`SunatLookup`] drive a [`PortalDriver`] through
//! probing, attempts and backoff. Both are total: they always return a value
//! and log every failure on the way.
//!
//! [`PortalDriver`]: crate::portal::PortalDriver

pub mod backoff;
pub mod reinfo;
pub mod state;
pub mod sunat;

pub use backoff::{BackoffPolicy, JitterRange};
pub use reinfo::{ReinfoLookup, ReinfoOutcome};
pub use state::{LookupState, LookupTrace, Traced};
pub use sunat::{ActivityAlert, SunatLookup, SunatRecord};
