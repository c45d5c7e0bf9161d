//! Configuration for portal lookups
//!
//! [`LookupConfig`] groups browser, REINFO, SUNAT and batch settings. Build
//! one with [`LookupConfig::builder`], load it with
//! [`LookupConfig::from_json_file`], then layer `VETA_*` environment
//! variables on top with [`LookupConfig::apply_env_overrides`].

pub mod builder;
pub mod invalid_codes;
pub mod loader;
pub mod types;

pub use builder::LookupConfigBuilder;
pub use invalid_codes::KnownInvalidCodeSet;
pub use types::{
    BatchSettings, BrowserSettings, LookupConfig, ReinfoSelectors, ReinfoSettings,
    SunatSelectors, SunatSettings,
};
