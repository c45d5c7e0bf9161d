//! Pure HTML extraction, no browser involved

pub mod activity;
pub mod table;

pub use activity::{ACTIVITY_SEPARATOR, extract_activities, is_mining_activity};
pub use table::{ParsedTable, parse_table};
