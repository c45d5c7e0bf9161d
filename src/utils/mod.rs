pub mod constants;
pub mod ruc;

pub use constants::*;
pub use ruc::{is_well_formed_ruc, normalize_ruc};
