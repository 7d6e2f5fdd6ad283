//! Survey definitions shared by the tests and the `questflow` binary.
//!
//! `mobility` is the full field survey as shipped to surveyors; the other
//! surveys are small graphs that each exercise one routing rule.

pub mod mobility;
pub mod routing;

pub use mobility::{MOBILITY_JSON, mobility};
pub use routing::{age_check, city_lines, other_precision, transport_modes};
