//! Domain module
//!
//! Core counter types and marker parsing.

pub mod marker;
pub mod tally;

pub use marker::{contains_marker, count_markers, MARKER};
pub use tally::{total, AggregateState, TallyMap, UserId, UserTally, Window};
