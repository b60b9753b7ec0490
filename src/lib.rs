//! plus_counter Library
//!
//! Counts `+` markers in group chat messages per user and posts ranked
//! daily and weekly reports before resetting the counters.

pub mod config;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod report;
pub mod store;
pub mod transport;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use domain::{AggregateState, TallyMap, UserTally, Window};
pub use handlers::{CounterService, IncomingMessage, IncrementCommand, ResetPolicy};
pub use store::{CounterStore, InMemoryStore, JsonFileStore};
