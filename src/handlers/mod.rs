//! Command Handlers module
//!
//! Orchestrates counter operations. Every load/mutate/save cycle runs
//! under one lock so increments and rollovers never interleave.

mod commands;
mod service;


pub use commands::*;
pub use service::{CounterService, ResetPolicy};
