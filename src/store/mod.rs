//! Counter Store module
//!
//! Persistence layer for the aggregate counter state.
//! The whole state is loaded and saved as one snapshot.

mod error;
mod memory;
mod repository;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use repository::{CounterStore, JsonFileStore, DATA_FILE_NAME};
