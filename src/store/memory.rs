//! In-memory Counter Store
//!
//! Keeps the snapshot as serialized JSON so load/save behave like the file store.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::AggregateState;

use super::{CounterStore, StoreError};

/// Volatile store; the snapshot is lost when the store is dropped
#[derive(Debug, Default)]
pub struct InMemoryStore {
    snapshot: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw snapshot
    pub fn with_snapshot(raw: impl Into<String>) -> Self {
        Self {
            snapshot: Mutex::new(Some(raw.into())),
        }
    }

    /// Raw stored document, if any
    pub fn raw(&self) -> Option<String> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn load(&self) -> Result<AggregateState, StoreError> {
        let state = match self.raw() {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "In-memory snapshot is malformed, starting empty");
                AggregateState::new()
            }),
            None => AggregateState::new(),
        };
        Ok(state)
    }

    async fn save(&self, state: &AggregateState) -> Result<(), StoreError> {
        let raw = serde_json::to_string(state)?;
        *self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(raw);
        Ok(())
    }
}
